mod assistant;
mod config;
mod files;

use assistant::ChatClient;
use config::AssistantConfig;
use log::{info, warn};
use tauri::{Manager, State};

#[tauri::command]
async fn chat_completion(
    client: State<'_, ChatClient>,
    prompt: String,
) -> Result<Option<String>, String> {
    client.complete(&prompt).await.map_err(|e| {
        warn!("chat completion failed: {e}");
        e.to_string()
    })
}

#[tauri::command]
async fn export_markdown(filename: String, content: String) -> Result<bool, String> {
    match files::save_with_dialog(&filename, &content).await {
        Ok(Some(path)) => {
            info!("exported {}", path.display());
            Ok(true)
        }
        Ok(None) => {
            info!("export of {filename} cancelled");
            Ok(false)
        }
        Err(e) => {
            warn!("export failed: {e}");
            Err(e.to_string())
        }
    }
}

#[tauri::command]
async fn pick_image() -> Result<Option<String>, String> {
    let picked = files::pick_image_data_url().await.map_err(|e| e.to_string())?;
    if picked.is_some() {
        info!("inlined picked image");
    }
    Ok(picked)
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AssistantConfig::from_env();
    tauri::Builder::default()
        .setup(move |app| {
            let client = ChatClient::new(config)?;
            if !client.has_api_key() {
                warn!("{} is not set; assistant prompts will fail", config::API_KEY_VAR);
            }
            app.manage(client);
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            chat_completion,
            export_markdown,
            pick_image
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
