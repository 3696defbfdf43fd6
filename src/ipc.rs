//! Bindings to the desktop host's command bridge.

use serde::Serialize;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(catch, js_namespace = ["window", "__TAURI__", "core"])]
    async fn invoke(cmd: &str, args: JsValue) -> Result<JsValue, JsValue>;
}

#[derive(Serialize)]
struct ChatArgs<'a> { prompt: &'a str }
#[derive(Serialize)]
struct ExportArgs<'a> { filename: &'a str, content: &'a str }

/// Whether the page runs inside the desktop host.
pub fn is_tauri() -> bool {
    let window = leptos::prelude::window();
    js_sys::Reflect::get(&window, &JsValue::from_str("__TAURI__"))
        .map(|value| !value.is_undefined() && !value.is_null())
        .unwrap_or(false)
}

/// Best-effort text for an error thrown across the JS boundary. Host
/// commands reject with plain strings.
pub fn js_error_message(value: &JsValue) -> String {
    if let Some(text) = value.as_string() {
        return text;
    }
    js_sys::Reflect::get(value, &JsValue::from_str("message"))
        .ok()
        .and_then(|message| message.as_string())
        .unwrap_or_else(|| format!("{value:?}"))
}

async fn call(cmd: &str, args: JsValue) -> Result<JsValue, String> {
    invoke(cmd, args).await.map_err(|err| js_error_message(&err))
}

fn to_args<T: Serialize>(args: &T) -> Result<JsValue, String> {
    serde_wasm_bindgen::to_value(args).map_err(|err| err.to_string())
}

/// Sends `prompt` to the chat endpoint through the host. `Ok(None)` means the
/// endpoint answered without a reply.
pub async fn chat_completion(prompt: &str) -> Result<Option<String>, String> {
    let value = call("chat_completion", to_args(&ChatArgs { prompt })?).await?;
    serde_wasm_bindgen::from_value(value).map_err(|err| err.to_string())
}

/// Returns `false` when the user cancelled the save dialog.
pub async fn export_markdown(filename: &str, content: &str) -> Result<bool, String> {
    let value = call("export_markdown", to_args(&ExportArgs { filename, content })?).await?;
    Ok(value.as_bool().unwrap_or(false))
}

/// Lets the user choose an image file; returns it as a `data:` URL.
pub async fn pick_image() -> Result<Option<String>, String> {
    let value = call("pick_image", JsValue::UNDEFINED).await?;
    Ok(value.as_string())
}
