use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fs;
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "webp", "svg"];

#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("could not write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0} is not a supported image type")]
    UnsupportedImage(String),
}

pub fn write_markdown(path: &Path, content: &str) -> Result<(), FileError> {
    fs::write(path, content).map_err(|source| FileError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Asks the user where to put `filename` and writes `content` there verbatim.
/// `None` means the dialog was dismissed.
pub async fn save_with_dialog(
    filename: &str,
    content: &str,
) -> Result<Option<PathBuf>, FileError> {
    let Some(handle) = rfd::AsyncFileDialog::new()
        .set_file_name(filename)
        .add_filter("Markdown", &["md"])
        .save_file()
        .await
    else {
        return Ok(None);
    };
    let path = handle.path().to_path_buf();
    write_markdown(&path, content)?;
    Ok(Some(path))
}

fn mime_for(name: &str) -> Option<&'static str> {
    let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

pub fn image_data_url(name: &str, bytes: &[u8]) -> Result<String, FileError> {
    let mime = mime_for(name).ok_or_else(|| FileError::UnsupportedImage(name.to_string()))?;
    Ok(format!("data:{mime};base64,{}", STANDARD.encode(bytes)))
}

/// Lets the user pick an image and inlines it so the markdown needs no
/// external file.
pub async fn pick_image_data_url() -> Result<Option<String>, FileError> {
    let Some(handle) = rfd::AsyncFileDialog::new()
        .add_filter("Images", &IMAGE_EXTENSIONS)
        .pick_file()
        .await
    else {
        return Ok(None);
    };
    let bytes = handle.read().await;
    image_data_url(&handle.file_name(), &bytes).map(Some)
}
