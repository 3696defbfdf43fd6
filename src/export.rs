use regex::Regex;
use std::sync::OnceLock;
use wasm_bindgen::{JsCast, JsValue};

use crate::ipc;

const FALLBACK_STEM: &str = "untitled";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportOutcome {
    Saved(String),
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ExportError {
    #[error("browser download failed: {0}")]
    Dom(String),
    #[error("host could not save the file: {0}")]
    Host(String),
}

impl From<JsValue> for ExportError {
    fn from(value: JsValue) -> Self {
        ExportError::Dom(ipc::js_error_message(&value))
    }
}

/// Turns a title into a filesystem-safe stem: lower-case, whitespace runs
/// collapsed to `-`, and everything outside `[a-z0-9-]` removed.
pub fn format_title(title: &str) -> String {
    static RE_SPACE: OnceLock<Regex> = OnceLock::new();
    static RE_UNSAFE: OnceLock<Regex> = OnceLock::new();

    let re_space = RE_SPACE.get_or_init(|| Regex::new(r"\s+").unwrap());
    let re_unsafe = RE_UNSAFE.get_or_init(|| Regex::new(r"[^a-z0-9\-]").unwrap());

    let lowered = title.trim().to_lowercase();
    let dashed = re_space.replace_all(&lowered, "-");
    re_unsafe.replace_all(&dashed, "").into_owned()
}

pub fn export_filename(title: &str) -> String {
    let stem = format_title(title);
    if stem.is_empty() {
        format!("{FALLBACK_STEM}.md")
    } else {
        format!("{stem}.md")
    }
}

/// Offers `content` to the user as `filename`. Inside the desktop host this
/// goes through a native save dialog; in a plain browser it triggers a blob
/// download.
pub async fn export_markdown(
    filename: String,
    content: String,
) -> Result<ExportOutcome, ExportError> {
    if ipc::is_tauri() {
        let saved = ipc::export_markdown(&filename, &content)
            .await
            .map_err(ExportError::Host)?;
        return Ok(if saved {
            ExportOutcome::Saved(filename)
        } else {
            ExportOutcome::Cancelled
        });
    }
    download_blob(&filename, &content)?;
    Ok(ExportOutcome::Saved(filename))
}

fn download_blob(filename: &str, content: &str) -> Result<(), ExportError> {
    let parts = js_sys::Array::of1(&JsValue::from_str(content));
    let options = web_sys::BlobPropertyBag::new();
    options.set_type("text/markdown");
    let blob = web_sys::Blob::new_with_str_sequence_and_options(&parts, &options)?;
    let url = web_sys::Url::create_object_url_with_blob(&blob)?;

    let document = leptos::prelude::document();
    let body = document
        .body()
        .ok_or_else(|| ExportError::Dom("document has no body".to_string()))?;
    let link: web_sys::HtmlAnchorElement = document.create_element("a")?.unchecked_into();
    link.set_href(&url);
    link.set_download(filename);
    body.append_child(&link)?;
    link.click();

    body.remove_child(&link)?;
    web_sys::Url::revoke_object_url(&url)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_titles_into_slugs() {
        assert_eq!(format_title("My Cool Note!!"), "my-cool-note");
        assert_eq!(format_title("  Trip   to\tOslo  "), "trip-to-oslo");
        assert_eq!(format_title("v2.0 release-notes"), "v20-release-notes");
        assert_eq!(format_title("Café crème"), "caf-crme");
    }

    #[test]
    fn blank_titles_fall_back_to_untitled() {
        assert_eq!(format_title("   "), "");
        assert_eq!(export_filename("   "), "untitled.md");
        assert_eq!(export_filename(""), "untitled.md");
        assert_eq!(export_filename("!!!"), "untitled.md");
    }

    #[test]
    fn filename_gets_markdown_extension() {
        assert_eq!(export_filename("My Cool Note!!"), "my-cool-note.md");
    }

    #[test]
    fn slug_is_idempotent() {
        for title in [
            "My Cool Note!!",
            "  a - b  ",
            "Ünïcode  Title\n2",
            "already-a-slug",
            "---",
            "",
        ] {
            let once = format_title(title);
            assert_eq!(format_title(&once), once, "title: {title:?}");
        }
    }
}
