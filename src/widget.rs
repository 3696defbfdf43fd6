use leptos::html;
use leptos::logging::warn;
use leptos::prelude::*;
use leptos::task::spawn_local;
use pulldown_cmark::{html as cmark_html, Options, Parser};
use regex::{Captures, Regex};
use std::sync::OnceLock;
use web_sys::HtmlTextAreaElement;

use crate::editor_core::{
    apply_markdown_command, byte_idx_to_utf16, utf16_to_byte_idx, BlockType, CoreError,
    EditorSnapshot, MarkdownCommand, Selection,
};
use crate::ipc;

const IMAGE_SUGGESTION: &str = "https://picsum.photos/200/300";

fn highlight_markdown(text: &str) -> String {
    static RE_H1: OnceLock<Regex> = OnceLock::new();
    static RE_H2: OnceLock<Regex> = OnceLock::new();
    static RE_H3: OnceLock<Regex> = OnceLock::new();
    static RE_QUOTE: OnceLock<Regex> = OnceLock::new();
    static RE_INLINE: OnceLock<Regex> = OnceLock::new();

    let re_h1 = RE_H1.get_or_init(|| Regex::new(r"(?m)^(#[^\S\n]+.*)$").unwrap());
    let re_h2 = RE_H2.get_or_init(|| Regex::new(r"(?m)^(##[^\S\n]+.*)$").unwrap());
    let re_h3 = RE_H3.get_or_init(|| Regex::new(r"(?m)^(#{3,6}[^\S\n]+.*)$").unwrap());
    let re_quote = RE_QUOTE.get_or_init(|| Regex::new(r"(?m)^(&gt;.*)$").unwrap());
    // Markers stay in the output so the overlay lines up with the textarea.
    let re_inline = RE_INLINE.get_or_init(|| {
        Regex::new(
            r"(?P<bold>\*\*[^\n]+?\*\*)|(?P<italic>\*[^*\n]+\*)|(?P<code>`[^`\n]+`)|(?P<link>!?\[[^\]\n]*\]\([^)\n]*\))",
        )
        .unwrap()
    });

    let mut html = text
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");

    html = re_h1.replace_all(&html, "<span class=\"hl-h1\">$1</span>").to_string();
    html = re_h2.replace_all(&html, "<span class=\"hl-h2\">$1</span>").to_string();
    html = re_h3.replace_all(&html, "<span class=\"hl-h3\">$1</span>").to_string();
    html = re_quote.replace_all(&html, "<span class=\"hl-quote\">$1</span>").to_string();
    html = re_inline
        .replace_all(&html, |caps: &Captures| {
            let class = ["bold", "italic", "code", "link"]
                .into_iter()
                .find(|name| caps.name(name).is_some())
                .unwrap_or("bold");
            format!("<span class=\"hl-{class}\">{}</span>", &caps[0])
        })
        .into_owned();

    // Trailing newline keeps the overlay as tall as the textarea.
    html.push_str("\n ");
    html
}

pub fn render_markdown(text: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_YAML_STYLE_METADATA_BLOCKS);

    let mut out = String::with_capacity(text.len() * 3 / 2);
    cmark_html::push_html(&mut out, Parser::new_ext(text, options));
    out
}

fn dom_selection(el: &HtmlTextAreaElement, text: &str) -> Option<Selection> {
    let start = el.selection_start().ok().flatten()?;
    let end = el.selection_end().ok().flatten()?;
    Some(Selection::new(
        utf16_to_byte_idx(text, start),
        utf16_to_byte_idx(text, end),
    ))
}

fn write_dom(el: &HtmlTextAreaElement, text: &str, selection: Selection) {
    el.set_value(text);
    let _ = el.set_selection_range(
        byte_idx_to_utf16(text, selection.start),
        byte_idx_to_utf16(text, selection.end),
    );
    let _ = el.focus();
}

fn ask(message: &str, default: &str) -> Option<String> {
    window()
        .prompt_with_message_and_default(message, default)
        .ok()
        .flatten()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Key bindings of the editor. Keys pressed while an IME composition is open
/// belong to the IME.
fn key_command(
    key: &str,
    modifier: bool,
    shift: bool,
    composing: bool,
) -> Option<MarkdownCommand> {
    if composing {
        return None;
    }
    match key {
        "b" | "B" if modifier => Some(MarkdownCommand::BOLD),
        "i" | "I" if modifier => Some(MarkdownCommand::ITALIC),
        "u" | "U" if modifier => Some(MarkdownCommand::UNDERLINE),
        "Tab" if shift => Some(MarkdownCommand::Outdent),
        "Tab" => Some(MarkdownCommand::Indent),
        "Enter" if !modifier && !shift => Some(MarkdownCommand::ContinueBlock),
        _ => None,
    }
}

/// Runs `command` against the widget's snapshot, starting from `selection` if
/// the DOM reported one. `None` once the widget's signals are gone.
fn apply_to_snapshot(
    snapshot: RwSignal<EditorSnapshot>,
    selection: Option<Selection>,
    command: &MarkdownCommand,
) -> Option<Result<bool, CoreError>> {
    if let Some(selection) = selection {
        snapshot.try_update_untracked(|s| s.set_selection(selection))?;
    }
    snapshot.try_update(|s| apply_markdown_command(s, command))
}

/// Markdown editing surface. `markdown` seeds the widget once; afterwards it
/// only reports edits through `on_change` and never takes content from its
/// parent. Remount it to show different content.
#[component]
pub fn MarkdownWidget(
    markdown: String,
    #[prop(into)] on_change: Callback<String>,
) -> impl IntoView {
    let snapshot = RwSignal::new(EditorSnapshot::new(markdown));
    let text = Memo::new(move |_| snapshot.with(|s| s.text.clone()));
    let highlighted = Memo::new(move |_| text.with(|t| highlight_markdown(t)));
    let (previewing, set_previewing) = signal(false);
    let (scroll_top, set_scroll_top) = signal(0);
    let textarea = NodeRef::<html::Textarea>::new();

    let run_command = move |command: MarkdownCommand| -> bool {
        // An image upload can resolve after the widget was unmounted.
        if snapshot.is_disposed() {
            return false;
        }
        let el = textarea.get_untracked();
        let selection = el
            .as_ref()
            .and_then(|el| snapshot.with_untracked(|s| dom_selection(el, &s.text)));

        match apply_to_snapshot(snapshot, selection, &command) {
            Some(Ok(true)) => {
                let (text, selection) = snapshot.with_untracked(|s| (s.text.clone(), s.selection));
                if let Some(el) = el {
                    write_dom(&el, &text, selection);
                }
                on_change.run(text);
                true
            }
            Some(Ok(false)) | None => false,
            Some(Err(err)) => {
                warn!("markdown command rejected: {err}");
                false
            }
        }
    };

    let on_input = move |ev| {
        let value = event_target_value(&ev);
        let selection = textarea
            .get_untracked()
            .and_then(|el| dom_selection(&el, &value))
            .unwrap_or(Selection::cursor(value.len()));
        let mut changed = false;
        snapshot.update(|s| changed = s.replace_from_input(value.clone(), selection).text_changed);
        if changed {
            on_change.run(value);
        }
    };

    let on_keydown = move |ev: web_sys::KeyboardEvent| {
        let modifier = ev.ctrl_key() || ev.meta_key();
        let Some(command) = key_command(&ev.key(), modifier, ev.shift_key(), ev.is_composing())
        else {
            return;
        };
        // Tab never moves focus out of the editor. Enter outside a list or
        // quote keeps the native newline.
        let is_indent = matches!(command, MarkdownCommand::Indent | MarkdownCommand::Outdent);
        if run_command(command) || is_indent {
            ev.prevent_default();
        }
    };

    let insert_link = move |_| {
        if let Some(url) = ask("Link URL", "https://") {
            run_command(MarkdownCommand::InsertLink { url });
        }
    };

    let insert_image = move |_| {
        if let Some(url) = ask("Image URL", IMAGE_SUGGESTION) {
            run_command(MarkdownCommand::InsertImage { url });
        }
    };

    let upload_image = move |_| {
        spawn_local(async move {
            match ipc::pick_image().await {
                Ok(Some(url)) => {
                    run_command(MarkdownCommand::InsertImage { url });
                }
                Ok(None) => {}
                Err(err) => warn!("image pick failed: {err}"),
            }
        });
    };

    let set_block_type = move |ev| {
        let select: web_sys::HtmlSelectElement = event_target(&ev);
        let block = match select.value().as_str() {
            "paragraph" => Some(BlockType::Paragraph),
            "h1" => Some(BlockType::Heading(1)),
            "h2" => Some(BlockType::Heading(2)),
            "h3" => Some(BlockType::Heading(3)),
            "quote" => Some(BlockType::Quote),
            _ => None,
        };
        select.set_value("");
        if let Some(block) = block {
            run_command(MarkdownCommand::SetBlockType(block));
        }
    };

    let tool_style = "background: transparent; border: 1px solid var(--border-color); border-radius: var(--radius-md); padding: 0.2rem 0.6rem; cursor: pointer; color: var(--text-secondary);";

    view! {
        <div class="markdown-widget" style="flex: 1; display: flex; flex-direction: column; min-height: 0;">
            <div class="toolbar" style="display: flex; flex-wrap: wrap; gap: 0.35rem; padding: 0.5rem 1.5rem; border-bottom: 1px solid var(--border-color);">
                <button style=tool_style title="Insert front-matter" on:click=move |_| { run_command(MarkdownCommand::InsertFrontmatter); }>"---"</button>
                <button style=tool_style title="Insert table" on:click=move |_| { run_command(MarkdownCommand::InsertTable); }>"Table"</button>
                <button style=tool_style title="Insert image" on:click=insert_image>"Image"</button>
                {ipc::is_tauri().then(|| view! {
                    <button style=tool_style title="Upload image" on:click=upload_image>"Upload"</button>
                })}
                <button style=tool_style title="Create link" on:click=insert_link>"Link"</button>
                <button style=tool_style title="Bold" on:click=move |_| { run_command(MarkdownCommand::BOLD); }><b>"B"</b></button>
                <button style=tool_style title="Italic" on:click=move |_| { run_command(MarkdownCommand::ITALIC); }><i>"I"</i></button>
                <button style=tool_style title="Underline" on:click=move |_| { run_command(MarkdownCommand::UNDERLINE); }><u>"U"</u></button>
                <select style=tool_style on:change=set_block_type>
                    <option value="">"Block type"</option>
                    <option value="paragraph">"Paragraph"</option>
                    <option value="h1">"Heading 1"</option>
                    <option value="h2">"Heading 2"</option>
                    <option value="h3">"Heading 3"</option>
                    <option value="quote">"Quote"</option>
                </select>
                <button
                    style=move || format!("{tool_style} margin-left: auto;{}", if previewing.get() { " background: var(--accent-color); color: white;" } else { "" })
                    on:click=move |_| set_previewing.update(|on| *on = !*on)
                >
                    "Preview"
                </button>
            </div>
            <div class="editor-container" style="flex: 1; position: relative; overflow: hidden; background: var(--bg-primary);">
                <div
                    class="markdown-highlight-layer"
                    style="position: absolute; top: 0; left: 0; width: 100%; height: 100%; padding: 2rem 3rem; font-family: var(--font-editor); font-size: var(--editor-font-size); line-height: 1.6; color: var(--text-primary); white-space: pre-wrap; word-wrap: break-word; pointer-events: none; box-sizing: border-box; overflow-y: hidden;"
                    inner_html=move || highlighted.get()
                    prop:scrollTop=move || scroll_top.get()
                ></div>
                <textarea
                    class="raw-editor"
                    node_ref=textarea
                    style="position: absolute; top: 0; left: 0; width: 100%; height: 100%; padding: 2rem 3rem; font-family: var(--font-editor); font-size: var(--editor-font-size); line-height: 1.6; color: transparent; background: transparent; caret-color: var(--text-primary); outline: none; border: none; resize: none; box-sizing: border-box; overflow-y: auto;"
                    prop:value=move || text.get()
                    on:input=on_input
                    on:keydown=on_keydown
                    on:scroll=move |e| {
                        let target: web_sys::Element = event_target(&e);
                        set_scroll_top.set(target.scroll_top());
                    }
                    placeholder="Start writing markdown..."
                    spellcheck="false"
                ></textarea>
                <Show when=move || previewing.get()>
                    <div
                        class="markdown-preview"
                        style="position: absolute; inset: 0; padding: 2rem 3rem; overflow-y: auto; background: var(--bg-primary); color: var(--text-primary);"
                        inner_html=move || text.with(|t| render_markdown(t))
                    ></div>
                </Show>
            </div>
        </div>
    }
}
