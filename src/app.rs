use leptos::logging::{error, log, warn};
use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::assistant::AssistantState;
use crate::entry_store::EntryId;
use crate::export::{export_markdown, ExportOutcome};
use crate::modal::AssistantModal;
use crate::notebook::Notebook;
use crate::widget::MarkdownWidget;

const BUTTON_STYLE: &str = "padding: 0.4rem 0.75rem; border: none; border-radius: var(--radius-md); color: white; cursor: pointer; font-size: 0.85rem;";

/// Keystrokes reported by the widget. They never remount it.
fn edit_sink(notebook: RwSignal<Notebook>) -> Callback<String> {
    Callback::new(move |text: String| notebook.update(|n| n.edit_content(text)))
}

/// Accepted assistant replies. These land as a replace so the widget remounts
/// with the appended text.
fn reply_sink(notebook: RwSignal<Notebook>) -> Callback<String> {
    Callback::new(move |reply: String| notebook.update(|n| n.append_reply(&reply)))
}

#[component]
pub fn App() -> impl IntoView {
    let notebook = RwSignal::new(Notebook::new());
    let assistant = RwSignal::new(AssistantState::default());
    let (prompt_open, set_prompt_open) = signal(false);
    let (status, set_status) = signal(None::<String>);

    // Memos keep keystrokes in the editor from re-rendering the rest of the shell.
    let entries = Memo::new(move |_| notebook.with(|n| n.entries().to_vec()));
    let current_id = Memo::new(move |_| notebook.with(|n| n.current_id()));
    let has_current = Memo::new(move |_| notebook.with(|n| n.has_current()));
    let generation = Memo::new(move |_| notebook.with(|n| n.generation()));
    let title = Memo::new(move |_| notebook.with(|n| n.title().to_string()));

    let new_entry = move |_| {
        notebook.update(|n| {
            n.new_entry();
        });
        set_status.set(None);
    };

    let save_entry = move |_| notebook.update(|n| n.save());

    let load_entry = move |id: EntryId| {
        notebook.update(|n| {
            if let Err(err) = n.load(id) {
                warn!("{err}");
            }
        });
        set_status.set(None);
    };

    let export_entry = move |_| {
        let (filename, content) = notebook.with_untracked(|n| n.export_request());
        spawn_local(async move {
            match export_markdown(filename, content).await {
                Ok(ExportOutcome::Saved(name)) => {
                    log!("exported {name}");
                    set_status.set(Some(format!("Exported {name}")));
                }
                Ok(ExportOutcome::Cancelled) => log!("export cancelled"),
                Err(err) => {
                    error!("export failed: {err}");
                    set_status.set(Some(format!("Export failed: {err}")));
                }
            }
        });
    };

    let append_reply = reply_sink(notebook);
    let edit_content = edit_sink(notebook);

    let editor = move || {
        if !has_current.get() {
            return view! {
                <div style="flex: 1; display: flex; align-items: center; justify-content: center; color: var(--text-muted);">
                    "Please create or select an entry to start editing."
                </div>
            }
            .into_any();
        }
        // Only a new generation rebuilds the widget; user edits flow out through on_change.
        generation.track();
        let markdown = notebook.with_untracked(|n| n.content().to_string());
        view! {
            <MarkdownWidget
                markdown=markdown
                on_change=edit_content
            />
        }
        .into_any()
    };

    view! {
        <main class="app-layout" style="display: flex; height: 100vh; width: 100vw; background: var(--bg-primary); color: var(--text-primary);">
            <nav class="sidebar" style="width: var(--sidebar-width); border-right: 1px solid var(--border-color); display: flex; flex-direction: column; background: var(--bg-secondary);">
                <div class="sidebar-header" style="height: var(--topbar-height); display: flex; align-items: center; justify-content: space-between; padding: 0 1rem; border-bottom: 1px solid var(--border-color); font-weight: 600; color: var(--accent-color);">
                    <span>"Entries"</span>
                    <div style="display: flex; gap: 0.5rem; align-items: center;">
                        <button on:click=new_entry style=format!("{BUTTON_STYLE} background: #28a745;")>"New Entry"</button>
                        <button on:click=save_entry style=format!("{BUTTON_STYLE} background: #007bff;")>"Save Entry"</button>
                    </div>
                </div>
                <div class="file-list" style="flex: 1; overflow-y: auto; padding: 0.75rem 0.5rem;">
                    {move || entries.get().into_iter().map(|entry| {
                        let id = entry.id;
                        let is_active = move || current_id.get() == Some(id);
                        view! {
                            <div
                                class="file-item"
                                style=move || format!("padding: 0.5rem 0.75rem; cursor: pointer; border-radius: var(--radius-md); margin-bottom: 4px; font-size: 0.9rem; transition: background 0.2s, color 0.2s; {}", if is_active() { "background: var(--accent-color); color: white;" } else { "color: var(--text-secondary);" })
                                on:click=move |_| load_entry(id)
                            >
                                {entry.title}
                            </div>
                        }
                    }).collect::<Vec<_>>()}
                </div>
            </nav>
            <section class="editor-pane" style="flex: 1; display: flex; flex-direction: column; background: var(--bg-primary); min-width: 0;">
                <header class="topbar" style="height: var(--topbar-height); border-bottom: 1px solid var(--border-color); display: flex; align-items: center; gap: 0.75rem; padding: 0 1.5rem;">
                    <input
                        type="text"
                        placeholder="Enter a title..."
                        style="flex: 1; padding: 0.4rem 0.5rem; font-size: 1rem; border: 1px solid var(--border-color); border-radius: var(--radius-md); background: var(--bg-primary); color: var(--text-primary);"
                        prop:value=move || title.get()
                        on:input=move |ev| notebook.update(|n| n.set_title(event_target_value(&ev)))
                    />
                    <button on:click=export_entry style=format!("{BUTTON_STYLE} background: #ff9800;")>"Export Markdown"</button>
                    <button on:click=move |_| set_prompt_open.set(true) style=format!("{BUTTON_STYLE} background: var(--accent-color);")>"Open Prompt"</button>
                </header>
                {move || status.get().map(|message| view! {
                    <div class="status-line" style="padding: 0.35rem 1.5rem; font-size: 0.85rem; color: var(--text-muted); border-bottom: 1px solid var(--border-color);">
                        {message}
                    </div>
                })}
                {editor}
            </section>
            <AssistantModal
                open=prompt_open
                state=assistant
                on_close=Callback::new(move |_: ()| set_prompt_open.set(false))
                on_accept=append_reply
            />
        </main>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edits_patch_and_replies_remount() {
        let owner = Owner::new();
        owner.with(|| {
            let notebook = RwSignal::new(Notebook::new());
            notebook.update(|n| {
                n.new_entry();
            });
            let mounted = notebook.with_untracked(|n| n.generation());

            edit_sink(notebook).run("draft".to_string());
            assert_eq!(notebook.with_untracked(|n| n.content().to_string()), "draft");
            assert_eq!(notebook.with_untracked(|n| n.generation()), mounted);

            reply_sink(notebook).run("Hello".to_string());
            assert_eq!(
                notebook.with_untracked(|n| n.content().to_string()),
                "draft\nHello"
            );
            assert_ne!(notebook.with_untracked(|n| n.generation()), mounted);
        });
    }
}
