use leptos::logging::{error, log, warn};
use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::assistant::AssistantState;
use crate::ipc;

/// Prompt surface for the assistant. The request state lives with the caller
/// so a reply can still land while the modal is hidden.
#[component]
pub fn AssistantModal(
    #[prop(into)] open: Signal<bool>,
    state: RwSignal<AssistantState>,
    #[prop(into)] on_close: Callback<()>,
    #[prop(into)] on_accept: Callback<String>,
) -> impl IntoView {
    let (input, set_input) = signal(String::new());

    let send_prompt = move |_| {
        let prompt = input.get_untracked();
        let mut submitted = Ok(());
        state.update(|s| submitted = s.submit(&prompt));
        if let Err(err) = submitted {
            warn!("prompt not sent: {err}");
            return;
        }
        log!("assistant request started");
        spawn_local(async move {
            let outcome = ipc::chat_completion(&prompt).await;
            match &outcome {
                Ok(_) => log!("assistant request finished"),
                Err(err) => error!("assistant request failed: {err}"),
            }
            state.update(|s| s.resolve(outcome));
        });
    };

    let close = move |_| {
        state.update(|s| s.dismiss());
        on_close.run(());
    };

    let add_to_entry = move |_| {
        if let Some(reply) = state.try_update(|s| s.accept()).flatten() {
            on_accept.run(reply);
        }
        on_close.run(());
    };

    view! {
        <Show when=move || open.get()>
            <div style="position: fixed; inset: 0; background: rgba(0, 0, 0, 0.5); display: flex; align-items: center; justify-content: center; z-index: 50;">
                <div style="position: relative; width: 80%; max-width: 28rem; padding: 1.5rem; border-radius: 8px; background: var(--bg-primary); color: var(--text-primary); box-shadow: 0 10px 25px rgba(0, 0, 0, 0.25);">
                    <button
                        on:click=close
                        style="position: absolute; top: 0.5rem; right: 0.75rem; background: transparent; border: none; font-size: 1.25rem; cursor: pointer; color: var(--text-muted);"
                        title="Close"
                    >
                        "×"
                    </button>
                    <h2 style="margin-top: 0; font-size: 1.25rem;">"Chat with the assistant"</h2>
                    <textarea
                        rows="4"
                        placeholder="Type your message here..."
                        style="width: 100%; box-sizing: border-box; padding: 0.5rem; border: 1px solid var(--border-color); border-radius: 6px; margin-bottom: 1rem; font-family: inherit;"
                        prop:value=move || input.get()
                        on:input=move |ev| set_input.set(event_target_value(&ev))
                    ></textarea>
                    <button
                        on:click=send_prompt
                        disabled=move || state.with(|s| s.is_pending())
                        style="padding: 0.5rem 1rem; border: none; border-radius: 6px; background: var(--accent-color); color: white; cursor: pointer;"
                    >
                        {move || {
                            if state.with(|s| s.is_pending()) { "Waiting..." } else { "Send Prompt" }
                        }}
                    </button>
                    {move || state.with(|s| s.reply().map(str::to_string)).map(|reply| view! {
                        <div style="margin-top: 1rem; padding: 0.75rem; border-radius: 6px; background: var(--bg-secondary);">
                            <h3 style="margin: 0 0 0.5rem; font-size: 1rem;">"Response:"</h3>
                            <p style="white-space: pre-wrap; margin: 0 0 1rem;">{reply}</p>
                            <button
                                on:click=add_to_entry
                                style="padding: 0.5rem 1rem; border: none; border-radius: 6px; background: #28a745; color: white; cursor: pointer;"
                            >
                                "Add to Entry"
                            </button>
                        </div>
                    })}
                </div>
            </div>
        </Show>
    }
}
