mod app;
mod assistant;
mod editor_binding;
mod editor_core;
mod entry_store;
mod export;
mod ipc;
mod modal;
mod notebook;
mod widget;

use app::*;
use leptos::prelude::*;

fn main() {
    console_error_panic_hook::set_once();
    mount_to_body(|| {
        view! {
            <App/>
        }
    })
}
