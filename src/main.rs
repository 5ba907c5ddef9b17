mod app;
mod chat;
mod config;
mod error;
mod gateway;
mod linker;
mod model;
mod notify;
mod preview;
mod render;
mod settings;
mod store;
mod tree;

#[cfg(test)]
mod testing;

use app::*;
use leptos::prelude::*;

fn main() {
    console_error_panic_hook::set_once();
    if let Err(err) = console_log::init_with_level(log::Level::Debug) {
        web_sys::console::warn_1(&format!("logger already set: {err}").into());
    }
    mount_to_body(|| {
        view! {
            <App/>
        }
    })
}
