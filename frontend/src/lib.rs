use chrono::{Duration, Utc};
use log::{debug, info};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsValue;
use yew::prelude::*;

use crate::components::usage_dashboard::UsageDashboard;

pub mod api;
pub mod charts;
pub mod components;
pub mod config;
pub mod export;
pub mod hooks;
pub mod analytics {
    pub mod aggregator;
    pub mod color;
    pub mod format;
    pub mod scale;
}

#[function_component(App)]
fn app() -> Html {
    debug!("App component rendering");
    let window = use_memo((), |_| {
        let to = Utc::now();
        (to - Duration::hours(6), to)
    });
    let (from, to) = *window;
    html! {
        <div class="app-container">
            <main class="container mx-auto px-4 py-6">
                <UsageDashboard {from} {to} />
            </main>
        </div>
    }
}

#[wasm_bindgen]
pub async fn run_app() -> Result<(), JsValue> {
    info!("Initializing application...");

    wasm_logger::init(wasm_logger::Config::new(log::Level::Debug));
    info!("Logger initialized");

    console_error_panic_hook::set_once();
    info!("Panic hook set");

    info!("Mounting application to #app");
    yew::Renderer::<App>::new().render();
    info!("Application mounted");

    Ok(())
}

// Trunk calls this on load
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    wasm_bindgen_futures::spawn_local(async {
        if let Err(e) = run_app().await {
            log::error!("Failed to run app: {:?}", e);
        }
    });
    Ok(())
}
