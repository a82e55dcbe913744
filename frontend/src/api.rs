pub mod controller;
pub mod error;
pub mod usage;

pub use controller::{AsyncDataController, CancellationToken, FetchState, FetchTask, LoadOptions};
pub use error::FetchError;

use crate::config::Config;

pub fn api_url(path: &str) -> String {
    let base_url = Config::api_base_url();
    if base_url.is_empty() {
        // Use relative URL
        path.to_string()
    } else {
        // Use absolute URL
        format!("{}{}", base_url, path)
    }
}
