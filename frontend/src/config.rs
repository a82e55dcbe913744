use shared::BucketWidth;

use crate::analytics::scale::{ScaleMode, DEFAULT_TICK_COUNT};
use crate::charts::{ChartGeometry, EntranceAnimation};

pub struct Config;

impl Config {
    pub const USAGE_EVENTS_PATH: &'static str = "/api/usage/events";

    /// LocalStorage key holding the bearer session token
    pub const SESSION_STORAGE_KEY: &'static str = "session_id";

    /// Page size requested from the events endpoint
    pub const DEFAULT_PAGE_SIZE: u32 = 500;

    pub fn api_base_url() -> String {
        // Trunk in development and nginx in production both proxy /api/ on the
        // same origin, so relative URLs work everywhere
        "".to_string()
    }
}

/// Presentation defaults shared by the usage dashboard charts
#[derive(Debug, Clone, PartialEq)]
pub struct ChartDefaults {
    pub geometry: ChartGeometry,
    pub bucket_width: BucketWidth,
    pub tick_count: usize,
    pub animation: EntranceAnimation,
    pub scale_mode: ScaleMode,
    pub stacked: bool,
    pub hover_multiplier: f64,
    pub donut_inner_ratio: f64,
    pub group_gap: f64,
    pub bar_gap: f64,
}

impl Default for ChartDefaults {
    fn default() -> Self {
        Self {
            geometry: ChartGeometry::default(),
            bucket_width: BucketWidth::FiveMinutes,
            tick_count: DEFAULT_TICK_COUNT,
            animation: EntranceAnimation::default(),
            scale_mode: ScaleMode::Linear,
            stacked: false,
            hover_multiplier: 1.15,
            donut_inner_ratio: 0.6,
            group_gap: 16.0,
            bar_gap: 4.0,
        }
    }
}
