//! Chart renderers: data in, drawable primitives and hover state out.
//!
//! Every renderer lays out its data once at construction (one render pass)
//! and can then emit frames at any entrance-animation progress.

pub mod animation;
pub mod bar;
pub mod legend;
pub mod line;
pub mod pie;
pub mod svg;
pub mod timeline;

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use shared::UsageTimeSeries;

use crate::analytics::format::format_count;
use crate::analytics::scale::{Tick, YScale};

pub use animation::{AnimationLoop, Easing, EntranceAnimation, FrameScheduler};
pub use bar::{BarCategory, BarSeries, GroupedBarChart, GroupedBarConfig};
pub use legend::{LegendEntry, SeriesVisibility};
pub use line::{LineChart, LineChartConfig, LineSeries};
pub use pie::{PieChart, PieConfig, PieSlice};
pub use timeline::{TimeSeriesChart, TimeSeriesConfig};

/// Margins around the plot area, in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Insets {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl Insets {
    pub const fn new(left: f64, right: f64, top: f64, bottom: f64) -> Self {
        Self {
            left,
            right,
            top,
            bottom,
        }
    }
}

impl Default for Insets {
    fn default() -> Self {
        Self::new(56.0, 16.0, 16.0, 40.0)
    }
}

/// Drawing surface size and plot margins
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartGeometry {
    pub width: f64,
    pub height: f64,
    pub margin: Insets,
}

impl ChartGeometry {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            margin: Insets::default(),
        }
    }

    pub fn with_margin(mut self, margin: Insets) -> Self {
        self.margin = margin;
        self
    }

    pub fn inner_width(&self) -> f64 {
        (self.width - self.margin.left - self.margin.right).max(0.0)
    }

    pub fn inner_height(&self) -> f64 {
        (self.height - self.margin.top - self.margin.bottom).max(0.0)
    }

    pub fn plot_right(&self) -> f64 {
        self.margin.left + self.inner_width()
    }

    pub fn plot_bottom(&self) -> f64 {
        self.margin.top + self.inner_height()
    }

    /// Whether a pointer position lies inside the plot area
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.margin.left && x <= self.plot_right() && y >= self.margin.top && y <= self.plot_bottom()
    }
}

impl Default for ChartGeometry {
    fn default() -> Self {
        Self::new(800.0, 320.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAnchor {
    Start,
    Middle,
    End,
}

impl TextAnchor {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextAnchor::Start => "start",
            TextAnchor::Middle => "middle",
            TextAnchor::End => "end",
        }
    }
}

/// One drawable element, in surface pixels
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        fill: String,
        class: &'static str,
    },
    /// Annular (or full, when `inner_radius == 0`) sector; angles in radians,
    /// clockwise from the positive x axis
    Sector {
        cx: f64,
        cy: f64,
        inner_radius: f64,
        outer_radius: f64,
        start_angle: f64,
        end_angle: f64,
        fill: String,
        key: String,
    },
    Polyline {
        points: Vec<(f64, f64)>,
        stroke: String,
        stroke_width: f64,
        key: String,
    },
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        stroke: String,
        dashed: bool,
        class: &'static str,
    },
    Circle {
        cx: f64,
        cy: f64,
        r: f64,
        fill: String,
    },
    Text {
        x: f64,
        y: f64,
        content: String,
        anchor: TextAnchor,
        class: &'static str,
    },
}

/// Everything needed to paint one frame
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: f64,
    pub height: f64,
    pub primitives: Vec<Primitive>,
}

impl Frame {
    pub fn new(geometry: &ChartGeometry) -> Self {
        Self {
            width: geometry.width,
            height: geometry.height,
            primitives: Vec::new(),
        }
    }

    pub fn push(&mut self, primitive: Primitive) {
        self.primitives.push(primitive);
    }

    pub fn polylines(&self) -> impl Iterator<Item = (&str, &[(f64, f64)])> {
        self.primitives.iter().filter_map(|p| match p {
            Primitive::Polyline { key, points, .. } => Some((key.as_str(), points.as_slice())),
            _ => None,
        })
    }
}

/// Formats one tooltip value; receives the series key so rows can differ
pub type ValueFormatter = Rc<dyn Fn(&str, f64) -> String>;

pub fn default_formatter() -> ValueFormatter {
    Rc::new(|_key, value| format_count(value))
}

#[derive(Debug, Clone, PartialEq)]
pub struct TooltipRow {
    pub key: String,
    pub label: String,
    pub color: String,
    pub value: f64,
    pub formatted: String,
}

/// Hover payload: what sits under the pointer
#[derive(Debug, Clone, PartialEq)]
pub struct Tooltip {
    pub label: String,
    pub rows: Vec<TooltipRow>,
}

/// Common surface of all chart variants
pub trait ChartRenderer {
    /// Geometry with every extent scaled by the eased animation `progress`
    fn frame(&self, progress: f64) -> Frame;

    /// Maps a pointer position to the data under it and keeps it hovered
    fn pointer_move(&mut self, x: f64, y: f64) -> Option<Tooltip>;

    fn pointer_leave(&mut self);

    fn legend(&self) -> Vec<LegendEntry>;
}

/// Stable hash of a usage dataset; a changed identity restarts the entrance
/// animation
pub fn usage_identity(usage: &UsageTimeSeries) -> u64 {
    let mut hasher = DefaultHasher::new();
    usage.interval.hash(&mut hasher);
    for series in &usage.series {
        series.key_id.hash(&mut hasher);
        for point in &series.points {
            point.ts.timestamp().hash(&mut hasher);
            point.value.hash(&mut hasher);
        }
    }
    hasher.finish()
}

/// Horizontal guide lines with their compact labels
pub(crate) fn grid_primitives(ticks: &[Tick], y: &YScale, geometry: &ChartGeometry) -> Vec<Primitive> {
    let mut primitives = Vec::with_capacity(ticks.len() * 2);
    for tick in ticks {
        let py = y.to_px(tick.value);
        primitives.push(Primitive::Line {
            x1: geometry.margin.left,
            y1: py,
            x2: geometry.plot_right(),
            y2: py,
            stroke: "#E5E7EB".to_string(),
            dashed: py < y.baseline(),
            class: "grid-line",
        });
        primitives.push(Primitive::Text {
            x: geometry.margin.left - 8.0,
            y: py + 4.0,
            content: tick.label.clone(),
            anchor: TextAnchor::End,
            class: "tick-label",
        });
    }
    primitives
}

/// Eased progress clamped into `[0, 1]`
pub(crate) fn clamp_progress(progress: f64) -> f64 {
    if progress.is_finite() {
        progress.clamp(0.0, 1.0)
    } else {
        1.0
    }
}
