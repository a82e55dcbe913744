//! Pie and donut charts with hover emphasis.

use std::f64::consts::{FRAC_PI_2, TAU};

use crate::analytics::format::{format_count, format_percent};
use crate::charts::line::tooltip_panel;
use crate::charts::{
    clamp_progress, default_formatter, ChartGeometry, ChartRenderer, Frame, LegendEntry, Primitive,
    SeriesVisibility, TextAnchor, Tooltip, TooltipRow, ValueFormatter,
};
use crate::config::ChartDefaults;

#[derive(Debug, Clone, PartialEq)]
pub struct PieSlice {
    pub key: String,
    pub label: String,
    pub value: f64,
    pub color: String,
}

impl PieSlice {
    pub fn new(key: impl Into<String>, label: impl Into<String>, value: f64, color: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            value,
            color: color.into(),
        }
    }
}

#[derive(Clone)]
pub struct PieConfig {
    /// Hole size relative to the outer radius; 0 draws a full pie
    pub inner_radius_ratio: f64,
    /// Weight factor applied to the hovered slice's share
    pub hover_multiplier: f64,
    /// Angle of the first slice edge, radians clockwise from +x
    pub start_angle: f64,
    pub formatter: ValueFormatter,
}

impl PieConfig {
    pub fn donut(inner_radius_ratio: f64) -> Self {
        Self {
            inner_radius_ratio,
            ..Self::default()
        }
    }

    /// Donut with the hole size configured in `defaults`
    pub fn donut_from(defaults: &ChartDefaults) -> Self {
        Self {
            inner_radius_ratio: defaults.donut_inner_ratio,
            ..Self::from(defaults)
        }
    }
}

impl From<&ChartDefaults> for PieConfig {
    fn from(defaults: &ChartDefaults) -> Self {
        Self {
            inner_radius_ratio: 0.0,
            hover_multiplier: defaults.hover_multiplier,
            start_angle: -FRAC_PI_2,
            formatter: default_formatter(),
        }
    }
}

impl Default for PieConfig {
    fn default() -> Self {
        Self::from(&ChartDefaults::default())
    }
}

/// Angular extent of one drawn slice
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliceArc {
    pub index: usize,
    pub start: f64,
    pub end: f64,
}

pub struct PieChart {
    geometry: ChartGeometry,
    slices: Vec<PieSlice>,
    visibility: SeriesVisibility,
    config: PieConfig,
    hover: Option<usize>,
}

impl PieChart {
    pub fn new(geometry: ChartGeometry, slices: Vec<PieSlice>, visibility: SeriesVisibility, config: PieConfig) -> Self {
        Self {
            geometry,
            slices,
            visibility,
            config,
            hover: None,
        }
    }

    pub fn hovered(&self) -> Option<usize> {
        self.hover
    }

    pub fn center(&self) -> (f64, f64) {
        (
            self.geometry.margin.left + self.geometry.inner_width() / 2.0,
            self.geometry.margin.top + self.geometry.inner_height() / 2.0,
        )
    }

    pub fn outer_radius(&self) -> f64 {
        self.geometry.inner_width().min(self.geometry.inner_height()) / 2.0
    }

    pub fn inner_radius(&self) -> f64 {
        self.outer_radius() * self.config.inner_radius_ratio.clamp(0.0, 0.95)
    }

    /// Sum of the visible slice values
    pub fn total(&self) -> f64 {
        self.visible().map(|(_, s)| s.value.max(0.0)).sum()
    }

    fn visible(&self) -> impl Iterator<Item = (usize, &PieSlice)> {
        self.slices
            .iter()
            .enumerate()
            .filter(|(_, s)| self.visibility.is_visible(&s.key))
    }

    /// Slice extents under the current hover; the hovered share is weighted
    /// by the hover multiplier before normalizing to a full turn
    pub fn arcs(&self) -> Vec<SliceArc> {
        let weights: Vec<(usize, f64)> = self
            .visible()
            .map(|(i, s)| {
                let weight = s.value.max(0.0);
                if self.hover == Some(i) {
                    (i, weight * self.config.hover_multiplier.max(0.0))
                } else {
                    (i, weight)
                }
            })
            .collect();
        let total: f64 = weights.iter().map(|(_, w)| w).sum();
        if total <= 0.0 {
            return Vec::new();
        }

        let mut cursor = self.config.start_angle;
        weights
            .into_iter()
            .map(|(index, weight)| {
                let start = cursor;
                cursor += weight / total * TAU;
                SliceArc {
                    index,
                    start,
                    end: cursor,
                }
            })
            .collect()
    }

    fn tooltip_for(&self, index: usize) -> Option<Tooltip> {
        let slice = self.slices.get(index)?;
        let formatted = format!(
            "{} ({})",
            (self.config.formatter)(&slice.key, slice.value),
            format_percent(slice.value, self.total())
        );
        Some(Tooltip {
            label: slice.label.clone(),
            rows: vec![TooltipRow {
                key: slice.key.clone(),
                label: slice.label.clone(),
                color: slice.color.clone(),
                value: slice.value,
                formatted,
            }],
        })
    }
}

impl ChartRenderer for PieChart {
    fn frame(&self, progress: f64) -> Frame {
        let progress = clamp_progress(progress);
        let mut frame = Frame::new(&self.geometry);
        let (cx, cy) = self.center();
        let outer_radius = self.outer_radius();
        let inner_radius = self.inner_radius();
        let origin = self.config.start_angle;

        for arc in self.arcs() {
            let slice = &self.slices[arc.index];
            frame.push(Primitive::Sector {
                cx,
                cy,
                inner_radius,
                outer_radius,
                start_angle: origin + (arc.start - origin) * progress,
                end_angle: origin + (arc.end - origin) * progress,
                fill: slice.color.clone(),
                key: slice.key.clone(),
            });
        }

        if inner_radius > 0.0 {
            let content = match self.hover.and_then(|i| self.slices.get(i)) {
                Some(slice) => format_percent(slice.value, self.total()),
                None => format_count(self.total()),
            };
            frame.push(Primitive::Text {
                x: cx,
                y: cy + 6.0,
                content,
                anchor: TextAnchor::Middle,
                class: "pie-center",
            });
        } else if let Some(tooltip) = self.hover.and_then(|i| self.tooltip_for(i)) {
            frame.primitives.extend(tooltip_panel(cx + outer_radius * 0.5, &tooltip, &self.geometry));
        }
        frame
    }

    fn pointer_move(&mut self, x: f64, y: f64) -> Option<Tooltip> {
        let (cx, cy) = self.center();
        let (dx, dy) = (x - cx, y - cy);
        let distance = dx.hypot(dy);
        if distance > self.outer_radius() || distance < self.inner_radius() {
            self.hover = None;
            return None;
        }

        let origin = self.config.start_angle;
        let angle = (dy.atan2(dx) - origin).rem_euclid(TAU);
        self.hover = self
            .arcs()
            .into_iter()
            .find(|arc| angle >= arc.start - origin && angle < arc.end - origin)
            .map(|arc| arc.index);
        self.hover.and_then(|i| self.tooltip_for(i))
    }

    fn pointer_leave(&mut self) {
        self.hover = None;
    }

    fn legend(&self) -> Vec<LegendEntry> {
        self.slices
            .iter()
            .map(|s| LegendEntry {
                key: s.key.clone(),
                label: s.label.clone(),
                color: s.color.clone(),
                visible: self.visibility.is_visible(&s.key),
            })
            .collect()
    }
}
