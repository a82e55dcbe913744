//! Grouped bars: two bars per category, side by side.

use crate::analytics::scale::{ScaleMode, XScale};
use crate::charts::line::{tooltip_panel, x_label_primitives, PlotLayout};
use crate::charts::{
    clamp_progress, default_formatter, grid_primitives, ChartGeometry, ChartRenderer, Frame, LegendEntry,
    Primitive, SeriesVisibility, Tooltip, TooltipRow, ValueFormatter,
};
use crate::config::ChartDefaults;

/// Identity and color of one of the two bar series
#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    pub key: String,
    pub label: String,
    pub color: String,
}

impl BarSeries {
    pub fn new(key: impl Into<String>, label: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            color: color.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarCategory {
    pub label: String,
    /// One value per bar series
    pub values: [f64; 2],
}

impl BarCategory {
    pub fn new(label: impl Into<String>, first: f64, second: f64) -> Self {
        Self {
            label: label.into(),
            values: [first, second],
        }
    }
}

#[derive(Clone)]
pub struct GroupedBarConfig {
    /// Space between neighbouring groups, in pixels
    pub group_gap: f64,
    /// Space between the bars of one group, in pixels
    pub bar_gap: f64,
    pub tick_count: usize,
    pub formatter: ValueFormatter,
}

impl From<&ChartDefaults> for GroupedBarConfig {
    fn from(defaults: &ChartDefaults) -> Self {
        Self {
            group_gap: defaults.group_gap,
            bar_gap: defaults.bar_gap,
            tick_count: defaults.tick_count,
            formatter: default_formatter(),
        }
    }
}

impl Default for GroupedBarConfig {
    fn default() -> Self {
        Self::from(&ChartDefaults::default())
    }
}

/// Horizontal placement of one bar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarSlot {
    pub x: f64,
    pub width: f64,
}

pub struct GroupedBarChart {
    geometry: ChartGeometry,
    series: [BarSeries; 2],
    categories: Vec<BarCategory>,
    visibility: SeriesVisibility,
    config: GroupedBarConfig,
    layout: PlotLayout,
    hover: Option<usize>,
}

impl GroupedBarChart {
    pub fn new(
        geometry: ChartGeometry,
        series: [BarSeries; 2],
        categories: Vec<BarCategory>,
        visibility: SeriesVisibility,
        config: GroupedBarConfig,
    ) -> Self {
        let max_value = categories
            .iter()
            .flat_map(|category| {
                category
                    .values
                    .iter()
                    .zip(&series)
                    .filter(|(_, s)| visibility.is_visible(&s.key))
                    .map(|(value, _)| *value)
            })
            .fold(0.0, f64::max);
        let layout = PlotLayout::new(
            &geometry,
            categories.len(),
            max_value,
            ScaleMode::Linear,
            config.tick_count,
        );

        Self {
            geometry,
            series,
            categories,
            visibility,
            config,
            layout,
            hover: None,
        }
    }

    pub fn y_max(&self) -> f64 {
        self.layout.y.y_max
    }

    pub fn hovered(&self) -> Option<usize> {
        self.hover
    }

    fn group_width(&self) -> f64 {
        if self.categories.is_empty() {
            return 0.0;
        }
        self.geometry.inner_width() / self.categories.len() as f64
    }

    fn visible_series(&self) -> Vec<usize> {
        (0..2).filter(|&j| self.visibility.is_visible(&self.series[j].key)).collect()
    }

    /// Placement of the visible bars of category `index`, in series order
    pub fn slots(&self, index: usize) -> Vec<(usize, BarSlot)> {
        let visible = self.visible_series();
        if visible.is_empty() {
            return Vec::new();
        }
        let group_width = self.group_width();
        let usable = (group_width - self.config.group_gap).max(0.0);
        let gaps = self.config.bar_gap * (visible.len() - 1) as f64;
        let width = ((usable - gaps) / visible.len() as f64).max(0.0);
        let group_left = self.geometry.margin.left + index as f64 * group_width + self.config.group_gap / 2.0;

        visible
            .into_iter()
            .enumerate()
            .map(|(position, j)| {
                (
                    j,
                    BarSlot {
                        x: group_left + position as f64 * (width + self.config.bar_gap),
                        width,
                    },
                )
            })
            .collect()
    }

    fn category_labels(&self) -> Vec<String> {
        self.categories.iter().map(|c| c.label.clone()).collect()
    }

    fn tooltip_at(&self, index: usize) -> Option<Tooltip> {
        let category = self.categories.get(index)?;
        Some(Tooltip {
            label: category.label.clone(),
            rows: self
                .visible_series()
                .into_iter()
                .map(|j| {
                    let series = &self.series[j];
                    let value = category.values[j];
                    TooltipRow {
                        key: series.key.clone(),
                        label: series.label.clone(),
                        color: series.color.clone(),
                        value,
                        formatted: (self.config.formatter)(&series.key, value),
                    }
                })
                .collect(),
        })
    }
}

impl ChartRenderer for GroupedBarChart {
    fn frame(&self, progress: f64) -> Frame {
        let progress = clamp_progress(progress);
        let mut frame = Frame::new(&self.geometry);
        let group_width = self.group_width();

        if let Some(index) = self.hover {
            frame.push(Primitive::Rect {
                x: self.geometry.margin.left + index as f64 * group_width,
                y: self.geometry.margin.top,
                width: group_width,
                height: self.geometry.inner_height(),
                fill: "#F3F4F6".to_string(),
                class: "hover-band",
            });
        }
        frame.primitives.extend(grid_primitives(&self.layout.ticks, &self.layout.y, &self.geometry));

        let baseline = self.layout.y.baseline();
        for (index, category) in self.categories.iter().enumerate() {
            for (j, slot) in self.slots(index) {
                let full = baseline - self.layout.y.to_px(category.values[j].max(0.0));
                let height = full * progress;
                frame.push(Primitive::Rect {
                    x: slot.x,
                    y: baseline - height,
                    width: slot.width,
                    height,
                    fill: self.series[j].color.clone(),
                    class: "bar",
                });
            }
        }

        // labels sit under group centres, not bucket points
        let labels = self.category_labels();
        let centred = PlotLayout {
            x: XScale {
                left: self.geometry.margin.left + group_width / 2.0,
                step: group_width,
                count: self.categories.len().max(1),
            },
            ..self.layout.clone()
        };
        frame
            .primitives
            .extend(x_label_primitives(&labels, &centred, &self.geometry));

        if let Some((index, tooltip)) = self.hover.and_then(|index| Some((index, self.tooltip_at(index)?))) {
            let anchor = self.geometry.margin.left + (index as f64 + 0.5) * group_width;
            frame.primitives.extend(tooltip_panel(anchor, &tooltip, &self.geometry));
        }
        frame
    }

    fn pointer_move(&mut self, x: f64, y: f64) -> Option<Tooltip> {
        let group_width = self.group_width();
        self.hover = if group_width > 0.0 && self.geometry.contains(x, y) {
            let index = ((x - self.geometry.margin.left) / group_width).floor() as usize;
            Some(index.min(self.categories.len() - 1))
        } else {
            None
        };
        self.hover.and_then(|index| self.tooltip_at(index))
    }

    fn pointer_leave(&mut self) {
        self.hover = None;
    }

    fn legend(&self) -> Vec<LegendEntry> {
        self.series
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
