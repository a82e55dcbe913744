//! Multi-series usage-over-time chart.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use shared::{BucketWidth, Series, UsageTimeSeries};

use crate::analytics::color::color_for_key;
use crate::analytics::scale::{stack, ScaleMode, YScale, DEFAULT_TICK_COUNT};
use crate::charts::line::{hover_rule_primitives, line_primitives, tooltip_panel, x_label_primitives, PlotLayout};
use crate::charts::{
    clamp_progress, default_formatter, grid_primitives, ChartGeometry, ChartRenderer, Frame, LegendEntry,
    SeriesVisibility, Tooltip, TooltipRow, ValueFormatter,
};

#[derive(Clone)]
pub struct TimeSeriesConfig {
    /// Draw each series on top of the ones before it
    pub stacked: bool,
    pub mode: ScaleMode,
    pub tick_count: usize,
    pub show_markers: bool,
    pub stroke_width: f64,
    pub formatter: ValueFormatter,
}

impl Default for TimeSeriesConfig {
    fn default() -> Self {
        Self {
            stacked: false,
            mode: ScaleMode::Linear,
            tick_count: DEFAULT_TICK_COUNT,
            show_markers: false,
            stroke_width: 2.0,
            formatter: default_formatter(),
        }
    }
}

/// Axis label for a bucket start, in the data's timezone
pub fn axis_label(ts: DateTime<Utc>, interval: BucketWidth, timezone: Tz) -> String {
    let local = ts.with_timezone(&timezone);
    match interval {
        BucketWidth::Day => local.format("%b %d").to_string(),
        _ => local.format("%H:%M").to_string(),
    }
}

/// Tooltip heading for a bucket start, in the data's timezone
pub fn tooltip_label(ts: DateTime<Utc>, timezone: Tz) -> String {
    ts.with_timezone(&timezone).format("%Y-%m-%d %H:%M").to_string()
}

fn series_color(series: &Series) -> String {
    series
        .color
        .clone()
        .unwrap_or_else(|| color_for_key(&series.key_id).to_string())
}

pub struct TimeSeriesChart {
    geometry: ChartGeometry,
    usage: UsageTimeSeries,
    visibility: SeriesVisibility,
    config: TimeSeriesConfig,
    layout: PlotLayout,
    /// Indices into `usage.series` that are drawn, in draw order
    visible: Vec<usize>,
    /// Plotted top of each visible series per bucket; cumulative when stacked
    tops: Vec<Vec<f64>>,
    labels: Vec<String>,
    hover: Option<usize>,
}

impl TimeSeriesChart {
    pub fn new(
        geometry: ChartGeometry,
        usage: UsageTimeSeries,
        visibility: SeriesVisibility,
        config: TimeSeriesConfig,
    ) -> Self {
        let visible: Vec<usize> = usage
            .series
            .iter()
            .enumerate()
            .filter(|(_, s)| visibility.is_visible(&s.key_id))
            .map(|(i, _)| i)
            .collect();
        let raw: Vec<Vec<f64>> = visible
            .iter()
            .map(|&i| usage.series[i].values().map(|v| v as f64).collect())
            .collect();

        let (tops, max_value) = if config.stacked {
            let stacked = stack(&raw);
            let max_total = stacked.max_total();
            let tops = stacked
                .layers
                .into_iter()
                .map(|layer| layer.into_iter().map(|segment| segment.top).collect())
                .collect();
            (tops, max_total)
        } else {
            let max_value = raw.iter().flatten().copied().fold(0.0, f64::max);
            (raw, max_value)
        };

        let buckets = usage.bucket_count();
        let layout = PlotLayout::new(&geometry, buckets, max_value, config.mode, config.tick_count);
        let labels = usage
            .timestamps()
            .into_iter()
            .map(|ts| axis_label(ts, usage.interval, usage.timezone))
            .collect();

        log::debug!(
            "Laid out {} of {} series over {} buckets, y_max {}",
            visible.len(),
            usage.series.len(),
            buckets,
            layout.y.y_max
        );

        Self {
            geometry,
            usage,
            visibility,
            config,
            layout,
            visible,
            tops,
            labels,
            hover: None,
        }
    }

    pub fn usage(&self) -> &UsageTimeSeries {
        &self.usage
    }

    pub fn y_scale(&self) -> YScale {
        self.layout.y
    }

    pub fn hovered(&self) -> Option<usize> {
        self.hover
    }

    fn tooltip_at(&self, index: usize) -> Tooltip {
        let label = self
            .usage
            .timestamps()
            .get(index)
            .map(|ts| tooltip_label(*ts, self.usage.timezone))
            .unwrap_or_default();
        let rows = self
            .visible
            .iter()
            .map(|&i| {
                let series = &self.usage.series[i];
                let value = series.points.get(index).map_or(0.0, |p| p.value as f64);
                TooltipRow {
                    key: series.key_id.clone(),
                    label: series.display_label().to_string(),
                    color: series_color(series),
                    value,
                    formatted: (self.config.formatter)(&series.key_id, value),
                }
            })
            .collect();
        Tooltip { label, rows }
    }
}

impl ChartRenderer for TimeSeriesChart {
    fn frame(&self, progress: f64) -> Frame {
        let progress = clamp_progress(progress);
        let mut frame = Frame::new(&self.geometry);
        frame.primitives.extend(grid_primitives(&self.layout.ticks, &self.layout.y, &self.geometry));
        frame
            .primitives
            .extend(x_label_primitives(&self.labels, &self.layout, &self.geometry));

        for (&i, tops) in self.visible.iter().zip(&self.tops) {
            let series = &self.usage.series[i];
            frame.primitives.extend(line_primitives(
                &series.key_id,
                &series_color(series),
                tops,
                &self.layout,
                progress,
                self.config.stroke_width,
                self.config.show_markers,
            ));
        }

        if let Some(index) = self.hover {
            let markers: Vec<(String, f64)> = self
                .visible
                .iter()
                .zip(&self.tops)
                .map(|(&i, tops)| {
                    (
                        series_color(&self.usage.series[i]),
                        tops.get(index).copied().unwrap_or(0.0),
                    )
                })
                .collect();
            frame
                .primitives
                .extend(hover_rule_primitives(index, &markers, &self.layout, &self.geometry));
            frame.primitives.extend(tooltip_panel(
                self.layout.x.to_px(index),
                &self.tooltip_at(index),
                &self.geometry,
            ));
        }
        frame
    }

    fn pointer_move(&mut self, x: f64, y: f64) -> Option<Tooltip> {
        self.hover = self.layout.hit(&self.geometry, x, y, self.usage.bucket_count());
        self.hover.map(|index| self.tooltip_at(index))
    }

    fn pointer_leave(&mut self) {
        self.hover = None;
    }

    fn legend(&self) -> Vec<LegendEntry> {
        self.usage
            .series
            .iter()
            .map(|series| LegendEntry {
                key: series.key_id.clone(),
                label: series.display_label().to_string(),
                color: series_color(series),
                visible: self.visibility.is_visible(&series.key_id),
            })
            .collect()
    }
}
