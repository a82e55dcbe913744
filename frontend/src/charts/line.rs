//! Category line chart plus the polyline, hover and tooltip pieces the
//! time-series chart reuses.

use crate::analytics::scale::{axis_ticks, nice_max, ScaleMode, Tick, XScale, YScale, DEFAULT_TICK_COUNT};
use crate::charts::{
    clamp_progress, default_formatter, grid_primitives, ChartGeometry, ChartRenderer, Frame,
    LegendEntry, Primitive, SeriesVisibility, TextAnchor, Tooltip, TooltipRow, ValueFormatter,
};

/// At most this many x labels are drawn; the rest are skipped evenly
const MAX_X_LABELS: usize = 8;
const TOOLTIP_CHAR_WIDTH: f64 = 7.0;
const TOOLTIP_ROW_HEIGHT: f64 = 18.0;

#[derive(Debug, Clone, PartialEq)]
pub struct LineSeries {
    pub key: String,
    pub label: String,
    pub color: String,
    pub values: Vec<f64>,
}

impl LineSeries {
    pub fn new(key: impl Into<String>, color: impl Into<String>, values: Vec<f64>) -> Self {
        let key = key.into();
        Self {
            label: key.clone(),
            key,
            color: color.into(),
            values,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

#[derive(Clone)]
pub struct LineChartConfig {
    pub show_markers: bool,
    pub tick_count: usize,
    pub stroke_width: f64,
    pub formatter: ValueFormatter,
}

impl Default for LineChartConfig {
    fn default() -> Self {
        Self {
            show_markers: true,
            tick_count: DEFAULT_TICK_COUNT,
            stroke_width: 2.0,
            formatter: default_formatter(),
        }
    }
}

/// Axes of one render pass
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PlotLayout {
    pub x: XScale,
    pub y: YScale,
    pub ticks: Vec<Tick>,
}

impl PlotLayout {
    pub fn new(geometry: &ChartGeometry, buckets: usize, max_value: f64, mode: ScaleMode, tick_count: usize) -> Self {
        let y_max = nice_max(max_value);
        let y = YScale::new(geometry.margin.top, geometry.inner_height(), y_max, mode);
        Self {
            x: XScale::new(geometry.margin.left, geometry.inner_width(), buckets),
            ticks: axis_ticks(y.y_max, tick_count, mode),
            y,
        }
    }

    /// Bucket under the pointer, if the pointer is over the plot area
    pub fn hit(&self, geometry: &ChartGeometry, x: f64, y: f64, buckets: usize) -> Option<usize> {
        if buckets == 0 || !geometry.contains(x, y) {
            return None;
        }
        Some(self.x.nearest_index(x))
    }
}

/// Polyline through `tops`, grown from the baseline by `progress`
pub(crate) fn line_primitives(
    key: &str,
    color: &str,
    tops: &[f64],
    layout: &PlotLayout,
    progress: f64,
    stroke_width: f64,
    markers: bool,
) -> Vec<Primitive> {
    let points: Vec<(f64, f64)> = tops
        .iter()
        .enumerate()
        .map(|(i, top)| (layout.x.to_px(i), layout.y.to_px(top * progress)))
        .collect();

    let mut primitives = Vec::with_capacity(points.len() + 1);
    if markers {
        primitives.extend(points.iter().map(|(cx, cy)| Primitive::Circle {
            cx: *cx,
            cy: *cy,
            r: 3.0,
            fill: color.to_string(),
        }));
    }
    primitives.insert(
        0,
        Primitive::Polyline {
            points,
            stroke: color.to_string(),
            stroke_width,
            key: key.to_string(),
        },
    );
    primitives
}

/// Evenly thinned category labels under the plot
pub(crate) fn x_label_primitives(labels: &[String], layout: &PlotLayout, geometry: &ChartGeometry) -> Vec<Primitive> {
    if labels.is_empty() {
        return Vec::new();
    }
    let stride = labels.len().div_ceil(MAX_X_LABELS).max(1);
    labels
        .iter()
        .enumerate()
        .filter(|(i, _)| i % stride == 0)
        .map(|(i, label)| Primitive::Text {
            x: layout.x.to_px(i),
            y: geometry.plot_bottom() + 18.0,
            content: label.clone(),
            anchor: TextAnchor::Middle,
            class: "x-label",
        })
        .collect()
}

/// Vertical rule at the hovered bucket with a marker per plotted value
pub(crate) fn hover_rule_primitives(
    index: usize,
    markers: &[(String, f64)],
    layout: &PlotLayout,
    geometry: &ChartGeometry,
) -> Vec<Primitive> {
    let px = layout.x.to_px(index);
    let mut primitives = vec![Primitive::Line {
        x1: px,
        y1: geometry.margin.top,
        x2: px,
        y2: geometry.plot_bottom(),
        stroke: "#9CA3AF".to_string(),
        dashed: false,
        class: "hover-rule",
    }];
    primitives.extend(markers.iter().map(|(color, top)| Primitive::Circle {
        cx: px,
        cy: layout.y.to_px(*top),
        r: 4.5,
        fill: color.clone(),
    }));
    primitives
}

/// Tooltip box beside `anchor_x`, flipped left when it would overflow
pub(crate) fn tooltip_panel(anchor_x: f64, tooltip: &Tooltip, geometry: &ChartGeometry) -> Vec<Primitive> {
    let longest = tooltip
        .rows
        .iter()
        .map(|row| row.label.chars().count() + row.formatted.chars().count() + 2)
        .chain(std::iter::once(tooltip.label.chars().count()))
        .max()
        .unwrap_or(0);
    let width = 28.0 + longest as f64 * TOOLTIP_CHAR_WIDTH;
    let height = 12.0 + TOOLTIP_ROW_HEIGHT * (tooltip.rows.len() + 1) as f64;

    let mut x = anchor_x + 12.0;
    if x + width > geometry.width {
        x = (anchor_x - 12.0 - width).max(0.0);
    }
    let y = geometry.margin.top;

    let mut primitives = vec![
        Primitive::Rect {
            x,
            y,
            width,
            height,
            fill: "#111827".to_string(),
            class: "tooltip-panel",
        },
        Primitive::Text {
            x: x + 8.0,
            y: y + TOOLTIP_ROW_HEIGHT,
            content: tooltip.label.clone(),
            anchor: TextAnchor::Start,
            class: "tooltip-title",
        },
    ];
    for (i, row) in tooltip.rows.iter().enumerate() {
        let row_y = y + TOOLTIP_ROW_HEIGHT * (i + 2) as f64;
        primitives.push(Primitive::Rect {
            x: x + 8.0,
            y: row_y - 8.0,
            width: 8.0,
            height: 8.0,
            fill: row.color.clone(),
            class: "tooltip-swatch",
        });
        primitives.push(Primitive::Text {
            x: x + 22.0,
            y: row_y,
            content: format!("{}: {}", row.label, row.formatted),
            anchor: TextAnchor::Start,
            class: "tooltip-row",
        });
    }
    primitives
}

/// Multi-series line chart over category labels
pub struct LineChart {
    geometry: ChartGeometry,
    labels: Vec<String>,
    series: Vec<LineSeries>,
    visibility: SeriesVisibility,
    config: LineChartConfig,
    layout: PlotLayout,
    buckets: usize,
    hover: Option<usize>,
}

impl LineChart {
    pub fn new(
        geometry: ChartGeometry,
        labels: Vec<String>,
        series: Vec<LineSeries>,
        visibility: SeriesVisibility,
        config: LineChartConfig,
    ) -> Self {
        let buckets = series
            .iter()
            .map(|s| s.values.len())
            .chain(std::iter::once(labels.len()))
            .max()
            .unwrap_or(0);
        let max_value = series
            .iter()
            .filter(|s| visibility.is_visible(&s.key))
            .flat_map(|s| s.values.iter().copied())
            .fold(0.0, f64::max);
        let layout = PlotLayout::new(&geometry, buckets, max_value, ScaleMode::Linear, config.tick_count);

        Self {
            geometry,
            labels,
            series,
            visibility,
            config,
            layout,
            buckets,
            hover: None,
        }
    }

    /// One series, always visible
    pub fn single(geometry: ChartGeometry, labels: Vec<String>, series: LineSeries, config: LineChartConfig) -> Self {
        Self::new(geometry, labels, vec![series], SeriesVisibility::new(), config)
    }

    pub fn hovered(&self) -> Option<usize> {
        self.hover
    }

    pub fn y_max(&self) -> f64 {
        self.layout.y.y_max
    }

    fn visible(&self) -> impl Iterator<Item = &LineSeries> {
        self.series.iter().filter(|s| self.visibility.is_visible(&s.key))
    }

    fn tooltip_at(&self, index: usize) -> Tooltip {
        Tooltip {
            label: self.labels.get(index).cloned().unwrap_or_else(|| index.to_string()),
            rows: self
                .visible()
                .map(|s| {
                    let value = s.values.get(index).copied().unwrap_or(0.0);
                    TooltipRow {
                        key: s.key.clone(),
                        label: s.label.clone(),
                        color: s.color.clone(),
                        value,
                        formatted: (self.config.formatter)(&s.key, value),
                    }
                })
                .collect(),
        }
    }
}

impl ChartRenderer for LineChart {
    fn frame(&self, progress: f64) -> Frame {
        let progress = clamp_progress(progress);
        let mut frame = Frame::new(&self.geometry);
        frame.primitives.extend(grid_primitives(&self.layout.ticks, &self.layout.y, &self.geometry));
        frame
            .primitives
            .extend(x_label_primitives(&self.labels, &self.layout, &self.geometry));

        for series in self.visible() {
            frame.primitives.extend(line_primitives(
                &series.key,
                &series.color,
                &series.values,
                &self.layout,
                progress,
                self.config.stroke_width,
                self.config.show_markers,
            ));
        }

        if let Some(index) = self.hover {
            let markers: Vec<(String, f64)> = self
                .visible()
                .map(|s| (s.color.clone(), s.values.get(index).copied().unwrap_or(0.0)))
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
        self.hover = self.layout.hit(&self.geometry, x, y, self.buckets);
        self.hover.map(|index| self.tooltip_at(index))
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
