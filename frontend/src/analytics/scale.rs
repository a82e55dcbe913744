//! Axis domains, value/pixel transforms and stacked accumulation.

use crate::analytics::format::format_compact;

/// Guide lines drawn above the baseline by default
pub const DEFAULT_TICK_COUNT: usize = 4;

/// Rounds `value` up to a readable axis ceiling.
///
/// The input is clamped to at least 1; anything up to 10 becomes 10, larger
/// values snap to the smallest of `{1, 2, 5, 10} x 10^k` that is not below
/// them.
pub fn nice_max(value: f64) -> f64 {
    let value = if value.is_finite() { value.max(1.0) } else { 1.0 };
    if value <= 10.0 {
        return 10.0;
    }
    let magnitude = 10f64.powf(value.log10().floor());
    [1.0, 2.0, 5.0, 10.0]
        .iter()
        .map(|step| step * magnitude)
        .find(|candidate| *candidate >= value)
        .unwrap_or(10.0 * magnitude)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScaleMode {
    #[default]
    Linear,
    Log,
}

/// Vertical scale mapping `[0, y_max]` onto `[top + inner_height, top]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YScale {
    pub top: f64,
    pub inner_height: f64,
    pub y_max: f64,
    pub mode: ScaleMode,
}

impl YScale {
    pub fn new(top: f64, inner_height: f64, y_max: f64, mode: ScaleMode) -> Self {
        Self {
            top,
            inner_height: inner_height.max(0.0),
            y_max: y_max.max(1.0),
            mode,
        }
    }

    /// Pixel row of the zero baseline
    #[inline]
    pub fn baseline(&self) -> f64 {
        self.top + self.inner_height
    }

    /// Fraction of the axis covered by `value`, before clamping
    #[inline]
    fn ratio(&self, value: f64) -> f64 {
        match self.mode {
            ScaleMode::Linear => value / self.y_max,
            ScaleMode::Log => {
                let span = self.y_max.log10().max(f64::EPSILON);
                value.max(1.0).log10() / span
            }
        }
    }

    #[inline]
    pub fn to_px(&self, value: f64) -> f64 {
        self.top + self.inner_height - self.ratio(value) * self.inner_height
    }

    /// Inverse of [`YScale::to_px`]
    pub fn from_px(&self, py: f64) -> f64 {
        if self.inner_height <= 0.0 {
            return 0.0;
        }
        let ratio = (self.baseline() - py) / self.inner_height;
        match self.mode {
            ScaleMode::Linear => ratio * self.y_max,
            ScaleMode::Log => 10f64.powf(ratio * self.y_max.log10()),
        }
    }
}

/// Horizontal scale placing bucket `i` at `left + i * step`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct XScale {
    pub left: f64,
    pub step: f64,
    pub count: usize,
}

impl XScale {
    /// Spreads `count` points over `inner_width`; a single point sits at `left`
    pub fn new(left: f64, inner_width: f64, count: usize) -> Self {
        let intervals = count.saturating_sub(1).max(1);
        Self {
            left,
            step: inner_width.max(0.0) / intervals as f64,
            count: count.max(1),
        }
    }

    #[inline]
    pub fn to_px(&self, index: usize) -> f64 {
        self.left + index as f64 * self.step
    }

    /// Nearest bucket index for a pixel column
    pub fn nearest_index(&self, px: f64) -> usize {
        if self.step <= 0.0 {
            return 0;
        }
        let raw = ((px - self.left) / self.step).round();
        raw.clamp(0.0, (self.count - 1) as f64) as usize
    }
}

/// One labeled horizontal guide line
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub value: f64,
    pub label: String,
}

/// `count + 1` evenly spaced ticks from 0 up to `y_max`
pub fn ticks(y_max: f64, count: usize) -> Vec<Tick> {
    let count = count.max(1);
    (0..=count)
        .map(|i| {
            let value = y_max * i as f64 / count as f64;
            Tick {
                value,
                label: format_compact(value),
            }
        })
        .collect()
}

/// Decade ticks `1, 10, 100, ...` up to `y_max`, closed by `y_max` itself
/// when it is not a decade
pub fn log_ticks(y_max: f64) -> Vec<Tick> {
    let y_max = if y_max.is_finite() { y_max.max(1.0) } else { 1.0 };
    let tolerance = y_max * 1e-9;
    let mut out = Vec::new();
    let mut value = 1.0;
    while value <= y_max + tolerance {
        out.push(Tick {
            value,
            label: format_compact(value),
        });
        value *= 10.0;
    }
    if out.last().map_or(true, |tick| tick.value < y_max - tolerance) {
        out.push(Tick {
            value: y_max,
            label: format_compact(y_max),
        });
    }
    out
}

/// Guide lines for an axis in `mode`; `count` only applies to linear axes
pub fn axis_ticks(y_max: f64, count: usize, mode: ScaleMode) -> Vec<Tick> {
    match mode {
        ScaleMode::Linear => ticks(y_max, count),
        ScaleMode::Log => log_ticks(y_max),
    }
}

/// Vertical extent of one series at one bucket inside a stack
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StackSegment {
    pub base: f64,
    pub top: f64,
}

/// Cumulative layout of several series drawn on top of each other
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StackedLayers {
    /// One entry per input layer, in draw order
    pub layers: Vec<Vec<StackSegment>>,
    /// Per-bucket sum of all layers
    pub totals: Vec<f64>,
}

impl StackedLayers {
    /// Largest per-bucket sum; the stacked axis must cover this
    pub fn max_total(&self) -> f64 {
        self.totals.iter().copied().fold(0.0, f64::max)
    }
}

/// Accumulates `layers` bucket by bucket in the given order.
///
/// Layers shorter than the longest one are treated as zero past their end.
pub fn stack(layers: &[Vec<f64>]) -> StackedLayers {
    let buckets = layers.iter().map(Vec::len).max().unwrap_or(0);
    let mut running = vec![0.0; buckets];

    let stacked = layers
        .iter()
        .map(|layer| {
            running
                .iter_mut()
                .enumerate()
                .map(|(i, acc)| {
                    let base = *acc;
                    *acc += layer.get(i).copied().unwrap_or(0.0).max(0.0);
                    StackSegment { base, top: *acc }
                })
                .collect()
        })
        .collect();

    StackedLayers {
        layers: stacked,
        totals: running,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test_case(47.0, 50.0)]
    #[test_case(4.0, 10.0)]
    #[test_case(1234.0, 2000.0)]
    #[test_case(0.0, 10.0)]
    #[test_case(-5.0, 10.0)]
    #[test_case(10.0, 10.0)]
    #[test_case(11.0, 20.0)]
    #[test_case(100.0, 100.0)]
    #[test_case(101.0, 200.0)]
    #[test_case(250.0, 500.0)]
    #[test_case(600.0, 1000.0)]
    fn test_nice_max(input: f64, expected: f64) {
        assert_eq!(nice_max(input), expected);
    }

    fn is_round(value: f64) -> bool {
        let magnitude = 10f64.powf(value.log10().floor());
        let leading = value / magnitude;
        [1.0, 2.0, 5.0, 10.0].iter().any(|d| (leading - d).abs() < 1e-9)
    }

    proptest! {
        #[test]
        fn prop_nice_max_covers_and_is_round(x in 0.0f64..1e12) {
            let nice = nice_max(x);
            prop_assert!(nice >= x);
            prop_assert!(nice >= 10.0);
            prop_assert!(is_round(nice));
        }
    }

    #[test]
    fn test_linear_scale_maps_ends() {
        let scale = YScale::new(20.0, 200.0, 100.0, ScaleMode::Linear);
        assert_eq!(scale.to_px(0.0), 220.0);
        assert_eq!(scale.to_px(100.0), 20.0);
        assert_eq!(scale.to_px(50.0), 120.0);
        assert_eq!(scale.from_px(120.0), 50.0);
    }

    #[test]
    fn test_log_scale_clamps_below_one() {
        let scale = YScale::new(0.0, 300.0, 1000.0, ScaleMode::Log);
        assert_eq!(scale.to_px(0.0), 300.0);
        assert_eq!(scale.to_px(1.0), 300.0);
        assert!((scale.to_px(10.0) - 200.0).abs() < 1e-9);
        assert!((scale.to_px(1000.0) - 0.0).abs() < 1e-9);
        assert!((scale.from_px(100.0) - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_x_scale_single_point_and_nearest() {
        let single = XScale::new(40.0, 400.0, 1);
        assert_eq!(single.to_px(0), 40.0);
        assert_eq!(single.nearest_index(999.0), 0);

        let scale = XScale::new(0.0, 300.0, 4);
        assert_eq!(scale.step, 100.0);
        assert_eq!(scale.nearest_index(149.0), 1);
        assert_eq!(scale.nearest_index(151.0), 2);
        assert_eq!(scale.nearest_index(-50.0), 0);
        assert_eq!(scale.nearest_index(10_000.0), 3);
    }

    #[test]
    fn test_ticks_evenly_spaced() {
        let values: Vec<f64> = ticks(2000.0, 4).iter().map(|t| t.value).collect();
        assert_eq!(values, vec![0.0, 500.0, 1000.0, 1500.0, 2000.0]);
        let labels: Vec<String> = ticks(2000.0, 4).into_iter().map(|t| t.label).collect();
        assert_eq!(labels, vec!["0", "500", "1K", "1.5K", "2K"]);
    }

    #[test]
    fn test_log_ticks_step_by_decade() {
        let labels = |ticks: Vec<Tick>| ticks.into_iter().map(|t| t.label).collect::<Vec<_>>();
        assert_eq!(labels(log_ticks(1000.0)), vec!["1", "10", "100", "1K"]);
        assert_eq!(labels(log_ticks(50.0)), vec!["1", "10", "50"]);
        assert_eq!(labels(log_ticks(0.0)), vec!["1"]);

        let values: Vec<f64> = axis_ticks(200.0, 4, ScaleMode::Log).iter().map(|t| t.value).collect();
        assert_eq!(values, vec![1.0, 10.0, 100.0, 200.0]);
        assert_eq!(axis_ticks(200.0, 4, ScaleMode::Linear), ticks(200.0, 4));
    }

    #[test]
    fn test_stack_accumulates_in_order() {
        let stacked = stack(&[vec![1.0, 2.0], vec![3.0, 4.0]]);
        assert_eq!(stacked.totals, vec![4.0, 6.0]);
        assert_eq!(stacked.layers[1][0], StackSegment { base: 1.0, top: 4.0 });
        assert_eq!(stacked.max_total(), 6.0);
    }

    #[test]
    fn test_stacked_domain_uses_bucket_sums() {
        // per-series maxima are 6 and 5, but the bucket sum reaches 11
        let stacked = stack(&[vec![6.0, 1.0], vec![5.0, 1.0]]);
        assert_eq!(nice_max(stacked.max_total()), 20.0);
        assert_eq!(nice_max(6.0_f64.max(5.0)), 10.0);
    }
}
