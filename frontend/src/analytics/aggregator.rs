use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use log::debug;
use shared::{BucketWidth, Series, TimePoint, UsageEvent, UsageTimeSeries};

use crate::analytics::color::color_for_key;

/// Unit of `UsageEvent::timestamp`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampUnit {
    #[default]
    Seconds,
    Milliseconds,
}

/// What happens when one series has several events in the same bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollisionPolicy {
    /// The event processed last replaces earlier ones (dashboard default)
    #[default]
    LastWriteWins,
    /// Counts are added up, histogram style
    Sum,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateOptions {
    pub width: BucketWidth,
    pub unit: TimestampUnit,
    pub timezone: Tz,
    pub collision: CollisionPolicy,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            width: BucketWidth::Minute,
            unit: TimestampUnit::Seconds,
            timezone: Tz::UTC,
            collision: CollisionPolicy::LastWriteWins,
        }
    }
}

impl AggregateOptions {
    pub fn new(width: BucketWidth) -> Self {
        Self {
            width,
            ..Self::default()
        }
    }

    pub fn with_unit(mut self, unit: TimestampUnit) -> Self {
        self.unit = unit;
        self
    }

    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn with_collision(mut self, collision: CollisionPolicy) -> Self {
        self.collision = collision;
        self
    }
}

/// Start of the UTC-aligned bucket containing `timestamp`.
///
/// Sub-second parts are dropped and the result is floored to a multiple of
/// the bucket width, so pre-epoch instants land in the bucket below.
pub fn bucket_start(timestamp: i64, unit: TimestampUnit, width: BucketWidth) -> Option<DateTime<Utc>> {
    let seconds = match unit {
        TimestampUnit::Seconds => timestamp,
        TimestampUnit::Milliseconds => timestamp.div_euclid(1000),
    };
    let aligned = seconds.checked_sub(seconds.rem_euclid(width.seconds()))?;
    DateTime::<Utc>::from_timestamp(aligned, 0)
}

#[derive(Default)]
struct SeriesAccumulator {
    owner: Option<String>,
    buckets: HashMap<DateTime<Utc>, u64>,
}

/// Turns a flat event list into a time-aligned multi-series grid.
///
/// Returns `None` when no event falls on a representable bucket; callers
/// treat that as "no data", not as a failure.
pub fn aggregate(events: &[UsageEvent], options: &AggregateOptions) -> Option<UsageTimeSeries> {
    let mut grid: BTreeSet<DateTime<Utc>> = BTreeSet::new();
    let mut per_series: BTreeMap<&str, SeriesAccumulator> = BTreeMap::new();
    let mut skipped = 0usize;

    for event in events {
        let Some(bucket) = bucket_start(event.timestamp, options.unit, options.width) else {
            skipped += 1;
            continue;
        };
        grid.insert(bucket);

        let acc = per_series.entry(event.series_key.as_str()).or_default();
        if acc.owner.is_none() {
            acc.owner = event.owner.clone();
        }
        match options.collision {
            CollisionPolicy::LastWriteWins => {
                acc.buckets.insert(bucket, event.count);
            }
            CollisionPolicy::Sum => {
                let value = acc.buckets.entry(bucket).or_insert(0);
                *value = value.saturating_add(event.count);
            }
        }
    }

    if skipped > 0 {
        debug!("Skipped {} usage events with out-of-range timestamps", skipped);
    }

    let grid: Vec<DateTime<Utc>> = grid.into_iter().collect();
    let (start, end) = match (grid.first(), grid.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return None,
    };

    let series: Vec<Series> = per_series
        .into_iter()
        .map(|(key, acc)| Series {
            key_id: key.to_string(),
            owner: acc.owner,
            color: Some(color_for_key(key).to_string()),
            points: grid
                .iter()
                .map(|ts| TimePoint {
                    ts: *ts,
                    value: acc.buckets.get(ts).copied().unwrap_or(0),
                })
                .collect(),
        })
        .collect();

    debug!(
        "Aggregated {} usage events into {} buckets across {} series ({})",
        events.len(),
        grid.len(),
        series.len(),
        options.width
    );

    Some(UsageTimeSeries {
        start,
        end,
        interval: options.width,
        timezone: options.timezone,
        series,
    })
}
