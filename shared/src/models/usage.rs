use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SharedError;

/// Width of one time bucket on the usage grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BucketWidth {
    #[serde(rename = "1m")]
    Minute,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "1h")]
    Hour,
    #[serde(rename = "1d")]
    Day,
}

impl BucketWidth {
    /// Bucket width in seconds
    pub fn seconds(&self) -> i64 {
        match self {
            BucketWidth::Minute => 60,
            BucketWidth::FiveMinutes => 5 * 60,
            BucketWidth::FifteenMinutes => 15 * 60,
            BucketWidth::Hour => 60 * 60,
            BucketWidth::Day => 24 * 60 * 60,
        }
    }

    /// Short label used in query strings and export filenames
    pub fn label(&self) -> &'static str {
        match self {
            BucketWidth::Minute => "1m",
            BucketWidth::FiveMinutes => "5m",
            BucketWidth::FifteenMinutes => "15m",
            BucketWidth::Hour => "1h",
            BucketWidth::Day => "1d",
        }
    }
}

impl Default for BucketWidth {
    fn default() -> Self {
        BucketWidth::Minute
    }
}

impl fmt::Display for BucketWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for BucketWidth {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1m" | "minute" => Ok(BucketWidth::Minute),
            "5m" => Ok(BucketWidth::FiveMinutes),
            "15m" => Ok(BucketWidth::FifteenMinutes),
            "1h" | "hour" => Ok(BucketWidth::Hour),
            "1d" | "day" => Ok(BucketWidth::Day),
            other => Err(SharedError::Validation(format!(
                "Unknown bucket interval: {}",
                other
            ))),
        }
    }
}

/// One bucket-aligned value of a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimePoint {
    /// Bucket start
    pub ts: DateTime<Utc>,
    /// Non-negative count for the bucket
    pub value: u64,
}

/// One named sequence of values aligned to the shared bucket grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    /// Stable identity of the series across refreshes
    pub key_id: String,

    /// Display label, when the events named one
    pub owner: Option<String>,

    /// Display color (`#RRGGBB`)
    pub color: Option<String>,

    pub points: Vec<TimePoint>,
}

impl Series {
    /// Label shown in legends and tooltips
    pub fn display_label(&self) -> &str {
        self.owner.as_deref().unwrap_or(&self.key_id)
    }

    pub fn values(&self) -> impl Iterator<Item = u64> + '_ {
        self.points.iter().map(|p| p.value)
    }

    pub fn max_value(&self) -> u64 {
        self.values().max().unwrap_or(0)
    }
}

/// Bucketed multi-series usage data.
///
/// Every series covers exactly the same ascending grid of bucket starts, so
/// `series[i].points[j].ts` is identical for all `i`. Instances are rebuilt
/// on every aggregation pass and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageTimeSeries {
    /// First bucket start of the grid
    pub start: DateTime<Utc>,
    /// Last bucket start of the grid
    pub end: DateTime<Utc>,
    pub interval: BucketWidth,
    pub timezone: Tz,
    pub series: Vec<Series>,
}

impl UsageTimeSeries {
    /// Number of buckets on the shared grid
    pub fn bucket_count(&self) -> usize {
        self.series.first().map(|s| s.points.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty() || self.bucket_count() == 0
    }

    /// Bucket starts of the grid, ascending
    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.series
            .first()
            .map(|s| s.points.iter().map(|p| p.ts).collect())
            .unwrap_or_default()
    }

    /// Looks up a series by key
    pub fn series(&self, key_id: &str) -> Option<&Series> {
        self.series.iter().find(|s| s.key_id == key_id)
    }

    /// Sum of every series at each bucket, saturating at `u64::MAX`
    pub fn bucket_totals(&self) -> Vec<u64> {
        let mut totals = vec![0u64; self.bucket_count()];
        for series in &self.series {
            for (total, point) in totals.iter_mut().zip(&series.points) {
                *total = total.saturating_add(point.value);
            }
        }
        totals
    }

    /// Checks the shared-grid invariant
    pub fn is_aligned(&self) -> bool {
        let grid = self.timestamps();
        self.series.iter().all(|s| {
            s.points.len() == grid.len() && s.points.iter().zip(&grid).all(|(p, ts)| p.ts == *ts)
        })
    }
}
