//! CSV and SVG exports of usage data.

use std::borrow::Cow;

use csv::{Terminator, WriterBuilder};
use log::debug;
use shared::UsageTimeSeries;
use thiserror::Error;

use crate::charts::svg::render_document;
use crate::charts::Frame;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV buffer could not be flushed: {0}")]
    Flush(String),

    #[error("CSV output was not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Download failed: {0}")]
    Download(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Svg,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Svg => "svg",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Svg => "image/svg+xml",
        }
    }
}

/// A file ready to hand to the browser
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub filename: String,
    pub mime_type: &'static str,
    pub body: String,
}

/// Prefixes cells that spreadsheets would evaluate as formulas
pub fn sanitize_cell(cell: &str) -> Cow<'_, str> {
    match cell.chars().next() {
        Some('=' | '+' | '-' | '@') => Cow::Owned(format!("'{}", cell)),
        _ => Cow::Borrowed(cell),
    }
}

/// Writes `header` and `rows` as comma-separated lines joined by `\n`,
/// without a trailing newline
pub fn write_csv(header: &[String], rows: &[Vec<String>]) -> Result<String, ExportError> {
    let mut writer = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(header.iter().map(|cell| sanitize_cell(cell).into_owned()))?;
    for row in rows {
        writer.write_record(row.iter().map(|cell| sanitize_cell(cell).into_owned()))?;
    }

    let bytes = writer.into_inner().map_err(|e| ExportError::Flush(e.to_string()))?;
    let mut text = String::from_utf8(bytes)?;
    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}

/// `timestamp,<series keys>,total` followed by one row per bucket
pub fn to_csv(usage: &UsageTimeSeries) -> Result<String, ExportError> {
    let header: Vec<String> = std::iter::once("timestamp".to_string())
        .chain(usage.series.iter().map(|s| s.key_id.clone()))
        .chain(std::iter::once("total".to_string()))
        .collect();

    let rows: Vec<Vec<String>> = usage
        .timestamps()
        .into_iter()
        .enumerate()
        .map(|(i, ts)| {
            let values: Vec<u64> = usage
                .series
                .iter()
                .map(|s| s.points.get(i).map_or(0, |p| p.value))
                .collect();
            let total = values.iter().fold(0u64, |acc, v| acc.saturating_add(*v));
            std::iter::once(ts.with_timezone(&usage.timezone).to_rfc3339())
                .chain(values.iter().map(u64::to_string))
                .chain(std::iter::once(total.to_string()))
                .collect()
        })
        .collect();

    debug!("Exporting {} buckets x {} series as CSV", rows.len(), usage.series.len());
    write_csv(&header, &rows)
}

/// `usage-<interval>-<local start>.<ext>`
pub fn export_filename(usage: &UsageTimeSeries, format: ExportFormat) -> String {
    format!(
        "usage-{}-{}.{}",
        usage.interval.label(),
        usage.start.with_timezone(&usage.timezone).format("%Y%m%dT%H%M"),
        format.extension()
    )
}

pub fn csv_artifact(usage: &UsageTimeSeries) -> Result<ExportArtifact, ExportError> {
    Ok(ExportArtifact {
        filename: export_filename(usage, ExportFormat::Csv),
        mime_type: ExportFormat::Csv.mime_type(),
        body: to_csv(usage)?,
    })
}

/// Vector snapshot of an already rendered frame
pub fn svg_artifact(usage: &UsageTimeSeries, frame: &Frame) -> ExportArtifact {
    let title = format!("Usage ({})", usage.interval);
    ExportArtifact {
        filename: export_filename(usage, ExportFormat::Svg),
        mime_type: ExportFormat::Svg.mime_type(),
        body: render_document(frame, Some(&title)),
    }
}

/// How long the object URL and its anchor outlive the click
pub const DOWNLOAD_REVOKE_DELAY_MS: u32 = 1_000;

/// Offers the artifact as a browser download.
///
/// The anchor is attached to the body for the click, and both it and the
/// object URL are released once [`DOWNLOAD_REVOKE_DELAY_MS`] has passed.
pub fn download(artifact: &ExportArtifact) -> Result<(), ExportError> {
    use gloo::file::{Blob, ObjectUrl};
    use gloo::timers::callback::Timeout;
    use wasm_bindgen::JsCast;

    let document = web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| ExportError::Download("no document available".to_string()))?;
    let body = document
        .body()
        .ok_or_else(|| ExportError::Download("document has no body".to_string()))?;

    let blob = Blob::new_with_options(artifact.body.as_str(), Some(artifact.mime_type));
    let url = ObjectUrl::from(blob);

    let anchor = document
        .create_element("a")
        .map_err(|e| ExportError::Download(format!("{:?}", e)))?
        .dyn_into::<web_sys::HtmlAnchorElement>()
        .map_err(|_| ExportError::Download("element is not an anchor".to_string()))?;
    anchor.set_href(&url);
    anchor.set_download(&artifact.filename);
    anchor.set_hidden(true);
    body.append_child(&anchor).map_err(|e| ExportError::Download(format!("{:?}", e)))?;
    anchor.click();

    Timeout::new(DOWNLOAD_REVOKE_DELAY_MS, move || {
        anchor.remove();
        drop(url);
    })
    .forget();

    debug!("Offered {} ({} bytes)", artifact.filename, artifact.body.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use shared::{BucketWidth, Series, TimePoint};
    use test_case::test_case;

    fn usage(series: &[(&str, Vec<u64>)], timezone: chrono_tz::Tz) -> UsageTimeSeries {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let buckets = series.first().map_or(0, |(_, v)| v.len());
        UsageTimeSeries {
            start,
            end: start + Duration::minutes(buckets.saturating_sub(1) as i64),
            interval: BucketWidth::Minute,
            timezone,
            series: series
                .iter()
                .map(|(key, values)| Series {
                    key_id: key.to_string(),
                    owner: None,
                    color: None,
                    points: values
                        .iter()
                        .enumerate()
                        .map(|(i, value)| TimePoint {
                            ts: start + Duration::minutes(i as i64),
                            value: *value,
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_csv_rows_and_totals() {
        let csv = to_csv(&usage(&[("k1", vec![1, 2]), ("k2", vec![3, 4])], chrono_tz::UTC)).unwrap();
        assert_eq!(
            csv,
            "timestamp,k1,k2,total\n\
             2024-05-01T00:00:00+00:00,1,3,4\n\
             2024-05-01T00:01:00+00:00,2,4,6"
        );
        assert_eq!(csv.lines().count(), 3);
    }

    #[test]
    fn test_csv_total_saturates_on_huge_counts() {
        let csv = to_csv(&usage(&[("k1", vec![u64::MAX]), ("k2", vec![1])], chrono_tz::UTC)).unwrap();
        let row = csv.lines().nth(1).unwrap();
        assert_eq!(row, format!("2024-05-01T00:00:00+00:00,{},1,{}", u64::MAX, u64::MAX));
    }

    #[test]
    fn test_csv_timestamps_use_series_timezone() {
        let csv = to_csv(&usage(&[("k1", vec![5])], chrono_tz::America::New_York)).unwrap();
        assert_eq!(csv, "timestamp,k1,total\n2024-04-30T20:00:00-04:00,5,5");
    }

    #[test_case("=SUM(A1)", "'=SUM(A1)")]
    #[test_case("+1", "'+1")]
    #[test_case("-2", "'-2")]
    #[test_case("@cmd", "'@cmd")]
    #[test_case("plain", "plain")]
    #[test_case("", "")]
    fn test_sanitize_cell(input: &str, expected: &str) {
        assert_eq!(sanitize_cell(input), expected);
    }

    #[test]
    fn test_csv_round_trips_through_reader() {
        let data = usage(&[("=HYPERLINK(\"x\")", vec![7, 0]), ("cab,2", vec![1, 9])], chrono_tz::UTC);
        let csv = to_csv(&data).unwrap();

        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let header: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(header, vec!["timestamp", "'=HYPERLINK(\"x\")", "cab,2", "total"]);

        let rows: Vec<Vec<String>> = reader
            .records()
            .map(|r| r.unwrap().iter().map(String::from).collect())
            .collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][1..], ["7", "1", "8"]);
        assert_eq!(rows[1][1..], ["0", "9", "9"]);
    }

    #[test]
    fn test_empty_usage_exports_header_only() {
        let csv = to_csv(&usage(&[], chrono_tz::UTC)).unwrap();
        assert_eq!(csv, "timestamp,total");
    }

    #[test]
    fn test_artifacts() {
        let data = usage(&[("k1", vec![1])], chrono_tz::Asia::Tokyo);
        let csv = csv_artifact(&data).unwrap();
        assert_eq!(csv.filename, "usage-1m-20240501T0900.csv");
        assert_eq!(csv.mime_type, "text/csv");

        let frame = Frame {
            width: 10.0,
            height: 10.0,
            primitives: vec![],
        };
        let svg = svg_artifact(&data, &frame);
        assert_eq!(svg.filename, "usage-1m-20240501T0900.svg");
        assert_eq!(svg.mime_type, "image/svg+xml");
        assert!(svg.body.starts_with("<?xml"));
        assert!(svg.body.contains("<title>Usage (1m)</title>"));
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod browser_tests {
    use super::*;
    use futures::channel::oneshot;
    use gloo::timers::callback::Timeout;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn pending_anchors() -> u32 {
        web_sys::window()
            .and_then(|window| window.document())
            .and_then(|document| document.query_selector_all("a[download]").ok())
            .map_or(0, |anchors| anchors.length())
    }

    #[wasm_bindgen_test]
    async fn test_download_keeps_url_alive_past_click() {
        let artifact = ExportArtifact {
            filename: "usage-1m-20240501T0000.csv".to_string(),
            mime_type: ExportFormat::Csv.mime_type(),
            body: "timestamp,k1,total".to_string(),
        };

        download(&artifact).unwrap();
        assert_eq!(pending_anchors(), 1);

        let (tx, rx) = oneshot::channel();
        Timeout::new(DOWNLOAD_REVOKE_DELAY_MS + 100, move || {
            let _ = tx.send(());
        })
        .forget();
        rx.await.unwrap();
        assert_eq!(pending_anchors(), 0);
    }
}
