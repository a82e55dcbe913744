//! End-to-end: events payload -> buckets -> chart frame -> exports.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use chrono::{TimeZone, Utc};
use frontend::analytics::aggregator::AggregateOptions;
use frontend::api::usage::{build_report, parse_usage_page, UsageReport};
use frontend::api::{AsyncDataController, CancellationToken, FetchError, LoadOptions};
use frontend::charts::svg::render_svg;
use frontend::charts::{ChartGeometry, ChartRenderer, SeriesVisibility, TimeSeriesChart, TimeSeriesConfig};
use frontend::export::{csv_artifact, svg_artifact, to_csv};
use futures::channel::oneshot;
use futures::executor::LocalPool;
use futures::task::LocalSpawnExt;
use pretty_assertions::assert_eq;
use shared::{BucketWidth, UsageQuery};

// 2024-05-01T00:00:00Z
const T0: i64 = 1_714_521_600;

fn page_body(page: u32, events: &[(i64, &str, u64)]) -> String {
    let events: Vec<serde_json::Value> = events
        .iter()
        .map(|(ts, key, count)| serde_json::json!({"timestamp": ts, "series_key": key, "count": count}))
        .collect();
    serde_json::json!({
        "events": events,
        "page": page,
        "size": 500,
        "total_pages": 0,
        "total": 1200
    })
    .to_string()
}

fn report_from(body: &str) -> Result<UsageReport, FetchError> {
    let page = parse_usage_page(body)?;
    Ok(build_report(&page, &AggregateOptions::new(BucketWidth::Minute)))
}

#[test]
fn test_payload_to_csv_and_svg() {
    let body = page_body(
        0,
        &[(T0, "k2", 3), (T0 + 60, "k1", 2), (T0 + 5, "k1", 1), (T0 + 61, "k2", 4)],
    );
    let report = report_from(&body).unwrap();
    assert_eq!(report.pagination.total_pages, 3);
    let usage = report.series.unwrap();
    assert!(usage.is_aligned());

    assert_eq!(
        to_csv(&usage).unwrap(),
        "timestamp,k1,k2,total\n\
         2024-05-01T00:00:00+00:00,1,3,4\n\
         2024-05-01T00:01:00+00:00,2,4,6"
    );

    let chart = TimeSeriesChart::new(
        ChartGeometry::default(),
        usage.clone(),
        SeriesVisibility::new(),
        TimeSeriesConfig {
            stacked: true,
            ..TimeSeriesConfig::default()
        },
    );
    let frame = chart.frame(1.0);
    let svg = render_svg(&frame, None);
    assert!(svg.contains(r#"data-key="k1""#));
    assert!(svg.contains(r#"data-key="k2""#));

    let csv = csv_artifact(&usage).unwrap();
    assert_eq!(csv.filename, "usage-1m-20240501T0000.csv");
    let snapshot = svg_artifact(&usage, &frame);
    assert!(snapshot.body.starts_with("<?xml"));
}

#[test]
fn test_hidden_series_survive_refresh() {
    let visibility = SeriesVisibility::new().toggled("k1");
    let first = report_from(&page_body(0, &[(T0, "k1", 50), (T0, "k2", 5)]))
        .unwrap()
        .series
        .unwrap();
    let second = report_from(&page_body(0, &[(T0, "k1", 80), (T0, "k2", 7)]))
        .unwrap()
        .series
        .unwrap();

    for usage in [first, second] {
        let chart = TimeSeriesChart::new(
            ChartGeometry::default(),
            usage,
            visibility.clone(),
            TimeSeriesConfig::default(),
        );
        assert_eq!(chart.y_scale().y_max, 10.0);
        assert_eq!(chart.frame(1.0).polylines().count(), 1);
    }
}

#[test]
fn test_superseded_page_does_not_overwrite_newer_one() {
    let senders: Rc<RefCell<HashMap<u32, oneshot::Sender<String>>>> = Rc::default();
    let controller = {
        let senders = Rc::clone(&senders);
        AsyncDataController::new(
            move |query: UsageQuery, _token: CancellationToken| {
                let (tx, rx) = oneshot::channel();
                senders.borrow_mut().insert(query.page, tx);
                async move {
                    let body = rx.await.map_err(|_| FetchError::Network("dropped".to_string()))?;
                    report_from(&body)
                }
            },
            LoadOptions::default(),
        )
    };

    let from = Utc.timestamp_opt(T0, 0).unwrap();
    let to = Utc.timestamp_opt(T0 + 3600, 0).unwrap();
    let query = UsageQuery::new(from, to, BucketWidth::Minute);

    let mut pool = LocalPool::new();
    let spawner = pool.spawner();
    spawner.spawn_local(controller.load(query.clone()).unwrap()).unwrap();
    spawner.spawn_local(controller.load(query.with_page(1)).unwrap()).unwrap();
    pool.run_until_stalled();

    let newer = senders.borrow_mut().remove(&1).unwrap();
    newer.send(page_body(1, &[(T0, "newer", 2)])).unwrap();
    pool.run_until_stalled();

    // the aborted request's sender may already be gone; a late reply is ignored either way
    if let Some(older) = senders.borrow_mut().remove(&0) {
        let _ = older.send(page_body(0, &[(T0, "older", 9)]));
    }
    pool.run_until_stalled();

    let state = controller.state();
    assert!(!state.loading);
    assert_eq!(state.error, None);
    let report = state.data.unwrap();
    assert_eq!(report.pagination.page, 1);
    let usage = report.series.unwrap();
    assert_eq!(usage.series.len(), 1);
    assert_eq!(usage.series[0].key_id, "newer");
}
