use gloo_net::http::{Request, RequestBuilder};
use gloo_storage::Storage;
use log::debug;
use shared::{PaginationMeta, SharedError, UsagePage, UsageQuery, UsageTimeSeries};

use crate::analytics::aggregator::{aggregate, AggregateOptions};
use crate::api::api_url;
use crate::api::controller::CancellationToken;
use crate::api::error::FetchError;
use crate::config::Config;

/// One fetched page, bucketed and paired with its pager state
#[derive(Debug, Clone, PartialEq)]
pub struct UsageReport {
    /// `None` when the page carried no events
    pub series: Option<UsageTimeSeries>,
    pub pagination: PaginationMeta,
}

/// Builds the events URL for `query`
pub fn usage_events_url(query: &UsageQuery) -> String {
    let mut url = format!(
        "{}?from={}&to={}&interval={}&page={}&size={}",
        api_url(Config::USAGE_EVENTS_PATH),
        urlencoding::encode(&query.from.to_rfc3339()),
        urlencoding::encode(&query.to.to_rfc3339()),
        query.interval.label(),
        query.page,
        query.size
    );
    if let Some(operator_id) = &query.operator_id {
        url.push_str("&operator_id=");
        url.push_str(&urlencoding::encode(operator_id));
    }
    url
}

/// Decodes a usage page body.
///
/// A body that parses as JSON but lacks the expected fields is reported as
/// [`FetchError::Malformed`] so the controller records it like any failure.
pub fn parse_usage_page(body: &str) -> Result<UsagePage, FetchError> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    if value.get("events").map_or(true, |events| !events.is_array()) {
        return Err(SharedError::MissingField("events".to_string()).into());
    }
    Ok(serde_json::from_value(value)?)
}

/// Attaches the stored session as a bearer token
fn authenticated_get(url: &str) -> RequestBuilder {
    let request = Request::get(url);
    match gloo_storage::LocalStorage::get::<String>(Config::SESSION_STORAGE_KEY) {
        Ok(session_id) => request.header("Authorization", &format!("Bearer {}", session_id)),
        Err(_) => request,
    }
}

/// Fetches one page of raw usage events
pub async fn fetch_usage_page(
    query: UsageQuery,
    token: CancellationToken,
) -> Result<UsagePage, FetchError> {
    query.check()?;
    token.check()?;

    let url = usage_events_url(&query);
    debug!("Fetching usage events: {}", url);

    let response = authenticated_get(&url)
        .send()
        .await
        .map_err(|e| FetchError::Network(e.to_string()))?;
    token.check()?;

    if !response.ok() {
        let message = response.text().await.unwrap_or_default();
        return Err(FetchError::Status {
            status: response.status(),
            message,
        });
    }

    let body = response
        .text()
        .await
        .map_err(|e| FetchError::Network(e.to_string()))?;
    token.check()?;

    let page = parse_usage_page(&body)?;
    debug!(
        "Fetched {} usage events (page {} of {})",
        page.events.len(),
        page.page + 1,
        page.total_pages
    );
    Ok(page)
}

/// Turns a fetched page into chart-ready data
pub fn build_report(page: &UsagePage, options: &AggregateOptions) -> UsageReport {
    UsageReport {
        series: aggregate(&page.events, options),
        pagination: PaginationMeta::from_payload(page),
    }
}

/// Fetcher used by the usage dashboard: one page, aggregated
pub async fn fetch_usage_report(
    query: UsageQuery,
    options: AggregateOptions,
    token: CancellationToken,
) -> Result<UsageReport, FetchError> {
    let options = AggregateOptions {
        width: query.interval,
        ..options
    };
    let page = fetch_usage_page(query, token).await?;
    Ok(build_report(&page, &options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use shared::{BucketWidth, UsageEvent};

    #[test]
    fn test_usage_events_url_encodes_query() {
        let from = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 5, 1, 1, 0, 0).unwrap();
        let mut query = UsageQuery::new(from, to, BucketWidth::FiveMinutes).with_page(2);
        query.operator_id = Some("lga/7 north".to_string());

        assert_eq!(
            usage_events_url(&query),
            "/api/usage/events?from=2024-05-01T00%3A00%3A00%2B00%3A00\
             &to=2024-05-01T01%3A00%3A00%2B00%3A00&interval=5m&page=2&size=500\
             &operator_id=lga%2F7%20north"
        );
    }

    #[test]
    fn test_parse_usage_page_missing_events_is_malformed() {
        let err = parse_usage_page(r#"{"page":0,"size":10,"total_pages":0,"total":0}"#).unwrap_err();
        assert_eq!(
            err,
            FetchError::Shared(SharedError::MissingField("events".to_string()))
        );

        let err = parse_usage_page("not json").unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
    }

    #[test]
    fn test_build_report_recomputes_pagination() {
        let page = UsagePage {
            events: vec![UsageEvent::new(0, "k1", 2), UsageEvent::new(60, "k2", 5)],
            page: 0,
            size: 2,
            total_pages: 0,
            total: 5,
        };
        let report = build_report(&page, &AggregateOptions::new(BucketWidth::Minute));

        assert_eq!(report.pagination.total_pages, 3);
        let series = report.series.unwrap();
        assert_eq!(series.bucket_count(), 2);
        assert_eq!(series.bucket_totals(), vec![2, 5]);
    }

    #[test]
    fn test_build_report_empty_page_has_no_series() {
        let page = UsagePage {
            events: vec![],
            page: 0,
            size: 50,
            total_pages: 0,
            total: 0,
        };
        let report = build_report(&page, &AggregateOptions::default());
        assert!(report.series.is_none());
    }
}
