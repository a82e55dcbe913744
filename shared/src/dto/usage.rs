use crate::error::{Result, SharedError};
use crate::models::usage::BucketWidth;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Raw usage event as delivered by the REST backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageEvent {
    /// Event time in epoch units (seconds unless the caller says otherwise)
    pub timestamp: i64,
    pub series_key: String,
    pub count: u64,
    /// Optional display label for the series
    #[serde(default)]
    pub owner: Option<String>,
}

impl UsageEvent {
    pub fn new(timestamp: i64, series_key: impl Into<String>, count: u64) -> Self {
        Self {
            timestamp,
            series_key: series_key.into(),
            count,
            owner: None,
        }
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }
}

/// Query parameters for one page of usage events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct UsageQuery {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub interval: BucketWidth,

    /// 0-based page index
    pub page: u32,

    #[validate(range(min = 1, max = 1000, message = "Page size must be between 1 and 1000"))]
    pub size: u32,

    #[validate(length(min = 1, message = "Operator id cannot be empty"))]
    pub operator_id: Option<String>,
}

impl UsageQuery {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>, interval: BucketWidth) -> Self {
        Self {
            from,
            to,
            interval,
            page: 0,
            size: 500,
            operator_id: None,
        }
    }

    /// Field validation plus the window ordering check
    pub fn check(&self) -> Result<()> {
        if self.from >= self.to {
            return Err(SharedError::InvalidDateRange {
                start: self.from,
                end: self.to,
            });
        }
        self.validate()?;
        Ok(())
    }

    /// Same query pointed at another page
    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page,
            ..self.clone()
        }
    }
}

/// One page of raw usage events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsagePage {
    pub events: Vec<UsageEvent>,
    pub page: u32,
    pub size: u32,
    pub total_pages: u32,
    pub total: u64,
}

/// Pagination metadata handed to the pager control.
///
/// Always derived from the latest payload; never edited by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PaginationMeta {
    /// 0-based page index
    pub page: u32,
    pub size: u32,
    pub total_pages: u32,
    pub total: u64,
}

impl PaginationMeta {
    /// Recomputes the pager state from a server payload.
    ///
    /// `total_pages` is derived from `total` and `size` when the server sends
    /// zero, and `page` is clamped into the valid range.
    pub fn from_payload(payload: &UsagePage) -> Self {
        let size = payload.size.max(1);
        let derived_pages = ((payload.total + size as u64 - 1) / size as u64) as u32;
        let total_pages = if payload.total_pages == 0 {
            derived_pages
        } else {
            payload.total_pages
        };
        let page = payload.page.min(total_pages.saturating_sub(1));
        if page != payload.page {
            log::debug!(
                "Clamped page {} to {} (total_pages={})",
                payload.page,
                page,
                total_pages
            );
        }

        Self {
            page,
            size,
            total_pages,
            total: payload.total,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page + 1 < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.page > 0
    }

    pub fn next_page(&self) -> Option<u32> {
        self.has_next().then(|| self.page + 1)
    }

    pub fn previous_page(&self) -> Option<u32> {
        self.has_previous().then(|| self.page - 1)
    }
}
