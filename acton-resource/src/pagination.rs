//! Result shaping for list responses
//!
//! Turns a store's `count + rows` result into the response body, a status hint
//! and a `Content-Range` descriptor. Two shapes exist:
//!
//! - **Range mode** (no `page` in the options): the body is the bare row array
//!   and the served window is `offset .. offset + limit`.
//! - **Page mode** (`page` present, `limit > 0`): rows are wrapped in a
//!   [`PageEnvelope`] with page totals and navigation data.
//!
//! Either way the status is `206 Partial Content` while rows remain beyond the
//! served window and `200 OK` otherwise.
//!
//! # Example
//!
//! ```rust
//! use acton_resource::pagination::{shape, StatusHint};
//! use acton_resource::query::QueryOptions;
//!
//! let options = QueryOptions::new().with_limit(10).with_offset(0);
//! let shaped = shape(25, &options, vec!["row"; 10]).unwrap();
//!
//! assert_eq!(shaped.status, StatusHint::Partial);
//! assert_eq!(shaped.range.to_string(), "0-10/25");
//! ```

use std::fmt;

use axum::http::{HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::query::QueryOptions;

/// Pages of context shown around the current page
pub const DEFAULT_PAGE_WINDOW: u64 = 3;

/// Whether the served window covers the remaining rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusHint {
    /// Everything up to the end of the collection was served
    Complete,
    /// More rows exist past the served window
    Partial,
}

impl StatusHint {
    /// HTTP status for this hint
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Complete => StatusCode::OK,
            Self::Partial => StatusCode::PARTIAL_CONTENT,
        }
    }

    fn for_window(end: u64, total: u64) -> Self {
        if total > end {
            Self::Partial
        } else {
            Self::Complete
        }
    }
}

/// `{start}-{end}/{total}` descriptor sent as `Content-Range`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRange {
    /// First served index (inclusive)
    pub start: u64,
    /// Last served index (exclusive)
    pub end: u64,
    /// Total matching rows
    pub total: u64,
}

impl ContentRange {
    /// Header value form
    #[must_use]
    pub fn header_value(&self) -> HeaderValue {
        // digits, '-' and '/' only
        HeaderValue::from_str(&self.to_string()).unwrap_or_else(|_| HeaderValue::from_static("*"))
    }
}

impl fmt::Display for ContentRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}/{}", self.start, self.end, self.total)
    }
}

/// Rows actually served plus the half-open index range they cover
///
/// Invariant: `0 <= start <= end <= count`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultWindow<R> {
    /// Served rows
    pub rows: Vec<R>,
    /// First served index (inclusive)
    pub start: u64,
    /// Last served index (exclusive)
    pub end: u64,
    /// Total matching rows
    pub count: u64,
}

impl<R> ResultWindow<R> {
    /// Compute the window for `count` matching rows under `options`
    ///
    /// `start` is the requested offset clamped to `count`; `end` is
    /// `min(count, start + limit)`, with a missing limit meaning "everything".
    pub fn new(count: u64, options: &QueryOptions, rows: Vec<R>) -> Self {
        let requested = match (options.offset, options.page, options.limit) {
            (Some(offset), _, _) => offset,
            (None, Some(page), Some(limit)) => page.saturating_sub(1).saturating_mul(limit),
            _ => 0,
        };
        let start = requested.min(count);
        let span = options.limit.unwrap_or(count);
        let end = start.saturating_add(span).min(count);
        Self {
            rows,
            start,
            end,
            count,
        }
    }

    /// `Content-Range` descriptor for this window
    #[must_use]
    pub fn range(&self) -> ContentRange {
        ContentRange {
            start: self.start,
            end: self.end,
            total: self.count,
        }
    }

    /// Status hint for this window
    #[must_use]
    pub fn status(&self) -> StatusHint {
        StatusHint::for_window(self.end, self.count)
    }
}

/// Navigation entry for a nearby page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLink {
    /// 1-indexed page number
    pub number: u64,
}

/// Page-mode response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageEnvelope<R> {
    /// Rows on this page
    pub data: Vec<R>,
    /// `ceil(item_total / limit)`
    pub page_total: u64,
    /// Total matching rows
    pub item_total: u64,
    /// Requested page
    pub current_page: u64,
    /// Whether a page before this one exists
    pub has_previous: bool,
    /// Whether a page after this one exists
    pub has_next: bool,
    /// Nearby pages for navigation
    pub pages: Vec<PageLink>,
}

/// Response body in either mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Envelope<R> {
    /// Range mode: the bare rows
    Range(Vec<R>),
    /// Page mode: rows wrapped with navigation data
    Page(PageEnvelope<R>),
}

/// Shaped list result
#[derive(Debug, Clone, PartialEq)]
pub struct Shaped<R> {
    /// Response body
    pub envelope: Envelope<R>,
    /// 200 vs 206
    pub status: StatusHint,
    /// `Content-Range` descriptor
    pub range: ContentRange,
}

/// Shaping failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ShapeError {
    /// Page mode needs a positive page size
    #[error("page-based pagination requires a positive limit")]
    PageWithoutLimit,
}

/// Shape with the default navigation window
pub fn shape<R>(total: u64, options: &QueryOptions, rows: Vec<R>) -> Result<Shaped<R>, ShapeError> {
    shape_with_window(total, options, rows, DEFAULT_PAGE_WINDOW)
}

/// Shape a `count + rows` result
///
/// # Errors
///
/// [`ShapeError::PageWithoutLimit`] when a page was requested but the limit
/// is absent or zero.
pub fn shape_with_window<R>(
    total: u64,
    options: &QueryOptions,
    rows: Vec<R>,
    window: u64,
) -> Result<Shaped<R>, ShapeError> {
    let Some(page) = options.page else {
        let served = ResultWindow::new(total, options, rows);
        return Ok(Shaped {
            status: served.status(),
            range: served.range(),
            envelope: Envelope::Range(served.rows),
        });
    };

    let limit = options
        .limit
        .filter(|limit| *limit > 0)
        .ok_or(ShapeError::PageWithoutLimit)?;

    let served = ResultWindow::new(total, options, rows);
    let page_total = total.div_ceil(limit);
    let status = served.status();
    let range = served.range();

    let envelope = PageEnvelope {
        data: served.rows,
        page_total,
        item_total: total,
        current_page: page,
        has_previous: page > 1,
        has_next: page < page_total,
        pages: page_window(window, page_total, page)
            .into_iter()
            .map(|number| PageLink { number })
            .collect(),
    };

    Ok(Shaped {
        envelope: Envelope::Page(envelope),
        status,
        range,
    })
}

/// Page numbers to offer around `current`
///
/// Up to `window` consecutive pages, never past `page_total`. Near the start
/// the window is anchored at page 1.
#[must_use]
pub fn page_window(window: u64, page_total: u64, current: u64) -> Vec<u64> {
    if window == 0 || page_total == 0 {
        return Vec::new();
    }
    let end = current
        .saturating_add(window / 2)
        .max(window)
        .min(page_total);
    let start = if current < window.saturating_sub(1) {
        1
    } else {
        (end + 1).saturating_sub(window).max(1)
    };
    (start..=end).collect()
}
