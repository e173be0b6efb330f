//! Final query options handed to the store
//!
//! [`compose`] merges a parsed [`QuerySpec`] with caller-supplied base options
//! and handler defaults. The merge is total and never mutates its inputs.
//!
//! Precedence:
//!
//! | Field | Highest wins |
//! |---|---|
//! | `where` (per key) | base > spec > defaults |
//! | `limit`, `page` | spec > base > defaults |
//! | `offset` | spec > base > `(page - 1) * limit` when paged > defaults |
//! | `order` | spec (non-empty) > base > defaults |
//! | `include` | base (non-empty) > defaults |
//! | `distinct` | forced `true` while a limit is in effect, else spec > base > defaults |

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::parser::{FilterValue, QuerySpec, SortKey};

/// Options for one store call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Equality predicates keyed by field
    #[serde(rename = "where", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub filters: BTreeMap<String, FilterValue>,
    /// Maximum rows to return
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    /// Rows to skip
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    /// 1-indexed page number; presence selects page-mode responses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    /// Collapse duplicate rows produced by joined includes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distinct: Option<bool>,
    /// Sort order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order: Vec<SortKey>,
    /// Associations to load alongside each row
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
}

impl QueryOptions {
    /// Empty options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality filter
    #[must_use]
    pub fn with_filter(mut self, field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.filters.insert(field.into(), value.into());
        self
    }

    /// Set the limit
    #[must_use]
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the offset
    #[must_use]
    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Set the page
    #[must_use]
    pub fn with_page(mut self, page: u64) -> Self {
        self.page = Some(page);
        self
    }

    /// Append a sort key
    #[must_use]
    pub fn with_order(mut self, key: SortKey) -> Self {
        self.order.push(key);
        self
    }

    /// Add an association to include
    #[must_use]
    pub fn with_include(mut self, association: impl Into<String>) -> Self {
        self.include.push(association.into());
        self
    }

    /// Check whether page-mode pagination applies
    #[must_use]
    pub fn is_paged(&self) -> bool {
        self.page.is_some()
    }
}

/// Merge a parsed spec with base options and defaults
///
/// See the module docs for the precedence table. `max_limit`, when set, caps
/// the effective limit.
///
/// # Example
///
/// ```rust
/// use acton_resource::query::{compose, FilterValue, QueryOptions, QuerySpec};
///
/// let defaults = QueryOptions::new().with_limit(50).with_offset(0);
/// let base = QueryOptions::new().with_filter("tenant", "acme");
/// let spec = QuerySpec { limit: Some(10), page: Some(3), ..QuerySpec::default() };
///
/// let options = compose(&spec, Some(&base), &defaults, None);
/// assert_eq!(options.limit, Some(10));
/// assert_eq!(options.offset, Some(20));
/// assert_eq!(options.distinct, Some(true));
/// assert_eq!(options.filters.get("tenant"), Some(&FilterValue::String("acme".into())));
/// ```
#[must_use]
pub fn compose(
    spec: &QuerySpec,
    base: Option<&QueryOptions>,
    defaults: &QueryOptions,
    max_limit: Option<u64>,
) -> QueryOptions {
    let mut filters = defaults.filters.clone();
    filters.extend(spec.filters.clone());
    if let Some(base) = base {
        filters.extend(base.filters.clone());
    }

    let limit = spec
        .limit
        .or_else(|| base.and_then(|b| b.limit))
        .or(defaults.limit)
        .map(|limit| match max_limit {
            Some(max) => limit.min(max),
            None => limit,
        });

    let page = spec
        .page
        .or_else(|| base.and_then(|b| b.page))
        .or(defaults.page);

    let offset = spec
        .offset
        .or_else(|| base.and_then(|b| b.offset))
        .or_else(|| match (page, limit) {
            (Some(page), Some(limit)) => Some(page.saturating_sub(1).saturating_mul(limit)),
            _ => None,
        })
        .or(defaults.offset);

    let distinct = if limit.is_some() {
        Some(true)
    } else {
        spec.distinct
            .or_else(|| base.and_then(|b| b.distinct))
            .or(defaults.distinct)
    };

    let order = if !spec.sort.is_empty() {
        spec.sort.clone()
    } else {
        match base {
            Some(b) if !b.order.is_empty() => b.order.clone(),
            _ => defaults.order.clone(),
        }
    };

    let include = match base {
        Some(b) if !b.include.is_empty() => b.include.clone(),
        _ => defaults.include.clone(),
    };

    let options = QueryOptions {
        filters,
        limit,
        offset,
        page,
        distinct,
        order,
        include,
    };

    tracing::debug!(
        filters = options.filters.len(),
        limit = ?options.limit,
        offset = ?options.offset,
        page = ?options.page,
        "Composed query options"
    );

    options
}
