//! Request parameter parsing
//!
//! Turns a flat [`RequestParams`] map into a [`QuerySpec`]: equality filters on
//! schema fields, a pagination window and a sort order. Parsing never fails.
//! Anything that does not name a schema field, or does not coerce to that
//! field's kind, is dropped and logged at debug level.
//!
//! # Example
//!
//! ```rust
//! use acton_resource::query::{parse, FilterValue, RequestParams};
//! use acton_resource::schema::{FieldKind, Schema};
//!
//! let schema = Schema::builder()
//!     .field("color", FieldKind::String)
//!     .field("weight", FieldKind::Number)
//!     .build();
//!
//! let params = RequestParams::new()
//!     .with("color", "red")
//!     .with("weight", "heavy")
//!     .with("bogus", "1")
//!     .with("limit", "abc")
//!     .with("page", "2");
//!
//! let spec = parse(&params, &schema);
//! assert_eq!(spec.filters.get("color"), Some(&FilterValue::String("red".into())));
//! assert!(!spec.filters.contains_key("weight"));
//! assert!(!spec.filters.contains_key("bogus"));
//! assert_eq!(spec.limit, None);
//! assert_eq!(spec.page, Some(2));
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::params::RequestParams;
use crate::schema::{FieldKind, Schema};

/// Parameter names with pagination or sorting meaning
pub const RESERVED_PARAMS: [&str; 4] = ["limit", "offset", "page", "sort"];

/// A typed equality operand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Boolean value
    Boolean(bool),
    /// 64-bit integer value
    Integer(i64),
    /// 64-bit floating point value
    Float(f64),
    /// UTC timestamp
    Date(DateTime<Utc>),
    /// String value
    String(String),
}

impl FilterValue {
    /// Coerce a raw parameter string to `kind`
    ///
    /// Returns `None` when the value does not fit the kind. String fields accept
    /// anything.
    ///
    /// # Example
    ///
    /// ```rust
    /// use acton_resource::query::FilterValue;
    /// use acton_resource::schema::FieldKind;
    ///
    /// assert_eq!(FilterValue::coerce("42", FieldKind::Number), Some(FilterValue::Integer(42)));
    /// assert_eq!(FilterValue::coerce("4.5", FieldKind::Number), Some(FilterValue::Float(4.5)));
    /// assert_eq!(FilterValue::coerce("true", FieldKind::Boolean), Some(FilterValue::Boolean(true)));
    /// assert_eq!(FilterValue::coerce("yes", FieldKind::Boolean), None);
    /// assert_eq!(FilterValue::coerce("abc", FieldKind::Number), None);
    /// ```
    #[must_use]
    pub fn coerce(raw: &str, kind: FieldKind) -> Option<Self> {
        match kind {
            FieldKind::String => Some(Self::String(raw.to_string())),
            FieldKind::Number => parse_number(raw),
            FieldKind::Boolean => match raw {
                "true" => Some(Self::Boolean(true)),
                "false" => Some(Self::Boolean(false)),
                _ => None,
            },
            FieldKind::Date => parse_date(raw).map(Self::Date),
        }
    }

    /// Compare against a stored JSON value using equality semantics
    ///
    /// Integers and floats compare numerically. Dates compare as instants, so
    /// `2024-01-01` matches a stored `2024-01-01T00:00:00Z`.
    #[must_use]
    pub fn matches(&self, stored: &serde_json::Value) -> bool {
        match self {
            Self::String(expected) => stored.as_str() == Some(expected.as_str()),
            Self::Boolean(expected) => stored.as_bool() == Some(*expected),
            Self::Integer(expected) => match stored.as_i64() {
                Some(actual) => actual == *expected,
                None => stored.as_f64() == Some(*expected as f64),
            },
            Self::Float(expected) => stored.as_f64() == Some(*expected),
            Self::Date(expected) => stored
                .as_str()
                .and_then(parse_date)
                .is_some_and(|actual| actual == *expected),
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Date(d) => write!(f, "{}", d.to_rfc3339()),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<f64> for FilterValue {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(d: DateTime<Utc>) -> Self {
        Self::Date(d)
    }
}

fn parse_number(raw: &str) -> Option<FilterValue> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Some(FilterValue::Integer(n));
    }
    raw.parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .map(FilterValue::Float)
}

/// Parse an ISO-8601 date or date-time into UTC
///
/// Accepts RFC 3339 timestamps, naive `YYYY-MM-DDTHH:MM:SS[.fff]` (read as UTC)
/// and bare `YYYY-MM-DD` (midnight UTC).
pub(crate) fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Direction for ordering results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    /// Sort in ascending order (A-Z, 0-9)
    #[default]
    Asc,
    /// Sort in descending order (Z-A, 9-0)
    Desc,
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => write!(f, "asc"),
            Self::Desc => write!(f, "desc"),
        }
    }
}

/// One sort key: a schema field and a direction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    /// Field to order by
    pub field: String,
    /// Direction
    pub direction: OrderDirection,
}

impl SortKey {
    /// Ascending key
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Asc,
        }
    }

    /// Descending key
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Desc,
        }
    }
}

/// Structured query derived from one request's parameters
///
/// Every key in `filters` is a schema field. `limit`, `offset` and `page` are
/// `None` when absent or unparseable, which keeps "no pagination requested"
/// distinct from "limit 0".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuerySpec {
    /// Equality predicates keyed by field
    #[serde(rename = "where", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub filters: BTreeMap<String, FilterValue>,
    /// Maximum rows to return
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    /// Rows to skip
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    /// 1-indexed page number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    /// Requested sort order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<SortKey>,
    /// Whether duplicate rows should be collapsed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distinct: Option<bool>,
}

impl QuerySpec {
    /// Check whether page-based pagination was requested
    #[must_use]
    pub fn is_paged(&self) -> bool {
        self.page.is_some()
    }
}

/// Why a parameter did not make it into the spec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dropped {
    UnknownField,
    Uncoercible(FieldKind),
    Empty,
}

impl fmt::Display for Dropped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownField => write!(f, "not a schema field"),
            Self::Uncoercible(kind) => write!(f, "value does not coerce to {kind}"),
            Self::Empty => write!(f, "no value"),
        }
    }
}

/// Schema-aware parameter parser
///
/// Holds the schema plus any extra reserved names (typically the route
/// parameters of a nested resource) that must never become filters.
#[derive(Debug, Clone)]
pub struct ParamParser<'a> {
    schema: &'a Schema,
    reserved: BTreeSet<String>,
}

impl<'a> ParamParser<'a> {
    /// Parser with only the built-in reserved names
    #[must_use]
    pub fn new(schema: &'a Schema) -> Self {
        Self {
            schema,
            reserved: RESERVED_PARAMS.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    /// Additionally reserve `names`
    #[must_use]
    pub fn reserve<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reserved.extend(names.into_iter().map(Into::into));
        self
    }

    /// Check whether `name` is reserved
    #[must_use]
    pub fn is_reserved(&self, name: &str) -> bool {
        self.reserved.contains(name)
    }

    /// Parse a parameter set
    ///
    /// Pure: the same parameters always produce the same spec.
    #[must_use]
    pub fn parse(&self, params: &RequestParams) -> QuerySpec {
        let mut spec = QuerySpec {
            limit: params.first("limit").and_then(parse_count),
            offset: params.first("offset").and_then(parse_count),
            page: params.first("page").and_then(parse_page),
            sort: params
                .first("sort")
                .map(|raw| self.parse_sort(raw))
                .unwrap_or_default(),
            ..QuerySpec::default()
        };

        for (name, value) in params.iter() {
            if self.is_reserved(name) {
                continue;
            }
            match self.coerce_filter(name, value.first()) {
                Ok(filter) => {
                    spec.filters.insert(name.to_string(), filter);
                }
                Err(reason) => {
                    tracing::debug!(param = name, %reason, "Dropping filter parameter");
                }
            }
        }

        spec
    }

    fn coerce_filter(&self, name: &str, raw: Option<&str>) -> Result<FilterValue, Dropped> {
        let kind = self.schema.kind_of(name).ok_or(Dropped::UnknownField)?;
        let raw = raw.ok_or(Dropped::Empty)?;
        FilterValue::coerce(raw, kind).ok_or(Dropped::Uncoercible(kind))
    }

    fn parse_sort(&self, raw: &str) -> Vec<SortKey> {
        raw.split(',')
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .filter_map(|term| {
                let key = match term.strip_prefix('-') {
                    Some(field) => SortKey::desc(field),
                    None => SortKey::asc(term.strip_prefix('+').unwrap_or(term)),
                };
                if self.schema.contains(&key.field) {
                    Some(key)
                } else {
                    tracing::debug!(field = %key.field, "Dropping sort key: not a schema field");
                    None
                }
            })
            .collect()
    }
}

/// Parse `params` against `schema` with the built-in reserved names
#[must_use]
pub fn parse(params: &RequestParams, schema: &Schema) -> QuerySpec {
    ParamParser::new(schema).parse(params)
}

fn parse_count(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok()
}

fn parse_page(raw: &str) -> Option<u64> {
    parse_count(raw).filter(|page| *page >= 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn schema() -> Schema {
        Schema::builder()
            .primary_key("id", FieldKind::String)
            .field("color", FieldKind::String)
            .field("weight", FieldKind::Number)
            .field("active", FieldKind::Boolean)
            .field("shipped_at", FieldKind::Date)
            .build()
    }

    #[test]
    fn test_coerces_each_kind() {
        let params = RequestParams::new()
            .with("color", "red")
            .with("weight", "12")
            .with("active", "false")
            .with("shipped_at", "2024-03-01T10:00:00Z");
        let spec = parse(&params, &schema());

        assert_eq!(spec.filters["color"], FilterValue::String("red".into()));
        assert_eq!(spec.filters["weight"], FilterValue::Integer(12));
        assert_eq!(spec.filters["active"], FilterValue::Boolean(false));
        assert_eq!(
            spec.filters["shipped_at"],
            FilterValue::Date(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_string_field_keeps_numeric_looking_value_as_string() {
        let spec = parse(&RequestParams::new().with("color", "42"), &schema());
        assert_eq!(spec.filters["color"], FilterValue::String("42".into()));
    }

    #[test]
    fn test_unknown_parameters_are_dropped() {
        let params = RequestParams::new()
            .with("color", "red")
            .with("password", "x")
            .with("__proto__", "y");
        let spec = parse(&params, &schema());
        assert_eq!(spec.filters.len(), 1);
        assert!(!spec.filters.contains_key("password"));
        assert!(!spec.filters.contains_key("__proto__"));
    }

    #[test]
    fn test_uncoercible_values_are_dropped() {
        let params = RequestParams::new()
            .with("weight", "heavy")
            .with("active", "yes")
            .with("shipped_at", "last tuesday");
        let spec = parse(&params, &schema());
        assert!(spec.filters.is_empty());
    }

    #[test]
    fn test_number_rejects_empty_and_non_finite() {
        assert_eq!(FilterValue::coerce("", FieldKind::Number), None);
        assert_eq!(FilterValue::coerce("NaN", FieldKind::Number), None);
        assert_eq!(FilterValue::coerce("inf", FieldKind::Number), None);
        assert_eq!(FilterValue::coerce("-3", FieldKind::Number), Some(FilterValue::Integer(-3)));
    }

    #[test]
    fn test_date_forms() {
        let midnight = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        assert_eq!(
            FilterValue::coerce("2024-01-02", FieldKind::Date),
            Some(FilterValue::Date(midnight))
        );
        assert_eq!(
            FilterValue::coerce("2024-01-02T00:00:00", FieldKind::Date),
            Some(FilterValue::Date(midnight))
        );
        assert_eq!(
            FilterValue::coerce("2024-01-02T02:00:00+02:00", FieldKind::Date),
            Some(FilterValue::Date(midnight))
        );
    }

    #[test]
    fn test_unparseable_limit_is_absent_not_zero() {
        let spec = parse(&RequestParams::new().with("limit", "abc"), &schema());
        assert_eq!(spec.limit, None);

        let spec = parse(&RequestParams::new().with("limit", "0"), &schema());
        assert_eq!(spec.limit, Some(0));
    }

    #[test]
    fn test_negative_and_fractional_window_values_are_absent() {
        let params = RequestParams::new()
            .with("limit", "-5")
            .with("offset", "2.5")
            .with("page", "0");
        let spec = parse(&params, &schema());
        assert_eq!(spec.limit, None);
        assert_eq!(spec.offset, None);
        assert_eq!(spec.page, None);
        assert!(!spec.is_paged());
    }

    #[test]
    fn test_reserved_names_never_become_filters() {
        let schema = Schema::builder()
            .field("limit", FieldKind::Number)
            .field("owner", FieldKind::String)
            .build();
        let params = RequestParams::new().with("limit", "5").with("owner", "me");

        let spec = ParamParser::new(&schema).reserve(["owner"]).parse(&params);
        assert!(spec.filters.is_empty());
        assert_eq!(spec.limit, Some(5));
    }

    #[test]
    fn test_multi_value_takes_first() {
        let params = RequestParams::from_pairs([
            ("color", "red"),
            ("color", "blue"),
            ("limit", "3"),
            ("limit", "9"),
        ]);
        let spec = parse(&params, &schema());
        assert_eq!(spec.filters["color"], FilterValue::String("red".into()));
        assert_eq!(spec.limit, Some(3));
    }

    #[test]
    fn test_sort_parsing() {
        let params = RequestParams::new().with("sort", "-weight, color,+active,bogus,");
        let spec = parse(&params, &schema());
        assert_eq!(
            spec.sort,
            vec![
                SortKey::desc("weight"),
                SortKey::asc("color"),
                SortKey::asc("active"),
            ]
        );
    }

    #[test]
    fn test_parse_is_deterministic() {
        let params = RequestParams::from_pairs([
            ("weight", "7"),
            ("color", "red"),
            ("page", "2"),
            ("limit", "10"),
        ]);
        assert_eq!(parse(&params, &schema()), parse(&params, &schema()));
    }

    #[test]
    fn test_filter_matches_stored_values() {
        use serde_json::json;

        assert!(FilterValue::Integer(3).matches(&json!(3)));
        assert!(FilterValue::Integer(3).matches(&json!(3.0)));
        assert!(FilterValue::Float(2.5).matches(&json!(2.5)));
        assert!(!FilterValue::String("3".into()).matches(&json!(3)));
        assert!(FilterValue::Boolean(true).matches(&json!(true)));
        assert!(FilterValue::coerce("2024-01-02", FieldKind::Date)
            .unwrap()
            .matches(&json!("2024-01-02T00:00:00Z")));
        assert!(!FilterValue::Boolean(true).matches(&json!(null)));
    }

    #[test]
    fn test_spec_serializes_where_key() {
        let spec = parse(&RequestParams::new().with("color", "red").with("limit", "2"), &schema());
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json, serde_json::json!({"where": {"color": "red"}, "limit": 2}));
    }
}
