//! Raw request parameters as delivered by the transport
//!
//! Query strings may repeat a key (`?tag=a&tag=b`). Equality filtering has no
//! meaning for several values, so [`ParamValue::first`] is the single place
//! where a repeated key collapses: the first value in request order wins.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single parameter value, possibly repeated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Parameter given once
    Single(String),
    /// Parameter given several times, in request order
    Multi(Vec<String>),
}

impl ParamValue {
    /// The value equality semantics operate on
    ///
    /// For a repeated parameter this is the first occurrence. An empty `Multi`
    /// yields `None`.
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        match self {
            Self::Single(value) => Some(value.as_str()),
            Self::Multi(values) => values.first().map(String::as_str),
        }
    }

    /// Check whether the parameter was repeated
    #[must_use]
    pub fn is_multi(&self) -> bool {
        matches!(self, Self::Multi(values) if values.len() > 1)
    }

    fn push(&mut self, value: String) {
        match self {
            Self::Single(existing) => {
                let first = std::mem::take(existing);
                *self = Self::Multi(vec![first, value]);
            }
            Self::Multi(values) => values.push(value),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Single(value)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(values: Vec<String>) -> Self {
        Self::Multi(values)
    }
}

/// Mapping from parameter name to raw value
///
/// Keys iterate in sorted order so that everything derived from a parameter
/// set is deterministic.
///
/// # Example
///
/// ```rust
/// use acton_resource::query::RequestParams;
///
/// let params = RequestParams::from_pairs(vec![
///     ("color".to_string(), "red".to_string()),
///     ("color".to_string(), "blue".to_string()),
///     ("limit".to_string(), "10".to_string()),
/// ]);
///
/// assert_eq!(params.first("color"), Some("red"));
/// assert_eq!(params.first("limit"), Some("10"));
/// assert!(params.get("color").unwrap().is_multi());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestParams(BTreeMap<String, ParamValue>);

impl RequestParams {
    /// Create an empty parameter set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(name, value)` pairs, grouping repeated names in order
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut params = Self::new();
        for (name, value) in pairs {
            params.append(name, value);
        }
        params
    }

    /// Add a value, turning the entry into a multi-value when the name repeats
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let (name, value) = (name.into(), value.into());
        match self.0.get_mut(&name) {
            Some(existing) => existing.push(value),
            None => {
                self.0.insert(name, ParamValue::Single(value));
            }
        }
    }

    /// Set a value, replacing anything present
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Raw value for `name`
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    /// First value for `name`
    #[must_use]
    pub fn first(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(ParamValue::first)
    }

    /// Check whether `name` is present
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Parameter names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Iterate over all entries, sorted by name
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of distinct parameter names
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check whether no parameters were supplied
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RequestParams {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self::from_pairs(iter)
    }
}
