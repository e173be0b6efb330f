//! Request-to-query translation
//!
//! Request parameters flow through two stages before reaching the store:
//!
//! 1. [`parse`] / [`ParamParser`] turn raw [`RequestParams`] into a [`QuerySpec`],
//!    keeping only schema fields and well-formed pagination values.
//! 2. [`compose`] merges that spec with caller base options and handler
//!    defaults into the [`QueryOptions`] passed to the store.
//!
//! Both stages are pure and synchronous.
//!
//! # Example
//!
//! ```rust
//! use acton_resource::query::{compose, parse, QueryOptions, RequestParams};
//! use acton_resource::schema::{FieldKind, Schema};
//!
//! let schema = Schema::builder().field("color", FieldKind::String).build();
//! let params = RequestParams::from_pairs([("color", "red"), ("limit", "2"), ("page", "1")]);
//!
//! let spec = parse(&params, &schema);
//! let options = compose(&spec, None, &QueryOptions::new().with_limit(50), None);
//!
//! assert_eq!(options.limit, Some(2));
//! assert_eq!(options.offset, Some(0));
//! assert!(options.is_paged());
//! ```

mod options;
mod params;
mod parser;

pub use options::{compose, QueryOptions};
pub use params::{ParamValue, RequestParams};
pub use parser::{
    parse, FilterValue, OrderDirection, ParamParser, QuerySpec, SortKey, RESERVED_PARAMS,
};

pub(crate) use parser::parse_date;
