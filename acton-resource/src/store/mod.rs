//! Store contract
//!
//! The handlers never talk to a database directly. They drive a
//! [`ResourceStore`], which executes single-collection operations against a
//! schema-typed model and reports failures as structured [`StoreError`]s.
//!
//! The trait uses return-position `impl Future` so implementations can be
//! written with plain `async fn`.
//!
//! # Example
//!
//! ```rust,ignore
//! use acton_resource::prelude::*;
//!
//! struct PgWidgets { pool: PgPool, schema: Schema }
//!
//! impl ResourceStore for PgWidgets {
//!     type Row = Widget;
//!
//!     fn schema(&self) -> &Schema {
//!         &self.schema
//!     }
//!
//!     async fn find_one(&self, options: &QueryOptions) -> StoreResult<Option<Widget>> {
//!         // translate options.filters into a WHERE clause
//!         todo!()
//!     }
//!
//!     // ... other methods
//! }
//! ```

mod error;
#[cfg(feature = "memory-store")]
mod memory;

use std::future::Future;

use serde::Serialize;

pub use error::{FieldViolation, StoreError, StoreErrorKind, StoreOperation};
#[cfg(feature = "memory-store")]
pub use memory::MemoryStore;

use crate::query::QueryOptions;
use crate::schema::Schema;

/// Attribute bag for create and update
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Rows for one window plus the total number of matching rows
#[derive(Debug, Clone, PartialEq)]
pub struct CountedRows<R> {
    /// Total rows matching the filters, ignoring limit and offset
    pub count: u64,
    /// Rows inside the requested window
    pub rows: Vec<R>,
}

impl<R> CountedRows<R> {
    /// Create a counted result
    pub fn new(count: u64, rows: Vec<R>) -> Self {
        Self { count, rows }
    }
}

/// Persistence for one model
///
/// Each method is a single store call; atomicity is the implementation's
/// concern. Implementations must not retry internally.
pub trait ResourceStore: Send + Sync + 'static {
    /// Row type returned by the store
    type Row: Serialize + Send + Sync;

    /// Attribute metadata of the model
    ///
    /// Read on every request.
    fn schema(&self) -> &Schema;

    /// Insert a row built from `attrs`
    fn create(&self, attrs: Attributes) -> impl Future<Output = StoreResult<Self::Row>> + Send;

    /// First row matching `options`, if any
    fn find_one(
        &self,
        options: &QueryOptions,
    ) -> impl Future<Output = StoreResult<Option<Self::Row>>> + Send;

    /// Window of rows matching `options` plus the total match count
    fn find_and_count_all(
        &self,
        options: &QueryOptions,
    ) -> impl Future<Output = StoreResult<CountedRows<Self::Row>>> + Send;

    /// Apply `attrs` to a previously loaded row
    fn update(
        &self,
        row: Self::Row,
        attrs: Attributes,
    ) -> impl Future<Output = StoreResult<Self::Row>> + Send;

    /// Delete a previously loaded row
    fn destroy(&self, row: Self::Row) -> impl Future<Output = StoreResult<()>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_result_type() {
        let ok: StoreResult<u64> = Ok(3);
        assert!(ok.is_ok());

        let err: StoreResult<u64> = Err(StoreError::not_found(StoreOperation::FindOne));
        assert!(err.is_err());
    }

    #[test]
    fn test_counted_rows() {
        let counted = CountedRows::new(25, vec![1, 2, 3]);
        assert_eq!(counted.count, 25);
        assert_eq!(counted.rows.len(), 3);
    }
}
