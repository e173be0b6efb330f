//! # acton-resource
//!
//! Schema-driven REST resource endpoints (create, get, query, update, remove)
//! over a single data model.
//!
//! ## Features
//!
//! - **Request-to-query translation**: query-string parameters become typed
//!   equality filters, a pagination window and a sort order, checked against
//!   the model schema
//! - **Deterministic composition**: parsed queries merge with caller base
//!   options and handler defaults under fixed precedence rules
//! - **Range-aware pagination**: `206 Partial Content` plus `Content-Range`,
//!   or a page envelope when `page` is requested
//! - **Pluggable stores**: any [`store::ResourceStore`]; an in-memory store
//!   ships behind the `memory-store` feature
//! - **Service wiring**: figment configuration, JSON tracing, tower-http
//!   middleware and graceful shutdown
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use acton_resource::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let schema = Schema::builder()
//!         .primary_key("id", FieldKind::String)
//!         .required("name", FieldKind::String)
//!         .field("color", FieldKind::String)
//!         .build();
//!
//!     let widgets = ResourceHandler::with_config(
//!         "widgets",
//!         Arc::new(MemoryStore::new(schema)),
//!         &config.resource,
//!     );
//!
//!     let app = Router::new().nest("/widgets", widgets.into_router());
//!
//!     Server::new(config).serve(app).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod observability;
pub mod pagination;
pub mod query;
pub mod router;
pub mod schema;
pub mod server;
pub mod store;
pub mod transform;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{Config, MiddlewareConfig, ResourceConfig, ServiceConfig};
    pub use crate::error::{Error, Result};
    pub use crate::handlers::{
        AffectedObject, ApiError, ApiErrorKind, ApiOperation, BaseOptions, Reply, ReplyBody,
        ResourceHandler, ResourceRequest,
    };
    pub use crate::observability::{init_tracing, shutdown_tracing};
    pub use crate::pagination::{
        shape, ContentRange, Envelope, PageEnvelope, PageLink, ResultWindow, StatusHint,
    };
    pub use crate::query::{
        compose, parse, FilterValue, OrderDirection, ParamParser, ParamValue, QueryOptions,
        QuerySpec, RequestParams, SortKey,
    };
    pub use crate::router::router;
    pub use crate::schema::{FieldDef, FieldKind, Schema};
    pub use crate::server::Server;
    pub use crate::store::{
        Attributes, CountedRows, FieldViolation, ResourceStore, StoreError, StoreErrorKind,
        StoreOperation, StoreResult,
    };
    pub use crate::transform::Transform;

    #[cfg(feature = "memory-store")]
    pub use crate::store::MemoryStore;

    pub use axum::{
        extract::{Path, Query, State},
        http::{HeaderMap, HeaderValue, StatusCode},
        response::{IntoResponse, Json, Response},
        routing::{delete, get, patch, post, put},
        Extension, Router,
    };

    pub use serde::{Deserialize, Serialize};

    // Re-export tracing macros and types
    pub use tracing::{debug, error, info, instrument, trace, warn, Level, Span};

    // Re-export tokio for async runtime
    pub use tokio;

    // Re-export error handling utilities
    pub use thiserror::Error;
}
