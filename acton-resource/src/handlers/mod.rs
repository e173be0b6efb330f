//! Resource handler factory
//!
//! [`ResourceHandler`] holds everything an endpoint needs, fixed at
//! construction: the store, composer defaults, the transform hook and the
//! identifier parameter. Each operation takes a [`ResourceRequest`] and
//! returns either a [`Reply`] or an [`ApiError`]; both are terminal.
//!
//! Per request the stages run strictly in order: parse, compose, one store
//! call, shape.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use acton_resource::handlers::{ResourceHandler, ResourceRequest};
//! use acton_resource::query::RequestParams;
//! use acton_resource::schema::{FieldKind, Schema};
//! use acton_resource::store::MemoryStore;
//! use axum::http::StatusCode;
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let schema = Schema::builder()
//!     .primary_key("id", FieldKind::String)
//!     .required("name", FieldKind::String)
//!     .build();
//! let handler = ResourceHandler::new("widgets", Arc::new(MemoryStore::new(schema)));
//!
//! let body = json!({"name": "a"}).as_object().cloned().unwrap();
//! let created = handler.create(ResourceRequest::new().with_body(body)).await.unwrap();
//! assert_eq!(created.status, StatusCode::CREATED);
//!
//! let listed = handler
//!     .query(ResourceRequest::new().with_query(RequestParams::from_pairs([("name", "a")])))
//!     .await
//!     .unwrap();
//! assert_eq!(listed.content_range(), Some("0-1/1"));
//! # }
//! ```

mod error;
mod reply;
mod request;

use std::sync::Arc;

use axum::http::StatusCode;
use serde::Serialize;
use serde_json::Value;

pub use error::{ApiError, ApiErrorKind, ApiOperation};
pub use reply::{AffectedObject, Reply, ReplyBody};
pub use request::{BaseOptions, ResourceRequest};

use crate::config::ResourceConfig;
use crate::pagination::shape_with_window;
use crate::query::{compose, ParamParser, QueryOptions, QuerySpec};
use crate::store::{ResourceStore, StoreError, StoreErrorKind};
use crate::transform::Transform;

/// REST operations over one store
pub struct ResourceHandler<S: ResourceStore> {
    name: String,
    store: Arc<S>,
    defaults: QueryOptions,
    transform: Transform,
    id_param: String,
    page_window: u64,
    max_limit: Option<u64>,
}

impl<S: ResourceStore> ResourceHandler<S> {
    /// Handler with the stock defaults (`limit` 50, `offset` 0)
    pub fn new(name: impl Into<String>, store: Arc<S>) -> Self {
        Self::with_config(name, store, &ResourceConfig::default())
    }

    /// Handler configured from a [`ResourceConfig`]
    pub fn with_config(name: impl Into<String>, store: Arc<S>, config: &ResourceConfig) -> Self {
        Self {
            name: name.into(),
            store,
            defaults: config.default_options(),
            transform: Transform::identity(),
            id_param: config.id_param.clone(),
            page_window: config.page_window,
            max_limit: config.max_limit,
        }
    }

    /// Replace the composer defaults
    #[must_use]
    pub fn with_defaults(mut self, defaults: QueryOptions) -> Self {
        self.defaults = defaults;
        self
    }

    /// Install a result transform
    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Change the route parameter naming a single row
    #[must_use]
    pub fn with_id_param(mut self, id_param: impl Into<String>) -> Self {
        self.id_param = id_param.into();
        self
    }

    /// Resource name used in logs
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Route parameter naming a single row
    pub fn id_param(&self) -> &str {
        &self.id_param
    }

    /// Underlying store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Composer defaults
    pub fn defaults(&self) -> &QueryOptions {
        &self.defaults
    }

    /// Insert a row from the request body
    ///
    /// `201 Created` with the transformed row.
    pub async fn create(&self, request: ResourceRequest) -> Result<Reply, ApiError> {
        let body = request.body.unwrap_or_default();
        let row = self
            .store
            .create(body)
            .await
            .map_err(|e| ApiError::from(e).with_operation(ApiOperation::Create))?;

        let row = to_json(&row, ApiOperation::Create)?;
        tracing::info!(resource = %self.name, "Created row");

        Ok(Reply::json(StatusCode::CREATED, self.transform.apply(row.clone()).await)
            .with_affected(row))
    }

    /// Fetch the row named by the route parameters
    pub async fn get(&self, request: ResourceRequest) -> Result<Reply, ApiError> {
        let row = self.load(&request, ApiOperation::Get).await?;
        let row = to_json(&row, ApiOperation::Get)?;
        Ok(Reply::json(StatusCode::OK, self.transform.apply(row).await))
    }

    /// List rows matching the query string
    ///
    /// `206 Partial Content` while rows remain past the served window, `200`
    /// otherwise. Always sets `Content-Range`.
    pub async fn query(&self, request: ResourceRequest) -> Result<Reply, ApiError> {
        let schema = self.store.schema();
        let spec = ParamParser::new(schema)
            .reserve(request.route.names())
            .reserve([self.id_param.as_str()])
            .parse(&request.query);
        let options = compose(
            &spec,
            request.base.as_ref(),
            &self.defaults,
            self.max_limit,
        );

        if options.is_paged() && !options.limit.is_some_and(|limit| limit > 0) {
            return Err(ApiError::bad_request(
                "page-based pagination requires a positive limit",
            ));
        }

        let counted = self
            .store
            .find_and_count_all(&options)
            .await
            .map_err(|e| ApiError::from(e).with_operation(ApiOperation::Query))?;

        let rows = counted
            .rows
            .iter()
            .map(|row| to_json(row, ApiOperation::Query))
            .collect::<Result<Vec<_>, _>>()?;
        let rows = self.transform.apply_all(rows).await;

        let shaped = shape_with_window(counted.count, &options, rows, self.page_window)
            .map_err(|e| ApiError::bad_request(e.to_string()))?;

        tracing::info!(
            resource = %self.name,
            total = counted.count,
            range = %shaped.range,
            paged = options.is_paged(),
            "Served resource query"
        );

        let body = serde_json::to_value(&shaped.envelope)
            .map_err(|e| ApiError::internal(e.to_string()).with_operation(ApiOperation::Query))?;

        Ok(Reply::json(shaped.status.status_code(), body)
            .with_content_range(shaped.range.header_value()))
    }

    /// Apply the request body to the row named by the route parameters
    pub async fn update(&self, request: ResourceRequest) -> Result<Reply, ApiError> {
        let row = self.load(&request, ApiOperation::Update).await?;
        let body = request.body.clone().unwrap_or_default();

        let row = self
            .store
            .update(row, body)
            .await
            .map_err(|e| self.store_failure(e, &request, ApiOperation::Update))?;

        let row = to_json(&row, ApiOperation::Update)?;
        tracing::info!(resource = %self.name, "Updated row");

        Ok(Reply::json(StatusCode::OK, self.transform.apply(row.clone()).await).with_affected(row))
    }

    /// Delete the row named by the route parameters
    ///
    /// `204 No Content`; the affected object is the route parameters.
    pub async fn remove(&self, request: ResourceRequest) -> Result<Reply, ApiError> {
        let row = self.load(&request, ApiOperation::Remove).await?;

        self.store
            .destroy(row)
            .await
            .map_err(|e| self.store_failure(e, &request, ApiOperation::Remove))?;

        tracing::info!(resource = %self.name, "Removed row");

        let route = serde_json::to_value(&request.route)
            .map_err(|e| ApiError::internal(e.to_string()).with_operation(ApiOperation::Remove))?;
        Ok(Reply::no_content().with_affected(route))
    }

    /// Load the target row of an item operation
    ///
    /// Route parameters naming schema fields become equality filters. An
    /// identifier that does not coerce to its field's kind cannot match any
    /// row, so it is reported as not found without a store call.
    async fn load(
        &self,
        request: &ResourceRequest,
        operation: ApiOperation,
    ) -> Result<S::Row, ApiError> {
        let spec = self.item_spec(request);
        let id = request.route.first(&self.id_param).unwrap_or_default();

        if !spec.filters.contains_key(&self.id_param) {
            tracing::debug!(resource = %self.name, id, "Identifier does not name a row");
            return Err(self.not_found(id, operation));
        }

        let options = compose(&spec, request.base.as_ref(), &QueryOptions::new(), None);
        self.store
            .find_one(&options)
            .await
            .map_err(|e| ApiError::from(e).with_operation(operation))?
            .ok_or_else(|| self.not_found(id, operation))
    }

    fn item_spec(&self, request: &ResourceRequest) -> QuerySpec {
        let spec = ParamParser::new(self.store.schema()).parse(&request.route);
        QuerySpec {
            filters: spec.filters,
            ..QuerySpec::default()
        }
    }

    fn not_found(&self, id: &str, operation: ApiOperation) -> ApiError {
        ApiError::not_found(self.id_param.as_str(), id).with_operation(operation)
    }

    /// The row can vanish between load and write
    fn store_failure(
        &self,
        err: StoreError,
        request: &ResourceRequest,
        operation: ApiOperation,
    ) -> ApiError {
        if err.kind == StoreErrorKind::NotFound {
            let id = request.route.first(&self.id_param).unwrap_or_default();
            return self.not_found(id, operation);
        }
        ApiError::from(err).with_operation(operation)
    }
}

impl<S: ResourceStore> std::fmt::Debug for ResourceHandler<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceHandler")
            .field("name", &self.name)
            .field("defaults", &self.defaults)
            .field("transform", &self.transform)
            .field("id_param", &self.id_param)
            .field("page_window", &self.page_window)
            .field("max_limit", &self.max_limit)
            .finish()
    }
}

fn to_json<R: Serialize>(row: &R, operation: ApiOperation) -> Result<Value, ApiError> {
    serde_json::to_value(row).map_err(|e| {
        ApiError::internal(format!("failed to serialize row: {e}")).with_operation(operation)
    })
}
