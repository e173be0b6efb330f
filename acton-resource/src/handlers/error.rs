//! API error types for resource operations
//!
//! [`ApiError`] is what a handler operation returns when it cannot produce a
//! normal reply. Rendering is terminal: the response is written and nothing
//! downstream runs for that request.
//!
//! Two body shapes exist:
//!
//! - not found: `{"errors": "<key> not found", "<key>": "<id>"}` with 404
//! - everything else: `{"error": "<detail>"}` with the carried status, or the
//!   kind's default status
//!
//! A store failure with no carried status defaults to 400 only when the store
//! classified it as a validation or constraint failure. Unclassified database
//! failures default to 500 instead, and their message is replaced so driver
//! internals never reach the client.
//!
//! # Example
//!
//! ```rust
//! use acton_resource::handlers::{ApiError, ApiErrorKind};
//!
//! let error = ApiError::not_found("id", "w_123");
//! assert!(matches!(error.kind, ApiErrorKind::NotFound));
//! assert_eq!(error.entity_id, Some("w_123".to_string()));
//! ```

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};

use crate::store::{StoreError, StoreErrorKind, StoreOperation};

/// Operation being performed when the API error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiOperation {
    /// Creating a row
    Create,
    /// Reading one row
    Get,
    /// Listing rows
    Query,
    /// Updating a row
    Update,
    /// Removing a row
    Remove,
}

impl fmt::Display for ApiOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Get => write!(f, "get"),
            Self::Query => write!(f, "query"),
            Self::Update => write!(f, "update"),
            Self::Remove => write!(f, "remove"),
        }
    }
}

/// Category of API error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// Target row absent
    NotFound,
    /// Store rejected the attributes
    ValidationFailed,
    /// Invalid request parameters
    BadRequest,
    /// Internal server error
    InternalError,
    /// Store temporarily unavailable
    ServiceUnavailable,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::ValidationFailed => write!(f, "validation_failed"),
            Self::BadRequest => write!(f, "bad_request"),
            Self::InternalError => write!(f, "internal_error"),
            Self::ServiceUnavailable => write!(f, "service_unavailable"),
        }
    }
}

impl ApiErrorKind {
    /// Default HTTP status for this kind
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::ValidationFailed | Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Structured API error with operation context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// The operation being performed when the error occurred
    pub operation: ApiOperation,
    /// The category of error
    pub kind: ApiErrorKind,
    /// Client-facing message
    pub message: String,
    /// Route parameter naming the target row
    pub entity_key: Option<String>,
    /// Identifier of the target row
    pub entity_id: Option<String>,
    /// Status overriding the kind default
    pub status: Option<StatusCode>,
}

impl ApiError {
    /// Create a new API error
    pub fn new(operation: ApiOperation, kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            entity_key: None,
            entity_id: None,
            status: None,
        }
    }

    /// Create a "not found" error for the row named by `key = id`
    pub fn not_found(key: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(ApiOperation::Get, ApiErrorKind::NotFound, "Row not found")
            .with_entity(key, id)
    }

    /// Create a bad request error
    ///
    /// # Example
    ///
    /// ```rust
    /// use acton_resource::handlers::ApiError;
    /// use axum::http::StatusCode;
    ///
    /// let error = ApiError::bad_request("page-based pagination requires a positive limit");
    /// assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
    /// ```
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ApiOperation::Query, ApiErrorKind::BadRequest, message)
    }

    /// Create a validation failed error
    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::new(ApiOperation::Create, ApiErrorKind::ValidationFailed, message)
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ApiOperation::Get, ApiErrorKind::InternalError, message)
    }

    /// Attach the target row identity
    #[must_use]
    pub fn with_entity(mut self, key: impl Into<String>, id: impl Into<String>) -> Self {
        self.entity_key = Some(key.into());
        self.entity_id = Some(id.into());
        self
    }

    /// Set the operation that caused the error
    #[must_use]
    pub fn with_operation(mut self, operation: ApiOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Override the HTTP status
    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    /// Status this error renders with
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        self.status.unwrap_or_else(|| self.kind.status_code())
    }

    /// Check if this error is transient
    pub fn is_retriable(&self) -> bool {
        matches!(self.kind, ApiErrorKind::ServiceUnavailable)
    }

    fn body(&self) -> Value {
        match self.kind {
            ApiErrorKind::NotFound => {
                let key = self.entity_key.as_deref().unwrap_or("id");
                let mut body = Map::new();
                body.insert("errors".to_string(), json!(format!("{key} not found")));
                body.insert(key.to_string(), json!(self.entity_id));
                Value::Object(body)
            }
            _ => json!({ "error": self.message }),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "API {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        if let (Some(key), Some(id)) = (&self.entity_key, &self.entity_id) {
            write!(f, " [{}: {}]", key, id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(
                operation = %self.operation,
                kind = %self.kind,
                entity_id = ?self.entity_id,
                status = status.as_u16(),
                retriable = self.is_retriable(),
                "API error: {}", self.message
            );
        } else {
            tracing::warn!(
                operation = %self.operation,
                kind = %self.kind,
                entity_id = ?self.entity_id,
                status = status.as_u16(),
                "API error: {}", self.message
            );
        }

        (status, Json(self.body())).into_response()
    }
}

fn store_operation_to_api_operation(op: StoreOperation) -> ApiOperation {
    match op {
        StoreOperation::Create => ApiOperation::Create,
        StoreOperation::FindOne => ApiOperation::Get,
        StoreOperation::FindAndCountAll => ApiOperation::Query,
        StoreOperation::Update => ApiOperation::Update,
        StoreOperation::Destroy => ApiOperation::Remove,
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let operation = store_operation_to_api_operation(err.operation);

        let kind = match err.kind {
            StoreErrorKind::NotFound => ApiErrorKind::NotFound,
            StoreErrorKind::ValidationFailed | StoreErrorKind::ConstraintViolation => {
                ApiErrorKind::ValidationFailed
            }
            StoreErrorKind::ConnectionFailed | StoreErrorKind::Timeout => {
                ApiErrorKind::ServiceUnavailable
            }
            StoreErrorKind::DatabaseError | StoreErrorKind::Other => ApiErrorKind::InternalError,
        };

        // internal details stay in the logs
        let message = match kind {
            ApiErrorKind::ServiceUnavailable => {
                tracing::warn!(error = %err, "Store unavailable");
                "Service temporarily unavailable".to_string()
            }
            ApiErrorKind::InternalError => {
                tracing::error!(error = %err, "Store failure");
                "An internal error occurred".to_string()
            }
            _ => err.detail().to_string(),
        };

        Self {
            operation,
            kind,
            message,
            entity_key: None,
            entity_id: None,
            status: err.status.and_then(|code| StatusCode::from_u16(code).ok()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FieldViolation;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_api_error_kind_status_codes() {
        assert_eq!(ApiErrorKind::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiErrorKind::ValidationFailed.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiErrorKind::BadRequest.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiErrorKind::InternalError.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiErrorKind::ServiceUnavailable.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn test_not_found_body() {
        let response = ApiError::not_found("id", "unknown-id").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            json!({"errors": "id not found", "id": "unknown-id"})
        );
    }

    #[tokio::test]
    async fn test_not_found_body_uses_key() {
        let response = ApiError::not_found("uuid", "abc").into_response();
        assert_eq!(
            body_json(response).await,
            json!({"errors": "uuid not found", "uuid": "abc"})
        );
    }

    #[tokio::test]
    async fn test_validation_error_surfaces_driver_detail() {
        let store_error = StoreError::validation_failed("Validation error")
            .with_violation(FieldViolation::new("name", "name cannot be null"))
            .with_driver("null value in column \"name\" violates not-null constraint");
        let response = ApiError::from(store_error).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({"error": "null value in column \"name\" violates not-null constraint"})
        );
    }

    #[tokio::test]
    async fn test_carried_status_wins() {
        let store_error = StoreError::validation_failed("locked").with_status(423);
        let response = ApiError::from(store_error).into_response();
        assert_eq!(response.status(), StatusCode::LOCKED);
        assert_eq!(body_json(response).await, json!({"error": "locked"}));
    }

    #[test]
    fn test_internal_details_hidden() {
        let error = ApiError::from(StoreError::database_error(
            StoreOperation::FindAndCountAll,
            "relation \"widgets\" does not exist",
        ));
        assert_eq!(error.kind, ApiErrorKind::InternalError);
        assert_eq!(error.operation, ApiOperation::Query);
        assert_eq!(error.message, "An internal error occurred");
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_connection_failure_is_retriable() {
        let error = ApiError::from(StoreError::connection_failed("refused"));
        assert_eq!(error.kind, ApiErrorKind::ServiceUnavailable);
        assert_eq!(error.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(error.is_retriable());
    }

    #[test]
    fn test_display() {
        let error = ApiError::not_found("id", "w1").with_operation(ApiOperation::Remove);
        assert_eq!(
            error.to_string(),
            "API not_found error during remove: Row not found [id: w1]"
        );
    }
}
