//! Response description produced by resource operations
//!
//! A [`Reply`] is plain data: status, headers, body and the affected object.
//! The axum binding turns it into a response via `IntoResponse`, publishing
//! the affected object as an [`AffectedObject`] extension so later layers
//! (audit, cache invalidation) can read what the operation touched.

use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

/// Row created, updated or removed by an operation
#[derive(Debug, Clone, PartialEq)]
pub struct AffectedObject(pub Value);

/// Reply body
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyBody {
    /// JSON document
    Json(Value),
    /// No content
    Empty,
}

/// Successful operation result
#[derive(Debug, Clone)]
pub struct Reply {
    /// Response status
    pub status: StatusCode,
    /// Extra response headers
    pub headers: HeaderMap,
    /// Response body
    pub body: ReplyBody,
    /// What the operation touched
    pub affected: Option<Value>,
}

impl Reply {
    /// JSON reply
    #[must_use]
    pub fn json(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: ReplyBody::Json(body),
            affected: None,
        }
    }

    /// `204 No Content`
    #[must_use]
    pub fn no_content() -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            headers: HeaderMap::new(),
            body: ReplyBody::Empty,
            affected: None,
        }
    }

    /// Record the affected object
    #[must_use]
    pub fn with_affected(mut self, affected: Value) -> Self {
        self.affected = Some(affected);
        self
    }

    /// Set the `Content-Range` header
    #[must_use]
    pub fn with_content_range(mut self, value: HeaderValue) -> Self {
        self.headers.insert(header::CONTENT_RANGE, value);
        self
    }

    /// `Content-Range` header, if set
    #[must_use]
    pub fn content_range(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_RANGE)
            .and_then(|value| value.to_str().ok())
    }

    /// JSON body, if any
    #[must_use]
    pub fn json_body(&self) -> Option<&Value> {
        match &self.body {
            ReplyBody::Json(value) => Some(value),
            ReplyBody::Empty => None,
        }
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        let mut response = match self.body {
            ReplyBody::Json(value) => (self.status, Json(value)).into_response(),
            ReplyBody::Empty => self.status.into_response(),
        };
        response.headers_mut().extend(self.headers);
        if let Some(affected) = self.affected {
            response.extensions_mut().insert(AffectedObject(affected));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_reply_into_response() {
        let reply = Reply::json(StatusCode::PARTIAL_CONTENT, json!([1, 2]))
            .with_content_range(HeaderValue::from_static("0-2/5"))
            .with_affected(json!({"id": 1}));
        assert_eq!(reply.content_range(), Some("0-2/5"));

        let response = reply.into_response();
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(response.headers()[header::CONTENT_RANGE], "0-2/5");
        assert_eq!(
            response.extensions().get::<AffectedObject>(),
            Some(&AffectedObject(json!({"id": 1})))
        );
    }

    #[test]
    fn test_no_content() {
        let reply = Reply::no_content();
        assert!(reply.json_body().is_none());
        let response = reply.into_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.extensions().get::<AffectedObject>().is_none());
    }
}
