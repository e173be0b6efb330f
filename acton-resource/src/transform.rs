//! Result transform hook
//!
//! A [`Transform`] rewrites each serialized row just before it is sent. It is
//! chosen once when the handler is built: identity by default, or a supplied
//! synchronous or asynchronous function.
//!
//! # Example
//!
//! ```rust
//! use acton_resource::transform::Transform;
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let redact = Transform::sync(|mut row| {
//!     if let Some(obj) = row.as_object_mut() {
//!         obj.remove("secret");
//!     }
//!     row
//! });
//!
//! let out = redact.apply(json!({"name": "a", "secret": "x"})).await;
//! assert_eq!(out, json!({"name": "a"}));
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};
use serde_json::Value;

type TransformFn = dyn Fn(Value) -> BoxFuture<'static, Value> + Send + Sync;

/// Per-row output transform
#[derive(Clone, Default)]
pub struct Transform {
    inner: Option<Arc<TransformFn>>,
}

impl Transform {
    /// Pass rows through unchanged
    #[must_use]
    pub fn identity() -> Self {
        Self::default()
    }

    /// Synchronous transform
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        Self {
            inner: Some(Arc::new(move |row| future::ready(f(row)).boxed())),
        }
    }

    /// Asynchronous transform
    pub fn future<F, Fut>(f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Value> + Send + 'static,
    {
        Self {
            inner: Some(Arc::new(move |row| f(row).boxed())),
        }
    }

    /// Check whether this is the identity transform
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.inner.is_none()
    }

    /// Transform one row
    pub async fn apply(&self, row: Value) -> Value {
        match &self.inner {
            Some(f) => f(row).await,
            None => row,
        }
    }

    /// Transform each row in order
    pub async fn apply_all(&self, rows: Vec<Value>) -> Vec<Value> {
        match &self.inner {
            Some(f) => future::join_all(rows.into_iter().map(|row| f(row))).await,
            None => rows,
        }
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transform")
            .field("identity", &self.is_identity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_identity() {
        let transform = Transform::identity();
        assert!(transform.is_identity());
        assert_eq!(transform.apply(json!({"a": 1})).await, json!({"a": 1}));
    }

    #[tokio::test]
    async fn test_async_transform_keeps_order() {
        let transform = Transform::future(|row: Value| async move {
            json!({ "wrapped": row })
        });
        assert!(!transform.is_identity());

        let out = transform.apply_all(vec![json!(1), json!(2), json!(3)]).await;
        assert_eq!(
            out,
            vec![
                json!({"wrapped": 1}),
                json!({"wrapped": 2}),
                json!({"wrapped": 3})
            ]
        );
    }

    #[test]
    fn test_debug() {
        assert_eq!(
            format!("{:?}", Transform::sync(|v| v)),
            "Transform { identity: false }"
        );
    }
}
