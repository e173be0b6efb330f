//! axum binding for resource handlers
//!
//! Produces the HTTP surface of one resource:
//!
//! | Route | Operation |
//! |---|---|
//! | `POST /` | [`ResourceHandler::create`] |
//! | `GET /` | [`ResourceHandler::query`] |
//! | `GET /{id}` | [`ResourceHandler::get`] |
//! | `PATCH /{id}`, `PUT /{id}` | [`ResourceHandler::update`] |
//! | `DELETE /{id}` | [`ResourceHandler::remove`] |
//!
//! The identifier segment is named after the handler's `id_param`. Nest the
//! router under the collection path:
//!
//! ```rust,ignore
//! let app = Router::new().nest("/widgets", handler.into_router());
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::Extensions,
    routing::get,
    Json, Router,
};

use crate::handlers::{
    ApiError, ApiOperation, BaseOptions, Reply, ResourceHandler, ResourceRequest,
};
use crate::query::RequestParams;
use crate::store::{Attributes, ResourceStore};

type SharedHandler<S> = State<Arc<ResourceHandler<S>>>;

impl<S: ResourceStore> ResourceHandler<S> {
    /// Router exposing every operation of this handler
    pub fn into_router(self) -> Router {
        router(Arc::new(self))
    }
}

/// Router for a shared handler
pub fn router<S: ResourceStore>(handler: Arc<ResourceHandler<S>>) -> Router {
    let item = format!("/{{{}}}", handler.id_param());

    Router::new()
        .route("/", get(query_rows::<S>).post(create_row::<S>))
        .route(
            &item,
            get(get_row::<S>)
                .patch(update_row::<S>)
                .put(update_row::<S>)
                .delete(remove_row::<S>),
        )
        .with_state(handler)
}

fn base_options(extensions: &Extensions) -> Option<crate::query::QueryOptions> {
    extensions.get::<BaseOptions>().map(|base| base.0.clone())
}

fn request(
    route: HashMap<String, String>,
    query: Vec<(String, String)>,
    extensions: &Extensions,
) -> ResourceRequest {
    ResourceRequest {
        route: RequestParams::from_pairs(route),
        query: RequestParams::from_pairs(query),
        body: None,
        base: base_options(extensions),
    }
}

/// Body of a create or update
///
/// Anything other than a JSON object is a bad request rendered in the usual
/// error envelope.
fn attributes(
    body: Result<Json<Attributes>, JsonRejection>,
    operation: ApiOperation,
) -> Result<Attributes, ApiError> {
    body.map(|Json(attributes)| attributes).map_err(|rejection| {
        ApiError::bad_request(rejection.body_text()).with_operation(operation)
    })
}

async fn create_row<S: ResourceStore>(
    State(handler): SharedHandler<S>,
    Query(query): Query<Vec<(String, String)>>,
    extensions: Extensions,
    body: Result<Json<Attributes>, JsonRejection>,
) -> Result<Reply, ApiError> {
    let body = attributes(body, ApiOperation::Create)?;
    let request = request(HashMap::new(), query, &extensions).with_body(body);
    handler.create(request).await
}

async fn query_rows<S: ResourceStore>(
    State(handler): SharedHandler<S>,
    Query(query): Query<Vec<(String, String)>>,
    extensions: Extensions,
) -> Result<Reply, ApiError> {
    handler
        .query(request(HashMap::new(), query, &extensions))
        .await
}

async fn get_row<S: ResourceStore>(
    State(handler): SharedHandler<S>,
    Path(route): Path<HashMap<String, String>>,
    Query(query): Query<Vec<(String, String)>>,
    extensions: Extensions,
) -> Result<Reply, ApiError> {
    handler.get(request(route, query, &extensions)).await
}

async fn update_row<S: ResourceStore>(
    State(handler): SharedHandler<S>,
    Path(route): Path<HashMap<String, String>>,
    Query(query): Query<Vec<(String, String)>>,
    extensions: Extensions,
    body: Result<Json<Attributes>, JsonRejection>,
) -> Result<Reply, ApiError> {
    let body = attributes(body, ApiOperation::Update)?;
    let request = request(route, query, &extensions).with_body(body);
    handler.update(request).await
}

async fn remove_row<S: ResourceStore>(
    State(handler): SharedHandler<S>,
    Path(route): Path<HashMap<String, String>>,
    Query(query): Query<Vec<(String, String)>>,
    extensions: Extensions,
) -> Result<Reply, ApiError> {
    handler.remove(request(route, query, &extensions)).await
}

#[cfg(all(test, feature = "memory-store"))]
mod tests {
    use super::*;
    use crate::handlers::AffectedObject;
    use crate::query::QueryOptions;
    use crate::schema::{FieldKind, Schema};
    use crate::store::MemoryStore;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use axum::Extension;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        let schema = Schema::builder()
            .primary_key("id", FieldKind::String)
            .required("name", FieldKind::String)
            .field("color", FieldKind::String)
            .build();
        let handler = ResourceHandler::new("widgets", Arc::new(MemoryStore::new(schema)));
        Router::new().nest("/widgets", handler.into_router())
    }

    fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: Method, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn seed(app: &Router, rows: &[(&str, &str)]) {
        for (id, color) in rows {
            let response = app
                .clone()
                .oneshot(json_request(
                    Method::POST,
                    "/widgets",
                    json!({"id": id, "name": format!("widget {id}"), "color": color}),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
        }
    }

    #[tokio::test]
    async fn test_post_creates_row() {
        let response = app()
            .oneshot(json_request(Method::POST, "/widgets", json!({"name": "a"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let affected = response.extensions().get::<AffectedObject>().cloned();
        let body = body_json(response).await;
        assert_eq!(body["name"], json!("a"));
        assert!(body["id"].is_string());
        assert_eq!(affected.map(|a| a.0["name"].clone()), Some(json!("a")));
    }

    #[tokio::test]
    async fn test_post_invalid_row_is_bad_request() {
        let response = app()
            .oneshot(json_request(Method::POST, "/widgets", json!({"color": "red"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await, json!({"error": "name cannot be null"}));
    }

    #[tokio::test]
    async fn test_post_non_object_body_is_bad_request() {
        let response = app()
            .oneshot(json_request(Method::POST, "/widgets", json!([1, 2])))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_post_malformed_json_is_bad_request() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/widgets")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_patch_without_body_is_bad_request() {
        let app = app();
        seed(&app, &[("w1", "red")]).await;

        let response = app
            .oneshot(empty_request(Method::PATCH, "/widgets/w1"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        assert!(body_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_get_unknown_id_is_not_found() {
        let response = app()
            .oneshot(empty_request(Method::GET, "/widgets/unknown-id"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            json!({"errors": "id not found", "id": "unknown-id"})
        );
    }

    #[tokio::test]
    async fn test_get_existing_row() {
        let app = app();
        seed(&app, &[("w1", "red")]).await;

        let response = app
            .oneshot(empty_request(Method::GET, "/widgets/w1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["color"], json!("red"));
    }

    #[tokio::test]
    async fn test_paged_query_is_partial() {
        let app = app();
        seed(
            &app,
            &[
                ("w1", "red"),
                ("w2", "red"),
                ("w3", "blue"),
                ("w4", "red"),
                ("w5", "red"),
                ("w6", "red"),
            ],
        )
        .await;

        let response = app
            .oneshot(empty_request(
                Method::GET,
                "/widgets?color=red&limit=2&page=1",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(response.headers()[header::CONTENT_RANGE], "0-2/5");
        let body = body_json(response).await;
        assert_eq!(body["pageTotal"], json!(3));
        assert_eq!(body["itemTotal"], json!(5));
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_range_query_returns_bare_rows() {
        let app = app();
        seed(&app, &[("w1", "red"), ("w2", "blue"), ("w3", "red")]).await;

        let response = app
            .oneshot(empty_request(Method::GET, "/widgets?offset=1&limit=5"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_RANGE], "1-3/3");
        assert_eq!(body_json(response).await.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_page_without_limit_is_bad_request() {
        let response = app()
            .oneshot(empty_request(Method::GET, "/widgets?page=1&limit=0"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_patch_and_put_update() {
        let app = app();
        seed(&app, &[("w1", "red")]).await;

        let response = app
            .clone()
            .oneshot(json_request(
                Method::PATCH,
                "/widgets/w1",
                json!({"color": "green"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["color"], json!("green"));

        let response = app
            .oneshot(json_request(
                Method::PUT,
                "/widgets/missing",
                json!({"color": "green"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_twice() {
        let app = app();
        seed(&app, &[("w1", "red")]).await;

        let response = app
            .clone()
            .oneshot(empty_request(Method::DELETE, "/widgets/w1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response.extensions().get::<AffectedObject>(),
            Some(&AffectedObject(json!({"id": "w1"})))
        );

        let response = app
            .oneshot(empty_request(Method::DELETE, "/widgets/w1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            json!({"errors": "id not found", "id": "w1"})
        );
    }

    #[tokio::test]
    async fn test_base_options_from_extension() {
        let app = app();
        seed(&app, &[("w1", "red"), ("w2", "blue"), ("w3", "red")]).await;

        let scoped = app.layer(Extension(BaseOptions(
            QueryOptions::new().with_filter("color", "blue"),
        )));
        let response = scoped
            .oneshot(empty_request(Method::GET, "/widgets?color=red"))
            .await
            .unwrap();

        assert_eq!(response.headers()[header::CONTENT_RANGE], "0-1/1");
        let body = body_json(response).await;
        assert_eq!(body[0]["id"], json!("w2"));
    }

    #[tokio::test]
    async fn test_custom_id_param() {
        let schema = Schema::builder()
            .primary_key("uuid", FieldKind::String)
            .field("name", FieldKind::String)
            .build();
        let handler = ResourceHandler::new("widgets", Arc::new(MemoryStore::new(schema)))
            .with_id_param("uuid");
        let app = Router::new().nest("/widgets", handler.into_router());

        let response = app
            .oneshot(empty_request(Method::GET, "/widgets/abc"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            json!({"errors": "uuid not found", "uuid": "abc"})
        );
    }
}
