//! Example: A widgets collection backed by the in-memory store
//!
//! Exposes `/widgets` with create, get, query, update and remove. Rows leave
//! the service with a computed `label` attached by a response transform.
//!
//! Run with: cargo run --example widgets-api
//!
//! Then try:
//!
//! ```text
//! curl -X POST localhost:8080/widgets -H 'content-type: application/json' \
//!      -d '{"name": "sprocket", "color": "red", "weight": 3}'
//! curl -i 'localhost:8080/widgets?color=red&limit=2&page=1'
//! curl -i 'localhost:8080/widgets?sort=-weight,name'
//! ```

use std::sync::Arc;

use acton_resource::prelude::*;
use serde_json::{json, Value};

fn widget_schema() -> Schema {
    Schema::builder()
        .primary_key("id", FieldKind::String)
        .required("name", FieldKind::String)
        .field("color", FieldKind::String)
        .field("weight", FieldKind::Number)
        .field("in_stock", FieldKind::Boolean)
        .field("made_at", FieldKind::Date)
        .build()
}

fn seed_rows() -> Vec<Attributes> {
    [
        json!({"id": "w-1", "name": "sprocket", "color": "red", "weight": 3, "in_stock": true}),
        json!({"id": "w-2", "name": "gear", "color": "blue", "weight": 7, "in_stock": false}),
        json!({"id": "w-3", "name": "flange", "color": "red", "weight": 2, "in_stock": true}),
    ]
    .into_iter()
    .filter_map(|row| match row {
        Value::Object(map) => Some(map),
        _ => None,
    })
    .collect()
}

/// Attach a display label built from name and color
fn label(row: Value) -> Value {
    let Value::Object(mut map) = row else {
        return row;
    };

    let name = map.get("name").and_then(Value::as_str).unwrap_or("widget");
    let label = match map.get("color").and_then(Value::as_str) {
        Some(color) => format!("{color} {name}"),
        None => name.to_string(),
    };
    map.insert("label".to_string(), Value::String(label));

    Value::Object(map)
}

#[tokio::main]
async fn main() -> acton_resource::error::Result<()> {
    let config = Config::load_for_service("widgets-api").unwrap_or_else(|e| {
        eprintln!("Falling back to default configuration: {e}");
        Config::default()
    });
    init_tracing(&config)?;

    let store = Arc::new(MemoryStore::with_rows(widget_schema(), seed_rows()));
    let widgets = ResourceHandler::with_config("widgets", store, &config.resource)
        .with_transform(Transform::sync(label));

    info!(
        "Serving widgets (default limit {}, page window {})",
        config.resource.default_limit, config.resource.page_window
    );

    let app = Router::new().nest("/widgets", widgets.into_router());

    Server::new(config).serve(app).await?;

    shutdown_tracing();
    Ok(())
}
