//! In-memory store
//!
//! Schema-validating [`ResourceStore`] backed by a `Vec` behind a tokio
//! `RwLock`. Rows are JSON objects. Used by the tests and the demo service.

use std::cmp::Ordering;

use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    Attributes, CountedRows, FieldViolation, ResourceStore, StoreError, StoreOperation,
    StoreResult,
};
use crate::query::{parse_date, OrderDirection, QueryOptions};
use crate::schema::{FieldKind, Schema};

/// Store keeping every row in memory
///
/// # Example
///
/// ```rust
/// use acton_resource::schema::{FieldKind, Schema};
/// use acton_resource::store::{MemoryStore, ResourceStore};
/// use acton_resource::query::QueryOptions;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let schema = Schema::builder()
///     .primary_key("id", FieldKind::String)
///     .required("name", FieldKind::String)
///     .build();
/// let store = MemoryStore::new(schema);
///
/// let mut attrs = serde_json::Map::new();
/// attrs.insert("name".into(), "sprocket".into());
/// let row = store.create(attrs).await.unwrap();
/// assert!(row["id"].is_string());
///
/// let all = store.find_and_count_all(&QueryOptions::new()).await.unwrap();
/// assert_eq!(all.count, 1);
/// # }
/// ```
#[derive(Debug)]
pub struct MemoryStore {
    schema: Schema,
    rows: RwLock<Vec<Attributes>>,
}

impl MemoryStore {
    /// Empty store for `schema`
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            rows: RwLock::new(Vec::new()),
        }
    }

    /// Store pre-loaded with `rows`
    ///
    /// Rows are taken as-is without validation.
    pub fn with_rows(schema: Schema, rows: impl IntoIterator<Item = Attributes>) -> Self {
        Self {
            schema,
            rows: RwLock::new(rows.into_iter().collect()),
        }
    }

    /// Number of stored rows
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    /// Check whether the store is empty
    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    fn validate(
        &self,
        attrs: &Attributes,
        operation: StoreOperation,
        check_required: bool,
    ) -> StoreResult<()> {
        let mut violations = Vec::new();

        for (name, value) in attrs {
            match self.schema.kind_of(name) {
                None => violations.push(FieldViolation::new(
                    name.as_str(),
                    format!("{name} is not an attribute of this model"),
                )),
                Some(kind) if !value.is_null() && !fits(kind, value) => {
                    violations.push(FieldViolation::new(
                        name.as_str(),
                        format!("{name} must be a {kind}"),
                    ));
                }
                Some(_) => {}
            }
        }

        for def in self.schema.definitions().iter().filter(|def| def.required) {
            let missing = match attrs.get(&def.name) {
                Some(value) => value.is_null(),
                None => check_required,
            };
            if missing {
                violations.push(FieldViolation::new(
                    def.name.as_str(),
                    format!("{} cannot be null", def.name),
                ));
            }
        }

        if violations.is_empty() {
            return Ok(());
        }
        Err(violations.into_iter().fold(
            StoreError::validation_failed("Validation error").with_operation(operation),
            StoreError::with_violation,
        ))
    }

    fn assign_key(&self, attrs: &mut Attributes, rows: &[Attributes]) {
        let Some(pk) = self.schema.primary_key() else {
            return;
        };
        if attrs.get(pk).is_some_and(|value| !value.is_null()) {
            return;
        }
        let generated = match self.schema.kind_of(pk) {
            Some(FieldKind::Number) => {
                let next = rows
                    .iter()
                    .filter_map(|row| row.get(pk).and_then(Value::as_i64))
                    .max()
                    .unwrap_or(0)
                    + 1;
                Value::from(next)
            }
            _ => Value::from(Uuid::new_v4().to_string()),
        };
        attrs.insert(pk.to_string(), generated);
    }

    fn position_of(&self, rows: &[Attributes], row: &Attributes) -> Option<usize> {
        match self.schema.primary_key() {
            Some(pk) => {
                let key = row.get(pk)?;
                rows.iter().position(|stored| stored.get(pk) == Some(key))
            }
            None => rows.iter().position(|stored| stored == row),
        }
    }

    fn duplicate_key(
        &self,
        rows: &[Attributes],
        candidate: &Attributes,
        skip: Option<usize>,
        operation: StoreOperation,
    ) -> StoreResult<()> {
        let Some(pk) = self.schema.primary_key() else {
            return Ok(());
        };
        let Some(key) = candidate.get(pk) else {
            return Ok(());
        };
        let clash = rows
            .iter()
            .enumerate()
            .any(|(i, stored)| Some(i) != skip && stored.get(pk) == Some(key));
        if clash {
            return Err(
                StoreError::constraint_violation(operation, "Validation error").with_driver(
                    format!("duplicate key value violates unique constraint on \"{pk}\""),
                ),
            );
        }
        Ok(())
    }

    fn select(&self, rows: &[Attributes], options: &QueryOptions) -> Vec<Attributes> {
        let mut matched: Vec<Attributes> = rows
            .iter()
            .filter(|row| {
                options.filters.iter().all(|(field, expected)| {
                    row.get(field).is_some_and(|stored| expected.matches(stored))
                })
            })
            .cloned()
            .collect();

        if !options.order.is_empty() {
            matched.sort_by(|a, b| {
                options
                    .order
                    .iter()
                    .map(|key| {
                        let kind = self.schema.kind_of(&key.field);
                        let ordering = compare(kind, a.get(&key.field), b.get(&key.field));
                        match key.direction {
                            OrderDirection::Asc => ordering,
                            OrderDirection::Desc => ordering.reverse(),
                        }
                    })
                    .find(|ordering| *ordering != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }

        matched
    }
}

impl ResourceStore for MemoryStore {
    type Row = Attributes;

    fn schema(&self) -> &Schema {
        &self.schema
    }

    async fn create(&self, mut attrs: Attributes) -> StoreResult<Attributes> {
        self.validate(&attrs, StoreOperation::Create, true)?;

        let mut rows = self.rows.write().await;
        self.assign_key(&mut attrs, &rows);
        self.duplicate_key(&rows, &attrs, None, StoreOperation::Create)?;

        rows.push(attrs.clone());
        tracing::debug!(rows = rows.len(), "Row created");
        Ok(attrs)
    }

    async fn find_one(&self, options: &QueryOptions) -> StoreResult<Option<Attributes>> {
        let rows = self.rows.read().await;
        let offset = usize::try_from(options.offset.unwrap_or(0)).unwrap_or(usize::MAX);
        Ok(self.select(&rows, options).into_iter().nth(offset))
    }

    async fn find_and_count_all(
        &self,
        options: &QueryOptions,
    ) -> StoreResult<CountedRows<Attributes>> {
        let rows = self.rows.read().await;
        let matched = self.select(&rows, options);
        let count = matched.len() as u64;

        let offset = usize::try_from(options.offset.unwrap_or(0)).unwrap_or(usize::MAX);
        let limit = options
            .limit
            .map_or(usize::MAX, |limit| usize::try_from(limit).unwrap_or(usize::MAX));
        let window = matched.into_iter().skip(offset).take(limit).collect();

        Ok(CountedRows::new(count, window))
    }

    async fn update(&self, row: Attributes, attrs: Attributes) -> StoreResult<Attributes> {
        self.validate(&attrs, StoreOperation::Update, false)?;

        let mut rows = self.rows.write().await;
        let index = self
            .position_of(&rows, &row)
            .ok_or_else(|| StoreError::not_found(StoreOperation::Update))?;

        let mut updated = rows[index].clone();
        updated.extend(attrs);
        self.duplicate_key(&rows, &updated, Some(index), StoreOperation::Update)?;

        rows[index] = updated.clone();
        Ok(updated)
    }

    async fn destroy(&self, row: Attributes) -> StoreResult<()> {
        let mut rows = self.rows.write().await;
        let index = self
            .position_of(&rows, &row)
            .ok_or_else(|| StoreError::not_found(StoreOperation::Destroy))?;
        rows.remove(index);
        Ok(())
    }
}

fn fits(kind: FieldKind, value: &Value) -> bool {
    match kind {
        FieldKind::String => value.is_string(),
        FieldKind::Number => value.is_number(),
        FieldKind::Boolean => value.is_boolean(),
        FieldKind::Date => value.as_str().and_then(parse_date).is_some(),
    }
}

/// Missing and null sort first
fn compare(kind: Option<FieldKind>, a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    let (a, b) = match (a, b) {
        (None, None) => return Ordering::Equal,
        (None, Some(_)) => return Ordering::Less,
        (Some(_), None) => return Ordering::Greater,
        (Some(a), Some(b)) => (a, b),
    };

    if kind == Some(FieldKind::Date) {
        if let (Some(a), Some(b)) = (a.as_str().and_then(parse_date), b.as_str().and_then(parse_date)) {
            return a.cmp(&b);
        }
    }

    match (a, b) {
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => a
                .as_f64()
                .zip(b.as_f64())
                .and_then(|(a, b)| a.partial_cmp(&b))
                .unwrap_or(Ordering::Equal),
        },
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::SortKey;
    use crate::store::StoreErrorKind;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::builder()
            .primary_key("id", FieldKind::String)
            .required("name", FieldKind::String)
            .field("color", FieldKind::String)
            .field("weight", FieldKind::Number)
            .field("active", FieldKind::Boolean)
            .field("made_at", FieldKind::Date)
            .build()
    }

    fn attrs(value: Value) -> Attributes {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new(schema());
        for (name, color, weight) in [
            ("a", "red", 3),
            ("b", "blue", 1),
            ("c", "red", 2),
            ("d", "red", 5),
        ] {
            store
                .create(attrs(json!({"name": name, "color": color, "weight": weight})))
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_create_generates_uuid_key() {
        let store = MemoryStore::new(schema());
        let row = store.create(attrs(json!({"name": "a"}))).await.unwrap();
        let id = row["id"].as_str().unwrap();
        assert!(Uuid::parse_str(id).is_ok());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_create_numeric_key_increments() {
        let schema = Schema::builder()
            .primary_key("id", FieldKind::Number)
            .field("name", FieldKind::String)
            .build();
        let store = MemoryStore::new(schema);
        let first = store.create(attrs(json!({"name": "a"}))).await.unwrap();
        let second = store.create(attrs(json!({"name": "b"}))).await.unwrap();
        assert_eq!(first["id"], json!(1));
        assert_eq!(second["id"], json!(2));
    }

    #[tokio::test]
    async fn test_create_rejects_missing_required() {
        let store = MemoryStore::new(schema());
        let err = store.create(attrs(json!({"color": "red"}))).await.unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::ValidationFailed);
        assert_eq!(err.detail(), "name cannot be null");
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_create_rejects_wrong_type_and_unknown_attribute() {
        let store = MemoryStore::new(schema());
        let err = store
            .create(attrs(json!({"name": "a", "weight": "heavy", "bogus": 1})))
            .await
            .unwrap_err();
        assert_eq!(err.errors.len(), 2);
        let fields: Vec<_> = err.errors.iter().map(|v| v.field.as_str()).collect();
        assert!(fields.contains(&"weight"));
        assert!(fields.contains(&"bogus"));
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_key() {
        let store = MemoryStore::new(schema());
        store
            .create(attrs(json!({"id": "w1", "name": "a"})))
            .await
            .unwrap();
        let err = store
            .create(attrs(json!({"id": "w1", "name": "b"})))
            .await
            .unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::ConstraintViolation);
        assert!(err.detail().contains("duplicate key"));
    }

    #[tokio::test]
    async fn test_find_and_count_all_filters_and_windows() {
        let store = seeded().await;
        let options = QueryOptions::new()
            .with_filter("color", "red")
            .with_limit(2)
            .with_offset(0);
        let result = store.find_and_count_all(&options).await.unwrap();
        assert_eq!(result.count, 3);
        assert_eq!(result.rows.len(), 2);
    }

    #[tokio::test]
    async fn test_find_and_count_all_sorts() {
        let store = seeded().await;
        let options = QueryOptions::new().with_order(SortKey::desc("weight"));
        let result = store.find_and_count_all(&options).await.unwrap();
        let names: Vec<_> = result.rows.iter().map(|r| r["name"].clone()).collect();
        assert_eq!(names, vec![json!("d"), json!("a"), json!("c"), json!("b")]);
    }

    #[tokio::test]
    async fn test_numeric_filter_matches_integer_rows() {
        let store = seeded().await;
        let options = QueryOptions::new().with_filter("weight", 2_i64);
        let row = store.find_one(&options).await.unwrap().unwrap();
        assert_eq!(row["name"], json!("c"));
    }

    #[tokio::test]
    async fn test_find_one_missing() {
        let store = seeded().await;
        let options = QueryOptions::new().with_filter("id", "nope");
        assert!(store.find_one(&options).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_merges_attributes() {
        let store = seeded().await;
        let row = store
            .find_one(&QueryOptions::new().with_filter("name", "b"))
            .await
            .unwrap()
            .unwrap();
        let updated = store
            .update(row, attrs(json!({"color": "green"})))
            .await
            .unwrap();
        assert_eq!(updated["color"], json!("green"));
        assert_eq!(updated["name"], json!("b"));

        let reloaded = store
            .find_one(&QueryOptions::new().with_filter("name", "b"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded, updated);
    }

    #[tokio::test]
    async fn test_update_rejects_null_required() {
        let store = seeded().await;
        let row = store
            .find_one(&QueryOptions::new().with_filter("name", "a"))
            .await
            .unwrap()
            .unwrap();
        let err = store.update(row, attrs(json!({"name": null}))).await.unwrap_err();
        assert_eq!(err.operation, StoreOperation::Update);
        assert_eq!(err.kind, StoreErrorKind::ValidationFailed);
    }

    #[tokio::test]
    async fn test_destroy_twice() {
        let store = seeded().await;
        let row = store
            .find_one(&QueryOptions::new().with_filter("name", "a"))
            .await
            .unwrap()
            .unwrap();
        store.destroy(row.clone()).await.unwrap();
        assert_eq!(store.len().await, 3);

        let err = store.destroy(row).await.unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_date_filter_and_sort() {
        let store = MemoryStore::with_rows(
            schema(),
            [
                attrs(json!({"id": "1", "name": "late", "made_at": "2024-03-01T12:00:00Z"})),
                attrs(json!({"id": "2", "name": "early", "made_at": "2024-01-01T00:00:00Z"})),
            ],
        );
        let options = QueryOptions::new().with_order(SortKey::asc("made_at"));
        let result = store.find_and_count_all(&options).await.unwrap();
        assert_eq!(result.rows[0]["name"], json!("early"));

        let spec = crate::query::parse(
            &crate::query::RequestParams::new().with("made_at", "2024-01-01"),
            store.schema(),
        );
        let options = crate::query::compose(&spec, None, &QueryOptions::new(), None);
        let found = store.find_one(&options).await.unwrap().unwrap();
        assert_eq!(found["name"], json!("early"));
    }
}
