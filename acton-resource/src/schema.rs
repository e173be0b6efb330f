//! Schema introspection for filterable model fields
//!
//! A [`Schema`] is the ordered list of attribute definitions a model exposes.
//! The query parser consults it to decide which request parameters name real
//! fields and how their raw string values should be coerced. Unknown fields are
//! never an error here: [`Schema::kind_of`] simply returns `None` and callers
//! treat that as "not filterable".
//!
//! # Example
//!
//! ```rust
//! use acton_resource::schema::{FieldKind, Schema};
//!
//! let schema = Schema::builder()
//!     .primary_key("id", FieldKind::String)
//!     .required("name", FieldKind::String)
//!     .field("weight", FieldKind::Number)
//!     .build();
//!
//! assert_eq!(schema.kind_of("weight"), Some(FieldKind::Number));
//! assert_eq!(schema.kind_of("colour"), None);
//! assert_eq!(schema.fields().collect::<Vec<_>>(), vec!["id", "name", "weight"]);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Coercion kind of a schema field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Free-form text
    String,
    /// Integer or floating point number
    Number,
    /// `true` / `false`
    Boolean,
    /// ISO-8601 date or date-time
    Date,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Number => write!(f, "number"),
            Self::Boolean => write!(f, "boolean"),
            Self::Date => write!(f, "date"),
        }
    }
}

/// A single attribute definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Attribute name as it appears in rows and request parameters
    pub name: String,
    /// How raw values are coerced
    pub kind: FieldKind,
    /// Whether the attribute must be present on create
    #[serde(default)]
    pub required: bool,
}

impl FieldDef {
    /// Create an optional field definition
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
        }
    }

    /// Mark the field as required
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Ordered mapping from field name to coercion kind
///
/// Read-only once built. Field order is declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<FieldDef>,
    primary_key: Option<String>,
}

impl Schema {
    /// Start building a schema
    #[must_use]
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Names of every field, in declaration order
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Coercion kind for `field`, or `None` when the field is not part of the schema
    #[must_use]
    pub fn kind_of(&self, field: &str) -> Option<FieldKind> {
        self.field(field).map(|f| f.kind)
    }

    /// Full definition for `field`
    #[must_use]
    pub fn field(&self, field: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == field)
    }

    /// Check whether `field` is a schema member
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.field(field).is_some()
    }

    /// All field definitions, in declaration order
    #[must_use]
    pub fn definitions(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Name of the primary key field, if one was designated
    #[must_use]
    pub fn primary_key(&self) -> Option<&str> {
        self.primary_key.as_deref()
    }

    /// Number of fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check whether the schema has no fields
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Builder for [`Schema`]
///
/// Re-declaring a field replaces the earlier definition in place.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<FieldDef>,
    primary_key: Option<String>,
}

impl SchemaBuilder {
    /// Add an optional field
    #[must_use]
    pub fn field(self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.define(FieldDef::new(name, kind))
    }

    /// Add a field that must be supplied on create
    #[must_use]
    pub fn required(self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.define(FieldDef::new(name, kind).required())
    }

    /// Add the primary key field
    ///
    /// The key is generated by the store when omitted on create, so it is
    /// never marked required.
    #[must_use]
    pub fn primary_key(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        let name = name.into();
        self.primary_key = Some(name.clone());
        self.define(FieldDef::new(name, kind))
    }

    /// Add a prepared definition
    #[must_use]
    pub fn define(mut self, def: FieldDef) -> Self {
        match self.fields.iter_mut().find(|f| f.name == def.name) {
            Some(existing) => *existing = def,
            None => self.fields.push(def),
        }
        self
    }

    /// Finish the schema
    #[must_use]
    pub fn build(self) -> Schema {
        Schema {
            fields: self.fields,
            primary_key: self.primary_key,
        }
    }
}
