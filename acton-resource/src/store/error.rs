//! Store error types
//!
//! Structured errors for store operations. Besides the category and the
//! operation that failed, a store error can carry the raw driver message, a
//! list of per-field violations and an explicit HTTP status. The handlers use
//! [`StoreError::detail`] to pick the most specific message for clients.
//!
//! # Example
//!
//! ```rust
//! use acton_resource::store::{FieldViolation, StoreError, StoreErrorKind};
//!
//! let error = StoreError::validation_failed("Validation error")
//!     .with_violation(FieldViolation::new("name", "name is required"));
//! assert!(matches!(error.kind, StoreErrorKind::ValidationFailed));
//! assert_eq!(error.detail(), "name is required");
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Operation being performed when the store error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    /// Inserting a new row
    Create,
    /// Looking up a single row
    FindOne,
    /// Listing rows with a total count
    FindAndCountAll,
    /// Updating an existing row
    Update,
    /// Deleting a row
    Destroy,
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::FindOne => write!(f, "find_one"),
            Self::FindAndCountAll => write!(f, "find_and_count_all"),
            Self::Update => write!(f, "update"),
            Self::Destroy => write!(f, "destroy"),
        }
    }
}

/// Category of store error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreErrorKind {
    /// Row was not found
    NotFound,
    /// Attributes were rejected before writing
    ValidationFailed,
    /// Uniqueness or foreign key constraint violated
    ConstraintViolation,
    /// Failed to reach the store
    ConnectionFailed,
    /// Operation timed out
    Timeout,
    /// Underlying database error
    DatabaseError,
    /// Other unclassified error
    Other,
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::ValidationFailed => write!(f, "validation_failed"),
            Self::ConstraintViolation => write!(f, "constraint_violation"),
            Self::ConnectionFailed => write!(f, "connection_failed"),
            Self::Timeout => write!(f, "timeout"),
            Self::DatabaseError => write!(f, "database_error"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// One rejected attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    /// Attribute name
    pub field: String,
    /// What was wrong with it
    pub message: String,
}

impl FieldViolation {
    /// Create a violation
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Structured store error with operation context
///
/// # Example
///
/// ```rust
/// use acton_resource::store::{StoreError, StoreOperation};
///
/// let error = StoreError::constraint_violation(StoreOperation::Create, "Validation error")
///     .with_driver("duplicate key value violates unique constraint \"widgets_pkey\"");
/// assert!(error.detail().starts_with("duplicate key"));
/// assert!(!error.is_retriable());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    /// The operation being performed when the error occurred
    pub operation: StoreOperation,
    /// The category of error
    pub kind: StoreErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Raw message from the storage driver
    pub driver: Option<String>,
    /// Per-field violations
    pub errors: Vec<FieldViolation>,
    /// HTTP status to report instead of the kind default
    pub status: Option<u16>,
}

impl StoreError {
    /// Create a new store error
    pub fn new(operation: StoreOperation, kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            driver: None,
            errors: Vec::new(),
            status: None,
        }
    }

    /// Create a "not found" error
    pub fn not_found(operation: StoreOperation) -> Self {
        Self::new(operation, StoreErrorKind::NotFound, "Row not found")
    }

    /// Create a validation failed error
    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::new(
            StoreOperation::Create,
            StoreErrorKind::ValidationFailed,
            message,
        )
    }

    /// Create a constraint violation error
    pub fn constraint_violation(operation: StoreOperation, message: impl Into<String>) -> Self {
        Self::new(operation, StoreErrorKind::ConstraintViolation, message)
    }

    /// Create a connection failed error
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::new(
            StoreOperation::FindOne,
            StoreErrorKind::ConnectionFailed,
            message,
        )
    }

    /// Create a timeout error
    pub fn timeout(operation: StoreOperation, message: impl Into<String>) -> Self {
        Self::new(operation, StoreErrorKind::Timeout, message)
    }

    /// Create a database error
    pub fn database_error(operation: StoreOperation, message: impl Into<String>) -> Self {
        Self::new(operation, StoreErrorKind::DatabaseError, message)
    }

    /// Attach the raw driver message
    #[must_use]
    pub fn with_driver(mut self, driver: impl Into<String>) -> Self {
        self.driver = Some(driver.into());
        self
    }

    /// Append a field violation
    #[must_use]
    pub fn with_violation(mut self, violation: FieldViolation) -> Self {
        self.errors.push(violation);
        self
    }

    /// Override the HTTP status
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Set the operation that caused the error
    #[must_use]
    pub fn with_operation(mut self, operation: StoreOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Most specific client-facing message
    ///
    /// Prefers the driver message, then the first field violation, then the
    /// generic message.
    #[must_use]
    pub fn detail(&self) -> &str {
        if let Some(driver) = self.driver.as_deref() {
            return driver;
        }
        self.errors
            .first()
            .map(|violation| violation.message.as_str())
            .unwrap_or(&self.message)
    }

    /// Check if this error is transient
    pub fn is_retriable(&self) -> bool {
        matches!(
            self.kind,
            StoreErrorKind::ConnectionFailed | StoreErrorKind::Timeout
        )
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Store {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        if let Some(ref driver) = self.driver {
            write!(f, " ({})", driver)?;
        }
        Ok(())
    }
}

impl std::error::Error for StoreError {}
