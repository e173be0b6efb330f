//! Transport-neutral request data for resource operations

use crate::query::{QueryOptions, RequestParams};
use crate::store::Attributes;

/// Caller-supplied base options for one request
///
/// Insert this as a request extension (for example from an auth middleware
/// scoping rows to a tenant) and the router hands it to the composer. Its
/// `where` keys win over anything parsed from the query string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaseOptions(pub QueryOptions);

/// Everything a resource operation reads from the request
///
/// # Example
///
/// ```rust
/// use acton_resource::handlers::ResourceRequest;
/// use acton_resource::query::RequestParams;
///
/// let request = ResourceRequest::new()
///     .with_route("id", "w_1")
///     .with_query(RequestParams::from_pairs([("limit", "10")]));
///
/// assert_eq!(request.route.first("id"), Some("w_1"));
/// assert!(request.body.is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ResourceRequest {
    /// Route parameters
    pub route: RequestParams,
    /// Query-string parameters
    pub query: RequestParams,
    /// JSON object body
    pub body: Option<Attributes>,
    /// Caller base options
    pub base: Option<QueryOptions>,
}

impl ResourceRequest {
    /// Empty request
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route parameter
    #[must_use]
    pub fn with_route(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.route.append(name, value);
        self
    }

    /// Replace the query parameters
    #[must_use]
    pub fn with_query(mut self, query: RequestParams) -> Self {
        self.query = query;
        self
    }

    /// Set the body
    #[must_use]
    pub fn with_body(mut self, body: Attributes) -> Self {
        self.body = Some(body);
        self
    }

    /// Set caller base options
    #[must_use]
    pub fn with_base(mut self, base: QueryOptions) -> Self {
        self.base = Some(base);
        self
    }
}
