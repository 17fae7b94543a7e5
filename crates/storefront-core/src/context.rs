//! Request context with typed parameters.

use std::collections::HashMap;

use http::header::{HeaderMap, COOKIE, USER_AGENT};
use rand::Rng;

use crate::client::ClientClassification;
use crate::lifecycle::TimingContext;

/// Unique request identifier for tracing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(pub String);

impl RequestId {
    /// Generate a new request ID.
    pub fn generate() -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let mut rng = rand::thread_rng();
        Self(format!(
            "{:x}-{:08x}-{:08x}",
            nanos,
            rng.gen::<u32>(),
            rng.gen::<u32>()
        ))
    }

    /// Create from an existing ID string.
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Reuse an inbound `x-request-id` header when present.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(Self::from_string)
            .unwrap_or_else(Self::generate)
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Extracted route parameters (e.g., `{handle}` from `/products/{handle}`).
pub type RouteParams = HashMap<String, String>;

/// Typed request context passed to route loaders.
#[derive(Debug)]
pub struct RequestContext {
    /// Unique request identifier.
    pub request_id: RequestId,
    /// Full request URL (path and query).
    pub url: String,
    /// Extracted route parameters.
    pub params: RouteParams,
    /// Inbound HTTP headers.
    pub headers: HeaderMap,
    /// Bot or standard client.
    pub classification: ClientClassification,
    /// Timing context for observability.
    pub timing: TimingContext,
}

impl RequestContext {
    /// Create a context from the inbound URL and headers.
    ///
    /// The client is classified from the `User-Agent` header.
    pub fn new(url: impl Into<String>, headers: HeaderMap) -> Self {
        let classification = ClientClassification::from_user_agent(
            headers.get(USER_AGENT).and_then(|v| v.to_str().ok()),
        );
        Self {
            request_id: RequestId::from_headers(&headers),
            url: url.into(),
            params: HashMap::new(),
            headers,
            classification,
            timing: TimingContext::new(),
        }
    }

    /// Attach a route parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Get a route parameter by name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(|s| s.as_str())
    }

    /// Request path without the query string.
    pub fn path(&self) -> &str {
        self.url.split('?').next().unwrap_or("/")
    }

    /// Get a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Get a cookie value from the `Cookie` header(s).
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v)
    }
}
