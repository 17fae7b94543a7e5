//! Route errors and the error boundary.

use http::StatusCode;
use storefront_data::DataError;
use storefront_observability::StructuredLogger;

/// Error raised by a route loader.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    /// A deliberate HTTP error response, such as a missing product.
    #[error("Route error response: {status}")]
    Response {
        status: StatusCode,
        status_text: String,
        data: Option<String>,
    },

    /// Anything else that went wrong while loading.
    #[error("{0}")]
    Thrown(String),
}

impl RouteError {
    /// An error response with the canonical reason phrase.
    pub fn response(status: StatusCode) -> Self {
        Self::Response {
            status,
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            data: None,
        }
    }

    pub fn not_found() -> Self {
        Self::response(StatusCode::NOT_FOUND)
    }

    /// Status the page is delivered with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Response { status, .. } => *status,
            Self::Thrown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DataError> for RouteError {
    fn from(e: DataError) -> Self {
        Self::Thrown(e.to_string())
    }
}

/// Log a route error and render its fallback markup.
pub fn error_boundary(error: &RouteError, logger: &StructuredLogger) -> String {
    match error {
        RouteError::Response {
            status,
            status_text,
            data,
        } => {
            tracing::error!(
                request_id = %logger.request_id(),
                status = status.as_u16(),
                status_text = %status_text,
                data = data.as_deref().unwrap_or(""),
                "route error response"
            );
            "<div>Route Error</div>".to_string()
        }
        RouteError::Thrown(message) => {
            logger.error("route loader failed", message);
            "<div>Thrown Error</div>".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::RequestId;

    fn logger() -> StructuredLogger {
        StructuredLogger::new(RequestId::from_string("req-err"))
    }

    #[test]
    fn test_not_found() {
        let error = RouteError::not_found();
        assert_eq!(error.status(), StatusCode::NOT_FOUND);
        assert_eq!(error.to_string(), "Route error response: 404 Not Found");
        assert_eq!(error_boundary(&error, &logger()), "<div>Route Error</div>");
    }

    #[test]
    fn test_thrown_from_data_error() {
        let error = RouteError::from(DataError::Http { status: 502 });
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error_boundary(&error, &logger()), "<div>Thrown Error</div>");
    }
}
