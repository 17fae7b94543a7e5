//! Structured logging with request context.

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use storefront_core::{ClientClassification, RequestId};
use tracing::Span;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Output format for logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON format (for production/log aggregation).
    #[default]
    Json,
    /// Human-readable format (for development).
    Human,
}

impl FromStr for LogFormat {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "human" | "pretty" | "text" => Ok(Self::Human),
            other => Err(LoggingError::UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Human => write!(f, "human"),
        }
    }
}

/// Errors setting up logging.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Unknown log format: {0}")]
    UnknownFormat(String),

    #[error("Failed to install subscriber: {0}")]
    Init(String),
}

/// Install the global subscriber. `RUST_LOG` overrides `DEFAULT_LOG_FILTER`.
pub fn init_logging(format: LogFormat) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let result = match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .try_init(),
        LogFormat::Human => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init(),
    };

    result.map_err(|e| LoggingError::Init(e.to_string()))
}

/// Request-scoped logger.
///
/// Carries request ID, route and client classification so every event
/// for a request can be correlated.
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    request_id: RequestId,
    route: Option<String>,
    client: Option<ClientClassification>,
    start_time: Instant,
}

impl StructuredLogger {
    /// Create a new logger with request context.
    pub fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            route: None,
            client: None,
            start_time: Instant::now(),
        }
    }

    /// Set the route pattern.
    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    /// Set the client classification.
    pub fn with_client(mut self, client: ClientClassification) -> Self {
        self.client = Some(client);
        self
    }

    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    /// Microseconds since the logger was created.
    pub fn elapsed_us(&self) -> u64 {
        self.start_time.elapsed().as_micros() as u64
    }

    /// Span covering the whole request.
    pub fn span(&self) -> Span {
        tracing::info_span!(
            "request",
            request_id = %self.request_id,
            route = self.route.as_deref().unwrap_or("-"),
            client = self.client.map(|c| c.name()).unwrap_or("-"),
        )
    }

    pub fn info(&self, message: &str) {
        tracing::info!(
            request_id = %self.request_id,
            elapsed_us = self.elapsed_us(),
            "{}",
            message
        );
    }

    pub fn warn(&self, message: &str) {
        tracing::warn!(
            request_id = %self.request_id,
            elapsed_us = self.elapsed_us(),
            "{}",
            message
        );
    }

    /// Log an error together with its cause.
    pub fn error(&self, message: &str, cause: &dyn fmt::Display) {
        tracing::error!(
            request_id = %self.request_id,
            elapsed_us = self.elapsed_us(),
            error = %cause,
            "{}",
            message
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("Human".parse::<LogFormat>().unwrap(), LogFormat::Human);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Human);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_log_format_display_round_trips() {
        for format in [LogFormat::Json, LogFormat::Human] {
            assert_eq!(format.to_string().parse::<LogFormat>().unwrap(), format);
        }
    }

    #[test]
    fn test_logger_context() {
        let logger = StructuredLogger::new(RequestId::from_string("req-1"))
            .with_route("/products/{handle}")
            .with_client(ClientClassification::Bot);

        assert_eq!(logger.request_id().0, "req-1");
        assert_eq!(logger.route.as_deref(), Some("/products/{handle}"));
        assert_eq!(logger.client, Some(ClientClassification::Bot));

        // No subscriber installed: these must be no-ops.
        logger.info("loaded");
        logger.error("failed", &"boom");
        let _guard = logger.span().entered();
    }
}
