//! Observability for the streaming SSR storefront.
//!
//! This crate provides:
//! - `init_logging` - Global `tracing` subscriber, JSON or human output
//! - `StructuredLogger` - Request-scoped structured logging
//! - `RenderMetrics` - Per-request render timings and outcome

mod logging;
mod metrics;

pub use logging::*;
pub use metrics::*;

pub use storefront_core::RequestId;
