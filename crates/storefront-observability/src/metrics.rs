//! Per-request render metrics.

use serde::{Deserialize, Serialize};
use storefront_streaming::RenderReport;

/// Metrics for a single rendered response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderMetrics {
    /// Request ID for correlation.
    pub request_id: String,
    /// Route pattern.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    /// `bot` or `standard`.
    pub client: String,
    /// Resolved HTTP status.
    pub status_code: u16,
    /// `completed`, `aborted` or `failed`.
    pub outcome: String,
    /// Time until status and headers were sent (microseconds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_to_resolve_us: Option<u64>,
    /// Time until the body finished (microseconds).
    pub total_duration_us: u64,
    /// Body bytes delivered.
    pub bytes: usize,
    /// Renderer errors, in order.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<String>,
}

impl RenderMetrics {
    /// Build metrics from a settled render.
    pub fn from_report(report: &RenderReport) -> Self {
        Self {
            request_id: report.request_id.to_string(),
            route: None,
            client: report.classification.name().to_string(),
            status_code: report.status.as_u16(),
            outcome: report.outcome.as_str().to_string(),
            time_to_resolve_us: report.time_to_resolve.map(|d| d.as_micros() as u64),
            total_duration_us: report.elapsed.as_micros() as u64,
            bytes: report.bytes,
            errors: report.errors.clone(),
        }
    }

    /// Attach the route pattern.
    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    /// Format as JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Get a summary string for logging.
    pub fn to_summary(&self) -> String {
        let mut parts = vec![
            format!("status={}", self.status_code),
            format!("client={}", self.client),
            format!("outcome={}", self.outcome),
        ];

        if let Some(route) = &self.route {
            parts.push(format!("route={}", route));
        }
        if let Some(ttr) = self.time_to_resolve_us {
            parts.push(format!("resolve={:.1}ms", ttr as f64 / 1000.0));
        }
        parts.push(format!("total={:.1}ms", self.total_duration_us as f64 / 1000.0));
        parts.push(format!("bytes={}", self.bytes));
        if !self.errors.is_empty() {
            parts.push(format!("errors={}", self.errors.len()));
        }

        parts.join(" ")
    }

    /// Emit the metrics as a structured event.
    pub fn record(&self) {
        tracing::info!(
            request_id = %self.request_id,
            route = self.route.as_deref().unwrap_or("-"),
            client = %self.client,
            status = self.status_code,
            outcome = %self.outcome,
            time_to_resolve_us = self.time_to_resolve_us,
            total_duration_us = self.total_duration_us,
            bytes = self.bytes,
            errors = self.errors.len(),
            "render metrics"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use storefront_core::{ClientClassification, RequestId};
    use storefront_streaming::RenderOutcome;

    fn report() -> RenderReport {
        RenderReport {
            request_id: RequestId::from_string("req-9"),
            classification: ClientClassification::Bot,
            status: http::StatusCode::INTERNAL_SERVER_ERROR,
            outcome: RenderOutcome::Failed,
            errors: vec!["deferred section 'cart' failed: timeout".into()],
            time_to_resolve: Some(Duration::from_micros(12_500)),
            elapsed: Duration::from_millis(40),
            bytes: 2048,
            chunks: 3,
        }
    }

    #[test]
    fn test_from_report() {
        let metrics = RenderMetrics::from_report(&report()).with_route("/");

        assert_eq!(metrics.request_id, "req-9");
        assert_eq!(metrics.client, "bot");
        assert_eq!(metrics.status_code, 500);
        assert_eq!(metrics.outcome, "failed");
        assert_eq!(metrics.time_to_resolve_us, Some(12_500));
        assert_eq!(metrics.total_duration_us, 40_000);
        assert_eq!(metrics.route.as_deref(), Some("/"));
    }

    #[test]
    fn test_summary() {
        let summary = RenderMetrics::from_report(&report()).with_route("/").to_summary();
        assert_eq!(
            summary,
            "status=500 client=bot outcome=failed route=/ resolve=12.5ms total=40.0ms bytes=2048 errors=1"
        );
    }

    #[test]
    fn test_json_skips_empty_fields() {
        let mut report = report();
        report.errors.clear();
        report.time_to_resolve = None;

        let json = RenderMetrics::from_report(&report).to_json();
        assert!(!json.contains("errors"));
        assert!(!json.contains("time_to_resolve_us"));
        assert!(!json.contains("route"));

        let back: RenderMetrics = serde_json::from_str(&json).unwrap();
        assert_eq!(back.bytes, 2048);
    }
}
