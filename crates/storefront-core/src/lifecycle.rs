//! Request lifecycle tracking.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Lifecycle phases of a single render cycle.
///
/// `Idle → Rendering → {Resolved → Settled | Failed}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecyclePhase {
    /// Request received, renderer not started.
    Idle,
    /// Renderer running, response still pending.
    Rendering,
    /// Headers sent, body streaming.
    Resolved,
    /// Body finished (completed, aborted or failed after resolution).
    Settled,
    /// Shell failed; no response was produced.
    Failed(String),
}

impl LifecyclePhase {
    /// Check if no further transitions can happen.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Settled | Self::Failed(_))
    }
}

/// Timing context for observability.
#[derive(Debug, Clone)]
pub struct TimingContext {
    start: Instant,
    marks: HashMap<String, Instant>,
}

impl TimingContext {
    /// Create a new timing context.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            marks: HashMap::new(),
        }
    }

    /// Record a timing mark. The first mark for a name wins.
    pub fn mark(&mut self, name: &str) {
        self.marks
            .entry(name.to_string())
            .or_insert_with(Instant::now);
    }

    /// Time from start to a named mark.
    pub fn since_start(&self, name: &str) -> Option<Duration> {
        self.marks.get(name).map(|t| t.duration_since(self.start))
    }

    /// Get elapsed time since start.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Time until the shell was ready.
    pub fn time_to_shell(&self) -> Option<Duration> {
        self.since_start("shell_ready")
    }

    /// Time until the response was resolved (headers sent).
    pub fn time_to_resolve(&self) -> Option<Duration> {
        self.since_start("resolved")
    }

    /// Check if a mark was recorded.
    pub fn has_mark(&self, name: &str) -> bool {
        self.marks.contains_key(name)
    }
}

impl Default for TimingContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_mark_wins() {
        let mut timing = TimingContext::new();
        timing.mark("resolved");
        let first = timing.time_to_resolve().unwrap();
        std::thread::sleep(Duration::from_millis(2));
        timing.mark("resolved");
        assert_eq!(timing.time_to_resolve(), Some(first));
    }

    #[test]
    fn test_missing_marks() {
        let timing = TimingContext::new();
        assert!(timing.time_to_shell().is_none());
        assert!(!timing.has_mark("shell_ready"));
    }

    #[test]
    fn test_terminal_phases() {
        assert!(LifecyclePhase::Settled.is_terminal());
        assert!(LifecyclePhase::Failed("boom".into()).is_terminal());
        assert!(!LifecyclePhase::Resolved.is_terminal());
        assert!(!LifecyclePhase::Rendering.is_terminal());
    }
}
