//! Retry policies for Storefront API queries.

use std::time::Duration;

use crate::error::DataError;

/// Backoff strategy between retry attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackoffStrategy {
    /// No delay between retries.
    None,
    /// Fixed delay between retries.
    Fixed(Duration),
    /// Exponential backoff with base and max.
    Exponential {
        /// Initial delay.
        base: Duration,
        /// Maximum delay.
        max: Duration,
    },
}

impl BackoffStrategy {
    /// Calculate delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match self {
            Self::None => Duration::ZERO,
            Self::Fixed(d) => *d,
            Self::Exponential { base, max } => {
                let multiplier = 2u32.saturating_pow(attempt);
                std::cmp::min(base.saturating_mul(multiplier), *max)
            }
        }
    }
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_millis(50),
            max: Duration::from_millis(500),
        }
    }
}

/// Conditions that trigger a retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryCondition {
    /// Retry on a specific HTTP status code.
    StatusCode(u16),
    /// Retry on any 5xx status.
    ServerError,
    /// Retry on timeout.
    Timeout,
    /// Retry when the upstream could not be reached.
    ConnectionError,
}

impl RetryCondition {
    /// Check whether an error matches this condition.
    pub fn matches(&self, error: &DataError) -> bool {
        match (self, error) {
            (Self::StatusCode(code), DataError::Http { status }) => status == code,
            (Self::ServerError, DataError::Http { status }) => (500..600).contains(status),
            (Self::Timeout, DataError::Timeout(_)) => true,
            (Self::ConnectionError, DataError::Transport(_)) => true,
            _ => false,
        }
    }
}

/// Retry policy configuration.
///
/// GraphQL-level errors are never retried: the API answered.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts.
    pub max_attempts: u32,
    /// Backoff strategy.
    pub backoff: BackoffStrategy,
    /// Conditions that trigger retry.
    pub retry_on: Vec<RetryCondition>,
}

impl RetryPolicy {
    /// Create a new retry policy.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: BackoffStrategy::default(),
            retry_on: vec![
                RetryCondition::ServerError,
                RetryCondition::Timeout,
                RetryCondition::ConnectionError,
            ],
        }
    }

    /// Create a policy with no retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 0,
            backoff: BackoffStrategy::None,
            retry_on: Vec::new(),
        }
    }

    /// Set backoff strategy.
    pub fn with_backoff(mut self, strategy: BackoffStrategy) -> Self {
        self.backoff = strategy;
        self
    }

    /// Set retry conditions.
    pub fn with_conditions(mut self, conditions: Vec<RetryCondition>) -> Self {
        self.retry_on = conditions;
        self
    }

    /// Check if a failed attempt should be retried.
    pub fn should_retry(&self, error: &DataError, attempt: u32) -> bool {
        if attempt >= self.max_attempts {
            return false;
        }
        self.retry_on.iter().any(|c| c.matches(error))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_backoff_capped() {
        let backoff = BackoffStrategy::default();
        assert_eq!(backoff.delay_for_attempt(0), Duration::from_millis(50));
        assert_eq!(backoff.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(backoff.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(backoff.delay_for_attempt(10), Duration::from_millis(500));
        assert_eq!(backoff.delay_for_attempt(64), Duration::from_millis(500));
    }

    #[test]
    fn test_should_retry_by_error_kind() {
        let policy = RetryPolicy::new(2);

        assert!(policy.should_retry(&DataError::Http { status: 503 }, 0));
        assert!(policy.should_retry(&DataError::Timeout(Duration::from_secs(1)), 1));
        assert!(policy.should_retry(&DataError::Transport("reset".into()), 0));
        assert!(!policy.should_retry(&DataError::Http { status: 404 }, 0));
        assert!(!policy.should_retry(&DataError::Api("bad query".into()), 0));
    }

    #[test]
    fn test_attempt_limit() {
        let policy = RetryPolicy::new(1);
        let error = DataError::Http { status: 500 };
        assert!(policy.should_retry(&error, 0));
        assert!(!policy.should_retry(&error, 1));
        assert!(!RetryPolicy::none().should_retry(&error, 0));
    }

    #[test]
    fn test_specific_status_condition() {
        let policy = RetryPolicy::new(3).with_conditions(vec![RetryCondition::StatusCode(429)]);
        assert!(policy.should_retry(&DataError::Http { status: 429 }, 0));
        assert!(!policy.should_retry(&DataError::Http { status: 500 }, 0));
    }
}
