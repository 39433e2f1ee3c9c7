//! Bounded retry with exponential backoff for serializable transactions.

use std::time::Duration;

/// Retry policy for transactions aborted by serialization conflicts.
///
/// Only PostgreSQL serialization failures (SQLSTATE 40001) and deadlocks
/// (40P01) are retried; every other error is surfaced on the first attempt.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Cap on the backoff delay.
    pub max_delay: Duration,
    /// Multiplier applied per retry.
    pub backoff_multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(1),
            backoff_multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// Returns the delay to sleep before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let factor = self.backoff_multiplier.saturating_pow(retry - 1);
        let delay = self.base_delay.saturating_mul(factor);
        std::cmp::min(delay, self.max_delay)
    }
}

/// Returns true when the error is a serialization failure or deadlock that
/// a fresh transaction attempt can resolve.
pub fn is_serialization_conflict(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(db_err) => matches!(
            db_err.code().as_deref(),
            Some("40001") | Some("40P01")
        ),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 6,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(300),
            backoff_multiplier: 2,
        };

        assert_eq!(policy.delay_for(0), Duration::ZERO);
        assert_eq!(policy.delay_for(1), Duration::from_millis(50));
        assert_eq!(policy.delay_for(2), Duration::from_millis(100));
        assert_eq!(policy.delay_for(3), Duration::from_millis(200));
        // 400ms capped at 300ms.
        assert_eq!(policy.delay_for(4), Duration::from_millis(300));
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay_for(1), Duration::from_millis(50));
    }

    #[test]
    fn test_non_database_errors_are_not_conflicts() {
        assert!(!is_serialization_conflict(&sqlx::Error::PoolTimedOut));
        assert!(!is_serialization_conflict(&sqlx::Error::RowNotFound));
    }
}
