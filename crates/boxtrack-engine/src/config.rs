//! Engine configuration.

use chrono::NaiveDate;
use std::time::Duration;

/// Automatic retry behaviour for optimistic-concurrency conflicts.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first failed attempt.
    pub max_retries: u32,
    /// Backoff before the first retry.
    pub base_delay_ms: u64,
}

impl RetryPolicy {
    /// Exponential backoff before the given retry attempt (1-based).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.base_delay_ms.saturating_mul(1 << exponent))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            base_delay_ms: 25,
        }
    }
}

/// Engine-wide settings.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Conflict retry behaviour.
    pub retry: RetryPolicy,
    /// Fixed anchor date for planned schedules; `None` means today.
    ///
    /// Pinning the anchor makes planned windows deterministic, which test
    /// suites and planning previews rely on.
    pub schedule_anchor: Option<NaiveDate>,
}

impl EngineConfig {
    /// Default configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a retry policy.
    #[inline]
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// With a fixed schedule anchor date.
    #[inline]
    #[must_use]
    pub fn with_schedule_anchor(mut self, anchor: NaiveDate) -> Self {
        self.schedule_anchor = Some(anchor);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay_ms: 10,
        };
        assert_eq!(policy.delay(1), Duration::from_millis(10));
        assert_eq!(policy.delay(2), Duration::from_millis(20));
        assert_eq!(policy.delay(3), Duration::from_millis(40));
    }

    #[test]
    fn config_builder() {
        let anchor = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let config = EngineConfig::new()
            .with_retry(RetryPolicy {
                max_retries: 2,
                base_delay_ms: 5,
            })
            .with_schedule_anchor(anchor);

        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.schedule_anchor, Some(anchor));
    }
}
