//! Retry policy for transient HTTP failures
//!
//! Capped exponential backoff with additive jitter. Only transient outcomes are retried:
//! the configured status set plus connection and timeout failures. Throttling (429) is not
//! part of this policy; the detail collector owns that backoff.

use std::time::Duration;

use crate::infrastructure::config::HttpConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first request
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_ms: u64,
    pub retry_statuses: Vec<u16>,
}

impl RetryPolicy {
    pub fn from_config(config: &HttpConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay_ms: config.backoff_base_ms,
            max_delay_ms: config.backoff_max_ms,
            jitter_ms: config.jitter_ms,
            retry_statuses: config.retry_statuses.clone(),
        }
    }

    /// Whether another attempt is allowed after `attempt` (1-based) failed
    pub const fn has_attempts_left(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.retry_statuses.contains(&status)
    }

    /// Capped exponential delay before the attempt following `attempt`, without jitter
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32);
        let delay = self
            .base_delay_ms
            .saturating_mul(1_u64 << exponent)
            .min(self.max_delay_ms);
        Duration::from_millis(delay)
    }

    /// Delay with `[0, jitter_ms]` of jitter added
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay(attempt) + Duration::from_millis(fastrand::u64(0..=self.jitter_ms))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&HttpConfig::default())
    }
}
