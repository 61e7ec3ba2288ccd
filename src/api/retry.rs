//! Retry with exponential backoff and jitter.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::ApiError;

/// How failed requests are retried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Zero disables retrying.
    pub max_retries: u32,
    #[serde(with = "humantime_serde")]
    pub initial_delay: Duration,
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
    /// Multiplier for exponential backoff (2.0 doubles the delay each retry).
    pub backoff_multiplier: f64,
    /// Fraction of the base delay (0.0-1.0) added or removed at random.
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl RetryPolicy {
    /// Quick recovery for cheap idempotent calls.
    #[must_use]
    pub const fn aggressive() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
            backoff_multiplier: 1.5,
            jitter_factor: 0.2,
        }
    }

    /// Long waits for uploads and other slow operations.
    #[must_use]
    pub const fn patient() -> Self {
        Self {
            max_retries: 8,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter_factor: 0.15,
        }
    }

    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            jitter_factor: 0.0,
        }
    }

    /// Delay before retry `attempt` (0-indexed) without jitter.
    #[must_use]
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let base = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let capped = base.min(self.max_delay.as_secs_f64());
        Duration::try_from_secs_f64(capped.max(0.0)).unwrap_or(self.max_delay)
    }

    /// Base delay plus uniform jitter in `±jitter_factor * base`, capped at
    /// `max_delay`.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt).as_secs_f64();
        let range = base * self.jitter_factor.clamp(0.0, 1.0);
        let jitter = if range > 0.0 {
            rand::rng().random_range(-range..=range)
        } else {
            0.0
        };
        let delay = (base + jitter).clamp(0.0, self.max_delay.as_secs_f64());
        Duration::try_from_secs_f64(delay).unwrap_or(self.max_delay)
    }

    /// Delay before retrying after `error`. A server `Retry-After` raises it,
    /// still bounded by `max_delay`.
    #[must_use]
    pub fn delay_after(&self, attempt: u32, error: &ApiError) -> Duration {
        let delay = self.delay_for_attempt(attempt);
        match error.retry_after {
            Some(requested) if requested > delay => requested.min(self.max_delay),
            _ => delay,
        }
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error or
    /// the retries run out. The closure receives the 0-indexed attempt.
    pub fn execute<T, F>(&self, label: &str, mut operation: F) -> Result<T, ApiError>
    where
        F: FnMut(u32) -> Result<T, ApiError>,
    {
        let mut attempt = 0;
        loop {
            match operation(attempt) {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(request = label, attempt, "request succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if err.retryable && attempt < self.max_retries => {
                    let delay = self.delay_after(attempt, &err);
                    warn!(
                        request = label,
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        code = %err.code,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "retrying request: {err}"
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
