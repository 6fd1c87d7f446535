//! Retry policy with exponential backoff.
//!
//! The base delay schedule is a pure function of the attempt number so
//! tests can assert exact sleep lengths; jitter is layered on top by the
//! caller.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backoff delay for a retry attempt: `base * 2^attempt`.
///
/// `attempt` is zero-based (the delay before the first retry).
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(1u32 << attempt.min(16))
}

/// Bounded retry policy for transient data-source failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum retry attempts after the initial request.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base backoff delay in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Maximum jitter added to each delay, as a fraction of the delay.
    #[serde(default = "default_jitter_frac")]
    pub jitter_frac: f64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    200
}

fn default_jitter_frac() -> f64 {
    0.25
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            jitter_frac: default_jitter_frac(),
        }
    }
}

impl RetryPolicy {
    /// Base (un-jittered) delay before retry `attempt`.
    pub fn delay(&self, attempt: u32) -> Duration {
        backoff_delay(Duration::from_millis(self.base_delay_ms), attempt)
    }

    /// Delay with uniform jitter in `[0, delay * jitter_frac]` added.
    pub fn jittered_delay(&self, attempt: u32, rng: &mut impl rand::Rng) -> Duration {
        let base = self.delay(attempt);
        let max_jitter = base.mul_f64(self.jitter_frac.clamp(0.0, 1.0));
        if max_jitter.is_zero() {
            return base;
        }
        base + Duration::from_millis(rng.gen_range(0..=max_jitter.as_millis() as u64))
    }

    /// Sum of all base delays if every retry is exhausted.
    pub fn total_base_delay(&self) -> Duration {
        (0..self.max_retries).map(|a| self.delay(a)).sum()
    }
}
