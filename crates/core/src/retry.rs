//! Retry policy (C2): pure exponential backoff with bounded jitter.
//!
//! `RetryPolicy` is deterministic given its parameters and a random
//! source; the random source is `rand::rng()`, which is thread-local and
//! safe for concurrent use without any locking on our part.

use crate::config::RetryConfig;
use rand::Rng;

/// Exponential backoff with bounded jitter, per the formula:
/// `delay = clamp(base * 2^retry_count, 1, max) + jitter * factor * (U - 0.5)`
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    base_delay_s: i64,
    max_delay_s: i64,
    jitter_factor: f64,
}

impl From<RetryConfig> for RetryPolicy {
    fn from(cfg: RetryConfig) -> Self {
        Self::new(cfg.base_delay_s, cfg.max_delay_s, cfg.jitter_factor)
    }
}

impl RetryPolicy {
    pub fn new(base_delay_s: i64, max_delay_s: i64, jitter_factor: f64) -> Self {
        Self {
            base_delay_s,
            max_delay_s,
            jitter_factor,
        }
    }

    /// Seconds to wait before the next attempt after `retry_count` completed
    /// attempts. Truncated to an integer, never below 1 second.
    pub fn delay_seconds(&self, retry_count: i32) -> i64 {
        self.delay_seconds_with(retry_count, &mut rand::rng())
    }

    /// Same as [`Self::delay_seconds`] but with an injectable RNG, so tests
    /// can assert the exact jittered range without flakiness.
    pub fn delay_seconds_with<R: Rng + ?Sized>(&self, retry_count: i32, rng: &mut R) -> i64 {
        let exp_delay = exp_backoff(self.base_delay_s, self.max_delay_s, retry_count);
        let u: f64 = rng.random_range(0.0..1.0);
        let jitter = exp_delay as f64 * self.jitter_factor * (u - 0.5);
        ((exp_delay as f64 + jitter).round() as i64).max(1)
    }

    /// A row is eligible for another attempt iff it hasn't exhausted its
    /// retry budget yet.
    pub fn should_retry(retry_count: i32, max_retries: i32) -> bool {
        retry_count < max_retries
    }
}

fn exp_backoff(base_delay_s: i64, max_delay_s: i64, retry_count: i32) -> i64 {
    let shift = retry_count.clamp(0, 62) as u32;
    let exp = base_delay_s.saturating_mul(2_i64.saturating_pow(shift));
    exp.clamp(1, max_delay_s)
}
