//! api::backoff
//!
//! Retry schedule for transient failures.
//!
//! Delays start at 100ms and double up to a 10s cap. Each delay is scaled by
//! a uniform factor in `[0.8, 1.2]`.

use std::time::Duration;

use backon::{BackoffBuilder, ExponentialBuilder};
use rand::Rng;

/// First retry delay.
pub const INITIAL_DELAY: Duration = Duration::from_millis(100);

/// Upper bound on a single (pre-jitter) delay.
pub const MAX_DELAY: Duration = Duration::from_secs(10);

/// Relative jitter applied to every delay.
pub const JITTER: f64 = 0.2;

/// How many times a request may be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(crate::core::config::settings::DEFAULT_RETRY_MAX as u32)
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    /// A policy that never retries.
    pub fn disabled() -> Self {
        Self::new(0)
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn enabled(&self) -> bool {
        self.max_retries > 0
    }

    /// The un-jittered schedule: one delay per permitted retry.
    pub fn schedule(&self) -> impl Iterator<Item = Duration> {
        ExponentialBuilder::default()
            .with_min_delay(INITIAL_DELAY)
            .with_max_delay(MAX_DELAY)
            .with_factor(2.0)
            .with_max_times(self.max_retries as usize)
            .build()
    }

    /// The jittered delays to sleep between attempts.
    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        self.schedule().map(|d| jitter(d, &mut rand::rng()))
    }
}

/// Scale `delay` by a random factor in `[1 - JITTER, 1 + JITTER]`.
pub fn jitter<R: Rng + ?Sized>(delay: Duration, rng: &mut R) -> Duration {
    let factor = rng.random_range((1.0 - JITTER)..=(1.0 + JITTER));
    delay.mul_f64(factor)
}
