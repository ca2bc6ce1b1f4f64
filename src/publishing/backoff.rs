//! Retry backoff.
//!
//! Exponential with a cap and bounded jitter. Jitter exists to spread herd
//! retries; scoring paths never touch randomness, and a zero jitter factor
//! makes the calculator fully deterministic for tests.

use chrono::Duration;
use rand::Rng;

use crate::config::BackoffConfig;

#[derive(Debug, Clone)]
pub struct BackoffCalculator {
    config: BackoffConfig,
}

impl BackoffCalculator {
    pub fn new(config: BackoffConfig) -> Self {
        Self { config }
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16) as i32;
        let base = self.config.base_secs as f64 * self.config.multiplier.powi(exponent);
        let capped = base.min(self.config.max_secs as f64);

        let jittered = if self.config.jitter_factor > 0.0 {
            let spread = capped * self.config.jitter_factor;
            let offset = rand::thread_rng().gen_range(-spread..=spread);
            capped + offset
        } else {
            capped
        };

        let seconds = jittered.clamp(self.config.base_secs as f64, self.config.max_secs as f64);
        Duration::milliseconds((seconds * 1000.0) as i64)
    }
}
