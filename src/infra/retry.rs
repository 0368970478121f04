// src/infra/retry.rs — Exponential backoff schedule with jitter
//
// Shared by the scheduling client. Attempts are counted in total (first try
// included), so `max_attempts = 3` means at most two sleeps.

use serde::{Deserialize, Serialize};
use std::time::Duration;

const MAX_ATTEMPTS: u32 = 3;
const INITIAL_DELAY_MS: u64 = 500;
const BACKOFF_FACTOR: f64 = 2.0;
const MAX_DELAY_MS: u64 = 5_000;
const JITTER_FRACTION: f64 = 0.2;
/// Added on top of a server-provided Retry-After.
const RATE_LIMIT_BUFFER_MS: u64 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub backoff_factor: f64,
    pub max_delay_ms: u64,
    pub jitter_fraction: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            initial_delay_ms: INITIAL_DELAY_MS,
            backoff_factor: BACKOFF_FACTOR,
            max_delay_ms: MAX_DELAY_MS,
            jitter_fraction: JITTER_FRACTION,
        }
    }
}

impl RetryConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// No sleeping between attempts. Useful in tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay_ms: 0,
            backoff_factor: 1.0,
            max_delay_ms: 0,
            jitter_fraction: 0.0,
        }
    }

    /// Delay before the retry that follows failed attempt `attempt` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32, rate_limit_delay: Option<Duration>) -> Duration {
        // Server hint plus a small buffer, never longer than max_delay_ms.
        if let Some(rl_delay) = rate_limit_delay {
            let hinted = rl_delay.saturating_add(Duration::from_millis(RATE_LIMIT_BUFFER_MS));
            return hinted.min(Duration::from_millis(self.max_delay_ms));
        }

        let base_ms = self.initial_delay_ms as f64 * self.backoff_factor.powi(attempt as i32);
        let capped_ms = base_ms.min(self.max_delay_ms as f64);
        let final_ms = (capped_ms * jitter_multiplier(self.jitter_fraction)).max(0.0);

        Duration::from_millis(final_ms as u64)
    }
}

/// Random multiplier in [1 - fraction, 1 + fraction].
fn jitter_multiplier(fraction: f64) -> f64 {
    if fraction <= 0.0 {
        return 1.0;
    }
    let mut buf = [0u8; 4];
    if getrandom::getrandom(&mut buf).is_err() {
        return 1.0;
    }
    let unit = u32::from_le_bytes(buf) as f64 / u32::MAX as f64; // 0.0..=1.0
    1.0 + fraction * (2.0 * unit - 1.0)
}
