//! Jittered exponential backoff, shared by the worker's idle loop and the
//! claim protocol's bounded RPC retry.
//!
//! Grounded on `sa-node-sdk::reconnect::ReconnectBackoff`'s shape
//! (`delay_for_attempt`/`should_give_up`/hand-rolled pseudo-random jitter,
//! no `rand` dependency), generalized from that crate's additive-only 25%
//! jitter to the symmetric `±backoff * jitter_ratio` jitter the original
//! worker loop uses (`random.uniform(-jitter, jitter)`).

use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
    pub factor: f64,
    pub jitter_ratio: f64,
    /// `0` means unlimited.
    pub max_attempts: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(100),
            max: Duration::from_secs(60),
            factor: 2.0,
            jitter_ratio: 0.2,
            max_attempts: 0,
        }
    }
}

impl Backoff {
    /// Delay for the given zero-indexed attempt, with symmetric jitter
    /// derived deterministically from the attempt number (no global RNG
    /// state, so this stays a pure function).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_ms = self.initial.as_millis() as f64;
        let delay_ms = base_ms * self.factor.powi(attempt as i32);
        let capped_ms = delay_ms.min(self.max.as_millis() as f64);
        let jitter_span = capped_ms * self.jitter_ratio;
        let signed_fraction = pseudo_random_signed_fraction(attempt);
        let jittered_ms = (capped_ms + jitter_span * signed_fraction).max(0.0);
        Duration::from_millis(jittered_ms as u64)
    }

    pub fn should_give_up(&self, attempt: u32) -> bool {
        self.max_attempts > 0 && attempt >= self.max_attempts
    }
}

/// Deterministic pseudo-random value in `[-1.0, 1.0)`, keyed on `attempt`.
fn pseudo_random_signed_fraction(attempt: u32) -> f64 {
    let hash = attempt.wrapping_mul(2654435761).wrapping_add(0x9E3779B9);
    let unit = (hash as f64) / (u32::MAX as f64);
    unit * 2.0 - 1.0
}
