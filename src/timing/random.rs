//! Bounded-random delay and jitter generators.
//!
//! Every delay in the crate is drawn through a `Randomizer` so that a test
//! can seed it and replay the exact same plan.

use std::time::Duration;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::sleep;

/// Seedable random source for delays, jitter and weighted choices.
pub struct Randomizer {
    rng: StdRng,
}

impl Randomizer {
    /// Create a randomizer seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self { rng: StdRng::from_entropy() }
    }

    /// Create a deterministic randomizer from a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }

    /// Draw a duration uniformly from `[min_ms, max_ms]`.
    pub fn delay_ms(&mut self, min_ms: u64, max_ms: u64) -> Duration {
        if min_ms >= max_ms {
            return Duration::from_millis(min_ms);
        }
        Duration::from_millis(self.rng.gen_range(min_ms..=max_ms))
    }

    /// Integer in `[min, max)`.
    pub fn range_u64(&mut self, min: u64, max: u64) -> u64 {
        if min >= max {
            return min;
        }
        self.rng.gen_range(min..max)
    }

    /// Integer in `[min, max)`.
    pub fn range_usize(&mut self, min: usize, max: usize) -> usize {
        if min >= max {
            return min;
        }
        self.rng.gen_range(min..max)
    }

    /// Float in `[min, max)`.
    pub fn range_f64(&mut self, min: f64, max: f64) -> f64 {
        if min >= max {
            return min;
        }
        self.rng.gen_range(min..max)
    }

    /// Bernoulli trial with probability `p` (clamped to [0, 1]).
    pub fn chance(&mut self, p: f64) -> bool {
        self.rng.gen_bool(p.clamp(0.0, 1.0))
    }

    /// Base duration with +/- `percent` jitter applied.
    pub fn jitter(&mut self, base_ms: u64, percent: u8) -> Duration {
        let jitter_range = base_ms * percent as u64 / 100;
        if jitter_range == 0 {
            return Duration::from_millis(base_ms);
        }
        let jitter = self.rng.gen_range(0..jitter_range * 2) as i64 - jitter_range as i64;
        Duration::from_millis((base_ms as i64 + jitter).max(0) as u64)
    }

    /// Pick an index with probability proportional to its weight.
    pub fn weighted_pick(&mut self, weights: &[u32]) -> usize {
        let total: u32 = weights.iter().sum();
        if total == 0 {
            return 0;
        }
        let mut roll = self.rng.gen_range(0..total);
        for (i, w) in weights.iter().enumerate() {
            if roll < *w {
                return i;
            }
            roll -= w;
        }
        weights.len() - 1
    }
}

/// Suspend the current task for `duration`. The single sleep point used by
/// all components, so nothing in the crate ever spins.
pub async fn pause(duration: Duration) {
    sleep(duration).await;
}

/// Exponential backoff with +/-20% jitter, capped at `max_ms`.
pub fn backoff_with_jitter(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    let base_delay = base_ms * 2u64.pow(attempt.saturating_sub(1).min(5));
    let capped_delay = base_delay.min(max_ms);

    let jitter_range = capped_delay / 5;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range * 2) as i64 - jitter_range as i64
    } else {
        0
    };

    Duration::from_millis((capped_delay as i64 + jitter).max(0) as u64)
}
