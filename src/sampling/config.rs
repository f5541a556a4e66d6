//! Configuration for random point sampling.

use serde::{Deserialize, Serialize};

/// Attempts per requested point before the sampler gives up.
pub const DEFAULT_ATTEMPTS_PER_POINT: u32 = 200;

/// Configuration for the random point sampler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Random seed for reproducible sampling; drawn at random when unset.
    pub seed: Option<u64>,
    /// Candidate points tried per requested point.
    pub max_attempts_per_point: u32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            seed: None,
            max_attempts_per_point: DEFAULT_ATTEMPTS_PER_POINT,
        }
    }
}

impl SamplingConfig {
    /// Creates a seeded configuration.
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Default::default()
        }
    }

    /// Total attempt budget for `count` points.
    pub fn attempt_budget(&self, count: u32) -> u64 {
        u64::from(count) * u64::from(self.max_attempts_per_point.max(1))
    }
}
