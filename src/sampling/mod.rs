//! Spatially constrained random point generation.

mod config;
mod grid_index;
mod random_points;

use thiserror::Error;

pub use config::{SamplingConfig, DEFAULT_ATTEMPTS_PER_POINT};
pub use grid_index::PointGrid;
pub use random_points::{random_points_in_bounds, random_points_with_budget};

/// Errors raised by the point sampler.
#[derive(Error, Debug)]
pub enum SamplingError {
    #[error("Minimum distance must be finite and non-negative, got {0}")]
    InvalidDistance(f64),
    #[error("Layer '{0}' has no extent to sample in")]
    EmptyBounds(String),
}
