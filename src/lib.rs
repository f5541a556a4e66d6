//! Random training sample generator for raster classification.
//!
//! This crate turns a single-band classified raster into a layer of small
//! polygons placed at random, spaced locations, each carrying the raster
//! class found under it. Generation runs as a pipeline of four stages:
//! raster extent, random points, value sampling and buffering.

pub mod algorithm;
pub mod config;
pub mod geometry;
pub mod pipeline;
pub mod raster;
pub mod sampling;
pub mod vector;

pub use algorithm::{Parameters, ProcessingError, ProcessingResults, TrainingSampleGenerator};
pub use config::GeneratorConfig;
pub use geometry::{buffer_layer, extent_to_polygon, BufferOptions};
pub use pipeline::{CancellationToken, Feedback, LogFeedback, Pipeline, PipelineError};
pub use raster::{sample_raster_at_points, Raster, Resampling};
pub use sampling::random_points_in_bounds;
pub use vector::{Destination, LayerRef, VectorLayer};
