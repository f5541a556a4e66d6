//! The training sample generator as a processing algorithm.
//!
//! Declares the algorithm's metadata and parameters and wires validated
//! parameter values into the stage pipeline.

mod generator;
pub mod parameters;

pub use generator::{AlgorithmInfo, ProcessingError, ProcessingResults, TrainingSampleGenerator, ALGORITHM_INFO};
pub use parameters::{ParameterDefinition, ParameterError, ParameterKind, Parameters};
