//! Pipeline module for orchestrating the sample generation stages.
//!
//! Provides a trait-based architecture for processing stages that share a
//! [`Workspace`] and a [`Feedback`] channel, and are run in order by a
//! [`Pipeline`].

mod feedback;
mod stage;
mod workspace;

pub use feedback::{CancellationToken, Feedback, LogFeedback, StepFeedback};
pub use stage::{
    BufferStage, ExtentStage, Pipeline, PipelineError, PipelineState, ProcessingStage, RandomPointsStage,
    RunStatus, SampleValuesStage, StageError, StageId,
};
pub use workspace::Workspace;
