//! Processing stage trait and pipeline orchestration.

use std::path::PathBuf;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::{debug, info};

use super::{Feedback, StepFeedback, Workspace};
use crate::geometry::{buffer_layer, extent_to_polygon, BufferOptions, GeometryError};
use crate::raster::{sample_raster_at_points, value_field_name, RasterError, Resampling};
use crate::sampling::{random_points_with_budget, SamplingConfig, SamplingError};
use crate::vector::{Destination, TempDataset, VectorError};

/// Unique identifier for processing stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageId {
    /// Raster extent to polygon.
    Extent,
    /// Random points within the extent.
    RandomPoints,
    /// Raster values at the points.
    SampleValues,
    /// Points to polygons.
    Buffer,
}

impl StageId {
    /// Returns the name of the stage.
    pub fn name(&self) -> &'static str {
        match self {
            StageId::Extent => "extent",
            StageId::RandomPoints => "random_points",
            StageId::SampleValues => "sample_values",
            StageId::Buffer => "buffer",
        }
    }

    /// State reached once this stage has completed.
    pub fn completed_state(&self) -> PipelineState {
        match self {
            StageId::Extent => PipelineState::ExtentDone,
            StageId::RandomPoints => PipelineState::PointsDone,
            StageId::SampleValues => PipelineState::ValuesDone,
            StageId::Buffer => PipelineState::Buffered,
        }
    }

    /// Wraps a stage's own error into a [`PipelineError`].
    fn fail<E: Into<StageError>>(self) -> impl FnOnce(E) -> PipelineError {
        move |e| PipelineError::StageFailed {
            stage: self.name(),
            source: e.into(),
        }
    }
}

/// Progress of a run through the stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineState {
    #[default]
    Init,
    ExtentDone,
    PointsDone,
    ValuesDone,
    Buffered,
    Cancelled,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Buffered | PipelineState::Cancelled)
    }
}

/// How a run ended, when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    Cancelled,
}

/// The error a stage's underlying operation produced.
#[derive(Error, Debug)]
pub enum StageError {
    #[error(transparent)]
    Raster(#[from] RasterError),
    #[error(transparent)]
    Sampling(#[from] SamplingError),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    Vector(#[from] VectorError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur during pipeline execution.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Stage '{stage}' failed: {source}")]
    StageFailed {
        stage: &'static str,
        #[source]
        source: StageError,
    },
    #[error("Missing dependency: stage '{0}' requires '{1}'")]
    MissingDependency(String, String),
    #[error("Stage '{stage}' found no {what} in the workspace")]
    MissingInput {
        stage: &'static str,
        what: &'static str,
    },
}

/// Trait for implementing processing stages.
///
/// Each stage reads its input from the [`Workspace`], runs one
/// geoprocessing operation and stores the result back for the next stage.
pub trait ProcessingStage: Send + Sync {
    /// Returns the unique identifier for this stage.
    fn id(&self) -> StageId;

    /// Returns a human-readable name for the stage.
    fn name(&self) -> &str;

    /// Returns the stage IDs that must be executed before this stage.
    fn dependencies(&self) -> &[StageId] {
        &[]
    }

    /// Executes the stage.
    ///
    /// # Arguments
    /// * `workspace` - Run state holding the previous stages' outputs
    /// * `feedback` - Progress and cancellation for this stage
    fn execute(&self, workspace: &mut Workspace, feedback: &dyn Feedback) -> Result<(), PipelineError>;
}

/// Runs processing stages in order over one workspace.
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn ProcessingStage>>,
}

impl Pipeline {
    /// Creates a new empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a stage to the pipeline.
    pub fn add_stage<S: ProcessingStage + 'static>(&mut self, stage: S) -> &mut Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Returns the number of stages in the pipeline.
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Executes all stages in order.
    ///
    /// Cancellation is checked before every stage. Whatever the outcome,
    /// the workspace's on-disk intermediates are deleted before returning.
    pub fn run(&self, workspace: &mut Workspace, feedback: &dyn Feedback) -> Result<RunStatus, PipelineError> {
        self.run_with_callbacks(workspace, feedback, |_, _, _| {}, |_, _, _| {})
    }

    /// Executes all stages with progress callbacks.
    ///
    /// # Arguments
    /// * `workspace` - Run state
    /// * `feedback` - Progress and cancellation
    /// * `on_stage_start` - Called when each stage begins
    /// * `on_stage_complete` - Called when each stage finishes
    pub fn run_with_callbacks<F1, F2>(
        &self,
        workspace: &mut Workspace,
        feedback: &dyn Feedback,
        on_stage_start: F1,
        on_stage_complete: F2,
    ) -> Result<RunStatus, PipelineError>
    where
        F1: FnMut(&str, usize, usize),
        F2: FnMut(&str, usize, usize),
    {
        let result = self.run_stages(workspace, feedback, on_stage_start, on_stage_complete);
        workspace.release_intermediates();
        if let Ok(RunStatus::Cancelled) = result {
            workspace.state = PipelineState::Cancelled;
        }
        result
    }

    fn run_stages<F1, F2>(
        &self,
        workspace: &mut Workspace,
        feedback: &dyn Feedback,
        mut on_stage_start: F1,
        mut on_stage_complete: F2,
    ) -> Result<RunStatus, PipelineError>
    where
        F1: FnMut(&str, usize, usize),
        F2: FnMut(&str, usize, usize),
    {
        let total = self.stages.len();
        let mut completed: Vec<StageId> = Vec::new();

        for (i, stage) in self.stages.iter().enumerate() {
            if feedback.is_canceled() {
                info!("Cancelled before stage '{}'", stage.name());
                return Ok(RunStatus::Cancelled);
            }

            // Check dependencies
            for dep in stage.dependencies() {
                if !completed.contains(dep) {
                    return Err(PipelineError::MissingDependency(
                        stage.name().to_string(),
                        dep.name().to_string(),
                    ));
                }
            }

            on_stage_start(stage.name(), i, total);
            info!("[{}/{}] {}", i + 1, total, stage.name());

            stage.execute(workspace, &StepFeedback::new(feedback, i, total))?;
            completed.push(stage.id());
            workspace.state = stage.id().completed_state();
            feedback.set_progress((i + 1) as f64 / total as f64 * 100.0);

            on_stage_complete(stage.name(), i, total);
        }

        Ok(RunStatus::Completed)
    }
}

/// Computes the raster's bounding polygon.
pub struct ExtentStage;

impl ProcessingStage for ExtentStage {
    fn id(&self) -> StageId {
        StageId::Extent
    }

    fn name(&self) -> &str {
        "Raster Extent"
    }

    fn execute(&self, workspace: &mut Workspace, _feedback: &dyn Feedback) -> Result<(), PipelineError> {
        let layer = extent_to_polygon(&workspace.raster).map_err(self.id().fail())?;
        workspace.extent = Some(layer);
        Ok(())
    }
}

/// Places random points inside the extent polygon.
pub struct RandomPointsStage {
    /// Minimum distance between points, in map units.
    pub min_distance: f64,
    /// Requested number of points.
    pub count: u32,
    /// Seed for the point generator.
    pub seed: u64,
    /// Candidates drawn before giving up on reaching `count`.
    pub max_attempts: u64,
}

impl RandomPointsStage {
    /// Creates a stage using the sampling configuration's attempt budget.
    pub fn new(min_distance: f64, count: u32, seed: u64, config: &SamplingConfig) -> Self {
        Self {
            min_distance,
            count,
            seed,
            max_attempts: config.attempt_budget(count),
        }
    }
}

impl ProcessingStage for RandomPointsStage {
    fn id(&self) -> StageId {
        StageId::RandomPoints
    }

    fn name(&self) -> &str {
        "Random Points"
    }

    fn dependencies(&self) -> &[StageId] {
        &[StageId::Extent]
    }

    fn execute(&self, workspace: &mut Workspace, feedback: &dyn Feedback) -> Result<(), PipelineError> {
        let extent = workspace.extent.take().ok_or(PipelineError::MissingInput {
            stage: self.id().name(),
            what: "extent layer",
        })?;

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let points =
            random_points_with_budget(&extent, self.min_distance, self.count, self.max_attempts, &mut rng, feedback)
                .map_err(self.id().fail())?;
        workspace.points = Some(points);
        Ok(())
    }
}

/// Samples the raster under each point into an on-disk dataset.
pub struct SampleValuesStage {
    pub resampling: Resampling,
    /// Attribute name; defaults to the truncated raster name.
    pub field_name: Option<String>,
    /// Parent directory for the intermediate dataset.
    pub work_dir: Option<PathBuf>,
}

impl Default for SampleValuesStage {
    fn default() -> Self {
        Self {
            resampling: Resampling::NearestNeighbour,
            field_name: None,
            work_dir: None,
        }
    }
}

impl ProcessingStage for SampleValuesStage {
    fn id(&self) -> StageId {
        StageId::SampleValues
    }

    fn name(&self) -> &str {
        "Sample Raster Values"
    }

    fn dependencies(&self) -> &[StageId] {
        &[StageId::RandomPoints]
    }

    fn execute(&self, workspace: &mut Workspace, _feedback: &dyn Feedback) -> Result<(), PipelineError> {
        let points = workspace.points.take().ok_or(PipelineError::MissingInput {
            stage: self.id().name(),
            what: "point layer",
        })?;

        let field = self
            .field_name
            .clone()
            .unwrap_or_else(|| value_field_name(workspace.raster.name()));
        let dataset = TempDataset::create("value_points", self.work_dir.as_deref()).map_err(self.id().fail())?;
        sample_raster_at_points(&points, &workspace.raster, self.resampling, &field, &dataset)
            .map_err(self.id().fail())?;

        debug!("Value points written to {}", dataset.geometry_path().display());
        workspace.value_points = Some(dataset);
        Ok(())
    }
}

/// Buffers the value points into the final polygon layer.
pub struct BufferStage {
    pub options: BufferOptions,
    pub destination: Destination,
}

impl BufferStage {
    pub fn new(options: BufferOptions, destination: Destination) -> Self {
        Self { options, destination }
    }
}

impl ProcessingStage for BufferStage {
    fn id(&self) -> StageId {
        StageId::Buffer
    }

    fn name(&self) -> &str {
        "Buffer Points"
    }

    fn dependencies(&self) -> &[StageId] {
        &[StageId::SampleValues]
    }

    fn execute(&self, workspace: &mut Workspace, _feedback: &dyn Feedback) -> Result<(), PipelineError> {
        let dataset = workspace.value_points.as_ref().ok_or(PipelineError::MissingInput {
            stage: self.id().name(),
            what: "value point dataset",
        })?;

        let points = dataset.read().map_err(self.id().fail())?;
        let output = buffer_layer(&points, &self.options, &self.destination).map_err(self.id().fail())?;
        workspace.output = Some(output);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Geometry;
    use crate::pipeline::{CancellationToken, LogFeedback};
    use crate::raster::{GeoTransform, Raster};
    use crate::vector::FieldValue;
    use tempfile::tempdir;

    /// 20x20 raster of 1 m cells with four class quadrants.
    fn quadrant_raster() -> Raster {
        let mut values = Vec::with_capacity(400);
        for row in 0..20 {
            for col in 0..20 {
                values.push(match (col < 10, row < 10) {
                    (true, true) => 1.0,
                    (false, true) => 2.0,
                    (true, false) => 3.0,
                    (false, false) => 4.0,
                });
            }
        }
        Raster::new("quadrants", 20, 20, values, GeoTransform::pixel_space(20)).unwrap()
    }

    fn full_pipeline(work_dir: PathBuf, buffer_distance: f64) -> Pipeline {
        let mut pipeline = Pipeline::new();
        pipeline
            .add_stage(ExtentStage)
            .add_stage(RandomPointsStage::new(1.0, 15, 42, &SamplingConfig::default()))
            .add_stage(SampleValuesStage {
                work_dir: Some(work_dir),
                ..Default::default()
            })
            .add_stage(BufferStage::new(
                BufferOptions { distance: buffer_distance, ..Default::default() },
                Destination::Memory,
            ));
        pipeline
    }

    #[test]
    fn test_stage_id_name() {
        assert_eq!(StageId::Extent.name(), "extent");
        assert_eq!(StageId::SampleValues.name(), "sample_values");
        assert_eq!(StageId::Buffer.completed_state(), PipelineState::Buffered);
        assert!(PipelineState::Cancelled.is_terminal());
        assert!(!PipelineState::ValuesDone.is_terminal());
    }

    #[test]
    fn test_pipeline_execution() {
        let work = tempdir().unwrap();
        let pipeline = full_pipeline(work.path().to_path_buf(), 0.5);
        assert_eq!(pipeline.stage_count(), 4);

        let mut ws = Workspace::new(quadrant_raster());
        let status = pipeline.run(&mut ws, &LogFeedback::default()).unwrap();

        assert_eq!(status, RunStatus::Completed);
        assert_eq!(ws.state, PipelineState::Buffered);
        assert!(ws.value_points.is_none(), "intermediate should be released");
        assert_eq!(std::fs::read_dir(work.path()).unwrap().count(), 0);

        let layer = ws.output.as_ref().unwrap().as_memory().unwrap();
        assert_eq!(layer.len(), 15);
        for feature in layer.features() {
            let poly = feature.geometry.as_polygon().unwrap();
            let centre = poly.centroid().unwrap();
            let expected = ws.raster.sample(centre, Resampling::NearestNeighbour).unwrap();
            assert_eq!(layer.value(feature, "quadrants"), Some(&FieldValue::Real(expected)));
        }
    }

    #[test]
    fn test_pipeline_with_callbacks() {
        let work = tempdir().unwrap();
        let pipeline = full_pipeline(work.path().to_path_buf(), 0.5);
        let mut ws = Workspace::new(quadrant_raster());
        let mut started = Vec::new();
        let mut completed = 0;

        pipeline
            .run_with_callbacks(
                &mut ws,
                &LogFeedback::default(),
                |name, _, total| {
                    assert_eq!(total, 4);
                    started.push(name.to_string());
                },
                |_, _, _| completed += 1,
            )
            .unwrap();

        assert_eq!(started, vec!["Raster Extent", "Random Points", "Sample Raster Values", "Buffer Points"]);
        assert_eq!(completed, 4);
    }

    #[test]
    fn test_cancel_before_first_stage() {
        let work = tempdir().unwrap();
        let pipeline = full_pipeline(work.path().to_path_buf(), 0.5);
        let token = CancellationToken::new();
        token.cancel();
        let mut ws = Workspace::new(quadrant_raster());
        let mut started = 0;

        let status = pipeline
            .run_with_callbacks(&mut ws, &LogFeedback::new(token), |_, _, _| started += 1, |_, _, _| {})
            .unwrap();

        assert_eq!(status, RunStatus::Cancelled);
        assert_eq!(started, 0);
        assert_eq!(ws.state, PipelineState::Cancelled);
        assert!(ws.extent.is_none());
    }

    #[test]
    fn test_cancel_after_sampling_removes_intermediate() {
        let work = tempdir().unwrap();
        let pipeline = full_pipeline(work.path().to_path_buf(), 0.5);
        let token = CancellationToken::new();
        let feedback = LogFeedback::new(token.clone());
        let mut ws = Workspace::new(quadrant_raster());
        let mut intermediate_seen = false;

        let status = pipeline
            .run_with_callbacks(
                &mut ws,
                &feedback,
                |_, _, _| {},
                |name, _, _| {
                    if name == "Sample Raster Values" {
                        intermediate_seen = std::fs::read_dir(work.path()).unwrap().count() == 1;
                        token.cancel();
                    }
                },
            )
            .unwrap();

        assert_eq!(status, RunStatus::Cancelled);
        assert!(intermediate_seen, "dataset should exist until the run ends");
        assert!(ws.output.is_none());
        assert_eq!(std::fs::read_dir(work.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_dependency() {
        let mut pipeline = Pipeline::new();
        pipeline.add_stage(BufferStage::new(BufferOptions::default(), Destination::Memory));

        let mut ws = Workspace::new(quadrant_raster());
        let err = pipeline.run(&mut ws, &LogFeedback::default()).unwrap_err();
        assert!(matches!(err, PipelineError::MissingDependency(_, ref dep) if dep == "sample_values"));
    }

    #[test]
    fn test_stage_failure_removes_intermediate() {
        let work = tempdir().unwrap();
        let blocker = work.path().join("not_a_dir");
        std::fs::write(&blocker, b"").unwrap();

        let mut pipeline = Pipeline::new();
        pipeline
            .add_stage(ExtentStage)
            .add_stage(RandomPointsStage::new(1.0, 5, 1, &SamplingConfig::default()))
            .add_stage(SampleValuesStage {
                work_dir: Some(work.path().to_path_buf()),
                ..Default::default()
            })
            .add_stage(BufferStage::new(
                BufferOptions::default(),
                Destination::File(blocker.join("out.geojson")),
            ));

        let mut ws = Workspace::new(quadrant_raster());
        let err = pipeline.run(&mut ws, &LogFeedback::default()).unwrap_err();
        assert!(matches!(err, PipelineError::StageFailed { stage: "buffer", .. }));
        assert_eq!(ws.state, PipelineState::ValuesDone);

        // Only the blocking file remains.
        assert_eq!(std::fs::read_dir(work.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_extent_stage_output() {
        let mut ws = Workspace::new(quadrant_raster());
        ExtentStage.execute(&mut ws, &LogFeedback::default()).unwrap();
        let layer = ws.extent.as_ref().unwrap();
        assert!(matches!(layer.features()[0].geometry, Geometry::Polygon(_)));
        assert_eq!(layer.extent(), Some(ws.raster.extent()));
    }
}
