//! The training sample generator: parameters in, buffered samples out.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use super::parameters::{self, ParameterDefinition, ParameterError, Parameters, INPUT, OUTPUT};
use crate::config::GeneratorConfig;
use crate::pipeline::{
    BufferStage, ExtentStage, Feedback, Pipeline, PipelineError, RandomPointsStage, RunStatus, SampleValuesStage,
    Workspace,
};
use crate::raster::{Raster, RasterError};
use crate::vector::{Destination, LayerRef};

/// Output layers keyed by output parameter name. Empty when cancelled.
pub type ProcessingResults = HashMap<String, LayerRef>;

/// Descriptive metadata shown by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlgorithmInfo {
    pub name: &'static str,
    pub display_name: &'static str,
    pub group: &'static str,
    pub group_id: &'static str,
    pub short_help: &'static str,
}

pub const ALGORITHM_INFO: AlgorithmInfo = AlgorithmInfo {
    name: "random_training_samples",
    display_name: "Training Samples Generator",
    group: "Example scripts",
    group_id: "examplescripts",
    short_help: "Creates random training sample data from an input raster. Number of samples and \
                 distance between samples can be specified. The output is in polygon format, for \
                 compatibility with machine learning classifiers. Distance input is float and number \
                 of points is integer. Input raster should be single band and classified.",
};

/// Errors that abort a generator run.
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error(transparent)]
    Parameter(#[from] ParameterError),
    #[error("Failed to load input raster {path:?}: {source}")]
    InputLoad {
        path: PathBuf,
        #[source]
        source: RasterError,
    },
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Generates random training sample polygons from a classified raster.
///
/// Runs the extent, random point, value sampling and buffer stages in
/// order. The intermediate value point dataset is always deleted before
/// [`process`](Self::process) returns.
#[derive(Debug, Clone, Default)]
pub struct TrainingSampleGenerator {
    config: GeneratorConfig,
}

impl TrainingSampleGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn info(&self) -> AlgorithmInfo {
        ALGORITHM_INFO
    }

    pub fn parameter_definitions(&self) -> Vec<ParameterDefinition> {
        parameters::parameter_definitions()
    }

    /// Runs the algorithm.
    ///
    /// # Returns
    /// `{"OUTPUT": layer}` on success, an empty map when cancelled
    pub fn process(&self, params: &Parameters, feedback: &dyn Feedback) -> Result<ProcessingResults, ProcessingError> {
        self.process_with_callbacks(params, feedback, |_, _, _| {}, |_, _, _| {})
    }

    /// Runs the algorithm with stage start/complete callbacks.
    pub fn process_with_callbacks<F1, F2>(
        &self,
        params: &Parameters,
        feedback: &dyn Feedback,
        on_stage_start: F1,
        on_stage_complete: F2,
    ) -> Result<ProcessingResults, ProcessingError>
    where
        F1: FnMut(&str, usize, usize),
        F2: FnMut(&str, usize, usize),
    {
        params.validate()?;
        let input = params.input.as_deref().ok_or(ParameterError::Missing(INPUT))?;
        let output = params.output.as_ref().ok_or(ParameterError::Missing(OUTPUT))?;

        let raster = self.load_raster(input)?;
        let seed = self.config.sampling.seed.unwrap_or_else(rand::random);
        info!(
            "Generating {} samples from '{}' (min distance {}, seed {})",
            params.number_of_points,
            raster.name(),
            params.distance_between_points,
            seed
        );

        let pipeline = self.build_pipeline(params, output.clone(), seed);
        let mut workspace = Workspace::new(raster);
        let status = pipeline.run_with_callbacks(&mut workspace, feedback, on_stage_start, on_stage_complete)?;

        let mut results = ProcessingResults::new();
        match (status, workspace.output.take()) {
            (RunStatus::Completed, Some(layer)) => {
                debug!("Output written to {}", layer);
                results.insert(OUTPUT.to_string(), layer);
            }
            _ => info!("Run cancelled, no output produced"),
        }
        Ok(results)
    }

    fn load_raster(&self, path: &Path) -> Result<Raster, ProcessingError> {
        let raster = Raster::open(path).map_err(|source| ProcessingError::InputLoad {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(match self.config.extraction.nodata {
            Some(nodata) => raster.with_nodata(nodata),
            None => raster,
        })
    }

    fn build_pipeline(&self, params: &Parameters, output: Destination, seed: u64) -> Pipeline {
        let mut pipeline = Pipeline::new();
        pipeline
            .add_stage(ExtentStage)
            .add_stage(RandomPointsStage::new(
                params.distance_between_points,
                params.number_of_points,
                seed,
                &self.config.sampling,
            ))
            .add_stage(SampleValuesStage {
                resampling: self.config.extraction.resampling,
                field_name: self.config.extraction.field_name.clone(),
                work_dir: self.config.work_dir.clone(),
            })
            .add_stage(BufferStage::new(self.config.buffer.clone(), output));
        pipeline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::LogFeedback;
    use crate::sampling::SamplingConfig;
    use image::{GrayImage, Luma};
    use tempfile::tempdir;

    fn write_png(dir: &std::path::Path) -> PathBuf {
        let path = dir.join("landcover.png");
        let img = GrayImage::from_fn(30, 30, |x, _| Luma([if x < 15 { 1 } else { 2 }]));
        img.save(&path).unwrap();
        std::fs::write(dir.join("landcover.pgw"), "1\n0\n0\n-1\n0.5\n29.5\n").unwrap();
        path
    }

    fn generator(work_dir: &std::path::Path) -> TrainingSampleGenerator {
        TrainingSampleGenerator::new(GeneratorConfig {
            work_dir: Some(work_dir.to_path_buf()),
            sampling: SamplingConfig::seeded(5),
            ..Default::default()
        })
    }

    #[test]
    fn test_info() {
        let info = TrainingSampleGenerator::default().info();
        assert_eq!(info.name, "random_training_samples");
        assert_eq!(info.display_name, "Training Samples Generator");
        assert_eq!(info.group_id, "examplescripts");
    }

    #[test]
    fn test_process_returns_output() {
        let dir = tempdir().unwrap();
        let work = tempdir().unwrap();
        let input = write_png(dir.path());

        let params = Parameters::new(&input, Destination::Memory).with_distance(2.0).with_points(10);
        let results = generator(work.path())
            .process(&params, &LogFeedback::default())
            .unwrap();

        let layer = results[OUTPUT].as_memory().unwrap();
        assert_eq!(layer.len(), 10);
        assert_eq!(layer.name(), "Buffered");
        assert!(layer.field_index("landcover").is_some());
    }

    #[test]
    fn test_invalid_parameters_fail_before_loading() {
        let work = tempdir().unwrap();
        let params = Parameters::new("/nonexistent.tif", Destination::Memory).with_points(0);
        let err = generator(work.path())
            .process(&params, &LogFeedback::default())
            .unwrap_err();
        assert!(matches!(err, ProcessingError::Parameter(ParameterError::InvalidPointCount(0))));
    }

    #[test]
    fn test_missing_input_file() {
        let work = tempdir().unwrap();
        let params = Parameters::new("/nonexistent/raster.tif", Destination::Memory);
        let err = generator(work.path())
            .process(&params, &LogFeedback::default())
            .unwrap_err();
        assert!(matches!(err, ProcessingError::InputLoad { .. }));
    }

    #[test]
    fn test_nodata_override() {
        let dir = tempdir().unwrap();
        let work = tempdir().unwrap();
        let input = write_png(dir.path());

        let mut config = generator(work.path()).config().clone();
        config.extraction.nodata = Some(2.0);
        config.extraction.field_name = Some("class".to_string());
        let params = Parameters::new(&input, Destination::Memory).with_distance(1.0).with_points(20);
        let results = TrainingSampleGenerator::new(config)
            .process(&params, &LogFeedback::default())
            .unwrap();

        let layer = results[OUTPUT].as_memory().unwrap();
        for feature in layer.features() {
            let centre = feature.geometry.as_polygon().unwrap().centroid().unwrap();
            let value = layer.value(feature, "class").unwrap();
            if centre.x < 15.0 {
                assert_eq!(value.as_f64(), Some(1.0));
            } else {
                assert!(value.is_null());
            }
        }
    }
}
