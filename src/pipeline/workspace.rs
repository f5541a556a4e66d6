//! Per-run state shared by the pipeline stages.

use tracing::warn;

use super::PipelineState;
use crate::raster::Raster;
use crate::vector::{LayerRef, TempDataset, VectorLayer};

/// Everything one run produces, stage by stage.
///
/// Each stage reads the output of the previous one and stores its own.
/// The workspace owns the on-disk intermediate dataset, so dropping it
/// removes any intermediate files still present.
#[derive(Debug)]
pub struct Workspace {
    /// Input raster, read-only for the whole run.
    pub raster: Raster,
    pub state: PipelineState,
    /// Bounding polygon of the raster (in memory).
    pub extent: Option<VectorLayer>,
    /// Randomly placed points (in memory).
    pub points: Option<VectorLayer>,
    /// Points with sampled raster values (on disk).
    pub value_points: Option<TempDataset>,
    /// Final buffered layer.
    pub output: Option<LayerRef>,
}

impl Workspace {
    pub fn new(raster: Raster) -> Self {
        Self {
            raster,
            state: PipelineState::Init,
            extent: None,
            points: None,
            value_points: None,
            output: None,
        }
    }

    /// Deletes the on-disk intermediate dataset, if any.
    ///
    /// Cleanup failures are logged, not returned.
    pub fn release_intermediates(&mut self) {
        if let Some(dataset) = self.value_points.take() {
            let dir = dataset.dir().to_path_buf();
            if let Err(e) = dataset.close() {
                warn!("Failed to remove intermediate dataset {}: {}", dir.display(), e);
            }
        }
    }
}
