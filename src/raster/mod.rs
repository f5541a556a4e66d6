//! Raster input: single-band grids, georeferencing and value sampling.
//!
//! GeoTIFFs are decoded with `tiff`, other single-channel images with
//! `image` plus a world file. Both produce a [`Raster`] holding band 1 as
//! `f64` values.

mod geotiff;
mod grid;
mod sample;
mod transform;
mod world_file;

use std::path::{Path, PathBuf};
use thiserror::Error;

pub use geotiff::read_geotiff;
pub use grid::Raster;
pub use sample::{sample_raster_at_points, value_field_name, Resampling, MAX_FIELD_NAME_LEN};
pub use transform::GeoTransform;
pub use world_file::{parse_world_file, read_image_raster, world_file_candidates};

use crate::geometry::SpatialRef;
use crate::vector::VectorError;

/// Errors that can occur loading or sampling rasters.
#[derive(Error, Debug)]
pub enum RasterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TIFF decoding error: {0}")]
    Tiff(#[from] tiff::TiffError),
    #[error("Image decoding error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Expected a single-band raster, got {0}")]
    UnsupportedColorType(String),
    #[error("Unsupported raster sample type")]
    UnsupportedSampleType,
    #[error("Invalid world file {path:?}: {reason}")]
    InvalidWorldFile { path: PathBuf, reason: String },
    #[error("Invalid georeferencing: {0}")]
    InvalidGeoreference(String),
    #[error("Rotated rasters are not supported")]
    RotatedRaster,
    #[error("Raster data has {actual} cells, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("Raster '{0}' has an empty extent")]
    EmptyExtent(String),
    #[error("Feature {0} is not a point")]
    NotAPoint(u64),
    #[error(transparent)]
    Vector(#[from] VectorError),
}

/// Layer name for a raster file: its file stem.
pub(crate) fn layer_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Spatial reference from a `.prj` sidecar next to `path`, if any.
pub(crate) fn sidecar_spatial_ref(path: &Path) -> Option<SpatialRef> {
    let text = std::fs::read_to_string(path.with_extension("prj")).ok()?;
    match SpatialRef::from_prj(&text) {
        SpatialRef::Unknown => None,
        srs => Some(srs),
    }
}
