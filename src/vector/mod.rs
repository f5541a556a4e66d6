//! Vector layers, GeoJSON I/O and output destinations.

mod dataset;
mod destination;
mod geojson;
mod layer;

use std::path::PathBuf;
use thiserror::Error;

pub use dataset::{DatasetMetadata, TempDataset};
pub use destination::{Destination, LayerRef};
pub use geojson::{layer_from_geojson, layer_to_geojson, read_geojson, write_geojson};
pub use layer::{Feature, Field, FieldKind, FieldValue, VectorLayer};

/// Errors that can occur reading or writing vector data.
#[derive(Error, Debug)]
pub enum VectorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid GeoJSON: {0}")]
    InvalidGeoJson(String),
    #[error("Unsupported geometry type: {0}")]
    UnsupportedGeometry(String),
    #[error("Unsupported output format for {0:?} (expected .geojson or .json)")]
    UnsupportedFormat(PathBuf),
    #[error("Output destination is empty")]
    EmptyDestination,
    #[error("Dataset does not match its metadata: {0}")]
    SchemaMismatch(String),
}
