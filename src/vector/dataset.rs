//! Scoped on-disk datasets for intermediate results.
//!
//! A [`TempDataset`] owns a uniquely named temporary directory holding the
//! companion files of one layer. Dropping the dataset removes the
//! directory, so intermediates never outlive the run that created them,
//! whether it succeeds, fails or is cancelled.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use tracing::debug;

use super::{read_geojson, write_geojson, Field, VectorError, VectorLayer};
use crate::geometry::SpatialRef;

/// Contents of the metadata sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub layer_name: String,
    pub feature_count: usize,
    pub fields: Vec<Field>,
    /// Free-form description of what produced the dataset.
    pub source: String,
}

/// An intermediate layer stored on disk for the lifetime of the guard.
#[derive(Debug)]
pub struct TempDataset {
    dir: TempDir,
    stem: String,
}

impl TempDataset {
    /// Creates an empty dataset directory.
    ///
    /// # Arguments
    /// * `stem` - Base name of the companion files (e.g. `value_points`)
    /// * `work_dir` - Parent directory; the system temp dir when `None`
    pub fn create(stem: &str, work_dir: Option<&Path>) -> io::Result<Self> {
        let prefix = format!("{stem}_");
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix);
        let dir = match work_dir {
            Some(parent) => builder.tempdir_in(parent)?,
            None => builder.tempdir()?,
        };
        debug!("Created intermediate dataset directory {}", dir.path().display());
        Ok(Self { dir, stem: stem.to_string() })
    }

    /// Directory holding the companion files.
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Geometry and attribute file.
    pub fn geometry_path(&self) -> PathBuf {
        self.dir.path().join(format!("{}.geojson", self.stem))
    }

    /// Spatial reference sidecar.
    pub fn projection_path(&self) -> PathBuf {
        self.dir.path().join(format!("{}.prj", self.stem))
    }

    /// Metadata sidecar.
    pub fn metadata_path(&self) -> PathBuf {
        self.dir.path().join(format!("{}.meta.json", self.stem))
    }

    /// All companion file paths.
    pub fn companion_files(&self) -> [PathBuf; 3] {
        [self.geometry_path(), self.projection_path(), self.metadata_path()]
    }

    /// Writes a layer and its sidecars, replacing any previous contents.
    pub fn write(&self, layer: &VectorLayer, source: &str) -> Result<(), VectorError> {
        write_geojson(layer, &self.geometry_path())?;
        fs::write(self.projection_path(), layer.spatial_ref().to_prj())?;

        let metadata = DatasetMetadata {
            layer_name: layer.name().to_string(),
            feature_count: layer.len(),
            fields: layer.fields().to_vec(),
            source: source.to_string(),
        };
        fs::write(self.metadata_path(), serde_json::to_vec_pretty(&metadata)?)?;
        Ok(())
    }

    /// Reads the metadata sidecar.
    pub fn metadata(&self) -> Result<DatasetMetadata, VectorError> {
        let bytes = fs::read(self.metadata_path())?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Reads the layer back using the schema and spatial reference stored
    /// in the sidecars.
    pub fn read(&self) -> Result<VectorLayer, VectorError> {
        let metadata = self.metadata()?;
        let layer = read_geojson(&self.geometry_path(), Some(&metadata.fields))?;
        if layer.len() != metadata.feature_count {
            return Err(VectorError::SchemaMismatch(format!(
                "metadata lists {} features, file has {}",
                metadata.feature_count,
                layer.len()
            )));
        }

        let prj = fs::read_to_string(self.projection_path())?;
        let mut out = VectorLayer::new(metadata.layer_name, SpatialRef::from_prj(&prj), metadata.fields);
        for feature in layer.into_features() {
            out.push(feature);
        }
        Ok(out)
    }

    /// Deletes the dataset now, reporting any filesystem error.
    ///
    /// Dropping the guard also deletes it, but silently.
    pub fn close(self) -> io::Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close()?;
        debug!("Removed intermediate dataset directory {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Geometry;
    use crate::vector::{Feature, FieldKind, FieldValue};
    use glam::DVec2;
    use tempfile::tempdir;

    fn value_points() -> VectorLayer {
        let mut layer = VectorLayer::new(
            "value_points",
            SpatialRef::Wkt(r#"PROJCS["Local grid"]"#.into()),
            vec![Field::new("id", FieldKind::Integer), Field::new("classes", FieldKind::Real)],
        );
        for i in 0..3 {
            layer.push(Feature::new(
                i,
                Geometry::Point(DVec2::new(i as f64, 2.0 * i as f64)),
                vec![FieldValue::Integer(i as i64), FieldValue::Real(i as f64 + 1.0)],
            ));
        }
        layer
    }

    #[test]
    fn test_write_read_round_trip() {
        let work = tempdir().unwrap();
        let dataset = TempDataset::create("value_points", Some(work.path())).unwrap();
        let layer = value_points();

        dataset.write(&layer, "test").unwrap();
        for file in dataset.companion_files() {
            assert!(file.exists(), "Missing companion file {:?}", file);
        }

        let back = dataset.read().unwrap();
        assert_eq!(back, layer);
        assert_eq!(dataset.metadata().unwrap().source, "test");
    }

    #[test]
    fn test_unique_directories() {
        let work = tempdir().unwrap();
        let a = TempDataset::create("value_points", Some(work.path())).unwrap();
        let b = TempDataset::create("value_points", Some(work.path())).unwrap();
        assert_ne!(a.dir(), b.dir());
        assert!(a.dir().file_name().unwrap().to_string_lossy().starts_with("value_points_"));
    }

    #[test]
    fn test_drop_removes_files() {
        let work = tempdir().unwrap();
        let dataset = TempDataset::create("value_points", Some(work.path())).unwrap();
        dataset.write(&value_points(), "test").unwrap();
        let dir = dataset.dir().to_path_buf();

        drop(dataset);
        assert!(!dir.exists());
        assert_eq!(fs::read_dir(work.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_close_removes_files() {
        let work = tempdir().unwrap();
        let dataset = TempDataset::create("value_points", Some(work.path())).unwrap();
        dataset.write(&value_points(), "test").unwrap();
        let files = dataset.companion_files();

        dataset.close().unwrap();
        for file in files {
            assert!(!file.exists());
        }
    }
}
