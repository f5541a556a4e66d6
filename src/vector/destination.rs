//! Output destinations for vector layers.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::{write_geojson, VectorError, VectorLayer};

const MEMORY_PREFIX: &str = "memory:";

/// Where a layer is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Kept in memory and returned to the caller.
    Memory,
    /// Written to a GeoJSON file.
    File(PathBuf),
}

/// A reference to a written layer.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerRef {
    Memory(VectorLayer),
    File(PathBuf),
}

impl LayerRef {
    pub fn as_memory(&self) -> Option<&VectorLayer> {
        match self {
            LayerRef::Memory(layer) => Some(layer),
            LayerRef::File(_) => None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            LayerRef::File(path) => Some(path),
            LayerRef::Memory(_) => None,
        }
    }
}

impl fmt::Display for LayerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerRef::Memory(layer) => write!(f, "{MEMORY_PREFIX}{}", layer.name()),
            LayerRef::File(path) => write!(f, "{}", path.display()),
        }
    }
}

impl Destination {
    /// Checks that the destination can be written before any work is done.
    pub fn validate(&self) -> Result<(), VectorError> {
        match self {
            Destination::Memory => Ok(()),
            Destination::File(path) => {
                let ext = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(str::to_ascii_lowercase);
                match ext.as_deref() {
                    Some("geojson") | Some("json") => Ok(()),
                    _ => Err(VectorError::UnsupportedFormat(path.clone())),
                }
            }
        }
    }

    /// Writes a layer and returns a reference to it.
    pub fn write(&self, layer: VectorLayer) -> Result<LayerRef, VectorError> {
        self.validate()?;
        match self {
            Destination::Memory => Ok(LayerRef::Memory(layer)),
            Destination::File(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                write_geojson(&layer, path)?;
                Ok(LayerRef::File(path.clone()))
            }
        }
    }
}

impl FromStr for Destination {
    type Err = VectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(VectorError::EmptyDestination);
        }
        if s.starts_with(MEMORY_PREFIX) {
            return Ok(Destination::Memory);
        }
        Ok(Destination::File(PathBuf::from(s)))
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Memory => write!(f, "{MEMORY_PREFIX}"),
            Destination::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::SpatialRef;
    use tempfile::tempdir;

    #[test]
    fn test_parse_destination() {
        assert_eq!("memory:".parse::<Destination>().unwrap(), Destination::Memory);
        assert_eq!("memory:samples".parse::<Destination>().unwrap(), Destination::Memory);
        assert_eq!(
            "out/samples.geojson".parse::<Destination>().unwrap(),
            Destination::File(PathBuf::from("out/samples.geojson"))
        );
        assert!(matches!("  ".parse::<Destination>(), Err(VectorError::EmptyDestination)));
    }

    #[test]
    fn test_validate_extension() {
        assert!(Destination::File("a.GeoJSON".into()).validate().is_ok());
        assert!(Destination::File("a.json".into()).validate().is_ok());
        assert!(matches!(
            Destination::File("a.shp".into()).validate(),
            Err(VectorError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_write_file_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("out.geojson");
        let layer = VectorLayer::new("Buffered", SpatialRef::Unknown, Vec::new());

        let written = Destination::File(path.clone()).write(layer).unwrap();
        assert_eq!(written.path(), Some(path.as_path()));
        assert!(path.exists());
    }
}
