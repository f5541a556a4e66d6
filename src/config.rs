//! Generator configuration loaded from TOML.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::BufferOptions;
use crate::raster::Resampling;
use crate::sampling::SamplingConfig;

/// Settings for the value extraction stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Name of the sampled value attribute; defaults to the raster name.
    pub field_name: Option<String>,
    /// Overrides the raster's own no-data value.
    pub nodata: Option<f64>,
    pub resampling: Resampling,
}

/// Complete configuration for one generator run.
///
/// Every section is optional in the file; missing values take the
/// defaults of the processing algorithm.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Parent directory for intermediate datasets (system temp dir if unset).
    pub work_dir: Option<PathBuf>,
    pub sampling: SamplingConfig,
    pub extraction: ExtractionConfig,
    pub buffer: BufferOptions,
}

impl GeneratorConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_owned(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_owned(),
            source: e,
        })
    }

    /// A fully spelled-out configuration, for use as a template.
    pub fn example() -> Self {
        Self {
            work_dir: None,
            sampling: SamplingConfig::seeded(42),
            extraction: ExtractionConfig::default(),
            buffer: BufferOptions::default(),
        }
    }

    /// Serializes the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
