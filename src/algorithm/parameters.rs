//! Algorithm parameters and their declarations.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::vector::{Destination, VectorError};

pub const INPUT: &str = "INPUT";
pub const OUTPUT: &str = "OUTPUT";
pub const DISTANCE_BETWEEN_POINTS: &str = "DISTANCE_BETWEEN_POINTS";
pub const NUMBER_OF_POINTS: &str = "NUMBER_OF_POINTS";

pub const DEFAULT_DISTANCE_BETWEEN_POINTS: f64 = 0.1;
pub const DEFAULT_NUMBER_OF_POINTS: u32 = 100;

/// Type and constraints of a declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterKind {
    /// Path to a single-band raster.
    RasterLayer,
    /// Where the final vector layer is written.
    VectorDestination,
    /// Distance in the linear unit of another (raster) parameter.
    Distance { default: f64, min: f64, parent: &'static str },
    /// Whole number with a lower bound.
    Integer { default: u32, min: u32 },
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterKind::RasterLayer => write!(f, "raster layer"),
            ParameterKind::VectorDestination => write!(f, "vector destination"),
            ParameterKind::Distance { default, min, parent } => {
                write!(f, "distance in {parent} units (default {default}, min {min})")
            }
            ParameterKind::Integer { default, min } => write!(f, "integer (default {default}, min {min})"),
        }
    }
}

/// A parameter as declared to the host.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: ParameterKind,
    pub optional: bool,
}

/// Declares the four parameters of the generator, in order.
pub fn parameter_definitions() -> Vec<ParameterDefinition> {
    vec![
        ParameterDefinition {
            name: INPUT,
            description: "Input Raster layer",
            kind: ParameterKind::RasterLayer,
            optional: false,
        },
        ParameterDefinition {
            name: OUTPUT,
            description: "Training Samples",
            kind: ParameterKind::VectorDestination,
            optional: false,
        },
        ParameterDefinition {
            name: DISTANCE_BETWEEN_POINTS,
            description: "Minimum distance between points",
            kind: ParameterKind::Distance {
                default: DEFAULT_DISTANCE_BETWEEN_POINTS,
                min: 0.0,
                parent: INPUT,
            },
            optional: false,
        },
        ParameterDefinition {
            name: NUMBER_OF_POINTS,
            description: "Number of points",
            kind: ParameterKind::Integer {
                default: DEFAULT_NUMBER_OF_POINTS,
                min: 1,
            },
            optional: false,
        },
    ]
}

/// Errors for invalid parameter values, raised before any stage runs.
#[derive(Error, Debug)]
pub enum ParameterError {
    #[error("Missing required parameter {0}")]
    Missing(&'static str),
    #[error("{DISTANCE_BETWEEN_POINTS} must be finite and non-negative, got {0}")]
    InvalidDistance(f64),
    #[error("{NUMBER_OF_POINTS} must be at least 1, got {0}")]
    InvalidPointCount(u32),
    #[error("Invalid {OUTPUT}: {0}")]
    InvalidOutput(#[source] VectorError),
}

/// Parameter values for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameters {
    pub input: Option<PathBuf>,
    pub output: Option<Destination>,
    pub distance_between_points: f64,
    pub number_of_points: u32,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            input: None,
            output: None,
            distance_between_points: DEFAULT_DISTANCE_BETWEEN_POINTS,
            number_of_points: DEFAULT_NUMBER_OF_POINTS,
        }
    }
}

impl Parameters {
    /// Creates parameters with the given input and output and default values.
    pub fn new(input: impl Into<PathBuf>, output: Destination) -> Self {
        Self {
            input: Some(input.into()),
            output: Some(output),
            ..Default::default()
        }
    }

    pub fn with_distance(mut self, distance: f64) -> Self {
        self.distance_between_points = distance;
        self
    }

    pub fn with_points(mut self, count: u32) -> Self {
        self.number_of_points = count;
        self
    }

    /// Checks every parameter value.
    pub fn validate(&self) -> Result<(), ParameterError> {
        if self.input.is_none() {
            return Err(ParameterError::Missing(INPUT));
        }
        let output = self.output.as_ref().ok_or(ParameterError::Missing(OUTPUT))?;
        output.validate().map_err(ParameterError::InvalidOutput)?;

        let d = self.distance_between_points;
        if !(d.is_finite() && d >= 0.0) {
            return Err(ParameterError::InvalidDistance(d));
        }
        if self.number_of_points < 1 {
            return Err(ParameterError::InvalidPointCount(self.number_of_points));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definitions_match_defaults() {
        let defs = parameter_definitions();
        let names: Vec<_> = defs.iter().map(|d| d.name).collect();
        assert_eq!(names, vec![INPUT, OUTPUT, DISTANCE_BETWEEN_POINTS, NUMBER_OF_POINTS]);
        assert_eq!(
            defs[3].kind,
            ParameterKind::Integer { default: 100, min: 1 }
        );

        let params = Parameters::default();
        assert_eq!(params.distance_between_points, 0.1);
        assert_eq!(params.number_of_points, 100);
    }

    #[test]
    fn test_validate_accepts_defaults() {
        let params = Parameters::new("class.tif", Destination::Memory);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing() {
        let err = Parameters::default().validate().unwrap_err();
        assert!(matches!(err, ParameterError::Missing(INPUT)));

        let params = Parameters {
            input: Some("class.tif".into()),
            ..Default::default()
        };
        assert!(matches!(params.validate().unwrap_err(), ParameterError::Missing(OUTPUT)));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let base = Parameters::new("class.tif", Destination::Memory);

        let err = base.clone().with_points(0).validate().unwrap_err();
        assert!(matches!(err, ParameterError::InvalidPointCount(0)));

        let err = base.clone().with_distance(-0.5).validate().unwrap_err();
        assert!(matches!(err, ParameterError::InvalidDistance(_)));

        let err = base.clone().with_distance(f64::NAN).validate().unwrap_err();
        assert!(matches!(err, ParameterError::InvalidDistance(_)));

        assert!(base.with_distance(0.0).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unsupported_output() {
        let params = Parameters::new("class.tif", Destination::File("samples.shp".into()));
        assert!(matches!(params.validate().unwrap_err(), ParameterError::InvalidOutput(_)));
    }
}
