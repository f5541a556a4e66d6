//! Planar geometry for sample generation.
//!
//! Points are plain `glam::DVec2` coordinates in map units; polygons carry
//! a single exterior ring. The module also provides the two geometric
//! primitives of the pipeline: extent-to-polygon and point buffering.

mod buffer;
mod extent;
mod polygon;
mod srs;

use glam::DVec2;
use thiserror::Error;

pub use buffer::{buffer_layer, buffer_point, BufferOptions, EndCapStyle, JoinStyle};
pub use extent::{extent_to_polygon, Extent};
pub use polygon::Polygon;
pub use srs::SpatialRef;

use crate::vector::VectorError;

/// Errors raised by geometry operations.
#[derive(Error, Debug)]
pub enum GeometryError {
    #[error("Unsupported geometry type for this operation: {0}")]
    UnsupportedGeometry(&'static str),
    #[error("Buffer distance must be positive and finite, got {0}")]
    InvalidBufferDistance(f64),
    #[error("Buffer segment count must be at least 1, got {0}")]
    InvalidSegments(u32),
    #[error("Miter limit must be at least 1, got {0}")]
    InvalidMiterLimit(f64),
    #[error(transparent)]
    Vector(#[from] VectorError),
}

/// A feature geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(DVec2),
    Polygon(Polygon),
}

impl Geometry {
    /// GeoJSON type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::Polygon(_) => "Polygon",
        }
    }

    pub fn bounds(&self) -> Option<Extent> {
        match self {
            Geometry::Point(p) => Some(Extent::new(p.x, p.y, p.x, p.y)),
            Geometry::Polygon(poly) => poly.bounds(),
        }
    }

    pub fn as_point(&self) -> Option<DVec2> {
        match self {
            Geometry::Point(p) => Some(*p),
            _ => None,
        }
    }

    pub fn as_polygon(&self) -> Option<&Polygon> {
        match self {
            Geometry::Polygon(poly) => Some(poly),
            _ => None,
        }
    }
}
