//! Rectangular extents and the extent-to-polygon primitive.

use glam::DVec2;
use tracing::debug;

use super::{Geometry, Polygon};
use crate::raster::{Raster, RasterError};
use crate::vector::{Feature, Field, FieldKind, FieldValue, VectorLayer};

/// Axis-aligned bounding rectangle in map units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// Smallest extent covering all points, or `None` when there are none.
    pub fn from_points(points: &[DVec2]) -> Option<Self> {
        let first = points.first()?;
        let mut extent = Self::new(first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            extent.include(*p);
        }
        Some(extent)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// True when the extent has no positive area.
    pub fn is_empty(&self) -> bool {
        !(self.width() > 0.0 && self.height() > 0.0)
    }

    /// Inclusive containment test.
    pub fn contains(&self, point: DVec2) -> bool {
        point.x >= self.min_x && point.x <= self.max_x && point.y >= self.min_y && point.y <= self.max_y
    }

    /// Grows the extent to include a point.
    pub fn include(&mut self, point: DVec2) {
        self.min_x = self.min_x.min(point.x);
        self.min_y = self.min_y.min(point.y);
        self.max_x = self.max_x.max(point.x);
        self.max_y = self.max_y.max(point.y);
    }

    /// Smallest extent covering both.
    pub fn union(&self, other: &Extent) -> Extent {
        Extent::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }

    pub fn center(&self) -> DVec2 {
        DVec2::new((self.min_x + self.max_x) * 0.5, (self.min_y + self.max_y) * 0.5)
    }
}

/// Computes the bounding polygon of a raster's extent.
///
/// The result is a single-feature layer carrying `width`, `height` and
/// `area` attributes, in the raster's spatial reference.
///
/// # Returns
/// The extent layer, or [`RasterError::EmptyExtent`] if the raster covers
/// no area
pub fn extent_to_polygon(raster: &Raster) -> Result<VectorLayer, RasterError> {
    let extent = raster.extent();
    if extent.is_empty() {
        return Err(RasterError::EmptyExtent(raster.name().to_string()));
    }

    let fields = vec![
        Field::new("width", FieldKind::Real),
        Field::new("height", FieldKind::Real),
        Field::new("area", FieldKind::Real),
    ];
    let mut layer = VectorLayer::new("extent", raster.spatial_ref().clone(), fields);
    layer.push(Feature::new(
        0,
        Geometry::Polygon(Polygon::from_extent(&extent)),
        vec![
            FieldValue::Real(extent.width()),
            FieldValue::Real(extent.height()),
            FieldValue::Real(extent.area()),
        ],
    ));

    debug!(
        "Extent of '{}': [{}, {}] - [{}, {}]",
        raster.name(),
        extent.min_x,
        extent.min_y,
        extent.max_x,
        extent.max_y
    );
    Ok(layer)
}
