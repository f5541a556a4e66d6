//! Fixed-distance buffering of point layers.

use std::f64::consts::TAU;

use glam::DVec2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{Geometry, GeometryError, Polygon};
use crate::vector::{Destination, Feature, LayerRef, VectorLayer};

/// End cap style, numbered as in the processing parameter files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndCapStyle {
    #[default]
    Round,
    Flat,
    Square,
}

impl EndCapStyle {
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(EndCapStyle::Round),
            1 => Some(EndCapStyle::Flat),
            2 => Some(EndCapStyle::Square),
            _ => None,
        }
    }
}

/// Join style, numbered as in the processing parameter files.
///
/// Joins only matter for lines and polygons; point buffers ignore them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinStyle {
    #[default]
    Round,
    Miter,
    Bevel,
}

impl JoinStyle {
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(JoinStyle::Round),
            1 => Some(JoinStyle::Miter),
            2 => Some(JoinStyle::Bevel),
            _ => None,
        }
    }
}

/// Buffer parameters. Buffers are never dissolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferOptions {
    /// Buffer radius in map units.
    pub distance: f64,
    /// Segments used to approximate a quarter circle.
    pub segments: u32,
    pub end_cap_style: EndCapStyle,
    pub join_style: JoinStyle,
    pub miter_limit: f64,
}

impl Default for BufferOptions {
    fn default() -> Self {
        Self {
            distance: 10.0,
            segments: 10,
            end_cap_style: EndCapStyle::Round,
            join_style: JoinStyle::Round,
            miter_limit: 2.0,
        }
    }
}

impl BufferOptions {
    /// Checks that the options describe a non-degenerate buffer.
    pub fn validate(&self) -> Result<(), GeometryError> {
        if !(self.distance.is_finite() && self.distance > 0.0) {
            return Err(GeometryError::InvalidBufferDistance(self.distance));
        }
        if self.segments == 0 {
            return Err(GeometryError::InvalidSegments(self.segments));
        }
        if !(self.miter_limit.is_finite() && self.miter_limit >= 1.0) {
            return Err(GeometryError::InvalidMiterLimit(self.miter_limit));
        }
        Ok(())
    }
}

/// Buffers a single point.
///
/// Round caps yield a regular polygon with `4 * segments` edges, square
/// caps an axis-aligned square, flat caps nothing (a point has no
/// direction to extend along).
pub fn buffer_point(center: DVec2, options: &BufferOptions) -> Option<Polygon> {
    let r = options.distance;
    match options.end_cap_style {
        EndCapStyle::Round => {
            let n = 4 * options.segments as usize;
            let ring = (0..n)
                .map(|i| {
                    let angle = TAU * i as f64 / n as f64;
                    center + DVec2::new(angle.cos(), angle.sin()) * r
                })
                .collect();
            Some(Polygon::new(ring))
        }
        EndCapStyle::Square => Some(Polygon::new(vec![
            center + DVec2::new(-r, -r),
            center + DVec2::new(r, -r),
            center + DVec2::new(r, r),
            center + DVec2::new(-r, r),
        ])),
        EndCapStyle::Flat => None,
    }
}

/// Buffers every point of a layer and writes the result to `destination`.
///
/// Each output polygon keeps the id and attributes of its source point.
/// Features whose buffer is empty are dropped with a warning.
///
/// # Arguments
/// * `layer` - Point layer to buffer
/// * `options` - Buffer parameters
/// * `destination` - Where the buffered layer goes
///
/// # Returns
/// A reference to the written layer
pub fn buffer_layer(
    layer: &VectorLayer,
    options: &BufferOptions,
    destination: &Destination,
) -> Result<LayerRef, GeometryError> {
    options.validate()?;

    let buffered: Vec<Option<Feature>> = layer
        .features()
        .par_iter()
        .map(|feature| match &feature.geometry {
            Geometry::Point(p) => Ok(buffer_point(*p, options).map(|poly| Feature {
                id: feature.id,
                geometry: Geometry::Polygon(poly),
                attributes: feature.attributes.clone(),
            })),
            other => Err(GeometryError::UnsupportedGeometry(other.type_name())),
        })
        .collect::<Result<_, _>>()?;

    let mut out = VectorLayer::new("Buffered", layer.spatial_ref().clone(), layer.fields().to_vec());
    let mut dropped = 0usize;
    for feature in buffered {
        match feature {
            Some(f) => out.push(f),
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        warn!("{} features produced an empty buffer and were dropped", dropped);
    }

    debug!("Buffered {} features at distance {}", out.len(), options.distance);
    Ok(destination.write(out)?)
}
