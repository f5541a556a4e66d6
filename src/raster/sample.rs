//! Sampling raster values at point locations.

use glam::DVec2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{Raster, RasterError};
use crate::vector::{Field, FieldKind, FieldValue, TempDataset, VectorLayer};

/// Longest attribute name written for the sampled value.
pub const MAX_FIELD_NAME_LEN: usize = 10;

/// Rule for picking a value at a point that is not on a cell centre.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resampling {
    /// Value of the cell containing the point (index 0).
    #[default]
    NearestNeighbour,
    /// Distance-weighted mean of the four surrounding cell centres (index 1).
    Bilinear,
}

impl Resampling {
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Resampling::NearestNeighbour),
            1 => Some(Resampling::Bilinear),
            _ => None,
        }
    }

    pub fn index(self) -> u8 {
        match self {
            Resampling::NearestNeighbour => 0,
            Resampling::Bilinear => 1,
        }
    }
}

impl Raster {
    /// Samples the raster at a map coordinate.
    ///
    /// Returns `None` outside the raster or when the cells involved are
    /// no-data.
    pub fn sample(&self, point: DVec2, method: Resampling) -> Option<f64> {
        let pixel = self.transform().world_to_pixel(point);
        let (w, h) = (self.width() as f64, self.height() as f64);
        if self.width() == 0 || self.height() == 0 {
            return None;
        }
        if !(pixel.x >= 0.0 && pixel.y >= 0.0 && pixel.x <= w && pixel.y <= h) {
            return None;
        }

        match method {
            Resampling::NearestNeighbour => {
                // The right and bottom edges belong to the last column/row.
                let col = (pixel.x.floor() as usize).min(self.width() - 1);
                let row = (pixel.y.floor() as usize).min(self.height() - 1);
                self.get(col, row)
            }
            Resampling::Bilinear => {
                let cx = (pixel.x - 0.5).clamp(0.0, w - 1.0);
                let cy = (pixel.y - 0.5).clamp(0.0, h - 1.0);
                let (c0, r0) = (cx.floor() as usize, cy.floor() as usize);
                let c1 = (c0 + 1).min(self.width() - 1);
                let r1 = (r0 + 1).min(self.height() - 1);
                let (fx, fy) = (cx - c0 as f64, cy - r0 as f64);

                let top = self.get(c0, r0)? * (1.0 - fx) + self.get(c1, r0)? * fx;
                let bottom = self.get(c0, r1)? * (1.0 - fx) + self.get(c1, r1)? * fx;
                Some(top * (1.0 - fy) + bottom * fy)
            }
        }
    }
}

/// Attribute name used for values sampled from a raster.
///
/// The raster name truncated to [`MAX_FIELD_NAME_LEN`] characters, or
/// `VALUE` when the name is empty.
pub fn value_field_name(raster_name: &str) -> String {
    let name: String = raster_name.chars().take(MAX_FIELD_NAME_LEN).collect();
    if name.is_empty() {
        "VALUE".to_string()
    } else {
        name
    }
}

/// First name derived from `base` that is not already a field of `layer`.
///
/// Taken names get a `_1`, `_2`, ... suffix, shortening `base` so the
/// result stays within [`MAX_FIELD_NAME_LEN`] characters.
fn unique_field_name(layer: &VectorLayer, base: &str) -> String {
    if layer.field_index(base).is_none() {
        return base.to_string();
    }
    (1u32..)
        .map(|n| {
            let suffix = format!("_{n}");
            let keep = MAX_FIELD_NAME_LEN.saturating_sub(suffix.len());
            let stem: String = base.chars().take(keep).collect();
            stem + &suffix
        })
        .find(|name| layer.field_index(name).is_none())
        .unwrap_or_else(|| base.to_string())
}

/// Adds the raster value under each point and writes the result to disk.
///
/// If `field_name` is already taken on `points`, the value is stored under
/// a suffixed name instead (see the returned layer's last field).
///
/// # Arguments
/// * `points` - Point layer to sample at
/// * `raster` - Raster to sample
/// * `resampling` - Resampling rule
/// * `field_name` - Name of the new attribute
/// * `dataset` - On-disk dataset receiving the result
///
/// # Returns
/// The value-bearing point layer, as written to `dataset`
pub fn sample_raster_at_points(
    points: &VectorLayer,
    raster: &Raster,
    resampling: Resampling,
    field_name: &str,
    dataset: &TempDataset,
) -> Result<VectorLayer, RasterError> {
    let base = field_name;
    let field_name = unique_field_name(points, base);
    if field_name != base {
        warn!("Field '{}' already exists on the point layer, writing values to '{}'", base, field_name);
    }

    let values: Vec<FieldValue> = points
        .features()
        .par_iter()
        .map(|feature| match feature.geometry.as_point() {
            Some(p) => Ok(raster
                .sample(p, resampling)
                .map(FieldValue::Real)
                .unwrap_or(FieldValue::Null)),
            None => Err(RasterError::NotAPoint(feature.id)),
        })
        .collect::<Result<_, _>>()?;

    let mut layer = VectorLayer::new("value_points", points.spatial_ref().clone(), points.fields().to_vec());
    for feature in points.features() {
        layer.push(feature.clone());
    }
    let mut values = values.into_iter();
    layer.add_field(Field::new(field_name, FieldKind::Real), |_| {
        values.next().unwrap_or(FieldValue::Null)
    });

    let nulls = layer
        .features()
        .iter()
        .filter(|f| f.attributes.last().is_some_and(FieldValue::is_null))
        .count();
    debug!(
        "Sampled '{}' at {} points ({} without data, {:?})",
        raster.name(),
        layer.len(),
        nulls,
        resampling
    );

    dataset.write(&layer, &format!("{} ({:?})", raster.name(), resampling))?;
    Ok(layer)
}
