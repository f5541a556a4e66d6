//! North-up affine georeferencing.

use glam::DVec2;

use super::RasterError;
use crate::geometry::Extent;

/// Maps pixel space to map space for a north-up raster.
///
/// Pixel `(col, row)` covers `[origin_x + col * pixel_width, ...]` to the
/// right and `origin_y - row * pixel_height` downward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    /// Map x of the upper-left corner of the upper-left pixel.
    pub origin_x: f64,
    /// Map y of the upper-left corner of the upper-left pixel.
    pub origin_y: f64,
    /// Pixel size along x, positive.
    pub pixel_width: f64,
    /// Pixel size along y, positive (rows grow southward).
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self { origin_x, origin_y, pixel_width, pixel_height }
    }

    /// Unit pixels with row 0 at the top, so map y grows upward from the
    /// bottom edge at 0.
    pub fn pixel_space(height: usize) -> Self {
        Self::new(0.0, height as f64, 1.0, 1.0)
    }

    /// Builds a transform from the six world file coefficients
    /// `[A, D, B, E, C, F]`.
    ///
    /// `C`/`F` address the centre of the upper-left pixel. Rotated rasters
    /// are rejected since their extent is not an axis-aligned rectangle.
    pub fn from_world_file(coefficients: [f64; 6]) -> Result<Self, RasterError> {
        let [a, d, b, e, c, f] = coefficients;
        if d != 0.0 || b != 0.0 {
            return Err(RasterError::RotatedRaster);
        }
        if !(a > 0.0 && e < 0.0) {
            return Err(RasterError::InvalidGeoreference(format!(
                "expected positive x and negative y pixel size, got {a} and {e}"
            )));
        }
        Ok(Self::new(c - a * 0.5, f - e * 0.5, a, -e))
    }

    /// Map coordinate of a (fractional) pixel position.
    pub fn pixel_to_world(&self, col: f64, row: f64) -> DVec2 {
        DVec2::new(
            self.origin_x + col * self.pixel_width,
            self.origin_y - row * self.pixel_height,
        )
    }

    /// Fractional pixel position `(col, row)` of a map coordinate.
    pub fn world_to_pixel(&self, point: DVec2) -> DVec2 {
        DVec2::new(
            (point.x - self.origin_x) / self.pixel_width,
            (self.origin_y - point.y) / self.pixel_height,
        )
    }

    /// Extent of a `width x height` raster.
    pub fn extent(&self, width: usize, height: usize) -> Extent {
        let max = self.pixel_to_world(width as f64, 0.0);
        let min = self.pixel_to_world(0.0, height as f64);
        Extent::new(self.origin_x, min.y, max.x, self.origin_y)
    }
}
