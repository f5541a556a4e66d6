//! Single-band raster grids.

use std::collections::BTreeMap;
use std::path::Path;

use super::{geotiff, world_file, GeoTransform, RasterError};
use crate::geometry::{Extent, SpatialRef};

/// A single-band raster held in memory.
///
/// Values are stored row-major, row 0 at the top (north).
#[derive(Debug, Clone)]
pub struct Raster {
    name: String,
    width: usize,
    height: usize,
    values: Vec<f64>,
    nodata: Option<f64>,
    transform: GeoTransform,
    spatial_ref: SpatialRef,
}

impl Raster {
    /// Creates a raster from row-major values.
    ///
    /// # Returns
    /// The raster, or [`RasterError::DimensionMismatch`] if `values` does
    /// not hold `width * height` cells
    pub fn new(
        name: impl Into<String>,
        width: usize,
        height: usize,
        values: Vec<f64>,
        transform: GeoTransform,
    ) -> Result<Self, RasterError> {
        let expected = width * height;
        if values.len() != expected {
            return Err(RasterError::DimensionMismatch { expected, actual: values.len() });
        }
        Ok(Self {
            name: name.into(),
            width,
            height,
            values,
            nodata: None,
            transform,
            spatial_ref: SpatialRef::Unknown,
        })
    }

    /// Sets the no-data value.
    pub fn with_nodata(mut self, nodata: f64) -> Self {
        self.nodata = Some(nodata);
        self
    }

    pub fn with_spatial_ref(mut self, spatial_ref: SpatialRef) -> Self {
        self.spatial_ref = spatial_ref;
        self
    }

    /// Opens a raster file.
    ///
    /// `.tif`/`.tiff` files are read as GeoTIFF; anything else is decoded
    /// as an image georeferenced by its world file.
    pub fn open(path: &Path) -> Result<Self, RasterError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("tif") | Some("tiff") => geotiff::read_geotiff(path),
            _ => world_file::read_image_raster(path),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn spatial_ref(&self) -> &SpatialRef {
        &self.spatial_ref
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn extent(&self) -> Extent {
        self.transform.extent(self.width, self.height)
    }

    /// Value of a cell, `None` outside the grid or on no-data.
    pub fn get(&self, col: usize, row: usize) -> Option<f64> {
        if col >= self.width || row >= self.height {
            return None;
        }
        let v = self.values[row * self.width + col];
        if v.is_nan() || self.nodata == Some(v) {
            None
        } else {
            Some(v)
        }
    }

    /// Cell counts per class for integral cell values.
    ///
    /// No-data and non-integral cells are skipped.
    pub fn class_counts(&self) -> BTreeMap<i64, usize> {
        let mut counts = BTreeMap::new();
        for row in 0..self.height {
            for col in 0..self.width {
                if let Some(v) = self.get(col, row).filter(|v| v.fract() == 0.0) {
                    *counts.entry(v as i64).or_insert(0) += 1;
                }
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> Raster {
        // 3x2, row 0 on top
        Raster::new(
            "classes",
            3,
            2,
            vec![1.0, 2.0, 2.0, 0.0, 3.5, f64::NAN],
            GeoTransform::pixel_space(2),
        )
        .unwrap()
        .with_nodata(0.0)
    }

    #[test]
    fn test_dimension_mismatch() {
        let err = Raster::new("bad", 3, 3, vec![0.0; 8], GeoTransform::pixel_space(3)).unwrap_err();
        assert!(matches!(err, RasterError::DimensionMismatch { expected: 9, actual: 8 }));
    }

    #[test]
    fn test_get_respects_nodata() {
        let r = grid();
        assert_eq!(r.get(0, 0), Some(1.0));
        assert_eq!(r.get(0, 1), None, "no-data cell");
        assert_eq!(r.get(2, 1), None, "NaN cell");
        assert_eq!(r.get(3, 0), None, "outside grid");
    }

    #[test]
    fn test_class_counts() {
        let counts = grid().class_counts();
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[&1], 1);
        assert_eq!(counts[&2], 2);
    }

    #[test]
    fn test_extent_and_metadata() {
        let r = grid().with_spatial_ref(SpatialRef::Epsg(3857));
        assert_eq!(r.extent(), Extent::new(0.0, 0.0, 3.0, 2.0));
        assert_eq!(r.spatial_ref(), &SpatialRef::Epsg(3857));
        assert_eq!(r.nodata(), Some(0.0));
        assert_eq!(r.name(), "classes");
    }
}
