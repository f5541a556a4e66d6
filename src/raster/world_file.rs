//! Single-channel images georeferenced by a world file.

use std::fs;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use tracing::{debug, warn};

use super::{layer_name, sidecar_spatial_ref, GeoTransform, Raster, RasterError};

/// Candidate world file paths for an image, in lookup order.
///
/// For `scene.png` these are `scene.pgw`, `scene.pngw` and `scene.wld`.
pub fn world_file_candidates(path: &Path) -> Vec<PathBuf> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    let mut candidates = Vec::new();
    let mut chars = ext.chars();
    if let (Some(first), Some(last)) = (chars.next(), chars.last()) {
        candidates.push(path.with_extension(format!("{first}{last}w")));
    }
    if !ext.is_empty() {
        candidates.push(path.with_extension(format!("{ext}w")));
    }
    candidates.push(path.with_extension("wld"));
    candidates
}

/// Parses the six coefficients of a world file.
pub fn parse_world_file(path: &Path, text: &str) -> Result<[f64; 6], RasterError> {
    let invalid = |reason: String| RasterError::InvalidWorldFile { path: path.to_path_buf(), reason };

    let numbers = text
        .split_whitespace()
        .map(|token| token.parse::<f64>().map_err(|e| invalid(format!("'{token}': {e}"))))
        .collect::<Result<Vec<_>, _>>()?;
    <[f64; 6]>::try_from(numbers.as_slice())
        .map_err(|_| invalid(format!("expected 6 coefficients, found {}", numbers.len())))
}

/// Reads a single-channel image raster.
///
/// Georeferencing comes from the first world file found next to the
/// image and the spatial reference from a `.prj` sidecar. Without a
/// world file the raster is placed in pixel space.
pub fn read_image_raster(path: &Path) -> Result<Raster, RasterError> {
    let img = image::open(path)?;
    if img.color().channel_count() != 1 {
        return Err(RasterError::UnsupportedColorType(format!("{:?}", img.color())));
    }

    let (width, height) = (img.width() as usize, img.height() as usize);
    let values: Vec<f64> = match img {
        DynamicImage::ImageLuma8(buf) => buf.into_raw().into_iter().map(f64::from).collect(),
        DynamicImage::ImageLuma16(buf) => buf.into_raw().into_iter().map(f64::from).collect(),
        other => other.to_luma16().into_raw().into_iter().map(f64::from).collect(),
    };

    let transform = match world_file_candidates(path).into_iter().find(|p| p.exists()) {
        Some(world) => {
            let text = fs::read_to_string(&world)?;
            debug!("Using world file {}", world.display());
            GeoTransform::from_world_file(parse_world_file(&world, &text)?)?
        }
        None => {
            warn!("No world file for {}, using pixel coordinates", path.display());
            GeoTransform::pixel_space(height)
        }
    };

    let raster = Raster::new(layer_name(path), width, height, values, transform)?
        .with_spatial_ref(sidecar_spatial_ref(path).unwrap_or_default());
    Ok(raster)
}
