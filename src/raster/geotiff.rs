//! GeoTIFF decoding.
//!
//! Reads band 1 of a single-band TIFF together with the GeoTIFF tags
//! needed to place it on the map: tiepoint + pixel scale (or a
//! non-rotated model transformation), the raster type key, the EPSG code
//! and the GDAL no-data value.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tiff::ColorType;
use tracing::{debug, warn};

use super::{layer_name, sidecar_spatial_ref, GeoTransform, Raster, RasterError};
use crate::geometry::SpatialRef;

const GT_RASTER_TYPE_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;
const RASTER_PIXEL_IS_POINT: u32 = 2;
const USER_DEFINED: u32 = 32767;

/// Reads a single-band GeoTIFF.
pub fn read_geotiff(path: &Path) -> Result<Raster, RasterError> {
    let file = File::open(path)?;
    let mut decoder = Decoder::new(BufReader::new(file))?;

    let (width, height) = decoder.dimensions()?;
    match decoder.colortype()? {
        ColorType::Gray(_) => {}
        other => return Err(RasterError::UnsupportedColorType(format!("{other:?}"))),
    }

    let geo_keys = match decoder.find_tag(Tag::GeoKeyDirectoryTag)? {
        Some(value) => parse_geo_keys(&value.into_u32_vec()?),
        None => HashMap::new(),
    };

    let transform = match read_transform(&mut decoder)? {
        Some(mut t) => {
            if geo_keys.get(&GT_RASTER_TYPE_KEY) == Some(&RASTER_PIXEL_IS_POINT) {
                // Tiepoints address pixel centres; move to the corner.
                t.origin_x -= t.pixel_width * 0.5;
                t.origin_y += t.pixel_height * 0.5;
            }
            t
        }
        None => {
            warn!("{} has no georeferencing tags, using pixel coordinates", path.display());
            GeoTransform::pixel_space(height as usize)
        }
    };

    let nodata = match decoder.find_tag(Tag::GdalNodata)? {
        Some(value) => parse_nodata(&value.into_string()?),
        None => None,
    };

    let spatial_ref = epsg_from_keys(&geo_keys)
        .map(SpatialRef::Epsg)
        .or_else(|| sidecar_spatial_ref(path))
        .unwrap_or_default();

    let values = decoding_to_f64(decoder.read_image()?)?;
    debug!("Read GeoTIFF {} ({}x{}, {})", path.display(), width, height, spatial_ref);

    let mut raster = Raster::new(layer_name(path), width as usize, height as usize, values, transform)?
        .with_spatial_ref(spatial_ref);
    if let Some(nd) = nodata {
        raster = raster.with_nodata(nd);
    }
    Ok(raster)
}

fn find_f64s<R: Read + Seek>(decoder: &mut Decoder<R>, tag: Tag) -> Result<Option<Vec<f64>>, RasterError> {
    Ok(decoder.find_tag(tag)?.map(|v| v.into_f64_vec()).transpose()?)
}

fn read_transform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Option<GeoTransform>, RasterError> {
    let scale = find_f64s(decoder, Tag::ModelPixelScaleTag)?;
    let tiepoint = find_f64s(decoder, Tag::ModelTiepointTag)?;

    if let (Some(scale), Some(tie)) = (scale, tiepoint) {
        if scale.len() < 2 || tie.len() < 6 {
            return Err(RasterError::InvalidGeoreference("short tiepoint or pixel scale tag".into()));
        }
        // Tiepoint maps raster (I, J) to model (X, Y).
        let (i, j, x, y) = (tie[0], tie[1], tie[3], tie[4]);
        let (sx, sy) = (scale[0], scale[1]);
        if !(sx > 0.0 && sy > 0.0) {
            return Err(RasterError::InvalidGeoreference(format!("pixel scale {sx} x {sy}")));
        }
        return Ok(Some(GeoTransform::new(x - i * sx, y + j * sy, sx, sy)));
    }

    if let Some(m) = find_f64s(decoder, Tag::ModelTransformationTag)? {
        if m.len() < 16 {
            return Err(RasterError::InvalidGeoreference("short model transformation tag".into()));
        }
        if m[1] != 0.0 || m[4] != 0.0 {
            return Err(RasterError::RotatedRaster);
        }
        if !(m[0] > 0.0 && m[5] < 0.0) {
            return Err(RasterError::InvalidGeoreference(format!(
                "model transformation scale {} x {}",
                m[0], m[5]
            )));
        }
        return Ok(Some(GeoTransform::new(m[3], m[7], m[0], -m[5])));
    }

    Ok(None)
}

/// Parses the GeoKeyDirectory into inline key values.
///
/// Keys stored in the double or ASCII parameter tags are skipped.
fn parse_geo_keys(directory: &[u32]) -> HashMap<u16, u32> {
    let mut keys = HashMap::new();
    if directory.len() < 4 {
        return keys;
    }
    let count = directory[3] as usize;
    for entry in directory[4..].chunks_exact(4).take(count) {
        let (key, location, value) = (entry[0], entry[1], entry[3]);
        if location == 0 {
            keys.insert(key as u16, value);
        }
    }
    keys
}

fn epsg_from_keys(keys: &HashMap<u16, u32>) -> Option<u32> {
    [PROJECTED_CS_TYPE_KEY, GEOGRAPHIC_TYPE_KEY]
        .iter()
        .filter_map(|k| keys.get(k).copied())
        .find(|&code| code != 0 && code != USER_DEFINED)
}

fn parse_nodata(text: &str) -> Option<f64> {
    let text = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    match text.to_ascii_lowercase().as_str() {
        "nan" => Some(f64::NAN),
        other => other.parse().ok(),
    }
}

fn decoding_to_f64(result: DecodingResult) -> Result<Vec<f64>, RasterError> {
    #[allow(unreachable_patterns)]
    let values = match result {
        DecodingResult::U8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::F32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::F64(v) => v,
        _ => return Err(RasterError::UnsupportedSampleType),
    };
    Ok(values)
}
