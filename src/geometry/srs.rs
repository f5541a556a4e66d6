//! Spatial reference identifiers carried by rasters and layers.

use std::fmt;

/// The coordinate reference system of a dataset.
///
/// Only enough is kept to round-trip the reference through sidecar files
/// and GeoJSON output; no reprojection is performed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SpatialRef {
    /// An EPSG code, e.g. `32633`.
    Epsg(u32),
    /// A WKT definition read from a `.prj` sidecar.
    Wkt(String),
    /// No reference available.
    #[default]
    Unknown,
}

impl SpatialRef {
    /// Parses the contents of a `.prj` file.
    ///
    /// Accepts `EPSG:<code>` shorthand as well as full WKT.
    pub fn from_prj(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() {
            return SpatialRef::Unknown;
        }
        if let Some(code) = text
            .strip_prefix("EPSG:")
            .or_else(|| text.strip_prefix("epsg:"))
            .and_then(|c| c.trim().parse().ok())
        {
            return SpatialRef::Epsg(code);
        }
        SpatialRef::Wkt(text.to_string())
    }

    /// Text written to a `.prj` sidecar.
    pub fn to_prj(&self) -> String {
        match self {
            SpatialRef::Epsg(code) => format!("EPSG:{code}"),
            SpatialRef::Wkt(wkt) => wkt.clone(),
            SpatialRef::Unknown => String::new(),
        }
    }

    /// OGC URN used in the GeoJSON `crs` member, when one can be built.
    pub fn ogc_urn(&self) -> Option<String> {
        match self {
            SpatialRef::Epsg(code) => Some(format!("urn:ogc:def:crs:EPSG::{code}")),
            _ => None,
        }
    }

    /// Inverse of [`SpatialRef::ogc_urn`].
    pub fn from_ogc_urn(urn: &str) -> Self {
        urn.rsplit(':')
            .next()
            .and_then(|code| code.parse().ok())
            .filter(|_| urn.to_ascii_uppercase().contains("EPSG"))
            .map(SpatialRef::Epsg)
            .unwrap_or(SpatialRef::Unknown)
    }
}

impl fmt::Display for SpatialRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpatialRef::Epsg(code) => write!(f, "EPSG:{code}"),
            SpatialRef::Wkt(wkt) => {
                // WKT is long; the leading name is enough for display.
                let head: String = wkt.chars().take(48).collect();
                if head.len() < wkt.len() {
                    write!(f, "{head}...")
                } else {
                    write!(f, "{head}")
                }
            }
            SpatialRef::Unknown => write!(f, "unknown"),
        }
    }
}
