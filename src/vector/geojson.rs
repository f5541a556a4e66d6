//! GeoJSON FeatureCollection encoding.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use glam::DVec2;
use serde_json::{json, Map, Value};

use super::{Feature, Field, FieldKind, FieldValue, VectorError, VectorLayer};
use crate::geometry::{Geometry, Polygon, SpatialRef};

/// Encodes a layer as a GeoJSON FeatureCollection.
///
/// EPSG references are written in the legacy named `crs` member so GIS
/// tools pick up the projection.
pub fn layer_to_geojson(layer: &VectorLayer) -> Value {
    let features: Vec<Value> = layer
        .features()
        .iter()
        .map(|feature| {
            let mut properties = Map::new();
            for (field, value) in layer.fields().iter().zip(&feature.attributes) {
                properties.insert(field.name.clone(), value_to_json(value));
            }
            json!({
                "type": "Feature",
                "id": feature.id,
                "geometry": geometry_to_json(&feature.geometry),
                "properties": properties,
            })
        })
        .collect();

    let mut collection = json!({
        "type": "FeatureCollection",
        "name": layer.name(),
        "features": features,
    });
    if let Some(urn) = layer.spatial_ref().ogc_urn() {
        collection["crs"] = json!({ "type": "name", "properties": { "name": urn } });
    }
    collection
}

/// Writes a layer to a GeoJSON file.
pub fn write_geojson(layer: &VectorLayer, path: &Path) -> Result<(), VectorError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &layer_to_geojson(layer))?;
    writer.flush()?;
    Ok(())
}

/// Reads a GeoJSON FeatureCollection.
///
/// With a `schema`, properties are read in that field order and with
/// those kinds. Without one, the schema is inferred from the first
/// feature: integral numbers become integer fields, other numbers real.
pub fn read_geojson(path: &Path, schema: Option<&[Field]>) -> Result<VectorLayer, VectorError> {
    let file = File::open(path)?;
    let value: Value = serde_json::from_reader(BufReader::new(file))?;
    layer_from_geojson(&value, schema)
}

/// Decodes a FeatureCollection value.
pub fn layer_from_geojson(value: &Value, schema: Option<&[Field]>) -> Result<VectorLayer, VectorError> {
    if value["type"] != "FeatureCollection" {
        return Err(VectorError::InvalidGeoJson("expected a FeatureCollection".into()));
    }
    let features = value["features"]
        .as_array()
        .ok_or_else(|| VectorError::InvalidGeoJson("missing features array".into()))?;

    let name = value["name"].as_str().unwrap_or("layer");
    let spatial_ref = value["crs"]["properties"]["name"]
        .as_str()
        .map(SpatialRef::from_ogc_urn)
        .unwrap_or_default();
    let fields = match schema {
        Some(fields) => fields.to_vec(),
        None => features.first().map(infer_schema).unwrap_or_default(),
    };

    let mut layer = VectorLayer::new(name, spatial_ref, fields.clone());
    for (index, feature) in features.iter().enumerate() {
        let id = feature["id"].as_u64().unwrap_or(index as u64);
        let geometry = geometry_from_json(&feature["geometry"])?;
        let attributes = fields
            .iter()
            .map(|field| value_from_json(&feature["properties"][&field.name], field.kind))
            .collect();
        layer.push(Feature::new(id, geometry, attributes));
    }
    Ok(layer)
}

fn infer_schema(feature: &Value) -> Vec<Field> {
    let Some(properties) = feature["properties"].as_object() else {
        return Vec::new();
    };
    properties
        .iter()
        .filter(|(_, v)| v.is_number() || v.is_null())
        .map(|(name, v)| {
            let kind = if v.is_i64() || v.is_u64() { FieldKind::Integer } else { FieldKind::Real };
            Field::new(name.clone(), kind)
        })
        .collect()
}

fn value_to_json(value: &FieldValue) -> Value {
    match *value {
        FieldValue::Integer(v) => json!(v),
        // Non-finite reals have no JSON form.
        FieldValue::Real(v) if v.is_finite() => json!(v),
        FieldValue::Real(_) | FieldValue::Null => Value::Null,
    }
}

fn value_from_json(value: &Value, kind: FieldKind) -> FieldValue {
    match kind {
        FieldKind::Integer => value
            .as_i64()
            .map(FieldValue::Integer)
            .or_else(|| value.as_f64().map(|v| FieldValue::Integer(v as i64)))
            .unwrap_or(FieldValue::Null),
        FieldKind::Real => value.as_f64().map(FieldValue::Real).unwrap_or(FieldValue::Null),
    }
}

fn geometry_to_json(geometry: &Geometry) -> Value {
    match geometry {
        Geometry::Point(p) => json!({ "type": "Point", "coordinates": [p.x, p.y] }),
        Geometry::Polygon(poly) => {
            let ring: Vec<[f64; 2]> = poly.exterior().iter().map(|v| [v.x, v.y]).collect();
            json!({ "type": "Polygon", "coordinates": [ring] })
        }
    }
}

fn geometry_from_json(value: &Value) -> Result<Geometry, VectorError> {
    let coords = &value["coordinates"];
    match value["type"].as_str() {
        Some("Point") => Ok(Geometry::Point(position(coords)?)),
        Some("Polygon") => {
            let exterior = coords
                .get(0)
                .and_then(Value::as_array)
                .ok_or_else(|| VectorError::InvalidGeoJson("polygon without exterior ring".into()))?;
            let ring = exterior.iter().map(position).collect::<Result<Vec<_>, _>>()?;
            Ok(Geometry::Polygon(Polygon::new(ring)))
        }
        Some(other) => Err(VectorError::UnsupportedGeometry(other.to_string())),
        None => Err(VectorError::InvalidGeoJson("feature without geometry type".into())),
    }
}

fn position(value: &Value) -> Result<DVec2, VectorError> {
    match (value.get(0).and_then(Value::as_f64), value.get(1).and_then(Value::as_f64)) {
        (Some(x), Some(y)) => Ok(DVec2::new(x, y)),
        _ => Err(VectorError::InvalidGeoJson(format!("invalid position: {value}"))),
    }
}
