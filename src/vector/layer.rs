//! In-memory feature layers.

use serde::{Deserialize, Serialize};

use crate::geometry::{Extent, Geometry, SpatialRef};

/// Attribute column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Integer,
    Real,
}

/// An attribute column definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self { name: name.into(), kind }
    }
}

/// A single attribute value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Real(f64),
    Null,
}

impl FieldValue {
    /// Numeric view of the value, `None` for nulls.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            FieldValue::Integer(v) => Some(v as f64),
            FieldValue::Real(v) => Some(v),
            FieldValue::Null => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

/// A feature: unique id, geometry and one value per layer field.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: u64,
    pub geometry: Geometry,
    pub attributes: Vec<FieldValue>,
}

impl Feature {
    pub fn new(id: u64, geometry: Geometry, attributes: Vec<FieldValue>) -> Self {
        Self { id, geometry, attributes }
    }
}

/// A named collection of features sharing a schema and spatial reference.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorLayer {
    name: String,
    spatial_ref: SpatialRef,
    fields: Vec<Field>,
    features: Vec<Feature>,
}

impl VectorLayer {
    /// Creates an empty layer.
    pub fn new(name: impl Into<String>, spatial_ref: SpatialRef, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            spatial_ref,
            fields,
            features: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn spatial_ref(&self) -> &SpatialRef {
        &self.spatial_ref
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Index of a field by name.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Value of the named field on a feature of this layer.
    pub fn value<'a>(&self, feature: &'a Feature, name: &str) -> Option<&'a FieldValue> {
        self.field_index(name).and_then(|i| feature.attributes.get(i))
    }

    /// Appends a feature.
    ///
    /// Missing trailing attributes are padded with nulls so every feature
    /// matches the schema.
    pub fn push(&mut self, mut feature: Feature) {
        feature.attributes.resize(self.fields.len(), FieldValue::Null);
        self.features.push(feature);
    }

    /// Appends a new field and sets its value on every feature.
    pub fn add_field<F>(&mut self, field: Field, mut value: F)
    where
        F: FnMut(&Feature) -> FieldValue,
    {
        self.fields.push(field);
        for feature in &mut self.features {
            let v = value(feature);
            feature.attributes.push(v);
        }
    }

    /// Consumes the layer and returns its features.
    pub fn into_features(self) -> Vec<Feature> {
        self.features
    }

    /// Combined bounds of all feature geometries.
    pub fn extent(&self) -> Option<Extent> {
        self.features
            .iter()
            .filter_map(|f| f.geometry.bounds())
            .reduce(|a, b| a.union(&b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec2;

    fn layer() -> VectorLayer {
        let mut layer = VectorLayer::new(
            "pts",
            SpatialRef::Unknown,
            vec![Field::new("id", FieldKind::Integer)],
        );
        layer.push(Feature::new(0, Geometry::Point(DVec2::new(1.0, 2.0)), vec![FieldValue::Integer(0)]));
        layer.push(Feature::new(1, Geometry::Point(DVec2::new(-3.0, 5.0)), vec![FieldValue::Integer(1)]));
        layer
    }

    #[test]
    fn test_push_pads_attributes() {
        let mut layer = layer();
        layer.push(Feature::new(2, Geometry::Point(DVec2::ZERO), Vec::new()));
        assert_eq!(layer.features()[2].attributes, vec![FieldValue::Null]);
    }

    #[test]
    fn test_add_field() {
        let mut layer = layer();
        layer.add_field(Field::new("x", FieldKind::Real), |f| {
            FieldValue::Real(f.geometry.as_point().unwrap().x)
        });
        assert_eq!(layer.fields().len(), 2);
        assert_eq!(layer.value(&layer.features()[1], "x"), Some(&FieldValue::Real(-3.0)));
        assert_eq!(layer.value(&layer.features()[1], "missing"), None);
    }

    #[test]
    fn test_layer_extent() {
        let layer = layer();
        assert_eq!(layer.extent(), Some(Extent::new(-3.0, 2.0, 1.0, 5.0)));
        let empty = VectorLayer::new("e", SpatialRef::Unknown, Vec::new());
        assert_eq!(empty.extent(), None);
    }

    #[test]
    fn test_field_value_as_f64() {
        assert_eq!(FieldValue::Integer(4).as_f64(), Some(4.0));
        assert_eq!(FieldValue::Real(2.5).as_f64(), Some(2.5));
        assert_eq!(FieldValue::Null.as_f64(), None);
        assert!(FieldValue::Null.is_null());
    }
}
