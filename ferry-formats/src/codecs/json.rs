//! JSON and GeoJSON

use geojson::{Feature, FeatureCollection, GeoJson};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

use crate::error::FormatResult;
use crate::registry::{Loader, Payload, Saver};
use crate::value::Value;

/// Serialise with four-space indentation.
pub fn to_indented_json<T: Serialize>(value: &T) -> FormatResult<Vec<u8>> {
    let mut out = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    Ok(out)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Loader for JsonCodec {
    fn load(&self, payload: Payload) -> FormatResult<Value> {
        let text = payload.into_text()?;
        Ok(Value::Json(serde_json::from_str(&text)?))
    }
}

impl Saver for JsonCodec {
    fn save(&self, value: &Value, _name: &str) -> FormatResult<Vec<u8>> {
        match value {
            Value::Json(json) => to_indented_json(json),
            other => Err(other.mismatch("json")),
        }
    }
}

/// Single-layer vector data as a feature collection
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoJsonCodec;

impl Loader for GeoJsonCodec {
    fn load(&self, payload: Payload) -> FormatResult<Value> {
        let text = payload.into_text()?;
        let collection = match text.parse::<GeoJson>()? {
            GeoJson::FeatureCollection(collection) => collection,
            GeoJson::Feature(feature) => single(feature),
            GeoJson::Geometry(geometry) => single(Feature::from(geometry)),
        };
        Ok(Value::Features(collection))
    }
}

impl Saver for GeoJsonCodec {
    fn save(&self, value: &Value, _name: &str) -> FormatResult<Vec<u8>> {
        match value {
            Value::Features(collection) => to_indented_json(collection),
            other => Err(other.mismatch("features")),
        }
    }
}

fn single(feature: Feature) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: vec![feature],
        foreign_members: None,
    }
}
