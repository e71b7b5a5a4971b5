//! Boundary normalization: loosely-typed JSON into canonical [`Geometry`].

use geo::{LineString, Polygon};
use serde_json::{Map, Value};
use tracing::trace;

use super::types::{ring_from_positions, Geometry, GeometryError, NamedPolygon};

/// Normalizes any accepted boundary representation.
///
/// Accepts a `FeatureCollection`, a single `Feature`, a bare `Polygon` or
/// `MultiPolygon` geometry, an object carrying only a `coordinates` array,
/// or a JSON string holding one of those. Anything else returns `None`,
/// which callers treat as "nothing to draw".
pub fn normalize(input: &Value) -> Option<Geometry> {
    match validate(input) {
        Ok(geometry) => Some(geometry),
        Err(e) => {
            trace!(error = %e, "Boundary input is not drawable");
            None
        }
    }
}

/// Like [`normalize`], but reports why an input was rejected.
pub fn validate(input: &Value) -> Result<Geometry, GeometryError> {
    match input {
        Value::Null => Err(GeometryError::Missing),
        Value::String(text) => {
            let parsed: Value = serde_json::from_str(text).map_err(|e| {
                GeometryError::UnsupportedShape(format!("string is not GeoJSON: {}", e))
            })?;
            if parsed.is_string() {
                return Err(GeometryError::UnsupportedShape(
                    "doubly encoded string".to_string(),
                ));
            }
            validate(&parsed)
        }
        Value::Object(object) => match object.get("type") {
            Some(Value::String(kind)) => typed_object(kind, object),
            Some(other) => Err(GeometryError::UnsupportedShape(format!(
                "type must be a string, got {}",
                kind_of(other)
            ))),
            None => implicit_polygon(object.get("coordinates")).map(Geometry::Polygon),
        },
        other => Err(GeometryError::UnsupportedShape(kind_of(other).to_string())),
    }
}

fn typed_object(kind: &str, object: &Map<String, Value>) -> Result<Geometry, GeometryError> {
    match kind {
        "FeatureCollection" => feature_collection(object),
        "Feature" => feature(object),
        "Polygon" | "MultiPolygon" => geometry_object(object, None),
        other => Err(GeometryError::UnsupportedShape(other.to_string())),
    }
}

fn feature_collection(object: &Map<String, Value>) -> Result<Geometry, GeometryError> {
    let features = object
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| GeometryError::UnsupportedShape("features is not an array".to_string()))?;

    let mut polygons = Vec::new();
    for (index, value) in features.iter().enumerate() {
        let Some(feature) = value.as_object() else {
            trace!(index, "Skipping non-object feature");
            continue;
        };
        match feature_polygons(feature) {
            Ok(found) => polygons.extend(found),
            Err(e) => trace!(index, error = %e, "Skipping invalid feature"),
        }
    }

    Geometry::from_polygons(polygons).ok_or(GeometryError::NoPolygons)
}

fn feature(object: &Map<String, Value>) -> Result<Geometry, GeometryError> {
    let geometry = object
        .get("geometry")
        .and_then(Value::as_object)
        .ok_or(GeometryError::EmptyCoordinates)?;
    geometry_object(geometry, feature_name(object))
}

fn feature_polygons(object: &Map<String, Value>) -> Result<Vec<NamedPolygon>, GeometryError> {
    Ok(match feature(object)? {
        Geometry::Polygon(polygon) => vec![NamedPolygon::new(feature_name(object), polygon)],
        Geometry::Collection(polygons) => polygons,
    })
}

/// A bare `Polygon` stays a polygon; a `MultiPolygon` becomes a collection
/// whose members all carry the owning feature's name.
fn geometry_object(
    object: &Map<String, Value>,
    name: Option<String>,
) -> Result<Geometry, GeometryError> {
    let coordinates = object.get("coordinates");
    match object.get("type").and_then(Value::as_str) {
        Some("Polygon") => polygon(coordinates).map(Geometry::Polygon),
        Some("MultiPolygon") => {
            let parts = non_empty_array(coordinates)?;
            let polygons = parts
                .iter()
                .map(|part| polygon(Some(part)).map(|p| NamedPolygon::new(name.clone(), p)))
                .collect::<Result<Vec<_>, _>>()?;
            Geometry::from_polygons(polygons).ok_or(GeometryError::NoPolygons)
        }
        Some(other) => Err(GeometryError::UnsupportedShape(other.to_string())),
        None => Err(GeometryError::UnsupportedShape(
            "geometry without type".to_string(),
        )),
    }
}

/// `coordinates` without a `type`: either an array of rings or a single ring.
fn implicit_polygon(coordinates: Option<&Value>) -> Result<Polygon<f64>, GeometryError> {
    let items = non_empty_array(coordinates)?;
    let is_single_ring = items
        .first()
        .and_then(Value::as_array)
        .and_then(|first| first.first())
        .is_some_and(|v| v.is_number() || v.is_string());

    if is_single_ring {
        Ok(Polygon::new(ring(coordinates.unwrap_or(&Value::Null))?, vec![]))
    } else {
        polygon(coordinates)
    }
}

fn polygon(coordinates: Option<&Value>) -> Result<Polygon<f64>, GeometryError> {
    let mut rings = non_empty_array(coordinates)?
        .iter()
        .map(ring)
        .collect::<Result<Vec<_>, _>>()?;
    let exterior = rings.remove(0);
    Ok(Polygon::new(exterior, rings))
}

fn ring(value: &Value) -> Result<LineString<f64>, GeometryError> {
    let points = value
        .as_array()
        .ok_or_else(|| GeometryError::MalformedPosition(format!("ring is {}", kind_of(value))))?;
    let positions = points.iter().map(position).collect::<Result<Vec<_>, _>>()?;
    ring_from_positions(positions)
}

fn position(value: &Value) -> Result<(f64, f64), GeometryError> {
    match value.as_array().map(Vec::as_slice) {
        Some([lon, lat, ..]) => Ok((number(lon)?, number(lat)?)),
        _ => Err(GeometryError::MalformedPosition(value.to_string())),
    }
}

/// Numbers may arrive as JSON strings from form-backed records.
fn number(value: &Value) -> Result<f64, GeometryError> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| GeometryError::MalformedPosition(value.to_string()))
}

fn non_empty_array(value: Option<&Value>) -> Result<&Vec<Value>, GeometryError> {
    match value.and_then(Value::as_array) {
        Some(items) if !items.is_empty() => Ok(items),
        _ => Err(GeometryError::EmptyCoordinates),
    }
}

fn feature_name(feature: &Map<String, Value>) -> Option<String> {
    feature
        .get("properties")
        .and_then(|p| p.get("name"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
