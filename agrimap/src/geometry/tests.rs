//! Tests for boundary normalization

use super::*;
use serde_json::{json, Value};

fn field_ring() -> Value {
    json!([
        [36.8219, -1.2921],
        [36.8319, -1.2921],
        [36.8319, -1.2821],
        [36.8219, -1.2821],
        [36.8219, -1.2921]
    ])
}

fn field_polygon() -> Value {
    json!({ "type": "Polygon", "coordinates": [field_ring()] })
}

#[test]
fn test_single_polygon_shapes_normalize_identically() {
    let bare = normalize(&field_polygon()).expect("bare polygon should normalize");
    let feature = normalize(&json!({
        "type": "Feature",
        "properties": { "name": "Plot 7" },
        "geometry": field_polygon()
    }))
    .expect("feature should normalize");
    let implicit = normalize(&json!({ "coordinates": [field_ring()] }))
        .expect("coordinates-only object should normalize");

    assert_eq!(bare, feature);
    assert_eq!(bare, implicit);
    assert!(matches!(bare, Geometry::Polygon(_)));
}

#[test]
fn test_implicit_single_ring_is_accepted() {
    let geometry = normalize(&json!({ "coordinates": field_ring() }));
    assert_eq!(geometry, normalize(&field_polygon()));
}

#[test]
fn test_null_returns_none() {
    assert!(normalize(&Value::Null).is_none());
    assert_eq!(validate(&Value::Null), Err(GeometryError::Missing));
}

#[test]
fn test_empty_coordinates_returns_none() {
    assert!(normalize(&json!({ "coordinates": [] })).is_none());
    assert!(normalize(&json!({ "type": "Polygon", "coordinates": [] })).is_none());
    assert!(normalize(&json!({ "type": "Polygon" })).is_none());
    assert!(normalize(&json!({})).is_none());
}

#[test]
fn test_fewer_than_four_points_returns_none() {
    let triangle = json!({
        "type": "Polygon",
        "coordinates": [[[0.0, 0.0], [1.0, 0.0], [0.0, 0.0]]]
    });
    assert!(normalize(&triangle).is_none());
    assert_eq!(
        validate(&triangle),
        Err(GeometryError::TooFewPoints { points: 3 })
    );
}

#[test]
fn test_open_ring_is_closed() {
    let open = json!({ "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]] });
    let Some(Geometry::Polygon(polygon)) = normalize(&open) else {
        panic!("open ring should normalize");
    };
    assert_eq!(polygon.exterior().0.len(), 5);
    assert_eq!(polygon.exterior().0.first(), polygon.exterior().0.last());
}

#[test]
fn test_out_of_range_latitude_returns_none() {
    let input = json!({ "coordinates": [[[0.0, 0.0], [1.0, 91.0], [1.0, 1.0], [0.0, 0.0]]] });
    assert!(normalize(&input).is_none());
}

#[test]
fn test_unsupported_shapes_return_none() {
    assert!(normalize(&json!(42)).is_none());
    assert!(normalize(&json!([1, 2, 3])).is_none());
    assert!(normalize(&json!({ "type": "Point", "coordinates": [1.0, 2.0] })).is_none());
    assert!(normalize(&json!({ "type": "LineString", "coordinates": [[1.0, 2.0]] })).is_none());
    assert!(normalize(&json!({ "type": 7, "coordinates": [field_ring()] })).is_none());
}

#[test]
fn test_feature_collection_becomes_named_collection() {
    let input = json!({
        "type": "FeatureCollection",
        "features": [
            { "type": "Feature", "properties": { "name": "North" }, "geometry": field_polygon() },
            { "type": "Feature", "properties": {}, "geometry": field_polygon() }
        ]
    });

    let Some(Geometry::Collection(polygons)) = normalize(&input) else {
        panic!("feature collection should normalize to a collection");
    };
    assert_eq!(polygons.len(), 2);
    assert_eq!(polygons[0].name.as_deref(), Some("North"));
    assert_eq!(polygons[1].name, None);
}

#[test]
fn test_feature_collection_skips_invalid_features() {
    let input = json!({
        "type": "FeatureCollection",
        "features": [
            { "type": "Feature", "geometry": { "type": "Point", "coordinates": [1.0, 2.0] } },
            "not a feature",
            { "type": "Feature", "geometry": field_polygon() }
        ]
    });
    assert_eq!(normalize(&input).map(|g| g.polygon_count()), Some(1));
}

#[test]
fn test_feature_collection_without_polygons_returns_none() {
    let input = json!({ "type": "FeatureCollection", "features": [] });
    assert_eq!(validate(&input), Err(GeometryError::NoPolygons));
}

#[test]
fn test_multi_polygon_feature_names_every_part() {
    let input = json!({
        "type": "Feature",
        "properties": { "name": "Split field" },
        "geometry": { "type": "MultiPolygon", "coordinates": [[field_ring()], [field_ring()]] }
    });
    let geometry = normalize(&input).unwrap();
    assert_eq!(geometry.names(), vec![Some("Split field"), Some("Split field")]);
}

#[test]
fn test_polygon_with_hole_keeps_interior() {
    let input = json!({
        "type": "Polygon",
        "coordinates": [
            [[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0], [0.0, 0.0]],
            [[2.0, 2.0], [4.0, 2.0], [4.0, 4.0], [2.0, 2.0]]
        ]
    });
    let Some(Geometry::Polygon(polygon)) = normalize(&input) else {
        panic!("polygon with hole should normalize");
    };
    assert_eq!(polygon.interiors().len(), 1);
}

#[test]
fn test_serialized_string_boundary() {
    let text = field_polygon().to_string();
    assert_eq!(normalize(&Value::String(text)), normalize(&field_polygon()));
    assert!(normalize(&json!("not json")).is_none());
}

#[test]
fn test_numeric_strings_are_accepted() {
    let input = json!({ "coordinates": [[["0", "0"], ["1", "0"], ["1", "1"], ["0", "0"]]] });
    assert!(normalize(&input).is_some());
}

#[test]
fn test_input_is_not_mutated() {
    let input = json!({ "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]] });
    let before = input.clone();
    let _ = normalize(&input);
    assert_eq!(input, before);
}
