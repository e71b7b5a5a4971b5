//! Canonical geometry type definitions

use geo::{BoundingRect, Coord, LineString, MultiPolygon, Polygon, Rect};
use thiserror::Error;

/// Valid latitude range
pub const MIN_LAT: f64 = -90.0;
pub const MAX_LAT: f64 = 90.0;

/// Valid longitude range
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Minimum number of points in a closed ring (three corners plus closure).
pub const MIN_RING_POINTS: usize = 4;

/// Reasons a boundary input cannot be turned into canonical geometry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    /// Input is `null` or absent
    #[error("No boundary supplied")]
    Missing,

    /// Input is not one of the accepted boundary shapes
    #[error("Unsupported boundary shape: {0}")]
    UnsupportedShape(String),

    /// Coordinates array is empty or absent
    #[error("Boundary has no coordinates")]
    EmptyCoordinates,

    /// A ring has fewer points than a closed polygon needs
    #[error("Ring has {points} points, at least 4 are required")]
    TooFewPoints { points: usize },

    /// A position is not a `[longitude, latitude]` pair of numbers
    #[error("Malformed position: {0}")]
    MalformedPosition(String),

    /// A position is non-finite or outside the WGS84 range
    #[error("Position [{lon}, {lat}] is outside the valid range")]
    InvalidPosition { lon: f64, lat: f64 },

    /// A collection contained no drawable polygon
    #[error("Collection contains no valid polygon")]
    NoPolygons,
}

/// Returns true if the position is finite and inside the WGS84 range.
#[inline]
pub fn is_valid_position(lon: f64, lat: f64) -> bool {
    lon.is_finite()
        && lat.is_finite()
        && (MIN_LON..=MAX_LON).contains(&lon)
        && (MIN_LAT..=MAX_LAT).contains(&lat)
}

/// Builds a closed ring from `(longitude, latitude)` positions.
///
/// The input must carry at least [`MIN_RING_POINTS`] points. An open ring is
/// closed by repeating its first point.
pub fn ring_from_positions(positions: Vec<(f64, f64)>) -> Result<LineString<f64>, GeometryError> {
    if positions.len() < MIN_RING_POINTS {
        return Err(GeometryError::TooFewPoints {
            points: positions.len(),
        });
    }

    if let Some(&(lon, lat)) = positions
        .iter()
        .find(|(lon, lat)| !is_valid_position(*lon, *lat))
    {
        return Err(GeometryError::InvalidPosition { lon, lat });
    }

    let mut coords: Vec<Coord<f64>> = positions
        .into_iter()
        .map(|(x, y)| Coord { x, y })
        .collect();

    if coords.first() != coords.last() {
        coords.push(coords[0]);
    }

    Ok(LineString::new(coords))
}

/// A polygon with an optional display name (e.g. a KML placemark name).
#[derive(Debug, Clone, PartialEq)]
pub struct NamedPolygon {
    pub name: Option<String>,
    pub polygon: Polygon<f64>,
}

impl NamedPolygon {
    pub fn new(name: Option<String>, polygon: Polygon<f64>) -> Self {
        Self { name, polygon }
    }
}

/// Canonical field geometry.
///
/// Either a single polygon or a collection of named polygons. Every ring is
/// closed, has at least four points, and holds finite WGS84 coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Polygon(Polygon<f64>),
    Collection(Vec<NamedPolygon>),
}

impl Geometry {
    /// Builds a collection, or `None` when there is nothing to draw.
    pub fn from_polygons(polygons: Vec<NamedPolygon>) -> Option<Self> {
        if polygons.is_empty() {
            None
        } else {
            Some(Geometry::Collection(polygons))
        }
    }

    /// Number of polygons (features) this geometry renders as.
    pub fn polygon_count(&self) -> usize {
        match self {
            Geometry::Polygon(_) => 1,
            Geometry::Collection(polygons) => polygons.len(),
        }
    }

    /// All polygons in render order.
    pub fn polygons(&self) -> Vec<&Polygon<f64>> {
        match self {
            Geometry::Polygon(polygon) => vec![polygon],
            Geometry::Collection(polygons) => polygons.iter().map(|p| &p.polygon).collect(),
        }
    }

    /// Names of the polygons, `None` where a polygon is unnamed.
    pub fn names(&self) -> Vec<Option<&str>> {
        match self {
            Geometry::Polygon(_) => vec![None],
            Geometry::Collection(polygons) => polygons.iter().map(|p| p.name.as_deref()).collect(),
        }
    }

    pub fn to_multi_polygon(&self) -> MultiPolygon<f64> {
        MultiPolygon::new(self.polygons().into_iter().cloned().collect())
    }

    /// Bounding box of every polygon, `None` for an empty collection.
    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.to_multi_polygon().bounding_rect()
    }

    /// Re-checks the ring invariants.
    ///
    /// Used on geometry produced outside the normalizer, such as polygons
    /// returned by a KML conversion library.
    pub fn check(&self) -> Result<(), GeometryError> {
        for polygon in self.polygons() {
            check_ring(polygon.exterior())?;
            for interior in polygon.interiors() {
                check_ring(interior)?;
            }
        }
        Ok(())
    }
}

fn check_ring(ring: &LineString<f64>) -> Result<(), GeometryError> {
    if ring.0.len() < MIN_RING_POINTS {
        return Err(GeometryError::TooFewPoints {
            points: ring.0.len(),
        });
    }
    match ring.0.iter().find(|c| !is_valid_position(c.x, c.y)) {
        Some(c) => Err(GeometryError::InvalidPosition { lon: c.x, lat: c.y }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod type_tests {
    use super::*;

    fn square() -> Polygon<f64> {
        let ring = ring_from_positions(vec![(10.0, 50.0), (11.0, 50.0), (11.0, 51.0), (10.0, 51.0)])
            .unwrap();
        Polygon::new(ring, vec![])
    }

    #[test]
    fn test_ring_is_closed_when_open() {
        let ring =
            ring_from_positions(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]).unwrap();
        assert_eq!(ring.0.len(), 5);
        assert_eq!(ring.0.first(), ring.0.last());
    }

    #[test]
    fn test_closed_ring_is_not_extended() {
        let ring =
            ring_from_positions(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)]).unwrap();
        assert_eq!(ring.0.len(), 4);
    }

    #[test]
    fn test_ring_rejects_out_of_range() {
        let result = ring_from_positions(vec![(0.0, 0.0), (181.0, 0.0), (1.0, 1.0), (0.0, 0.0)]);
        assert!(matches!(
            result,
            Err(GeometryError::InvalidPosition { lon, .. }) if lon == 181.0
        ));
    }

    #[test]
    fn test_ring_rejects_non_finite() {
        let result = ring_from_positions(vec![(0.0, 0.0), (f64::NAN, 0.0), (1.0, 1.0), (0.0, 0.0)]);
        assert!(matches!(result, Err(GeometryError::InvalidPosition { .. })));
    }

    #[test]
    fn test_bounds_cover_all_polygons() {
        let other = Polygon::new(
            ring_from_positions(vec![(20.0, 40.0), (21.0, 40.0), (21.0, 41.0), (20.0, 40.0)])
                .unwrap(),
            vec![],
        );
        let geometry = Geometry::Collection(vec![
            NamedPolygon::new(Some("north".to_string()), square()),
            NamedPolygon::new(None, other),
        ]);

        let bounds = geometry.bounds().unwrap();
        assert_eq!(bounds.min(), Coord { x: 10.0, y: 40.0 });
        assert_eq!(bounds.max(), Coord { x: 21.0, y: 51.0 });
        assert_eq!(geometry.polygon_count(), 2);
        assert_eq!(geometry.names(), vec![Some("north"), None]);
    }

    #[test]
    fn test_empty_collection_is_nothing() {
        assert!(Geometry::from_polygons(vec![]).is_none());
    }

    #[test]
    fn test_check_flags_bad_library_output() {
        let bad = Polygon::new(
            LineString::new(vec![
                Coord { x: 0.0, y: 0.0 },
                Coord { x: 0.0, y: 95.0 },
                Coord { x: 1.0, y: 1.0 },
                Coord { x: 0.0, y: 0.0 },
            ]),
            vec![],
        );
        assert!(Geometry::Polygon(bad).check().is_err());
        assert!(Geometry::Polygon(square()).check().is_ok());
    }
}
