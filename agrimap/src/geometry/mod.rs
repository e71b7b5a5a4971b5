//! Canonical field geometry and boundary normalization.
//!
//! Every boundary source a caller can hand us (GeoJSON feature collections,
//! single features, bare polygons, or bare `coordinates` objects) is
//! normalized into one [`Geometry`] value before it reaches the map.
//!
//! Normalization is pure: it never performs I/O, never mutates its input and
//! never fails loudly. Inputs that cannot be drawn produce `None`.
//!
//! ```
//! use agrimap::geometry::{normalize, Geometry};
//! use serde_json::json;
//!
//! let boundary = json!({
//!     "coordinates": [[[36.8, -1.3], [36.9, -1.3], [36.9, -1.2], [36.8, -1.3]]]
//! });
//! assert!(matches!(normalize(&boundary), Some(Geometry::Polygon(_))));
//! assert!(normalize(&json!(null)).is_none());
//! ```

mod normalize;
mod types;

pub use normalize::{normalize, validate};
pub use types::{
    is_valid_position, ring_from_positions, Geometry, GeometryError, NamedPolygon, MAX_LAT,
    MAX_LON, MIN_LAT, MIN_LON, MIN_RING_POINTS,
};

#[cfg(test)]
mod tests;
