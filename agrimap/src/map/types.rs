//! Map view types.

use std::f64::consts::PI;
use std::fmt;

use crate::geometry::{MAX_LAT, MAX_LON, MIN_LAT, MIN_LON};

/// Size of one slippy-map tile in pixels.
pub const TILE_SIZE_PX: f64 = 256.0;

/// A WGS84 position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Finite and inside the WGS84 range.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (MIN_LAT..=MAX_LAT).contains(&self.lat)
            && (MIN_LON..=MAX_LON).contains(&self.lng)
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lng)
    }
}

/// Center and zoom of a map surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct View {
    pub center: LatLng,
    pub zoom: u8,
}

impl View {
    pub const fn new(center: LatLng, zoom: u8) -> Self {
        Self { center, zoom }
    }
}

/// Web Mercator y for a latitude, normalized to [0, 1] at the poles of the projection.
pub(crate) fn mercator_y(lat: f64) -> f64 {
    let lat = lat.clamp(-85.051_128_78, 85.051_128_78);
    let lat_rad = lat.to_radians();
    (1.0 - lat_rad.tan().asinh() / PI) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latlng_validity() {
        assert!(LatLng::new(-1.29, 36.82).is_valid());
        assert!(LatLng::new(90.0, 180.0).is_valid());
        assert!(!LatLng::new(91.0, 0.0).is_valid());
        assert!(!LatLng::new(0.0, -180.5).is_valid());
        assert!(!LatLng::new(f64::NAN, 0.0).is_valid());
        assert!(!LatLng::new(0.0, f64::INFINITY).is_valid());
    }

    #[test]
    fn test_mercator_y_equator_is_half() {
        assert!((mercator_y(0.0) - 0.5).abs() < 1e-12);
        assert!(mercator_y(45.0) < 0.5);
        assert!(mercator_y(-45.0) > 0.5);
    }
}
