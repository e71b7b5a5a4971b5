//! Map presentation settings.

use super::tile::BaseTile;
use super::types::{LatLng, View};

/// Default padding around a fitted boundary, in pixels.
pub const DEFAULT_FIT_PADDING_PX: u32 = 20;

/// Default zoom before any boundary is shown.
pub const DEFAULT_ZOOM: u8 = 13;

/// Default center (Nairobi) before any boundary is shown.
pub const DEFAULT_CENTER: LatLng = LatLng::new(-1.2921, 36.8219);

/// Settings for a [`LayerManager`](super::LayerManager).
///
/// # Example
///
/// ```
/// use agrimap::map::{BaseTile, MapConfig};
///
/// let config = MapConfig::default()
///     .with_base_tile(BaseTile::Satellite)
///     .with_fit_padding(32);
/// assert_eq!(config.fit_padding, 32);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapConfig {
    pub fit_padding: u32,
    pub default_view: View,
    pub base_tile: BaseTile,
}

impl MapConfig {
    pub fn with_fit_padding(mut self, padding: u32) -> Self {
        self.fit_padding = padding;
        self
    }

    pub fn with_default_view(mut self, center: LatLng, zoom: u8) -> Self {
        self.default_view = View::new(center, zoom);
        self
    }

    pub fn with_base_tile(mut self, tile: BaseTile) -> Self {
        self.base_tile = tile;
        self
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            fit_padding: DEFAULT_FIT_PADDING_PX,
            default_view: View::new(DEFAULT_CENTER, DEFAULT_ZOOM),
            base_tile: BaseTile::Street,
        }
    }
}
