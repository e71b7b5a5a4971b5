//! Layer lifecycle on a map surface.
//!
//! A [`LayerManager`] owns one surface and guarantees that at most one
//! vector layer, one marker and one base tile layer are on it at any time.
//! Replacing the geometry always removes the old layer first.

use tracing::{debug, trace};

use super::config::MapConfig;
use super::surface::{FeatureStyle, Layer, LayerId, MapSurface, VectorLayer};
use super::tile::BaseTile;
use super::types::{LatLng, View};
use crate::geometry::Geometry;

/// What the manager currently has on its surface.
#[derive(Debug, Clone, PartialEq)]
pub struct MapSurfaceState {
    pub view: View,
    pub base_tile: BaseTile,
    pub base_tile_layer: Option<LayerId>,
    pub vector_layer: Option<LayerId>,
    pub marker: Option<LayerId>,
    /// Polygon count of the vector layer, for hover bounds checks
    pub feature_count: usize,
    /// Feature index currently highlighted, if any
    pub hovered: Option<usize>,
}

/// Owns the layers of one map instance.
pub struct LayerManager<S: MapSurface> {
    surface: S,
    state: MapSurfaceState,
    config: MapConfig,
}

impl<S: MapSurface> LayerManager<S> {
    /// Takes over `surface`: adds the configured base tiles and default view.
    pub fn new(mut surface: S, config: MapConfig) -> Self {
        let base_tile_layer = surface.add_layer(Layer::BaseTile(config.base_tile));
        let view = clamp_zoom(config.default_view, config.base_tile);
        surface.set_view(view);

        Self {
            surface,
            state: MapSurfaceState {
                view,
                base_tile: config.base_tile,
                base_tile_layer: Some(base_tile_layer),
                vector_layer: None,
                marker: None,
                feature_count: 0,
                hovered: None,
            },
            config,
        }
    }

    pub fn state(&self) -> &MapSurfaceState {
        &self.state
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    /// Shows `geometry` as the only vector layer.
    ///
    /// `None` keeps an existing layer in place. With nothing on the map yet,
    /// a marker is placed at the current center instead.
    pub fn set_geometry(&mut self, geometry: Option<&Geometry>) {
        let Some(geometry) = geometry else {
            if self.state.vector_layer.is_none() && self.state.marker.is_none() {
                let center = self.surface.view().center;
                debug!(center = %center, "No boundary to draw, placing marker");
                self.state.marker = Some(self.surface.add_layer(Layer::Marker(center)));
            }
            return;
        };

        self.clear_vector_layer();
        self.clear_marker();

        let id = self
            .surface
            .add_layer(Layer::Vector(VectorLayer::new(geometry.clone())));
        self.state.vector_layer = Some(id);
        self.state.feature_count = geometry.polygon_count();
        debug!(
            layer = id.0,
            polygons = self.state.feature_count,
            "Boundary layer added"
        );

        match geometry.bounds() {
            Some(bounds) if is_fittable(&bounds) => {
                self.surface.fit_bounds(
                    bounds,
                    self.config.fit_padding,
                    self.state.base_tile.max_zoom(),
                );
                self.state.view = self.surface.view();
            }
            _ => trace!("Degenerate boundary bounds, keeping viewport"),
        }
    }

    /// Swaps the base tile layer.
    pub fn set_base_tile(&mut self, tile: BaseTile) {
        if self.state.base_tile == tile && self.state.base_tile_layer.is_some() {
            return;
        }

        if let Some(old) = self.state.base_tile_layer.take() {
            self.surface.remove_layer(old);
        }
        self.state.base_tile_layer = Some(self.surface.add_layer(Layer::BaseTile(tile)));
        self.state.base_tile = tile;

        let view = clamp_zoom(self.surface.view(), tile);
        if view != self.surface.view() {
            self.surface.set_view(view);
        }
        self.state.view = view;
        debug!(tile = %tile, "Base tile changed");
    }

    /// Replaces whatever is shown with a single marker at `point`.
    ///
    /// Invalid positions are ignored.
    pub fn set_marker_only(&mut self, point: LatLng) {
        if !point.is_valid() {
            trace!(point = %point, "Ignoring invalid marker position");
            return;
        }

        self.clear_vector_layer();
        self.clear_marker();
        self.state.marker = Some(self.surface.add_layer(Layer::Marker(point)));
        self.set_view(point, self.state.view.zoom);
    }

    /// Moves the viewport. Invalid centers or zooms beyond the base tile's
    /// range are ignored and the last valid view is kept.
    pub fn set_view(&mut self, center: LatLng, zoom: u8) -> bool {
        if !center.is_valid() || zoom > self.state.base_tile.max_zoom() {
            trace!(center = %center, zoom, "Ignoring invalid view");
            return false;
        }

        let view = View::new(center, zoom);
        self.surface.set_view(view);
        self.state.view = view;
        true
    }

    /// Highlights or un-highlights one feature of the vector layer.
    ///
    /// Returns `false` when there is no such feature.
    pub fn set_hover(&mut self, feature: usize, hovered: bool) -> bool {
        let Some(layer) = self.state.vector_layer else {
            return false;
        };
        if feature >= self.state.feature_count {
            return false;
        }

        let style = if hovered {
            FeatureStyle::HIGHLIGHT
        } else {
            FeatureStyle::DEFAULT
        };

        if hovered {
            if let Some(previous) = self.state.hovered.filter(|&p| p != feature) {
                self.surface
                    .set_feature_style(layer, previous, FeatureStyle::DEFAULT);
            }
            self.state.hovered = Some(feature);
        } else if self.state.hovered == Some(feature) {
            self.state.hovered = None;
        }

        self.surface.set_feature_style(layer, feature, style)
    }

    /// Removes every layer and hands the surface back.
    pub fn teardown(mut self) -> S {
        self.clear_vector_layer();
        self.clear_marker();
        if let Some(base) = self.state.base_tile_layer.take() {
            self.surface.remove_layer(base);
        }
        debug!("Map surface torn down");
        self.surface
    }

    fn clear_vector_layer(&mut self) {
        if let Some(id) = self.state.vector_layer.take() {
            self.surface.remove_layer(id);
            self.state.feature_count = 0;
            self.state.hovered = None;
        }
    }

    fn clear_marker(&mut self) {
        if let Some(id) = self.state.marker.take() {
            self.surface.remove_layer(id);
        }
    }
}

fn is_fittable(bounds: &geo::Rect<f64>) -> bool {
    let (min, max) = (bounds.min(), bounds.max());
    [min.x, min.y, max.x, max.y].iter().all(|v| v.is_finite())
        && max.x - min.x > 0.0
        && max.y - min.y > 0.0
}

fn clamp_zoom(view: View, tile: BaseTile) -> View {
    View::new(view.center, view.zoom.min(tile.max_zoom()))
}
