//! Rendering surface abstraction.
//!
//! The layer manager only talks to a [`MapSurface`]. A real map widget, a
//! tile renderer or [`HeadlessSurface`] can sit behind it.

use std::collections::BTreeMap;

use geo::Rect;

use super::tile::BaseTile;
use super::types::{mercator_y, LatLng, View, TILE_SIZE_PX};
use crate::geometry::Geometry;

/// Handle to a layer on a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayerId(pub u64);

/// Presentation state of one polygon in a vector layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureStyle {
    /// Stroke and fill color as `#RRGGBB`
    pub color: &'static str,
    /// Stroke width in pixels
    pub weight: f64,
    pub fill_opacity: f64,
}

impl FeatureStyle {
    pub const DEFAULT: FeatureStyle = FeatureStyle {
        color: "#2E7D32",
        weight: 2.0,
        fill_opacity: 0.2,
    };

    pub const HIGHLIGHT: FeatureStyle = FeatureStyle {
        color: "#2E7D32",
        weight: 4.0,
        fill_opacity: 0.4,
    };
}

impl Default for FeatureStyle {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// A field boundary drawn over the base tiles.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorLayer {
    pub geometry: Geometry,
    /// One style per polygon, in [`Geometry::polygons`] order
    pub styles: Vec<FeatureStyle>,
}

impl VectorLayer {
    pub fn new(geometry: Geometry) -> Self {
        let styles = vec![FeatureStyle::DEFAULT; geometry.polygon_count()];
        Self { geometry, styles }
    }
}

/// Anything a surface can draw.
#[derive(Debug, Clone, PartialEq)]
pub enum Layer {
    BaseTile(BaseTile),
    Vector(VectorLayer),
    Marker(LatLng),
}

/// Operations the layer manager needs from a map.
pub trait MapSurface: Send {
    fn add_layer(&mut self, layer: Layer) -> LayerId;

    /// Removes a layer; returns `false` if it was not present.
    fn remove_layer(&mut self, id: LayerId) -> bool;

    /// Moves the viewport so that `bounds` is visible with `padding` pixels
    /// on every side, never zooming in past `max_zoom`.
    fn fit_bounds(&mut self, bounds: Rect<f64>, padding: u32, max_zoom: u8);

    fn set_view(&mut self, view: View);

    fn view(&self) -> View;

    /// Restyles one polygon of a vector layer; returns `false` if there is
    /// no such layer or feature.
    fn set_feature_style(&mut self, id: LayerId, feature: usize, style: FeatureStyle) -> bool;

    fn layer_count(&self) -> usize;
}

/// In-memory surface that keeps layers and viewport as plain data.
#[derive(Debug, Clone)]
pub struct HeadlessSurface {
    width_px: u32,
    height_px: u32,
    view: View,
    layers: BTreeMap<LayerId, Layer>,
    next_id: u64,
    fits: usize,
}

impl HeadlessSurface {
    pub fn new(width_px: u32, height_px: u32, view: View) -> Self {
        Self {
            width_px,
            height_px,
            view,
            layers: BTreeMap::new(),
            next_id: 1,
            fits: 0,
        }
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.get(&id)
    }

    pub fn layers(&self) -> impl Iterator<Item = (&LayerId, &Layer)> {
        self.layers.iter()
    }

    /// Vector layers currently on the surface.
    pub fn vector_layers(&self) -> Vec<&VectorLayer> {
        self.layers
            .values()
            .filter_map(|layer| match layer {
                Layer::Vector(vector) => Some(vector),
                _ => None,
            })
            .collect()
    }

    pub fn markers(&self) -> Vec<LatLng> {
        self.layers
            .values()
            .filter_map(|layer| match layer {
                Layer::Marker(point) => Some(*point),
                _ => None,
            })
            .collect()
    }

    pub fn base_tiles(&self) -> Vec<BaseTile> {
        self.layers
            .values()
            .filter_map(|layer| match layer {
                Layer::BaseTile(tile) => Some(*tile),
                _ => None,
            })
            .collect()
    }

    /// Number of `fit_bounds` calls so far.
    pub fn fit_count(&self) -> usize {
        self.fits
    }
}

impl Default for HeadlessSurface {
    fn default() -> Self {
        Self::new(800, 600, View::new(LatLng::new(0.0, 0.0), 2))
    }
}

impl MapSurface for HeadlessSurface {
    fn add_layer(&mut self, layer: Layer) -> LayerId {
        let id = LayerId(self.next_id);
        self.next_id += 1;
        self.layers.insert(id, layer);
        id
    }

    fn remove_layer(&mut self, id: LayerId) -> bool {
        self.layers.remove(&id).is_some()
    }

    fn fit_bounds(&mut self, bounds: Rect<f64>, padding: u32, max_zoom: u8) {
        let center = bounds.center();
        let usable_w = self.width_px.saturating_sub(2 * padding).max(1) as f64;
        let usable_h = self.height_px.saturating_sub(2 * padding).max(1) as f64;

        // Fractions of the world covered at zoom 0
        let span_x = (bounds.max().x - bounds.min().x) / 360.0;
        let span_y = (mercator_y(bounds.min().y) - mercator_y(bounds.max().y)).abs();

        let zoom_for = |span: f64, usable: f64| {
            if span > 0.0 {
                (usable / (TILE_SIZE_PX * span)).log2().floor()
            } else {
                f64::from(max_zoom)
            }
        };
        let zoom = zoom_for(span_x, usable_w)
            .min(zoom_for(span_y, usable_h))
            .clamp(0.0, f64::from(max_zoom)) as u8;

        self.view = View::new(LatLng::new(center.y, center.x), zoom);
        self.fits += 1;
    }

    fn set_view(&mut self, view: View) {
        self.view = view;
    }

    fn view(&self) -> View {
        self.view
    }

    fn set_feature_style(&mut self, id: LayerId, feature: usize, style: FeatureStyle) -> bool {
        match self.layers.get_mut(&id) {
            Some(Layer::Vector(vector)) => match vector.styles.get_mut(feature) {
                Some(slot) => {
                    *slot = style;
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    fn layer_count(&self) -> usize {
        self.layers.len()
    }
}
