//! Map layer lifecycle.
//!
//! # Architecture
//!
//! ```text
//! BoundarySources ──► BoundaryResolver ──► KmlPipeline / normalize
//!                            │
//!                            ▼
//!                      LayerManager ──► MapSurface (HeadlessSurface, ...)
//! ```
//!
//! The resolver picks one boundary source, the manager keeps exactly one
//! vector layer on the surface and fits the viewport to it.

mod config;
mod manager;
mod resolver;
mod surface;
mod tile;
mod types;

pub use config::{MapConfig, DEFAULT_CENTER, DEFAULT_FIT_PADDING_PX, DEFAULT_ZOOM};
pub use manager::{LayerManager, MapSurfaceState};
pub use resolver::{BoundaryResolver, BoundarySources, KmlReference, Resolution, SourceKind};
pub use surface::{FeatureStyle, HeadlessSurface, Layer, LayerId, MapSurface, VectorLayer};
pub use tile::{BaseTile, UnknownBaseTile};
pub use types::{LatLng, View, TILE_SIZE_PX};
