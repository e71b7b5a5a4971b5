//! agrimap - field boundary geodata engine
//!
//! This library turns heterogeneous field-boundary data (raw coordinate
//! arrays, GeoJSON geometries and features, remotely hosted KML documents)
//! into a single rendered vector layer, and waits for a backend to finish
//! analysing uploaded drone-survey reports.
//!
//! # High-Level API
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use agrimap::config::ConfigFile;
//! use agrimap::credential::EnvToken;
//! use agrimap::http::AsyncReqwestClient;
//! use agrimap::ingest::KmlPipeline;
//! use agrimap::map::{BoundaryResolver, BoundarySources, HeadlessSurface, LayerManager};
//!
//! let config = ConfigFile::load()?;
//! let client = AsyncReqwestClient::with_timeout(config.backend.timeout)?;
//! let pipeline = KmlPipeline::from_config(client, &config.pipeline_config())?;
//! let manager = LayerManager::new(HeadlessSurface::default(), config.map_config());
//! let resolver = BoundaryResolver::new(manager, pipeline, Arc::new(EnvToken::new("AGRIMAP_TOKEN")));
//!
//! resolver.show(BoundarySources::default().with_boundary(boundary)).await;
//! ```

pub mod config;
pub mod credential;
pub mod geometry;
pub mod http;
pub mod ingest;
pub mod logging;
pub mod map;
pub mod poll;

/// Version of the agrimap library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
