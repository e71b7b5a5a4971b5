//! Boundary source selection.
//!
//! A map instance may be handed up to three boundary sources at once. The
//! KML reference wins when present, with the raw boundary (or else the
//! explicit geometry) as its fallback. Without a KML reference the explicit
//! geometry wins over the raw boundary.
//!
//! Calls are last-writer-wins: a KML result that arrives after a newer
//! [`BoundaryResolver::show`] call started is dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use serde_json::Value;
use tracing::debug;

use super::manager::LayerManager;
use super::surface::MapSurface;
use crate::credential::CredentialSource;
use crate::geometry::{normalize, Geometry};
use crate::http::AsyncHttpClient;
use crate::ingest::{BuiltinKmlLibrary, IngestState, KmlPipeline, LibraryLoader};

/// A remote KML boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KmlReference {
    pub uri: String,
    /// Attach the bearer credential when fetching
    pub requires_credential: bool,
}

impl KmlReference {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            requires_credential: false,
        }
    }

    pub fn authenticated(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            requires_credential: true,
        }
    }
}

/// Every boundary input of one map instance.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoundarySources {
    /// Already-canonical or near-canonical geometry
    pub geometry: Option<Value>,
    pub kml: Option<KmlReference>,
    /// Loosely-typed polygon, last resort and KML fallback
    pub boundary: Option<Value>,
}

impl BoundarySources {
    pub fn with_geometry(mut self, geometry: Value) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn with_kml(mut self, kml: KmlReference) -> Self {
        self.kml = Some(kml);
        self
    }

    pub fn with_boundary(mut self, boundary: Value) -> Self {
        self.boundary = Some(boundary);
        self
    }

    /// Fallback handed to the KML pipeline.
    fn kml_fallback(&self) -> Option<&Value> {
        self.boundary.as_ref().or(self.geometry.as_ref())
    }
}

/// Which input produced the displayed geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Geometry,
    Kml,
    Boundary,
}

/// Outcome of [`BoundaryResolver::show`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The result reached the layer manager
    Applied {
        /// Source of the displayed geometry, `None` when nothing resolved
        source: Option<SourceKind>,
        /// Terminal KML state when the KML source was used
        ingest: Option<IngestState>,
    },
    /// Same sources as the previous call; nothing was done
    Unchanged,
    /// A newer call started while this one was fetching
    Superseded,
}

/// Resolves boundary sources and hands the result to a [`LayerManager`].
pub struct BoundaryResolver<S, C, L = BuiltinKmlLibrary>
where
    S: MapSurface,
    C: AsyncHttpClient,
    L: LibraryLoader,
{
    manager: Mutex<LayerManager<S>>,
    pipeline: KmlPipeline<C, L>,
    credentials: Arc<dyn CredentialSource>,
    generation: AtomicU64,
    last_sources: Mutex<Option<BoundarySources>>,
}

impl<S, C, L> BoundaryResolver<S, C, L>
where
    S: MapSurface,
    C: AsyncHttpClient,
    L: LibraryLoader,
{
    pub fn new(
        manager: LayerManager<S>,
        pipeline: KmlPipeline<C, L>,
        credentials: Arc<dyn CredentialSource>,
    ) -> Self {
        Self {
            manager: Mutex::new(manager),
            pipeline,
            credentials,
            generation: AtomicU64::new(0),
            last_sources: Mutex::new(None),
        }
    }

    /// Locks the layer manager, e.g. for hover or base tile changes.
    pub fn manager(&self) -> MutexGuard<'_, LayerManager<S>> {
        self.manager.lock()
    }

    pub fn into_manager(self) -> LayerManager<S> {
        self.manager.into_inner()
    }

    /// Resolves `sources` and updates the map.
    ///
    /// Sources count as shown only once their result reaches the layer
    /// manager, so a call dropped mid-flight does not block a retry.
    pub async fn show(&self, sources: BoundarySources) -> Resolution {
        if self.last_sources.lock().as_ref() == Some(&sources) {
            debug!("Boundary sources unchanged, skipping");
            return Resolution::Unchanged;
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let (geometry, source, ingest) = match &sources.kml {
            Some(kml) => {
                let token = if kml.requires_credential {
                    self.credentials.bearer_token()
                } else {
                    None
                };
                let report = self
                    .pipeline
                    .ingest(&kml.uri, token.as_deref(), sources.kml_fallback())
                    .await;
                let source = report.geometry.as_ref().map(|_| SourceKind::Kml);
                (report.geometry, source, Some(report.state))
            }
            None => {
                let (geometry, source) = resolve_local(&sources);
                (geometry, source, None)
            }
        };

        let mut manager = self.manager.lock();
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(generation, "Boundary result superseded, discarding");
            return Resolution::Superseded;
        }

        manager.set_geometry(geometry.as_ref());
        *self.last_sources.lock() = Some(sources);
        Resolution::Applied { source, ingest }
    }
}

/// Explicit geometry first, raw boundary second.
fn resolve_local(sources: &BoundarySources) -> (Option<Geometry>, Option<SourceKind>) {
    if let Some(geometry) = sources.geometry.as_ref().and_then(normalize) {
        return (Some(geometry), Some(SourceKind::Geometry));
    }
    if let Some(geometry) = sources.boundary.as_ref().and_then(normalize) {
        return (Some(geometry), Some(SourceKind::Boundary));
    }
    (None, None)
}
