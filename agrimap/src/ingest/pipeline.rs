//! KML ingestion pipeline.
//!
//! ```text
//! Idle → LibraryLoading → Fetching → Parsing → Converting
//!                                                  │
//!                  ┌───────────────┬───────────────┤
//!                  ▼               ▼               ▼
//!              Succeeded      FallbackUsed       Failed
//! ```
//!
//! Any failure after the library is resident may be replaced by a fallback
//! boundary. A library that never loads fails the attempt outright.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::convert::convert_document;
use super::document::parse_document;
use super::error::KmlError;
use super::fetch::KmlFetcher;
use super::library::{BuiltinKmlLibrary, ConverterLibrary, LibraryConfig, LibraryLoader};
use crate::geometry::{normalize, Geometry};
use crate::http::AsyncHttpClient;

/// Position of an ingestion attempt in its state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IngestState {
    Idle,
    LibraryLoading,
    Fetching,
    Parsing,
    Converting,
    /// The document converted to geometry
    Succeeded,
    /// The document failed; the fallback boundary was rendered instead
    FallbackUsed,
    /// Nothing to render
    Failed,
}

impl IngestState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            IngestState::Succeeded | IngestState::FallbackUsed | IngestState::Failed
        )
    }
}

/// Outcome of one [`KmlPipeline::ingest`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestReport {
    /// Geometry to render, if any
    pub geometry: Option<Geometry>,
    /// Terminal state
    pub state: IngestState,
    /// The failure that was recovered from or that ended the attempt
    pub failure: Option<KmlError>,
    /// Every state visited, in order, starting at `Idle`
    pub transitions: Vec<IngestState>,
}

/// User-facing notifications raised by the pipeline.
///
/// Each method is called at most once per ingestion attempt.
pub trait IngestObserver: Send + Sync {
    /// The KML failed and the fallback boundary is shown instead.
    fn on_fallback(&self, _uri: &str, _error: &KmlError) {}

    /// The KML failed and nothing could be shown.
    fn on_failure(&self, _uri: &str, _error: &KmlError) {}
}

/// Ingestion settings taken from the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PipelineConfig {
    /// Base URL used for relative KML references
    pub base_url: Option<String>,
    pub library: LibraryConfig,
}

/// Turns a KML reference into canonical geometry.
pub struct KmlPipeline<C: AsyncHttpClient, L: LibraryLoader = BuiltinKmlLibrary> {
    fetcher: KmlFetcher<C>,
    library: Arc<ConverterLibrary<L>>,
    observer: Option<Arc<dyn IngestObserver>>,
}

impl<C: AsyncHttpClient> KmlPipeline<C, BuiltinKmlLibrary> {
    /// Creates a pipeline backed by the process-wide converter library.
    pub fn new(client: C, base_url: Option<&str>) -> Result<Self, KmlError> {
        Ok(Self {
            fetcher: KmlFetcher::new(client, base_url)?,
            library: ConverterLibrary::shared(),
            observer: None,
        })
    }

    /// Creates a pipeline with the given library probe settings.
    ///
    /// Pipelines built from equal settings share one library, and the
    /// default settings share [`ConverterLibrary::shared`].
    pub fn from_config(client: C, config: &PipelineConfig) -> Result<Self, KmlError> {
        let library = ConverterLibrary::for_config(config.library);
        Self::with_library(client, config.base_url.as_deref(), library)
    }
}

impl<C: AsyncHttpClient, L: LibraryLoader> KmlPipeline<C, L> {
    /// Creates a pipeline backed by a specific converter library.
    pub fn with_library(
        client: C,
        base_url: Option<&str>,
        library: Arc<ConverterLibrary<L>>,
    ) -> Result<Self, KmlError> {
        Ok(Self {
            fetcher: KmlFetcher::new(client, base_url)?,
            library,
            observer: None,
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn IngestObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn library(&self) -> &Arc<ConverterLibrary<L>> {
        &self.library
    }

    /// Runs one ingestion attempt.
    ///
    /// Never fails: every error ends in the report. `fallback` is any
    /// boundary shape accepted by [`normalize`].
    pub async fn ingest(
        &self,
        uri: &str,
        credential: Option<&str>,
        fallback: Option<&Value>,
    ) -> IngestReport {
        let mut run = Run::new(uri);

        run.enter(IngestState::LibraryLoading);
        let converter = match self.library.ensure_loaded().await {
            Ok(converter) => converter,
            Err(e) => return self.fail(run, e),
        };

        match self.fetch_and_convert(&mut run, &*converter, credential).await {
            Ok(geometry) => {
                info!(
                    uri = %uri,
                    polygons = geometry.polygon_count(),
                    "KML boundary ingested"
                );
                run.finish(IngestState::Succeeded, Some(geometry), None)
            }
            Err(e) => match fallback.filter(|_| e.is_recoverable()).and_then(normalize) {
                Some(geometry) => {
                    warn!(uri = %uri, error = %e, "KML failed, showing fallback boundary");
                    if let Some(observer) = &self.observer {
                        observer.on_fallback(uri, &e);
                    }
                    run.finish(IngestState::FallbackUsed, Some(geometry), Some(e))
                }
                None => self.fail(run, e),
            },
        }
    }

    async fn fetch_and_convert(
        &self,
        run: &mut Run<'_>,
        converter: &dyn super::convert::KmlConverter,
        credential: Option<&str>,
    ) -> Result<Geometry, KmlError> {
        run.enter(IngestState::Fetching);
        let body = self.fetcher.fetch(run.uri, credential).await?;

        run.enter(IngestState::Parsing);
        let document = parse_document(body)?;
        debug!(uri = %run.uri, placemarks = document.placemarks(), "KML document parsed");

        run.enter(IngestState::Converting);
        convert_document(converter, &document)
    }

    fn fail(&self, run: Run<'_>, error: KmlError) -> IngestReport {
        warn!(uri = %run.uri, error = %error, "KML boundary unavailable");
        if let Some(observer) = &self.observer {
            observer.on_failure(run.uri, &error);
        }
        run.finish(IngestState::Failed, None, Some(error))
    }
}

/// Transition bookkeeping for a single attempt.
struct Run<'a> {
    uri: &'a str,
    transitions: Vec<IngestState>,
}

impl<'a> Run<'a> {
    fn new(uri: &'a str) -> Self {
        Self {
            uri,
            transitions: vec![IngestState::Idle],
        }
    }

    fn enter(&mut self, state: IngestState) {
        debug!(uri = %self.uri, state = ?state, "KML ingestion state");
        self.transitions.push(state);
    }

    fn finish(
        mut self,
        state: IngestState,
        geometry: Option<Geometry>,
        failure: Option<KmlError>,
    ) -> IngestReport {
        self.enter(state);
        IngestReport {
            geometry,
            state,
            failure,
            transitions: self.transitions,
        }
    }
}
