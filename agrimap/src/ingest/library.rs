//! Process-wide KML conversion library.
//!
//! The conversion capability is published into a [`LibraryRegistry`] of
//! named exports. It may not be resident when the first KML reference
//! arrives, so [`ConverterLibrary`] loads it on demand, exactly once.
//!
//! # Lifecycle
//!
//! ```text
//! NotLoaded --ensure_loaded()--> Loading --capability found--> Loaded
//!                                   │
//!                                   └--attempt ceiling reached--> LoadFailed
//! LoadFailed --next ensure_loaded()--> Loading
//! ```
//!
//! # Single-flight
//!
//! Concurrent callers that arrive while a load is in progress subscribe to
//! the in-flight load's broadcast channel instead of triggering their own:
//!
//! ```text
//! ingest A ─┐
//!           │                          LibraryLoader
//! ingest B ─┼──► ConverterLibrary ────► (one load)
//!           │          │                    │
//! ingest C ─┘          ▼                    ▼
//!              [A, B, C receive the same converter]
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::convert::{convert_with_kml_crate, ConvertFn, FnConverter, KmlConverter};
use super::error::KmlError;

/// Export name of the free-function access pattern.
pub const FUNCTION_EXPORT: &str = "kml";

/// Export name of the namespaced access pattern (`toGeoJSON.kml`).
pub const NAMESPACE_EXPORT: &str = "toGeoJSON";

/// Method looked up inside [`NAMESPACE_EXPORT`].
pub const NAMESPACE_METHOD: &str = "kml";

/// Default interval between capability probes.
pub const DEFAULT_PROBE_INTERVAL_MS: u64 = 100;

/// Default number of capability probes before declaring load failure.
pub const DEFAULT_PROBE_ATTEMPTS: u32 = 50;

/// Shape under which a library exposes its conversion capability.
#[derive(Clone)]
pub enum Export {
    /// A callable published directly under its export name
    Function(ConvertFn),
    /// An object whose methods are callables
    Namespace(HashMap<String, ConvertFn>),
}

/// Named exports published by loaded libraries.
#[derive(Default)]
pub struct LibraryRegistry {
    exports: RwLock<HashMap<String, Export>>,
}

impl LibraryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by every pipeline in this process.
    pub fn global() -> Arc<LibraryRegistry> {
        static GLOBAL: OnceLock<Arc<LibraryRegistry>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(LibraryRegistry::new())))
    }

    pub fn register(&self, name: impl Into<String>, export: Export) {
        self.exports.write().insert(name.into(), export);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.exports.read().contains_key(name)
    }
}

/// Resolves whichever export shape is present into one converter.
///
/// Tries the free function first, then the namespaced method. Either name
/// may carry either shape; a namespace published under the function name
/// is searched for the method as well.
pub fn resolve_capability(registry: &LibraryRegistry) -> Option<Arc<dyn KmlConverter>> {
    let exports = registry.exports.read();

    for name in [FUNCTION_EXPORT, NAMESPACE_EXPORT] {
        let found = match exports.get(name) {
            Some(Export::Function(convert)) => Some((name.to_string(), Arc::clone(convert))),
            Some(Export::Namespace(methods)) => methods
                .get(NAMESPACE_METHOD)
                .map(|convert| (format!("{}.{}", name, NAMESPACE_METHOD), Arc::clone(convert))),
            None => None,
        };

        if let Some((export, convert)) = found {
            return Some(Arc::new(FnConverter::new(export, convert)));
        }
    }

    None
}

/// Makes a conversion library resident.
///
/// A loader may publish its exports before returning, or start a background
/// load that publishes later; [`ConverterLibrary`] probes the registry
/// afterwards either way.
pub trait LibraryLoader: Send + Sync + 'static {
    fn load(&self, registry: Arc<LibraryRegistry>)
        -> impl Future<Output = Result<(), KmlError>> + Send;
}

/// Loader that publishes the `kml`-crate converter under `toGeoJSON.kml`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinKmlLibrary;

impl LibraryLoader for BuiltinKmlLibrary {
    async fn load(&self, registry: Arc<LibraryRegistry>) -> Result<(), KmlError> {
        let convert: ConvertFn = Arc::new(convert_with_kml_crate);
        let methods = HashMap::from([(NAMESPACE_METHOD.to_string(), convert)]);
        registry.register(NAMESPACE_EXPORT, Export::Namespace(methods));
        Ok(())
    }
}

/// Probe schedule used while waiting for the capability to appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LibraryConfig {
    /// Interval between capability probes
    pub probe_interval: Duration,
    /// Probes before the load is declared failed
    pub max_attempts: u32,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            probe_interval: Duration::from_millis(DEFAULT_PROBE_INTERVAL_MS),
            max_attempts: DEFAULT_PROBE_ATTEMPTS,
        }
    }
}

/// Observable load status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryStatus {
    NotLoaded,
    Loading,
    Loaded,
    LoadFailed,
}

type LoadResult = Result<Arc<dyn KmlConverter>, KmlError>;

enum LoadState {
    NotLoaded,
    Loading(broadcast::Sender<LoadResult>),
    Loaded(Arc<dyn KmlConverter>),
    LoadFailed(KmlError),
}

/// Single-flight owner of the conversion capability.
pub struct ConverterLibrary<L: LibraryLoader = BuiltinKmlLibrary> {
    registry: Arc<LibraryRegistry>,
    loader: L,
    config: LibraryConfig,
    state: Mutex<LoadState>,
    loads_started: AtomicU64,
}

impl ConverterLibrary<BuiltinKmlLibrary> {
    /// The library shared by every pipeline in this process.
    pub fn shared() -> Arc<Self> {
        static SHARED: OnceLock<Arc<ConverterLibrary<BuiltinKmlLibrary>>> = OnceLock::new();
        Arc::clone(SHARED.get_or_init(|| {
            Arc::new(ConverterLibrary::new(
                LibraryRegistry::global(),
                BuiltinKmlLibrary,
                LibraryConfig::default(),
            ))
        }))
    }

    /// The process-wide library for `config`.
    ///
    /// The default schedule maps to [`shared`](Self::shared); every other
    /// schedule gets one library of its own, reused by later callers.
    pub fn for_config(config: LibraryConfig) -> Arc<Self> {
        if config == LibraryConfig::default() {
            return Self::shared();
        }
        static BY_CONFIG: OnceLock<Mutex<HashMap<LibraryConfig, Arc<ConverterLibrary>>>> =
            OnceLock::new();
        let mut libraries = BY_CONFIG.get_or_init(Default::default).lock();
        Arc::clone(libraries.entry(config).or_insert_with(|| {
            Arc::new(ConverterLibrary::new(
                LibraryRegistry::global(),
                BuiltinKmlLibrary,
                config,
            ))
        }))
    }
}

impl<L: LibraryLoader> ConverterLibrary<L> {
    pub fn new(registry: Arc<LibraryRegistry>, loader: L, config: LibraryConfig) -> Self {
        Self {
            registry,
            loader,
            config,
            state: Mutex::new(LoadState::NotLoaded),
            loads_started: AtomicU64::new(0),
        }
    }

    pub fn status(&self) -> LibraryStatus {
        match &*self.state.lock() {
            LoadState::NotLoaded => LibraryStatus::NotLoaded,
            LoadState::Loading(_) => LibraryStatus::Loading,
            LoadState::Loaded(_) => LibraryStatus::Loaded,
            LoadState::LoadFailed(_) => LibraryStatus::LoadFailed,
        }
    }

    /// Number of loads actually started (not counting coalesced waiters).
    pub fn loads_started(&self) -> u64 {
        self.loads_started.load(Ordering::SeqCst)
    }

    /// Returns the converter, loading the library first if needed.
    pub async fn ensure_loaded(&self) -> Result<Arc<dyn KmlConverter>, KmlError> {
        let waiter = {
            let mut state = self.state.lock();
            let waiter = match &*state {
                LoadState::Loaded(converter) => return Ok(Arc::clone(converter)),
                LoadState::Loading(tx) => Some(tx.subscribe()),
                LoadState::NotLoaded | LoadState::LoadFailed(_) => None,
            };

            if waiter.is_none() {
                if let Some(converter) = resolve_capability(&self.registry) {
                    debug!("KML conversion capability already resident");
                    *state = LoadState::Loaded(Arc::clone(&converter));
                    return Ok(converter);
                }
                let (tx, _rx) = broadcast::channel(1);
                *state = LoadState::Loading(tx);
                self.loads_started.fetch_add(1, Ordering::SeqCst);
            }
            waiter
        };

        if let Some(mut rx) = waiter {
            debug!("Awaiting in-flight KML library load");
            return match rx.recv().await {
                Ok(result) => result,
                Err(_) => Err(KmlError::LibraryLoad(
                    "in-flight load was abandoned".to_string(),
                )),
            };
        }

        let mut guard = LoadGuard {
            state: &self.state,
            finished: false,
        };
        let result = self.load_and_probe().await;
        guard.finish(&result);
        result
    }

    async fn load_and_probe(&self) -> LoadResult {
        info!(
            max_attempts = self.config.max_attempts,
            probe_interval_ms = self.config.probe_interval.as_millis() as u64,
            "Loading KML conversion library"
        );

        self.loader.load(Arc::clone(&self.registry)).await?;

        for attempt in 1..=self.config.max_attempts {
            if let Some(converter) = resolve_capability(&self.registry) {
                info!(attempt, "KML conversion library loaded");
                return Ok(converter);
            }
            tokio::time::sleep(self.config.probe_interval).await;
        }

        Err(KmlError::LibraryLoad(format!(
            "capability not exported after {} probes",
            self.config.max_attempts
        )))
    }
}

/// Publishes the load result, or resets the state if the loading future
/// is dropped before finishing so that waiters are released.
struct LoadGuard<'a> {
    state: &'a Mutex<LoadState>,
    finished: bool,
}

impl LoadGuard<'_> {
    fn finish(&mut self, result: &LoadResult) {
        let next = match result {
            Ok(converter) => LoadState::Loaded(Arc::clone(converter)),
            Err(e) => {
                warn!(error = %e, "KML conversion library failed to load");
                LoadState::LoadFailed(e.clone())
            }
        };

        let previous = std::mem::replace(&mut *self.state.lock(), next);
        if let LoadState::Loading(tx) = previous {
            // Receivers may have been dropped
            let _ = tx.send(result.clone());
        }
        self.finished = true;
    }
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            *self.state.lock() = LoadState::NotLoaded;
        }
    }
}
