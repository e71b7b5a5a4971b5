//! Remote KML boundary ingestion.
//!
//! A KML reference (absolute URL, or a path relative to the backend base
//! URL) is fetched, checked for well-formedness and converted into canonical
//! [`Geometry`](crate::geometry::Geometry):
//!
//! - [`ConverterLibrary`] makes the conversion capability resident, loading
//!   it at most once per process no matter how many pipelines ask;
//! - [`KmlFetcher`] retrieves the document, optionally with a bearer token;
//! - [`parse_document`] rejects anything that is not well-formed KML;
//! - [`convert_document`] runs the library converter and falls back to
//!   [`ManualExtractor`] when it fails.
//!
//! [`KmlPipeline::ingest`] ties the stages together and substitutes a
//! fallback boundary when anything after library loading goes wrong.

mod convert;
mod document;
mod error;
mod fetch;
mod library;
mod pipeline;

#[cfg(test)]
pub(crate) mod fixtures;

pub use convert::{convert_document, convert_with_kml_crate, ConvertFn, FnConverter, KmlConverter, ManualExtractor};
pub use document::{parse_document, KmlDocument};
pub use error::KmlError;
pub use fetch::KmlFetcher;
pub use library::{
    resolve_capability, BuiltinKmlLibrary, ConverterLibrary, Export, LibraryConfig,
    LibraryLoader, LibraryRegistry, LibraryStatus, DEFAULT_PROBE_ATTEMPTS,
    DEFAULT_PROBE_INTERVAL_MS, FUNCTION_EXPORT, NAMESPACE_EXPORT, NAMESPACE_METHOD,
};
pub use pipeline::{IngestObserver, IngestReport, IngestState, KmlPipeline, PipelineConfig};
