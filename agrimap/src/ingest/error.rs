//! Error types for KML ingestion.

use thiserror::Error;

use crate::http::HttpError;

/// Errors raised while turning a KML reference into geometry.
///
/// Every variant except [`KmlError::LibraryLoad`] is recoverable through a
/// fallback boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KmlError {
    /// Network or HTTP failure, including empty bodies
    #[error("Failed to fetch KML: {0}")]
    Fetch(String),

    /// The body is not well-formed KML
    #[error("Failed to parse KML: {0}")]
    Parse(String),

    /// Neither the conversion library nor manual extraction produced geometry
    #[error("Failed to convert KML: {0}")]
    Conversion(String),

    /// The conversion library never became available
    #[error("KML conversion library unavailable: {0}")]
    LibraryLoad(String),
}

impl KmlError {
    /// Whether a fallback boundary may replace the failed result.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, KmlError::LibraryLoad(_))
    }
}

impl From<HttpError> for KmlError {
    fn from(e: HttpError) -> Self {
        KmlError::Fetch(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_load_is_not_recoverable() {
        assert!(!KmlError::LibraryLoad("timeout".to_string()).is_recoverable());
        assert!(KmlError::Fetch("404".to_string()).is_recoverable());
        assert!(KmlError::Parse("eof".to_string()).is_recoverable());
        assert!(KmlError::Conversion("empty".to_string()).is_recoverable());
    }

    #[test]
    fn test_http_error_maps_to_fetch() {
        let error: KmlError = HttpError::Status {
            status: 404,
            url: "https://x/a.kml".to_string(),
        }
        .into();
        assert_eq!(
            error,
            KmlError::Fetch("HTTP 404 from https://x/a.kml".to_string())
        );
    }
}
