//! Error types for result polling and report upload.

use thiserror::Error;

use crate::http::HttpError;

/// A failed poll tick.
///
/// Tick failures never end a session; the poller logs them and waits for
/// the next tick.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    /// Network, server or decoding failure expected to clear up
    #[error("Transient poll failure: {0}")]
    Transient(String),

    /// The backend does not know the resource (yet)
    #[error("Resource {0} not found")]
    NotFound(String),
}

impl PollError {
    /// Maps a transport error for `resource_id`.
    pub fn from_http(resource_id: &str, error: HttpError) -> Self {
        match error.status() {
            Some(404) => PollError::NotFound(resource_id.to_string()),
            _ => PollError::Transient(error.to_string()),
        }
    }
}

impl From<serde_json::Error> for PollError {
    fn from(e: serde_json::Error) -> Self {
        PollError::Transient(format!("Failed to parse response: {}", e))
    }
}

/// Errors raised while uploading a drone report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("Drone report upload failed: {0}")]
    Http(#[from] HttpError),

    #[error("Empty drone report '{0}'")]
    EmptyReport(String),

    #[error("Failed to parse upload response: {0}")]
    Decode(String),
}
