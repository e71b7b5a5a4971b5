//! KML document retrieval.

use reqwest::Url;
use tracing::debug;

use super::error::KmlError;
use crate::http::AsyncHttpClient;

/// Fetches KML documents, resolving relative references against a base URL.
pub struct KmlFetcher<C: AsyncHttpClient> {
    client: C,
    base_url: Option<Url>,
}

impl<C: AsyncHttpClient> KmlFetcher<C> {
    /// Creates a fetcher.
    ///
    /// `base_url` is used to resolve relative references such as
    /// `/media/kml/field-12.kml`. It is treated as a directory, so
    /// `https://api.example.com/api` and `https://api.example.com/api/`
    /// resolve `media/a.kml` identically.
    pub fn new(client: C, base_url: Option<&str>) -> Result<Self, KmlError> {
        let base_url = base_url
            .map(|base| {
                let base = if base.ends_with('/') {
                    base.to_string()
                } else {
                    format!("{}/", base)
                };
                Url::parse(&base).map_err(|e| KmlError::Fetch(format!("Invalid base URL: {}", e)))
            })
            .transpose()?;

        Ok(Self { client, base_url })
    }

    /// Resolves a possibly relative reference to an absolute URL.
    pub fn resolve(&self, uri: &str) -> Result<Url, KmlError> {
        let uri = uri.trim();
        if uri.is_empty() {
            return Err(KmlError::Fetch("Empty KML reference".to_string()));
        }

        match Url::parse(uri) {
            Ok(url) => Ok(url),
            Err(_) => {
                let base = self.base_url.as_ref().ok_or_else(|| {
                    KmlError::Fetch(format!("Relative KML reference '{}' without base URL", uri))
                })?;
                base.join(uri)
                    .map_err(|e| KmlError::Fetch(format!("Cannot resolve '{}': {}", uri, e)))
            }
        }
    }

    /// Fetches the document body as text.
    ///
    /// Non-2xx responses, non-UTF-8 bodies and empty bodies are all failures.
    pub async fn fetch(&self, uri: &str, credential: Option<&str>) -> Result<String, KmlError> {
        let url = self.resolve(uri)?;

        debug!(url = %url, authenticated = credential.is_some(), "Fetching KML document");

        let bytes = match credential {
            Some(token) => self.client.get_with_bearer(url.as_str(), token).await?,
            None => self.client.get(url.as_str()).await?,
        };

        let body = String::from_utf8(bytes)
            .map_err(|e| KmlError::Fetch(format!("Body is not UTF-8: {}", e)))?;

        if body.trim().is_empty() {
            return Err(KmlError::Fetch(format!("Empty body from {}", url)));
        }

        Ok(body)
    }
}
