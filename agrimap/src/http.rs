//! HTTP client abstraction for testability

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, trace, warn};

/// Default request timeout in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Errors raised by the HTTP transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpError {
    /// Failed to build the underlying client
    #[error("Failed to create HTTP client: {0}")]
    Client(String),

    /// The request never produced a response (DNS, connect, timeout)
    #[error("Request failed: {0}")]
    Request(String),

    /// The server answered with a non-2xx status
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// The response body could not be read
    #[error("Failed to read response: {0}")]
    Body(String),
}

impl HttpError {
    /// HTTP status code, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A file attached to a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    /// Form field name
    pub field: String,
    /// File name reported to the server
    pub file_name: String,
    /// MIME type of the payload
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Trait for asynchronous HTTP client operations.
///
/// Every network access in the crate goes through this trait so that the
/// ingestion pipeline and the result poller can be tested with mock clients.
pub trait AsyncHttpClient: Send + Sync {
    /// Performs an async HTTP GET request.
    ///
    /// # Returns
    ///
    /// The response body as bytes or an error. Non-2xx responses are errors.
    fn get(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, HttpError>> + Send;

    /// Performs an async HTTP GET request with Bearer token authentication.
    fn get_with_bearer(
        &self,
        url: &str,
        bearer_token: &str,
    ) -> impl Future<Output = Result<Vec<u8>, HttpError>> + Send;

    /// Performs an async multipart POST carrying a single file.
    fn post_file(
        &self,
        url: &str,
        file: FilePart,
        bearer_token: Option<&str>,
    ) -> impl Future<Output = Result<Vec<u8>, HttpError>> + Send;
}

/// Joins a base URL and an API path with exactly one slash between them.
pub fn endpoint(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Async HTTP client implementation using reqwest.
#[derive(Clone)]
pub struct AsyncReqwestClient {
    client: reqwest::Client,
}

impl AsyncReqwestClient {
    /// Creates a new AsyncReqwestClient with default configuration.
    pub fn new() -> Result<Self, HttpError> {
        Self::with_timeout(DEFAULT_HTTP_TIMEOUT_SECS)
    }

    /// Creates a new AsyncReqwestClient with custom timeout.
    pub fn with_timeout(timeout_secs: u64) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("agrimap/", env!("CARGO_PKG_VERSION")))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| HttpError::Client(e.to_string()))?;

        Ok(Self { client })
    }

    async fn send(&self, request: reqwest::RequestBuilder, url: &str) -> Result<Vec<u8>, HttpError> {
        trace!(url = url, "HTTP request starting");

        let response = match request.send().await {
            Ok(resp) => {
                debug!(
                    url = url,
                    status = resp.status().as_u16(),
                    "HTTP response received"
                );
                resp
            }
            Err(e) => {
                warn!(
                    url = url,
                    error = %e,
                    is_connect = e.is_connect(),
                    is_timeout = e.is_timeout(),
                    "HTTP request failed"
                );
                return Err(HttpError::Request(e.to_string()));
            }
        };

        // Check HTTP status
        if !response.status().is_success() {
            warn!(
                url = url,
                status = response.status().as_u16(),
                "HTTP error status"
            );
            return Err(HttpError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        // Read response body
        match response.bytes().await {
            Ok(bytes) => {
                trace!(url = url, bytes = bytes.len(), "HTTP response body read");
                Ok(bytes.to_vec())
            }
            Err(e) => {
                warn!(url = url, error = %e, "Failed to read response body");
                Err(HttpError::Body(e.to_string()))
            }
        }
    }
}

impl AsyncHttpClient for AsyncReqwestClient {
    async fn get(&self, url: &str) -> Result<Vec<u8>, HttpError> {
        self.send(self.client.get(url), url).await
    }

    async fn get_with_bearer(&self, url: &str, bearer_token: &str) -> Result<Vec<u8>, HttpError> {
        let request = self.client.get(url).bearer_auth(bearer_token);
        self.send(request, url).await
    }

    async fn post_file(
        &self,
        url: &str,
        file: FilePart,
        bearer_token: Option<&str>,
    ) -> Result<Vec<u8>, HttpError> {
        let part = reqwest::multipart::Part::bytes(file.bytes)
            .file_name(file.file_name)
            .mime_str(&file.mime)
            .map_err(|e| HttpError::Request(format!("Invalid MIME type: {}", e)))?;
        let form = reqwest::multipart::Form::new().part(file.field, part);

        let mut request = self.client.post(url).multipart(form);
        if let Some(token) = bearer_token {
            request = request.bearer_auth(token);
        }

        self.send(request, url).await
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// A request seen by [`MockAsyncHttpClient`].
    #[derive(Debug, Clone, PartialEq)]
    pub struct RecordedRequest {
        pub method: &'static str,
        pub url: String,
        pub bearer: Option<String>,
        pub file: Option<FilePart>,
    }

    /// Mock async HTTP client for testing.
    ///
    /// Returns the same response for every request and records each call.
    #[derive(Clone)]
    pub struct MockAsyncHttpClient {
        pub response: Result<Vec<u8>, HttpError>,
        pub requests: Arc<Mutex<Vec<RecordedRequest>>>,
    }

    impl MockAsyncHttpClient {
        pub fn ok(body: impl Into<Vec<u8>>) -> Self {
            Self {
                response: Ok(body.into()),
                requests: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn status(status: u16) -> Self {
            Self {
                response: Err(HttpError::Status {
                    status,
                    url: "mock".to_string(),
                }),
                requests: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn recorded(&self) -> Vec<RecordedRequest> {
            self.requests.lock().clone()
        }

        fn record(&self, request: RecordedRequest) -> Result<Vec<u8>, HttpError> {
            self.requests.lock().push(request);
            self.response.clone()
        }
    }

    impl AsyncHttpClient for MockAsyncHttpClient {
        async fn get(&self, url: &str) -> Result<Vec<u8>, HttpError> {
            self.record(RecordedRequest {
                method: "GET",
                url: url.to_string(),
                bearer: None,
                file: None,
            })
        }

        async fn get_with_bearer(
            &self,
            url: &str,
            bearer_token: &str,
        ) -> Result<Vec<u8>, HttpError> {
            self.record(RecordedRequest {
                method: "GET",
                url: url.to_string(),
                bearer: Some(bearer_token.to_string()),
                file: None,
            })
        }

        async fn post_file(
            &self,
            url: &str,
            file: FilePart,
            bearer_token: Option<&str>,
        ) -> Result<Vec<u8>, HttpError> {
            self.record(RecordedRequest {
                method: "POST",
                url: url.to_string(),
                bearer: bearer_token.map(str::to_string),
                file: Some(file),
            })
        }
    }

    #[tokio::test]
    async fn test_mock_async_client_success() {
        let mock = MockAsyncHttpClient::ok(vec![1, 2, 3, 4]);

        let result = mock.get("http://example.com").await;
        assert_eq!(result.unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(mock.recorded().len(), 1);
    }

    #[tokio::test]
    async fn test_mock_async_client_error() {
        let mock = MockAsyncHttpClient::status(404);

        let result = mock.get("http://example.com").await;
        assert_eq!(result.unwrap_err().status(), Some(404));
    }

    #[tokio::test]
    async fn test_mock_records_bearer_only_when_given() {
        let mock = MockAsyncHttpClient::ok("{}");

        mock.get("http://example.com/a").await.unwrap();
        mock.get_with_bearer("http://example.com/b", "tok").await.unwrap();

        let recorded = mock.recorded();
        assert_eq!(recorded[0].bearer, None);
        assert_eq!(recorded[1].bearer.as_deref(), Some("tok"));
        assert!(recorded.iter().all(|r| r.method == "GET"));
    }

    #[test]
    fn test_endpoint_joins_with_single_slash() {
        assert_eq!(
            endpoint("https://api.example.com/api/", "/assessments/7"),
            "https://api.example.com/api/assessments/7"
        );
        assert_eq!(
            endpoint("https://api.example.com/api", "assessments/7"),
            "https://api.example.com/api/assessments/7"
        );
    }

    #[test]
    fn test_status_error_display() {
        let error = HttpError::Status {
            status: 404,
            url: "https://example.com/a.kml".to_string(),
        };
        assert_eq!(error.to_string(), "HTTP 404 from https://example.com/a.kml");
        assert_eq!(HttpError::Request("boom".to_string()).status(), None);
    }
}
