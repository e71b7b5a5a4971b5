//! Drone report upload and result wait.
//!
//! The backend either analyses an uploaded report synchronously and returns
//! the analysis inline, or accepts it and finishes later. In the second case
//! [`DroneReportWorkflow`] polls the assessment until the analysis appears.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use super::assessment::{analysis_is_present, AssessmentClient, AssessmentRecord};
use super::config::PollerConfig;
use super::error::UploadError;
use super::poller::ResultPoller;
use super::session::{PollSession, PollTimeout};
use crate::credential::CredentialSource;
use crate::http::{endpoint, AsyncHttpClient, FilePart};

/// Multipart form field carrying the report.
pub const REPORT_FIELD: &str = "file";

/// What the backend did with an uploaded report.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    /// Analysis finished during the upload request
    Inline(Value),
    /// Analysis continues in the background
    Pending,
}

/// Posts drone reports to `{base}/assessments/{id}/drone-report`.
pub struct DroneReportUploader<C: AsyncHttpClient> {
    client: C,
    base_url: String,
    credentials: Arc<dyn CredentialSource>,
}

impl<C: AsyncHttpClient> DroneReportUploader<C> {
    pub fn new(client: C, base_url: impl Into<String>, credentials: Arc<dyn CredentialSource>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            credentials,
        }
    }

    pub async fn upload(
        &self,
        assessment_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadOutcome, UploadError> {
        if bytes.is_empty() {
            return Err(UploadError::EmptyReport(file_name.to_string()));
        }

        let url = endpoint(
            &self.base_url,
            &format!("assessments/{}/drone-report", assessment_id),
        );
        let file = FilePart {
            field: REPORT_FIELD.to_string(),
            file_name: file_name.to_string(),
            mime: mime_for(file_name).to_string(),
            bytes,
        };

        info!(
            assessment_id,
            file_name,
            bytes = file.bytes.len(),
            "Uploading drone report"
        );

        let token = self.credentials.bearer_token();
        let body = self.client.post_file(&url, file, token.as_deref()).await?;

        parse_upload_response(&body)
    }
}

/// Extracts an inline analysis from the upload response.
///
/// Accepts the payload at the top level or inside an `assessment` object.
fn parse_upload_response(body: &[u8]) -> Result<UploadOutcome, UploadError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(UploadOutcome::Pending);
    }

    let response: Value =
        serde_json::from_slice(body).map_err(|e| UploadError::Decode(e.to_string()))?;

    let analysis = ["drone_analysis", "droneAnalysis"]
        .iter()
        .find_map(|key| {
            response
                .get(*key)
                .or_else(|| response.get("assessment").and_then(|a| a.get(*key)))
                .filter(|v| analysis_is_present(Some(*v)))
        })
        .cloned();

    Ok(match analysis {
        Some(analysis) => UploadOutcome::Inline(analysis),
        None => UploadOutcome::Pending,
    })
}

fn mime_for(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "pdf" => "application/pdf",
        "json" => "application/json",
        "csv" => "text/csv",
        "zip" => "application/zip",
        "tif" | "tiff" => "image/tiff",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        _ => "application/octet-stream",
    }
}

/// How a submitted report will deliver its analysis.
#[derive(Debug)]
pub enum Submission {
    /// `on_complete` already ran with the inline analysis
    Completed,
    /// The assessment is being polled
    Polling(PollSession),
}

/// Uploads a report, then waits for its analysis.
pub struct DroneReportWorkflow<C: AsyncHttpClient + 'static> {
    uploader: DroneReportUploader<C>,
    poller: ResultPoller<AssessmentClient<C>>,
}

impl<C: AsyncHttpClient + Clone + 'static> DroneReportWorkflow<C> {
    pub fn new(
        client: C,
        base_url: impl Into<String>,
        credentials: Arc<dyn CredentialSource>,
        config: PollerConfig,
    ) -> Self {
        let base_url = base_url.into();
        Self {
            uploader: DroneReportUploader::new(
                client.clone(),
                base_url.clone(),
                Arc::clone(&credentials),
            ),
            poller: ResultPoller::new(AssessmentClient::new(client, base_url, credentials), config),
        }
    }

    pub fn poller(&self) -> &ResultPoller<AssessmentClient<C>> {
        &self.poller
    }

    /// Uploads `bytes` and arranges for `on_complete` to receive the analysis.
    ///
    /// Upload errors are returned; nothing is polled in that case.
    pub async fn submit<OnComplete, OnTimeout>(
        &self,
        assessment_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
        on_complete: OnComplete,
        on_timeout: OnTimeout,
    ) -> Result<Submission, UploadError>
    where
        OnComplete: FnOnce(Value) + Send + 'static,
        OnTimeout: FnOnce(PollTimeout) + Send + 'static,
    {
        match self.uploader.upload(assessment_id, file_name, bytes).await? {
            UploadOutcome::Inline(analysis) => {
                debug!(assessment_id, "Drone analysis returned inline");
                on_complete(analysis);
                Ok(Submission::Completed)
            }
            UploadOutcome::Pending => {
                debug!(assessment_id, "Drone analysis pending, polling assessment");
                let session = self.poller.start(
                    assessment_id,
                    None,
                    AssessmentRecord::has_analysis,
                    move |record: AssessmentRecord| {
                        on_complete(record.drone_analysis.unwrap_or(Value::Null))
                    },
                    on_timeout,
                );
                Ok(Submission::Polling(session))
            }
        }
    }
}
