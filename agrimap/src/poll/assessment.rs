//! Farm assessment records.

use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::trace;

use super::error::PollError;
use super::poller::ResourceFetcher;
use crate::credential::CredentialSource;
use crate::http::{endpoint, AsyncHttpClient};

/// An assessment as returned by `GET /assessments/{id}`.
///
/// Only the fields the poller needs are typed; the rest is kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,

    /// Drone analysis payload, filled in once the backend finishes
    #[serde(default, alias = "droneAnalysis")]
    pub drone_analysis: Option<Value>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AssessmentRecord {
    /// Whether the drone analysis is present and non-empty.
    ///
    /// This is the completion predicate used when polling after an upload.
    pub fn has_analysis(&self) -> bool {
        analysis_is_present(self.drone_analysis.as_ref())
    }
}

pub(crate) fn analysis_is_present(analysis: Option<&Value>) -> bool {
    matches!(analysis, Some(Value::Object(fields)) if !fields.is_empty())
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

/// Reads assessments from the backend.
pub struct AssessmentClient<C: AsyncHttpClient> {
    client: C,
    base_url: String,
    credentials: Arc<dyn CredentialSource>,
}

impl<C: AsyncHttpClient> AssessmentClient<C> {
    pub fn new(client: C, base_url: impl Into<String>, credentials: Arc<dyn CredentialSource>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            credentials,
        }
    }

    pub fn assessment_url(&self, id: &str) -> String {
        endpoint(&self.base_url, &format!("assessments/{}", id))
    }

    pub async fn get(&self, id: &str) -> Result<AssessmentRecord, PollError> {
        let url = self.assessment_url(id);
        trace!(url = %url, "Fetching assessment");

        let body = match self.credentials.bearer_token() {
            Some(token) => self.client.get_with_bearer(&url, &token).await,
            None => self.client.get(&url).await,
        }
        .map_err(|e| PollError::from_http(id, e))?;

        Ok(serde_json::from_slice(&body)?)
    }
}

impl<C: AsyncHttpClient + 'static> ResourceFetcher<AssessmentRecord> for AssessmentClient<C> {
    async fn fetch(&self, resource_id: &str) -> Result<AssessmentRecord, PollError> {
        self.get(resource_id).await
    }
}
