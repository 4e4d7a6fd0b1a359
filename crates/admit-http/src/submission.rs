//! Submission service client

use crate::response::{read, transport_error};
use admit_core::ApplicationPayload;
use admit_flow::{CollaboratorError, SubmissionAck, SubmissionClient};
use std::time::Duration;

/// Header carrying the payload fingerprint
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Submission service over HTTP
///
/// Every attempt for the same records carries the same idempotency key, so
/// the service can recognize a retry of a request whose response was lost.
#[derive(Debug, Clone)]
pub struct HttpSubmissionClient {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpSubmissionClient {
    /// Create client posting to `endpoint`
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, CollaboratorError> {
        Ok(Self {
            http: crate::build_client(timeout)?,
            endpoint: endpoint.into(),
        })
    }

    /// Target URL
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl SubmissionClient for HttpSubmissionClient {
    async fn submit_application(
        &self,
        payload: &ApplicationPayload,
        fingerprint: &str,
    ) -> Result<SubmissionAck, CollaboratorError> {
        tracing::debug!(endpoint = %self.endpoint, fingerprint, "Posting application");
        let response = self
            .http
            .post(&self.endpoint)
            .header(IDEMPOTENCY_HEADER, fingerprint)
            .json(payload)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;
        read(response).await
    }
}
