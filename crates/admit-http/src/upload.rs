//! Upload service client

use crate::response::{read, transport_error};
use admit_flow::{CollaboratorError, UploadClient, UploadFile};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use std::time::Duration;

/// Header carrying the original file name
pub const FILE_NAME_HEADER: &str = "X-File-Name";

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: String,
}

/// Upload service over HTTP
#[derive(Debug, Clone)]
pub struct HttpUploadClient {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpUploadClient {
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
impl UploadClient for HttpUploadClient {
    async fn upload(&self, file: UploadFile) -> Result<String, CollaboratorError> {
        tracing::debug!(
            endpoint = %self.endpoint,
            file = %file.name,
            bytes = file.bytes.len(),
            "Posting upload"
        );
        let response = self
            .http
            .post(&self.endpoint)
            .header(CONTENT_TYPE, file.content_type)
            .header(FILE_NAME_HEADER, file.name)
            .body(file.bytes)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;
        let body: UploadResponse = read(response).await?;
        if body.url.trim().is_empty() {
            return Err(CollaboratorError::InvalidResponse("empty url".into()));
        }
        Ok(body.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn refused_connection_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client =
            HttpUploadClient::new(format!("http://{addr}/files"), Duration::from_secs(2)).unwrap();
        let err = client
            .upload(UploadFile::new("cv.pdf", "application/pdf", vec![0x25]))
            .await
            .unwrap_err();

        assert!(matches!(err, CollaboratorError::Transport(_)));
    }
}
