//! Admission HTTP Collaborators
//!
//! `reqwest` implementations of the upload and submission ports:
//! - `HttpUploadClient`: POSTs the raw file, expects `{"url": ...}`
//! - `HttpSubmissionClient`: POSTs the JSON payload with an
//!   `Idempotency-Key` header, expects `{"reference": ...}`
//!
//! Timeouts are the client's own; an elapsed timeout, a non-2xx status or an
//! unexpected body all surface as a `CollaboratorError`.

#![warn(unreachable_pub)]

mod response;
pub mod submission;
pub mod upload;

pub use submission::HttpSubmissionClient;
pub use upload::HttpUploadClient;

use admit_flow::CollaboratorError;
use std::time::Duration;

/// User agent sent with every request
pub const USER_AGENT: &str = concat!("admit/", env!("CARGO_PKG_VERSION"));

/// Shared client with the collaborator timeout applied
fn build_client(timeout: Duration) -> Result<reqwest::Client, CollaboratorError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| CollaboratorError::Transport(e.to_string()))
}
