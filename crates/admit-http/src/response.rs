//! Response classification shared by both clients

use admit_flow::CollaboratorError;
use serde::de::DeserializeOwned;

/// Longest error body echoed into a `Rejected` message
const MAX_ERROR_BODY: usize = 512;

pub(crate) fn transport_error(error: &reqwest::Error) -> CollaboratorError {
    if error.is_timeout() {
        CollaboratorError::Timeout
    } else {
        CollaboratorError::Transport(error.to_string())
    }
}

/// Map a status and body to the expected JSON document or an error
pub(crate) fn classify<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, CollaboratorError> {
    if !(200..300).contains(&status) {
        let mut message = body.trim().to_string();
        if message.len() > MAX_ERROR_BODY {
            let mut end = MAX_ERROR_BODY;
            while !message.is_char_boundary(end) {
                end -= 1;
            }
            message.truncate(end);
        }
        return Err(CollaboratorError::Rejected { status, message });
    }
    serde_json::from_str(body).map_err(|e| CollaboratorError::InvalidResponse(e.to_string()))
}

/// Read the body and classify it
pub(crate) async fn read<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, CollaboratorError> {
    let status = response.status().as_u16();
    let body = response.text().await.map_err(|e| transport_error(&e))?;
    classify(status, &body)
}
