//! Classified remote failures.

use reqwest::StatusCode;

/// Classified failure of a remote operation.
///
/// `Conflict` on create and `NotFound` on overwrite are recovered by the sync
/// engine; everything else is surfaced and leaves the entry pending.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    Transport(String),

    #[error("Unexpected server response: {0}")]
    Decode(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

impl RemoteError {
    /// Classifies a non-success HTTP status with its response body.
    pub fn from_status(status: StatusCode, body: String) -> Self {
        match status {
            StatusCode::NOT_FOUND => RemoteError::NotFound(detail_or_body(body)),
            StatusCode::CONFLICT => RemoteError::Conflict(detail_or_body(body)),
            _ if body.trim().is_empty() => RemoteError::ServerError(status.to_string()),
            _ => RemoteError::ServerError(body),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, RemoteError::Conflict(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound(_))
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_builder() {
            RemoteError::InvalidRequest(e.to_string())
        } else if e.is_decode() {
            RemoteError::Decode(e.to_string())
        } else {
            RemoteError::Transport(e.to_string())
        }
    }
}

/// Extracts `detail` from an error body of the form `{"detail": "..."}`.
fn detail_or_body(body: String) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        detail: serde_json::Value,
    }

    match serde_json::from_str::<ErrorBody>(&body) {
        Ok(ErrorBody {
            detail: serde_json::Value::String(detail),
        }) => detail,
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) => body,
    }
}
