use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use super::storage::ServerStorageError;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    #[error("{context}: {source}")]
    Storage {
        context: &'static str,
        #[source]
        source: ServerStorageError,
    },
}

impl ServerError {
    /// Maps a storage failure, prefixing internal errors with `context`.
    pub fn from_storage(context: &'static str, e: ServerStorageError) -> Self {
        match e {
            ServerStorageError::DeviceNotRegistered | ServerStorageError::EntryNotFound => {
                ServerError::NotFound(e.to_string())
            }
            ServerStorageError::DuplicateEntry => ServerError::Conflict(e.to_string()),
            source => ServerError::Storage { context, source },
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Conflict(_) => StatusCode::CONFLICT,
            ServerError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::Storage { .. } => {
                tracing::error!(error = %self, "Storage error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_storage_errors_map_to_status() {
        let cases = [
            (ServerStorageError::DeviceNotRegistered, StatusCode::NOT_FOUND),
            (ServerStorageError::EntryNotFound, StatusCode::NOT_FOUND),
            (ServerStorageError::DuplicateEntry, StatusCode::CONFLICT),
            (
                ServerStorageError::IoError(
                    PathBuf::from("/tmp/diary.json"),
                    std::io::Error::other("disk full"),
                ),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            let response = ServerError::from_storage("Upload failed", error).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn test_internal_error_keeps_context() {
        let error = ServerError::from_storage(
            "Update failed",
            ServerStorageError::IoError(PathBuf::from("x"), std::io::Error::other("boom")),
        );
        assert!(error.to_string().starts_with("Update failed: "));
    }
}
