use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FileServerError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Path is outside root directory")]
    PathTraversal,

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("No permission to list directory: {0}")]
    ListingFailed(String),

    #[error("Error creating ZIP: {0}")]
    ArchiveFailed(String),

    #[error("ZIP too large: {size} bytes exceeds limit of {limit} bytes")]
    ZipTooLarge { size: u64, limit: u64 },

    #[error("ZIP has too many entries: {entries} exceeds limit of {limit}")]
    ZipTooManyEntries { entries: u64, limit: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FileServerError {
    /// Status code and machine-readable code sent to the client.
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self {
            FileServerError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            FileServerError::PathTraversal => (StatusCode::FORBIDDEN, "PATH_TRAVERSAL"),
            FileServerError::InvalidPath(_) => (StatusCode::BAD_REQUEST, "INVALID_PATH"),
            FileServerError::ListingFailed(_) => (StatusCode::NOT_FOUND, "LISTING_FAILED"),
            FileServerError::ArchiveFailed(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "ARCHIVE_FAILED")
            }
            FileServerError::ZipTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "ZIP_TOO_LARGE"),
            FileServerError::ZipTooManyEntries { .. } => {
                (StatusCode::PAYLOAD_TOO_LARGE, "ZIP_TOO_MANY_ENTRIES")
            }
            FileServerError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
}

impl IntoResponse for FileServerError {
    fn into_response(self) -> Response {
        let (status, code) = self.status();

        let body = ErrorResponse {
            error: self.to_string(),
            code,
        };

        (status, Json(body)).into_response()
    }
}
