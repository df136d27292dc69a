//! Error types for the receipt OCR server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, ReceiptError>;

/// Everything that can go wrong while handling a receipt upload
#[derive(Error, Debug)]
pub enum ReceiptError {
    #[error("No file part")]
    MissingFile,

    #[error("No selected file")]
    EmptyFilename,

    #[error("Invalid file format")]
    UnsupportedFormat(String),

    #[error("Failed to read upload: {0}")]
    InvalidMultipart(String),

    #[error("Failed to store upload: {0}")]
    Storage(#[from] std::io::Error),

    /// Raw backend text, surfaced to the client unchanged
    #[error("{0}")]
    BackendFailure(String),

    #[error("Extraction backend not available: {0}")]
    BackendUnavailable(String),
}

impl ReceiptError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingFile
            | Self::EmptyFilename
            | Self::UnsupportedFormat(_)
            | Self::InvalidMultipart(_) => StatusCode::BAD_REQUEST,
            Self::Storage(_) | Self::BackendFailure(_) | Self::BackendUnavailable(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ReceiptError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, "Receipt processing failed");
        } else {
            match &self {
                ReceiptError::UnsupportedFormat(ext) => {
                    tracing::warn!(extension = %ext, "Rejected receipt upload: {}", self)
                }
                _ => tracing::warn!("Rejected receipt upload: {}", self),
            }
        }

        let body = Json(ErrorResponse {
            error: self.to_string(),
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_map_to_400() {
        assert_eq!(ReceiptError::MissingFile.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ReceiptError::EmptyFilename.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ReceiptError::UnsupportedFormat("gif".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ReceiptError::InvalidMultipart("boundary".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_backend_errors_map_to_500() {
        assert_eq!(
            ReceiptError::BackendFailure("connection refused".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        assert_eq!(
            ReceiptError::from(io).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_messages() {
        assert_eq!(ReceiptError::MissingFile.to_string(), "No file part");
        assert_eq!(
            ReceiptError::UnsupportedFormat("gif".into()).to_string(),
            "Invalid file format"
        );
        assert_eq!(
            ReceiptError::BackendFailure("upstream said no".into()).to_string(),
            "upstream said no"
        );
    }
}
