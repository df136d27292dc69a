//! Extraction Types
//!
//! Backend selection, extraction results and backend errors.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ReceiptError;

/// Extraction backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractorBackend {
    /// Third-party receipt OCR web API
    Remote,
    /// Local Donut model
    Donut,
}

impl Default for ExtractorBackend {
    fn default() -> Self {
        Self::Remote
    }
}

impl ExtractorBackend {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "remote" => Some(Self::Remote),
            "donut" | "local" => Some(Self::Donut),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Donut => "donut",
        }
    }
}

/// Form field the OCR API key is sent under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialField {
    ApiKey,
    ClientId,
}

impl CredentialField {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "api_key" => Some(Self::ApiKey),
            "client_id" => Some(Self::ClientId),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApiKey => "api_key",
            Self::ClientId => "client_id",
        }
    }
}

/// Result of running an image through a backend
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// Upstream document, returned to the client as-is
    Passthrough(Value),
    /// Structured fields decoded from model output
    Fields(Value),
}

impl Extraction {
    pub fn value(&self) -> &Value {
        match self {
            Self::Passthrough(value) | Self::Fields(value) => value,
        }
    }
}

/// Extraction backend errors
#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("Extraction backend not available: {0}")]
    ProviderNotAvailable(String),

    #[error("{0}")]
    Request(String),

    #[error("OCR API returned {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("OCR API returned a non-JSON response: {0}")]
    InvalidResponse(String),

    #[error("Failed to read stored image: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Inference(String),
}

impl From<OcrError> for ReceiptError {
    fn from(err: OcrError) -> Self {
        match err {
            OcrError::ProviderNotAvailable(msg) => ReceiptError::BackendUnavailable(msg),
            other => ReceiptError::BackendFailure(other.to_string()),
        }
    }
}
