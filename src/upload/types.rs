//! Upload types

use std::path::PathBuf;

use serde::Serialize;

// ============================================================================
// Constants
// ============================================================================

/// Multipart field carrying the receipt image
pub const IMAGE_FIELD: &str = "image";

/// Multipart field carrying the optional free-text description
pub const DESCRIPTION_FIELD: &str = "description";

/// Description used when the client sends none
pub const DEFAULT_DESCRIPTION: &str = "No description provided";

/// Accepted image extensions (compared case-insensitively)
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

// ============================================================================
// Upload Types
// ============================================================================

/// A receipt image received from the client, already validated
#[derive(Debug, Clone)]
pub struct ReceiptUpload {
    /// Sanitised file name
    pub file_name: String,

    /// Content type declared by the client, if any
    pub content_type: Option<String>,

    /// Raw image bytes
    pub data: Vec<u8>,

    /// Accepted but not used for extraction
    pub description: String,
}

/// Where an upload ended up on disk
#[derive(Debug, Clone, Serialize)]
pub struct StoredUpload {
    /// Full path of the written file
    pub path: PathBuf,

    /// Sanitised file name
    pub file_name: String,

    /// Content type declared by the client, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// Bytes written
    pub size: usize,
}

impl StoredUpload {
    /// Content type for forwarding the file, guessed from the name when the
    /// client did not declare one
    pub fn mime_type(&self) -> String {
        self.content_type.clone().unwrap_or_else(|| {
            mime_guess::from_path(&self.path)
                .first_or_octet_stream()
                .to_string()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_type_prefers_declared_type() {
        let stored = StoredUpload {
            path: PathBuf::from("uploads/receipt.png"),
            file_name: "receipt.png".into(),
            content_type: Some("image/x-custom".into()),
            size: 4,
        };
        assert_eq!(stored.mime_type(), "image/x-custom");
    }

    #[test]
    fn test_mime_type_guessed_from_extension() {
        let stored = StoredUpload {
            path: PathBuf::from("uploads/receipt.jpg"),
            file_name: "receipt.jpg".into(),
            content_type: None,
            size: 4,
        };
        assert_eq!(stored.mime_type(), "image/jpeg");
    }
}
