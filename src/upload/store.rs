//! Upload Store
//!
//! Persists receipt images into a single flat directory on local disk.
//! Files are never cleaned up, and a second upload with the same name
//! replaces the first.

use std::path::{Path, PathBuf};

use super::types::{ReceiptUpload, StoredUpload};
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct UploadStore {
    base_path: PathBuf,
}

impl UploadStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Write the upload to `<base_path>/<file_name>`, creating the directory
    /// if needed.
    pub async fn save(&self, upload: &ReceiptUpload) -> Result<StoredUpload> {
        tokio::fs::create_dir_all(&self.base_path).await?;

        let path = self.base_path.join(&upload.file_name);
        tokio::fs::write(&path, &upload.data).await?;

        tracing::info!(
            path = %path.display(),
            size = upload.data.len(),
            "Receipt image saved"
        );

        Ok(StoredUpload {
            path,
            file_name: upload.file_name.clone(),
            content_type: upload.content_type.clone(),
            size: upload.data.len(),
        })
    }
}
