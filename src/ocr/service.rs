//! Extraction Service
//!
//! Owns the configured extraction provider and is the single entry point the
//! request handlers call.

use std::sync::Arc;
use std::time::Instant;

use super::{
    provider::{ExtractorTrait, RemoteOcrProvider},
    types::{Extraction, ExtractorBackend, OcrError},
};
use crate::config::Config;
use crate::upload::StoredUpload;

/// Receipt extraction service
#[derive(Clone)]
pub struct ExtractionService {
    provider: Arc<dyn ExtractorTrait>,
}

impl ExtractionService {
    /// Wrap an already constructed provider
    pub fn new(provider: Arc<dyn ExtractorTrait>) -> Self {
        Self { provider }
    }

    /// Build the provider selected by `config.backend`.
    ///
    /// For the Donut backend this loads the model, which can take a while.
    pub fn from_config(config: &Config) -> Result<Self, OcrError> {
        let provider: Arc<dyn ExtractorTrait> = match config.backend {
            ExtractorBackend::Remote => Arc::new(RemoteOcrProvider::new(config.remote.clone())?),
            ExtractorBackend::Donut => load_donut(config)?,
        };

        tracing::info!(backend = provider.backend().as_str(), "Extraction backend ready");

        Ok(Self::new(provider))
    }

    pub fn backend(&self) -> ExtractorBackend {
        self.provider.backend()
    }

    pub async fn is_available(&self) -> bool {
        self.provider.is_available().await
    }

    /// Run a stored receipt image through the configured backend
    pub async fn extract(&self, upload: &StoredUpload) -> Result<Extraction, OcrError> {
        let started = Instant::now();
        let result = self.provider.extract(upload).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(_) => tracing::info!(
                backend = self.backend().as_str(),
                file = %upload.file_name,
                elapsed_ms,
                "Receipt extracted"
            ),
            Err(e) => tracing::warn!(
                backend = self.backend().as_str(),
                file = %upload.file_name,
                elapsed_ms,
                "Receipt extraction failed: {}",
                e
            ),
        }

        result
    }
}

#[cfg(feature = "donut")]
fn load_donut(config: &Config) -> Result<Arc<dyn ExtractorTrait>, OcrError> {
    let provider = super::provider::DonutProvider::load(&config.donut).map_err(|e| {
        OcrError::ProviderNotAvailable(format!(
            "Failed to load Donut model from {}: {}",
            config.donut.model_dir.display(),
            e
        ))
    })?;
    Ok(Arc::new(provider))
}

#[cfg(not(feature = "donut"))]
fn load_donut(_config: &Config) -> Result<Arc<dyn ExtractorTrait>, OcrError> {
    Err(OcrError::ProviderNotAvailable(
        "Donut backend requires building with the `donut` feature".to_string(),
    ))
}
