//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::ocr::{ExtractionService, OcrError};
use crate::upload::UploadStore;

/// Error type for state initialization
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Failed to initialize extraction backend: {0}")]
    Extraction(#[from] OcrError),
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    uploads: UploadStore,
    extraction: ExtractionService,
}

impl AppState {
    /// Create application state around an existing extraction service
    pub fn new(config: Config, extraction: ExtractionService) -> Self {
        let uploads = UploadStore::new(config.upload.dir.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                uploads,
                extraction,
            }),
        }
    }

    /// Create application state with the backend selected by the config.
    ///
    /// With the Donut backend this is where the model gets loaded, once,
    /// before any request is served.
    pub fn from_config(config: Config) -> Result<Self, StateError> {
        let extraction = ExtractionService::from_config(&config)?;
        Ok(Self::new(config, extraction))
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the upload store
    pub fn uploads(&self) -> &UploadStore {
        &self.inner.uploads
    }

    /// Get the extraction service
    pub fn extraction(&self) -> &ExtractionService {
        &self.inner.extraction
    }
}
