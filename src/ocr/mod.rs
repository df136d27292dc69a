//! OCR Module
//!
//! Extracts structured receipt data from a stored image.
//!
//! One backend is chosen at start-up:
//! - Remote receipt OCR API (multipart upload, JSON passed through)
//! - Local Donut model (feature `donut`, fields decoded from model output)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use receipt_ocr_server::ocr::ExtractionService;
//!
//! let service = ExtractionService::from_config(&config)?;
//! let extraction = service.extract(&stored_upload).await?;
//! ```

mod provider;
mod service;
mod types;

pub use provider::{ExtractorTrait, RemoteOcrProvider};
pub use service::ExtractionService;
pub use types::{CredentialField, Extraction, ExtractorBackend, OcrError};

#[cfg(feature = "donut")]
pub use provider::DonutProvider;
