//! Donut Module
//!
//! Local receipt understanding with a Donut (document understanding
//! transformer) checkpoint: a vision encoder reads the receipt image and a
//! text decoder emits field tags that are parsed into JSON.
//!
//! The runtime-independent pieces (preprocessing, the greedy decoding loop
//! and tag parsing) are always compiled. ONNX inference lives in `model`
//! behind the `donut` feature.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use receipt_ocr_server::donut::DonutModel;
//!
//! let model = DonutModel::load(Path::new("models/donut-receipts-extract"), "<s_receipt>", None)?;
//! let fields = model.extract(&std::fs::read("receipt.jpg")?)?;
//! ```

pub mod decode;
mod error;
pub mod generate;
pub mod preprocess;

#[cfg(feature = "donut")]
mod model;

pub use decode::{clean_sequence, token2json};
pub use error::DonutError;
pub use generate::{greedy_decode, GenerationParams};
pub use preprocess::{preprocess, PreprocessorConfig};

#[cfg(feature = "donut")]
pub use model::DonutModel;
