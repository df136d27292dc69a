//! Donut pipeline errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DonutError {
    #[error("Failed to decode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid model config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Failed to read model file {path}: {source}")]
    ModelFile {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("Token not in vocabulary: {0}")]
    MissingToken(String),

    #[error("Unexpected tensor shape: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[cfg(feature = "donut")]
    #[error("ONNX runtime error: {0}")]
    Runtime(#[from] ort::Error),
}
