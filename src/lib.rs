//! Receipt OCR Server Library
//!
//! The server binary is in main.rs; everything it wires together lives here
//! so the router can be exercised from integration tests.
//!
//! # Modules
//!
//! - `upload`: multipart parsing, filename validation, disk storage
//! - `ocr`: extraction backends (remote OCR API, local Donut model)
//! - `donut`: Donut preprocessing, generation and output decoding
//! - `routes`: HTTP handlers and router construction

pub mod config;
pub mod donut;
pub mod error;
pub mod ocr;
pub mod routes;
pub mod state;
pub mod upload;

pub use config::Config;
pub use error::ReceiptError;
pub use state::AppState;
