//! Receipt Upload Module
//!
//! Turns a multipart request into a validated receipt image and persists it:
//! 1. Pull the `image` file part (and optional `description`) out of the form
//! 2. Reject blank filenames and extensions outside the image allow-list
//! 3. Write the bytes into the upload directory under a sanitised name

pub mod store;
pub mod types;
pub mod validate;

pub use store::UploadStore;
pub use types::*;
pub use validate::{read_upload, secure_filename, validate_filename};
