//! Upload validation
//!
//! Multipart parsing plus the filename rules every receipt must pass.

use std::path::Path;

use axum::extract::Multipart;
use unicode_normalization::UnicodeNormalization;

use super::types::{
    ReceiptUpload, ALLOWED_EXTENSIONS, DEFAULT_DESCRIPTION, DESCRIPTION_FIELD, IMAGE_FIELD,
};
use crate::error::{ReceiptError, Result};

/// Read the receipt image and description out of a multipart form.
///
/// Only the first `image` part that carries a filename counts; a part named
/// `image` without a filename is a plain form value and is ignored, the same
/// as any unknown field.
pub async fn read_upload(multipart: &mut Multipart) -> Result<ReceiptUpload> {
    let mut image: Option<(String, Option<String>, Vec<u8>)> = None;
    let mut description: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ReceiptError::InvalidMultipart(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            IMAGE_FIELD if image.is_none() => {
                let Some(raw_name) = field.file_name().map(str::to_string) else {
                    tracing::debug!("Ignoring image field without a filename");
                    continue;
                };
                let content_type = field.content_type().map(str::to_string);

                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ReceiptError::InvalidMultipart(e.to_string()))?;

                tracing::debug!(
                    filename = %raw_name,
                    content_type = ?content_type,
                    size = data.len(),
                    "Received image field"
                );

                image = Some((raw_name, content_type, data.to_vec()));
            }
            DESCRIPTION_FIELD => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ReceiptError::InvalidMultipart(e.to_string()))?;
                description = Some(text);
            }
            _ => {
                tracing::debug!(field = %name, "Ignoring multipart field");
            }
        }
    }

    let (raw_name, content_type, data) = image.ok_or(ReceiptError::MissingFile)?;
    let file_name = validate_filename(&raw_name)?;

    Ok(ReceiptUpload {
        file_name,
        content_type,
        data,
        description: description.unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
    })
}

/// Check a client-supplied filename and return the sanitised name to store
/// the upload under.
///
/// The extension is judged on the name the client sent, so a stem that
/// sanitises away entirely (`收据.jpg` becomes `jpg`) is still accepted.
pub fn validate_filename(raw_name: &str) -> Result<String> {
    let raw_name = raw_name.trim();
    if raw_name.is_empty() {
        return Err(ReceiptError::EmptyFilename);
    }

    let file_name = secure_filename(raw_name);
    if file_name.is_empty() {
        return Err(ReceiptError::EmptyFilename);
    }

    let extension = Path::new(raw_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ReceiptError::UnsupportedFormat(extension));
    }

    Ok(file_name)
}

/// Reduce a filename to a flat, ASCII-only name that is safe to join onto
/// the upload directory.
///
/// The name is NFKD-normalised and folded to ASCII (`café` becomes `cafe`).
/// Path separators and whitespace runs become `_`, anything outside
/// `[A-Za-z0-9_.-]` is dropped, and leading/trailing `.` and `_` are stripped.
pub fn secure_filename(name: &str) -> String {
    let folded: String = name.nfkd().filter(char::is_ascii).collect();
    let flattened = folded.replace(['/', '\\'], " ");
    let joined = flattened.split_whitespace().collect::<Vec<_>>().join("_");

    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();

    kept.trim_matches(|c| c == '.' || c == '_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_filename() {
        assert_eq!(secure_filename("receipt.png"), "receipt.png");
        assert_eq!(secure_filename("my receipt.JPG"), "my_receipt.JPG");
        assert_eq!(secure_filename("../../etc/passwd"), "etc_passwd");
        assert_eq!(secure_filename("C:\\Users\\me\\scan.jpeg"), "C_Users_me_scan.jpeg");
        assert_eq!(secure_filename("caf\u{e9}.png"), "cafe.png");
        assert_eq!(secure_filename("\u{ff32}eceipt.jpg"), "Receipt.jpg");
        assert_eq!(secure_filename("..."), "");
    }

    #[test]
    fn test_allowed_extensions() {
        assert_eq!(validate_filename("a.png").unwrap(), "a.png");
        assert_eq!(validate_filename("a.jpg").unwrap(), "a.jpg");
        assert_eq!(validate_filename("a.JPEG").unwrap(), "a.JPEG");
        assert_eq!(validate_filename(" a.png ").unwrap(), "a.png");
    }

    #[test]
    fn test_non_ascii_stem_keeps_allowed_extension() {
        assert_eq!(validate_filename("\u{6536}\u{636e}.jpg").unwrap(), "jpg");
        assert_eq!(validate_filename("r\u{e9}\u{e7}u.PNG").unwrap(), "recu.PNG");

        let err = validate_filename("\u{6536}\u{636e}.gif").unwrap_err();
        assert!(matches!(err, ReceiptError::UnsupportedFormat(ref ext) if ext == "gif"));
    }

    #[test]
    fn test_disallowed_extension() {
        let err = validate_filename("receipt.gif").unwrap_err();
        assert!(matches!(err, ReceiptError::UnsupportedFormat(ref ext) if ext == "gif"));

        let err = validate_filename("receipt").unwrap_err();
        assert!(matches!(err, ReceiptError::UnsupportedFormat(ref ext) if ext.is_empty()));
    }

    #[test]
    fn test_blank_filename() {
        assert!(matches!(validate_filename(""), Err(ReceiptError::EmptyFilename)));
        assert!(matches!(validate_filename("   "), Err(ReceiptError::EmptyFilename)));
        assert!(matches!(validate_filename("/../"), Err(ReceiptError::EmptyFilename)));
    }
}
