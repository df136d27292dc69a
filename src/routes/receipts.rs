//! Receipt Routes
//!
//! Endpoints:
//! - POST /process_receipt - Upload a receipt image and get its extracted fields

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;

use crate::error::{ReceiptError, Result};
use crate::ocr::Extraction;
use crate::state::AppState;
use crate::upload::{read_upload, StoredUpload};

/// Create the receipt router
pub fn router() -> Router<AppState> {
    Router::new().route("/process_receipt", post(process_receipt))
}

/// Body returned for model-decoded receipts
#[derive(Debug, Serialize)]
pub struct ExtractedTextResponse {
    pub extracted_text: Value,
    pub image_path: String,
}

/// POST /process_receipt
///
/// Multipart form with an `image` file (png/jpg/jpeg) and an optional
/// `description`. The image is saved to the upload directory, then handed to
/// the configured extraction backend.
#[tracing::instrument(skip_all, fields(request_id = %uuid::Uuid::new_v4()))]
async fn process_receipt(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Response> {
    let mut multipart =
        multipart.map_err(|rejection| ReceiptError::InvalidMultipart(rejection.body_text()))?;

    let upload = read_upload(&mut multipart).await?;

    tracing::info!(
        file = %upload.file_name,
        size = upload.data.len(),
        description = %upload.description,
        "Receipt image received"
    );

    let stored = state.uploads().save(&upload).await?;
    let extraction = state.extraction().extract(&stored).await?;

    Ok(render_extraction(extraction, &stored))
}

/// Shape the backend result: upstream documents go back verbatim, decoded
/// fields are wrapped with the path the image was saved to.
pub fn render_extraction(extraction: Extraction, stored: &StoredUpload) -> Response {
    match extraction {
        Extraction::Passthrough(document) => Json(document).into_response(),
        Extraction::Fields(fields) => Json(ExtractedTextResponse {
            extracted_text: fields,
            image_path: stored.path.display().to_string(),
        })
        .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::StatusCode;
    use serde_json::json;

    fn stored() -> StoredUpload {
        StoredUpload {
            path: "uploads/receipt.png".into(),
            file_name: "receipt.png".into(),
            content_type: Some("image/png".into()),
            size: 3,
        }
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_passthrough_is_verbatim() {
        let document = json!({"ocr_type": "receipts", "receipts": []});
        let response = render_extraction(Extraction::Passthrough(document.clone()), &stored());

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, document);
    }

    #[tokio::test]
    async fn test_fields_are_wrapped() {
        let fields = json!({"total": "5.75"});
        let response = render_extraction(Extraction::Fields(fields.clone()), &stored());

        let body = body_json(response).await;
        assert_eq!(body["extracted_text"], fields);
        assert_eq!(body["image_path"], "uploads/receipt.png");
    }
}
