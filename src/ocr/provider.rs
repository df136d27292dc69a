//! Extraction Providers
//!
//! Defines the provider trait and the two backends: the third-party receipt
//! OCR API and the local Donut model.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::Value;

use super::types::{Extraction, ExtractorBackend, OcrError};
use crate::config::RemoteOcrConfig;
use crate::upload::StoredUpload;

/// Receipt extraction provider trait
#[async_trait]
pub trait ExtractorTrait: Send + Sync {
    /// Get the backend type
    fn backend(&self) -> ExtractorBackend;

    /// Check if the provider can serve requests
    async fn is_available(&self) -> bool;

    /// Extract receipt data from a stored image
    async fn extract(&self, upload: &StoredUpload) -> Result<Extraction, OcrError>;
}

/// Third-party receipt OCR API provider
pub struct RemoteOcrProvider {
    client: reqwest::Client,
    config: RemoteOcrConfig,
}

impl RemoteOcrProvider {
    pub fn new(config: RemoteOcrConfig) -> Result<Self, OcrError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| OcrError::Request(e.to_string()))?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl ExtractorTrait for RemoteOcrProvider {
    fn backend(&self) -> ExtractorBackend {
        ExtractorBackend::Remote
    }

    async fn is_available(&self) -> bool {
        // Probing the upstream would spend API quota
        reqwest::Url::parse(&self.config.api_url).is_ok() && !self.config.api_key.is_empty()
    }

    async fn extract(&self, upload: &StoredUpload) -> Result<Extraction, OcrError> {
        let data = tokio::fs::read(&upload.path).await?;

        let part = Part::bytes(data)
            .file_name(upload.file_name.clone())
            .mime_str(&upload.mime_type())
            .map_err(|e| OcrError::Request(e.to_string()))?;

        let form = Form::new()
            .text(
                self.config.credential_field.as_str(),
                self.config.api_key.clone(),
            )
            .text("recognizer", self.config.recognizer.clone())
            .text("ref_no", self.config.ref_no.clone())
            .part("file", part);

        tracing::debug!(
            url = %self.config.api_url,
            file = %upload.file_name,
            credential_field = self.config.credential_field.as_str(),
            "Calling OCR API"
        );

        let response = self
            .client
            .post(&self.config.api_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| OcrError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| OcrError::Request(e.to_string()))?;

        if !status.is_success() {
            return Err(OcrError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        let document: Value =
            serde_json::from_str(&body).map_err(|e| OcrError::InvalidResponse(e.to_string()))?;

        Ok(Extraction::Passthrough(document))
    }
}

/// Local Donut model provider
///
/// Holds the one model instance for the process. Generation runs on the
/// blocking pool and the mutex keeps it to one pass at a time.
#[cfg(feature = "donut")]
pub struct DonutProvider {
    model: std::sync::Arc<parking_lot::Mutex<crate::donut::DonutModel>>,
}

#[cfg(feature = "donut")]
impl DonutProvider {
    pub fn new(model: crate::donut::DonutModel) -> Self {
        Self {
            model: std::sync::Arc::new(parking_lot::Mutex::new(model)),
        }
    }

    pub fn load(config: &crate::config::DonutConfig) -> Result<Self, crate::donut::DonutError> {
        let model = crate::donut::DonutModel::load(
            &config.model_dir,
            &config.task_prompt,
            config.max_length,
        )?;
        Ok(Self::new(model))
    }
}

#[cfg(feature = "donut")]
#[async_trait]
impl ExtractorTrait for DonutProvider {
    fn backend(&self) -> ExtractorBackend {
        ExtractorBackend::Donut
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn extract(&self, upload: &StoredUpload) -> Result<Extraction, OcrError> {
        let data = tokio::fs::read(&upload.path).await?;
        let model = self.model.clone();

        let fields = tokio::task::spawn_blocking(move || {
            let model = model.lock();
            model.extract(&data)
        })
        .await
        .map_err(|e| OcrError::Inference(format!("Inference task failed: {}", e)))?
        .map_err(|e| OcrError::Inference(e.to_string()))?;

        Ok(Extraction::Fields(fields))
    }
}

/// Mock provider for testing
#[cfg(test)]
pub struct MockProvider {
    pub response: Extraction,
    pub available: bool,
}

#[cfg(test)]
#[async_trait]
impl ExtractorTrait for MockProvider {
    fn backend(&self) -> ExtractorBackend {
        match self.response {
            Extraction::Passthrough(_) => ExtractorBackend::Remote,
            Extraction::Fields(_) => ExtractorBackend::Donut,
        }
    }

    async fn is_available(&self) -> bool {
        self.available
    }

    async fn extract(&self, _upload: &StoredUpload) -> Result<Extraction, OcrError> {
        Ok(self.response.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::ocr::CredentialField;
    use tempfile::TempDir;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn stored_receipt(dir: &TempDir) -> StoredUpload {
        let path = dir.path().join("receipt.jpg");
        std::fs::write(&path, b"fake jpeg bytes").unwrap();
        StoredUpload {
            path,
            file_name: "receipt.jpg".to_string(),
            content_type: Some("image/jpeg".to_string()),
            size: 15,
        }
    }

    fn remote_config(api_url: String) -> RemoteOcrConfig {
        RemoteOcrConfig {
            api_url,
            ..Config::default().remote
        }
    }

    #[tokio::test]
    async fn test_upstream_json_is_passed_through() {
        let server = MockServer::start().await;
        let document = serde_json::json!({
            "success": true,
            "receipts": [{"merchant_name": "Corner Shop", "total": 12.5}]
        });

        Mock::given(method("POST"))
            .and(path("/api/v1/receipt"))
            .and(body_string_contains("name=\"api_key\""))
            .and(body_string_contains("name=\"recognizer\""))
            .and(body_string_contains("fake jpeg bytes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(document.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let provider =
            RemoteOcrProvider::new(remote_config(format!("{}/api/v1/receipt", server.uri()))).unwrap();

        let result = provider.extract(&stored_receipt(&dir)).await.unwrap();
        assert_eq!(result, Extraction::Passthrough(document));
    }

    #[tokio::test]
    async fn test_client_id_credential_field() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(body_string_contains("name=\"client_id\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let config = RemoteOcrConfig {
            credential_field: CredentialField::ClientId,
            ..remote_config(server.uri())
        };
        let provider = RemoteOcrProvider::new(config).unwrap();

        assert!(provider.extract(&stored_receipt(&dir)).await.is_ok());
    }

    #[tokio::test]
    async fn test_upstream_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let provider = RemoteOcrProvider::new(remote_config(server.uri())).unwrap();

        let err = provider.extract(&stored_receipt(&dir)).await.unwrap_err();
        assert!(matches!(err, OcrError::UpstreamStatus { status: 503, ref body } if body == "maintenance"));
    }

    #[tokio::test]
    async fn test_non_json_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let provider = RemoteOcrProvider::new(remote_config(server.uri())).unwrap();

        let err = provider.extract(&stored_receipt(&dir)).await.unwrap_err();
        assert!(matches!(err, OcrError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_unreachable_upstream() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let dir = TempDir::new().unwrap();
        let provider = RemoteOcrProvider::new(remote_config(format!("http://{}/receipt", addr))).unwrap();

        let err = provider.extract(&stored_receipt(&dir)).await.unwrap_err();
        assert!(matches!(err, OcrError::Request(ref msg) if !msg.is_empty()));
    }

    #[tokio::test]
    async fn test_missing_stored_file() {
        let provider = RemoteOcrProvider::new(remote_config("http://127.0.0.1:9/".into())).unwrap();
        let upload = StoredUpload {
            path: "/nonexistent/receipt.png".into(),
            file_name: "receipt.png".into(),
            content_type: None,
            size: 0,
        };

        let err = provider.extract(&upload).await.unwrap_err();
        assert!(matches!(err, OcrError::Io(_)));
    }

    #[tokio::test]
    async fn test_availability_requires_valid_url() {
        let provider = RemoteOcrProvider::new(remote_config("not a url".into())).unwrap();
        assert!(!provider.is_available().await);

        let provider = RemoteOcrProvider::new(Config::default().remote).unwrap();
        assert!(provider.is_available().await);
    }
}
