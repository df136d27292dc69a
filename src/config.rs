//! Configuration management for the receipt OCR server

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::ocr::{CredentialField, ExtractorBackend};

/// Error raised when an environment value cannot be interpreted
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

impl ConfigError {
    /// True when the bad value selects the extraction backend or configures
    /// how it is reached.
    pub fn is_backend_setting(&self) -> bool {
        match self {
            ConfigError::InvalidValue { key, .. } => {
                *key == "EXTRACTOR_BACKEND" || key.starts_with("OCR_") || key.starts_with("DONUT_")
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub upload: UploadConfig,
    pub backend: ExtractorBackend,
    pub remote: RemoteOcrConfig,
    pub donut: DonutConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Directory receipt images are written to
    pub dir: PathBuf,
    /// Request body limit for `/process_receipt`
    pub max_bytes: usize,
}

/// Third-party receipt OCR API settings
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteOcrConfig {
    pub api_url: String,
    pub api_key: String,
    pub credential_field: CredentialField,
    pub recognizer: String,
    pub ref_no: String,
    /// No timeout when unset
    pub timeout: Option<Duration>,
}

/// Local Donut model settings
#[derive(Debug, Clone, Deserialize)]
pub struct DonutConfig {
    /// Directory holding the ONNX export, tokenizer and processor configs
    pub model_dir: PathBuf,
    pub task_prompt: String,
    /// Overrides the decoder's `max_position_embeddings`
    pub max_length: Option<usize>,
}

pub const DEFAULT_OCR_API_URL: &str = "https://ocr.asprise.com/api/v1/receipt";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
            },
            upload: UploadConfig {
                dir: PathBuf::from("uploads"),
                max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            },
            backend: ExtractorBackend::Remote,
            remote: RemoteOcrConfig {
                api_url: DEFAULT_OCR_API_URL.to_string(),
                api_key: "TEST".to_string(),
                credential_field: CredentialField::ApiKey,
                recognizer: "auto".to_string(),
                ref_no: "oct_python_123".to_string(),
                timeout: None,
            },
            donut: DonutConfig {
                model_dir: PathBuf::from("models/donut-receipts-extract"),
                task_prompt: "<s_receipt>".to_string(),
                max_length: None,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup, falling back to defaults
    /// for anything the lookup does not provide.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        Ok(Config {
            server: ServerConfig {
                host: lookup("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_or(&lookup, "SERVER_PORT", defaults.server.port)?,
            },
            upload: UploadConfig {
                dir: lookup("UPLOAD_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.upload.dir),
                max_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", defaults.upload.max_bytes)?,
            },
            backend: match lookup("EXTRACTOR_BACKEND") {
                Some(value) => ExtractorBackend::parse(&value).ok_or(ConfigError::InvalidValue {
                    key: "EXTRACTOR_BACKEND",
                    value,
                })?,
                None => defaults.backend,
            },
            remote: RemoteOcrConfig {
                api_url: lookup("OCR_API_URL").unwrap_or(defaults.remote.api_url),
                api_key: lookup("OCR_API_KEY").unwrap_or(defaults.remote.api_key),
                credential_field: match lookup("OCR_CREDENTIAL_FIELD") {
                    Some(value) => {
                        CredentialField::parse(&value).ok_or(ConfigError::InvalidValue {
                            key: "OCR_CREDENTIAL_FIELD",
                            value,
                        })?
                    }
                    None => defaults.remote.credential_field,
                },
                recognizer: lookup("OCR_RECOGNIZER").unwrap_or(defaults.remote.recognizer),
                ref_no: lookup("OCR_REF_NO").unwrap_or(defaults.remote.ref_no),
                timeout: parse_opt::<u64, _>(&lookup, "OCR_TIMEOUT_SECS")?
                    .map(Duration::from_secs),
            },
            donut: DonutConfig {
                model_dir: lookup("DONUT_MODEL_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.donut.model_dir),
                task_prompt: lookup("DONUT_TASK_PROMPT").unwrap_or(defaults.donut.task_prompt),
                max_length: parse_opt(&lookup, "DONUT_MAX_LENGTH")?,
            },
        })
    }
}

fn parse_opt<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        None => Ok(None),
    }
}

fn parse_or<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    Ok(parse_opt(lookup, key)?.unwrap_or(default))
}
