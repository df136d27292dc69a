//! ONNX Donut model
//!
//! Loads an encoder/decoder export of a Donut checkpoint (as produced by
//! `optimum-cli export onnx`) together with its tokenizer and processor
//! configs, and runs the full image → structured fields pass.

use std::collections::HashSet;
use std::path::Path;

use ndarray::{s, Array2, ArrayD, Ix3};
use ort::session::{builder::GraphOptimizationLevel, Session};
use serde::Deserialize;
use serde_json::Value;
use tokenizers::Tokenizer;

use super::decode::{clean_sequence, token2json};
use super::error::DonutError;
use super::generate::{greedy_decode, GenerationParams};
use super::preprocess::{preprocess, PreprocessorConfig};

pub const ENCODER_FILE: &str = "encoder_model.onnx";
pub const DECODER_FILE: &str = "decoder_model.onnx";
pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const PREPROCESSOR_FILE: &str = "preprocessor_config.json";
pub const CONFIG_FILE: &str = "config.json";

const EOS_TOKEN: &str = "</s>";
const PAD_TOKEN: &str = "<pad>";
const UNK_TOKEN: &str = "<unk>";

#[derive(Deserialize)]
struct ModelConfig {
    decoder: DecoderConfig,
}

#[derive(Deserialize)]
struct DecoderConfig {
    max_position_embeddings: usize,
}

/// A loaded Donut model. Construct once at start-up and share.
pub struct DonutModel {
    encoder: Session,
    decoder: Session,
    tokenizer: Tokenizer,
    preprocessor: PreprocessorConfig,
    prompt_ids: Vec<i64>,
    params: GenerationParams,
    added_vocab: HashSet<String>,
}

impl DonutModel {
    /// Load every model artefact from `dir`.
    ///
    /// `task_prompt` seeds the decoder (e.g. `<s_receipt>`); `max_length`
    /// overrides the decoder's `max_position_embeddings`.
    pub fn load(dir: &Path, task_prompt: &str, max_length: Option<usize>) -> Result<Self, DonutError> {
        let preprocessor = PreprocessorConfig::from_json(&read_file(&dir.join(PREPROCESSOR_FILE))?)?;
        let model_config: ModelConfig = serde_json::from_str(&read_file(&dir.join(CONFIG_FILE))?)?;

        let tokenizer = Tokenizer::from_file(dir.join(TOKENIZER_FILE))
            .map_err(|e| DonutError::Tokenizer(e.to_string()))?;

        let prompt_ids: Vec<i64> = tokenizer
            .encode(task_prompt, false)
            .map_err(|e| DonutError::Tokenizer(e.to_string()))?
            .get_ids()
            .iter()
            .map(|&id| id as i64)
            .collect();
        if prompt_ids.is_empty() {
            return Err(DonutError::MissingToken(task_prompt.to_string()));
        }

        let params = GenerationParams {
            max_length: max_length.unwrap_or(model_config.decoder.max_position_embeddings),
            eos_token_id: token_id(&tokenizer, EOS_TOKEN)?,
            banned_token_ids: vec![token_id(&tokenizer, UNK_TOKEN)?],
        };

        let added_vocab = tokenizer
            .get_added_tokens_decoder()
            .values()
            .map(|token| token.content.clone())
            .collect();

        let encoder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(dir.join(ENCODER_FILE))?;
        let decoder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(dir.join(DECODER_FILE))?;

        tracing::info!(
            model_dir = %dir.display(),
            canvas_width = preprocessor.size.width,
            canvas_height = preprocessor.size.height,
            max_length = params.max_length,
            "Donut model loaded"
        );

        Ok(Self {
            encoder,
            decoder,
            tokenizer,
            preprocessor,
            prompt_ids,
            params,
            added_vocab,
        })
    }

    /// Run one image through preprocessing, generation and decoding
    pub fn extract(&self, image_bytes: &[u8]) -> Result<Value, DonutError> {
        let pixel_values = preprocess(image_bytes, &self.preprocessor)?;

        let encoder_outputs = self
            .encoder
            .run(ort::inputs!["pixel_values" => pixel_values.view()]?)?;
        let hidden_states: ArrayD<f32> = encoder_outputs["last_hidden_state"]
            .try_extract_tensor::<f32>()?
            .to_owned();

        let sequence = greedy_decode(&self.prompt_ids, &self.params, |ids| {
            self.next_token_logits(ids, &hidden_states)
        })?;

        let ids: Vec<u32> = sequence.iter().map(|&id| id as u32).collect();
        let decoded = self
            .tokenizer
            .decode(&ids, false)
            .map_err(|e| DonutError::Tokenizer(e.to_string()))?;

        tracing::debug!(tokens = ids.len(), sequence = %decoded, "Donut generation finished");

        let cleaned = clean_sequence(&decoded, EOS_TOKEN, PAD_TOKEN);
        Ok(token2json(&cleaned, &self.added_vocab))
    }

    fn next_token_logits(&self, ids: &[i64], hidden_states: &ArrayD<f32>) -> Result<Vec<f32>, DonutError> {
        let input_ids = Array2::from_shape_vec((1, ids.len()), ids.to_vec())?;

        let outputs = self.decoder.run(ort::inputs![
            "input_ids" => input_ids.view(),
            "encoder_hidden_states" => hidden_states.view()
        ]?)?;

        let logits = outputs["logits"]
            .try_extract_tensor::<f32>()?
            .into_dimensionality::<Ix3>()?;
        let last = logits.shape()[1].saturating_sub(1);

        Ok(logits.slice(s![0, last, ..]).to_vec())
    }
}

fn token_id(tokenizer: &Tokenizer, token: &str) -> Result<i64, DonutError> {
    tokenizer
        .token_to_id(token)
        .map(i64::from)
        .ok_or_else(|| DonutError::MissingToken(token.to_string()))
}

fn read_file(path: &Path) -> Result<String, DonutError> {
    std::fs::read_to_string(path).map_err(|source| DonutError::ModelFile {
        path: path.to_path_buf(),
        source,
    })
}
