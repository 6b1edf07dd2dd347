use std::borrow::Cow;
use std::path::Path;
use std::sync::Mutex;

use ndarray::Array2;
use ort::session::{Session, SessionInputValue, builder::GraphOptimizationLevel};
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tokenizers::{PaddingParams, PaddingStrategy, TruncationParams, TruncationStrategy};
use tracing::{debug, info};

use super::TextEncoder;
use crate::error::EmbeddingError;
use crate::models::EmbeddingConfig;
use crate::utils::l2_normalize;

/// Transformer encoder exported to ONNX (BGE-small by default), pooled on
/// the first token of `last_hidden_state`.
pub struct OnnxEncoder {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    name: String,
    dimension: usize,
    max_length: usize,
    token_type_ids: bool,
}

impl OnnxEncoder {
    pub fn load(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let model_path = config.resolved_model_path().ok_or_else(|| {
            EmbeddingError::BackendUnavailable("could not determine model path".to_string())
        })?;
        let tokenizer_path = config.resolved_tokenizer_path().ok_or_else(|| {
            EmbeddingError::BackendUnavailable("could not determine tokenizer path".to_string())
        })?;
        Self::load_from(
            &model_path,
            &tokenizer_path,
            config.dimension as usize,
            config.max_sequence_length as usize,
        )
    }

    pub fn load_from(
        model_path: &Path,
        tokenizer_path: &Path,
        dimension: usize,
        max_length: usize,
    ) -> Result<Self, EmbeddingError> {
        if !model_path.exists() {
            return Err(EmbeddingError::BackendUnavailable(format!(
                "model not found: {}",
                model_path.display()
            )));
        }
        if !tokenizer_path.exists() {
            return Err(EmbeddingError::BackendUnavailable(format!(
                "tokenizer not found: {}",
                tokenizer_path.display()
            )));
        }

        debug!("Loading ONNX encoder from {}", model_path.display());
        let session = Session::builder()
            .map_err(|e: ort::Error| EmbeddingError::BackendUnavailable(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e: ort::Error| EmbeddingError::BackendUnavailable(e.to_string()))?
            .with_intra_threads(num_cpus())
            .map_err(|e: ort::Error| EmbeddingError::BackendUnavailable(e.to_string()))?
            .commit_from_file(model_path)
            .map_err(|e: ort::Error| EmbeddingError::BackendUnavailable(e.to_string()))?;

        let token_type_ids = session
            .inputs
            .iter()
            .any(|input| input.name == "token_type_ids");

        let mut tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| EmbeddingError::BackendUnavailable(e.to_string()))?;

        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                strategy: TruncationStrategy::LongestFirst,
                ..Default::default()
            }))
            .map_err(|e| EmbeddingError::TokenizerError(e.to_string()))?;

        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::Fixed(max_length),
            ..Default::default()
        }));

        let name = model_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "onnx".to_string());

        info!(
            "ONNX encoder loaded (model={}, dim={}, max_length={})",
            name, dimension, max_length
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            name,
            dimension,
            max_length,
            token_type_ids,
        })
    }

    /// Token ids and attention mask, padded or truncated to `[1, max_length]`.
    fn tensors(&self, text: &str) -> Result<(Array2<i64>, Array2<i64>), EmbeddingError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| EmbeddingError::TokenizerError(e.to_string()))?;

        let mut input_ids = vec![0i64; self.max_length];
        let mut attention_mask = vec![0i64; self.max_length];
        for (j, (&id, &m)) in encoding
            .get_ids()
            .iter()
            .zip(encoding.get_attention_mask())
            .take(self.max_length)
            .enumerate()
        {
            input_ids[j] = i64::from(id);
            attention_mask[j] = i64::from(m);
        }

        let shape = (1, self.max_length);
        let input_ids = Array2::from_shape_vec(shape, input_ids)
            .map_err(|e| EmbeddingError::InferenceError(e.to_string()))?;
        let attention_mask = Array2::from_shape_vec(shape, attention_mask)
            .map_err(|e| EmbeddingError::InferenceError(e.to_string()))?;
        Ok((input_ids, attention_mask))
    }
}

impl TextEncoder for OnnxEncoder {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn encode(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let (input_ids, attention_mask) = self.tensors(text)?;

        let mut inputs: Vec<(Cow<'static, str>, SessionInputValue<'_>)> = ort::inputs![
            "input_ids" => Tensor::from_array(input_ids)
                .map_err(|e: ort::Error| EmbeddingError::InferenceError(e.to_string()))?,
            "attention_mask" => Tensor::from_array(attention_mask)
                .map_err(|e: ort::Error| EmbeddingError::InferenceError(e.to_string()))?,
        ];
        if self.token_type_ids {
            let token_type_ids = Tensor::from_array(Array2::<i64>::zeros((1, self.max_length)))
                .map_err(|e: ort::Error| EmbeddingError::InferenceError(e.to_string()))?;
            inputs.push((Cow::Borrowed("token_type_ids"), token_type_ids.into()));
        }

        let mut session = self
            .session
            .lock()
            .map_err(|_| EmbeddingError::InferenceError("session lock poisoned".to_string()))?;

        let outputs = session
            .run(inputs)
            .map_err(|e: ort::Error| EmbeddingError::InferenceError(e.to_string()))?;

        let hidden = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e: ort::Error| EmbeddingError::InferenceError(e.to_string()))?;

        let shape = hidden.shape().to_vec();
        let pooled: Vec<f32> = match shape.as_slice() {
            // [batch, seq, dim]: first-token (CLS) pooling
            [1, _, dim] if *dim == self.dimension => {
                (0..self.dimension).map(|d| hidden[[0, 0, d]]).collect()
            }
            // [batch, dim]: already pooled
            [1, dim] if *dim == self.dimension => {
                (0..self.dimension).map(|d| hidden[[0, d]]).collect()
            }
            _ => {
                return Err(EmbeddingError::InferenceError(format!(
                    "unexpected output shape {:?} for dimension {}",
                    shape, self.dimension
                )));
            }
        };

        Ok(l2_normalize(&pooled))
    }
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let result = OnnxEncoder::load_from(
            &dir.path().join("model.onnx"),
            &dir.path().join("tokenizer.json"),
            384,
            512,
        );
        assert!(matches!(
            result,
            Err(EmbeddingError::BackendUnavailable(msg)) if msg.contains("model not found")
        ));
    }

    #[test]
    fn test_missing_tokenizer_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("model.onnx");
        std::fs::write(&model, b"not a model").unwrap();
        let result = OnnxEncoder::load_from(&model, &dir.path().join("tokenizer.json"), 384, 512);
        assert!(matches!(
            result,
            Err(EmbeddingError::BackendUnavailable(msg)) if msg.contains("tokenizer not found")
        ));
    }
}
