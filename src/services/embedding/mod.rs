//! Embedding generation with a neural encoder and a deterministic fallback.
//!
//! The active backend is chosen at construction: the ONNX encoder when it
//! loads, the term-frequency embedder otherwise. A neural failure at runtime
//! switches the generator to the fallback backend for good; `embed` itself
//! never fails.

mod fallback;
mod neural;

pub use fallback::{VocabularyState, embed_with_vocabulary};
pub use neural::OnnxEncoder;

use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use tracing::{info, warn};

use crate::error::EmbeddingError;
use crate::models::EmbeddingConfig;

/// A neural text encoder producing unit vectors of a fixed dimension.
pub trait TextEncoder: Send + Sync {
    /// Model name for logs and status output.
    fn name(&self) -> &str;

    fn dimension(&self) -> usize;

    fn encode(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingMode {
    Neural,
    Fallback,
}

impl std::fmt::Display for EmbeddingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbeddingMode::Neural => write!(f, "neural"),
            EmbeddingMode::Fallback => write!(f, "fallback"),
        }
    }
}

#[derive(Clone)]
enum EmbeddingBackend {
    Neural(Arc<dyn TextEncoder>),
    Fallback,
}

/// Outcome of [`EmbeddingGenerator::build_vocabulary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VocabularyBuild {
    /// Fallback vocabulary extended with `added` terms, `total` known.
    Built { added: usize, total: usize },
    /// Neural backend active; no vocabulary is needed.
    AlreadyBuilt,
}

pub struct EmbeddingGenerator {
    backend: RwLock<EmbeddingBackend>,
    vocabulary: RwLock<VocabularyState>,
    dimension: usize,
    query_instruction: Option<String>,
}

impl EmbeddingGenerator {
    /// Try the configured ONNX encoder and fall back when it cannot load.
    pub fn from_config(config: &EmbeddingConfig) -> Self {
        let generator = match OnnxEncoder::load(config) {
            Ok(encoder) => Self::with_encoder(Arc::new(encoder)),
            Err(e) => {
                warn!("Neural embeddings unavailable, using fallback embedder: {}", e);
                Self::fallback(config.dimension as usize)
            }
        };
        generator.with_query_instruction(config.query_instruction.clone())
    }

    /// Deterministic term-frequency embeddings of `dimension` floats.
    pub fn fallback(dimension: usize) -> Self {
        Self {
            backend: RwLock::new(EmbeddingBackend::Fallback),
            vocabulary: RwLock::new(VocabularyState::new()),
            dimension,
            query_instruction: None,
        }
    }

    pub fn with_encoder(encoder: Arc<dyn TextEncoder>) -> Self {
        info!(
            "Using neural embeddings ({}, dim={})",
            encoder.name(),
            encoder.dimension()
        );
        Self {
            dimension: encoder.dimension(),
            backend: RwLock::new(EmbeddingBackend::Neural(encoder)),
            vocabulary: RwLock::new(VocabularyState::new()),
            query_instruction: None,
        }
    }

    pub fn with_query_instruction(mut self, instruction: Option<String>) -> Self {
        self.query_instruction = instruction.filter(|s| !s.is_empty());
        self
    }

    pub fn with_vocabulary(self, vocabulary: VocabularyState) -> Self {
        self.set_vocabulary(vocabulary);
        self
    }

    pub fn mode(&self) -> EmbeddingMode {
        match *self.backend.read().unwrap_or_else(PoisonError::into_inner) {
            EmbeddingBackend::Neural(_) => EmbeddingMode::Neural,
            EmbeddingBackend::Fallback => EmbeddingMode::Fallback,
        }
    }

    /// Name of the active backend's model.
    pub fn backend_name(&self) -> String {
        match &*self.backend.read().unwrap_or_else(PoisonError::into_inner) {
            EmbeddingBackend::Neural(encoder) => encoder.name().to_string(),
            EmbeddingBackend::Fallback => "term-frequency".to_string(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// True in neural mode, or once the fallback vocabulary knows a term.
    pub fn is_vocabulary_built(&self) -> bool {
        self.mode() == EmbeddingMode::Neural
            || self
                .vocabulary
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .is_built()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Seed the fallback vocabulary from `documents`. Additive when called
    /// again; a no-op in neural mode.
    pub fn build_vocabulary<S: AsRef<str>>(&self, documents: &[S]) -> VocabularyBuild {
        if self.mode() == EmbeddingMode::Neural {
            return VocabularyBuild::AlreadyBuilt;
        }

        let mut vocabulary = self
            .vocabulary
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let added = vocabulary.extend(documents, self.dimension);
        info!(
            "Fallback vocabulary built: {} new terms, {} total",
            added,
            vocabulary.len()
        );
        VocabularyBuild::Built {
            added,
            total: vocabulary.len(),
        }
    }

    pub fn vocabulary_snapshot(&self) -> VocabularyState {
        self.vocabulary
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the fallback vocabulary, e.g. with one restored from storage.
    pub fn set_vocabulary(&self, vocabulary: VocabularyState) {
        *self
            .vocabulary
            .write()
            .unwrap_or_else(PoisonError::into_inner) = vocabulary;
    }

    pub fn clear_vocabulary(&self) {
        self.vocabulary
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Embed a passage.
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let backend = self
            .backend
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        match backend {
            EmbeddingBackend::Neural(encoder) => match self.encode_checked(encoder.as_ref(), text) {
                Ok(embedding) => embedding,
                Err(e) => {
                    self.degrade(&e);
                    self.embed_fallback(text)
                }
            },
            EmbeddingBackend::Fallback => self.embed_fallback(text),
        }
    }

    /// Embed a search query, prefixed with the query instruction in neural mode.
    pub fn embed_query(&self, query: &str) -> Vec<f32> {
        match (&self.query_instruction, self.mode()) {
            (Some(instruction), EmbeddingMode::Neural) => {
                self.embed(&format!("{instruction}{query}"))
            }
            _ => self.embed(query),
        }
    }

    /// Embed every text, preserving input order.
    pub fn embed_all<S: AsRef<str>>(&self, texts: &[S]) -> Vec<Vec<f32>> {
        texts.iter().map(|t| self.embed(t.as_ref())).collect()
    }

    fn encode_checked(&self, encoder: &dyn TextEncoder, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let embedding = encoder.encode(text)?;
        if embedding.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                left: embedding.len(),
                right: self.dimension,
            });
        }
        Ok(embedding)
    }

    fn embed_fallback(&self, text: &str) -> Vec<f32> {
        let vocabulary = self
            .vocabulary
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        embed_with_vocabulary(text, &vocabulary, self.dimension)
    }

    /// Neural → fallback transition after an encoder failure.
    fn degrade(&self, error: &EmbeddingError) {
        let mut backend = self
            .backend
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let EmbeddingBackend::Neural(ref encoder) = *backend {
            warn!(
                "Neural encoder {} failed ({}), switching to fallback embeddings",
                encoder.name(),
                error
            );
            *backend = EmbeddingBackend::Fallback;
        }
    }
}

impl std::fmt::Debug for EmbeddingGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingGenerator")
            .field("mode", &self.mode())
            .field("dimension", &self.dimension)
            .field("vocabulary_size", &self.vocabulary_size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::utils::{cosine_similarity, l2_normalize};

    /// Hashes characters into buckets; stands in for a real model.
    struct CharHashEncoder {
        dimension: usize,
        calls: AtomicUsize,
    }

    impl TextEncoder for CharHashEncoder {
        fn name(&self) -> &str {
            "char-hash"
        }

        fn dimension(&self) -> usize {
            self.dimension
        }

        fn encode(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut v = vec![0.0; self.dimension];
            for c in text.chars() {
                v[c as usize % self.dimension] += 1.0;
            }
            Ok(l2_normalize(&v))
        }
    }

    struct FailingEncoder;

    impl TextEncoder for FailingEncoder {
        fn name(&self) -> &str {
            "failing"
        }

        fn dimension(&self) -> usize {
            8
        }

        fn encode(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Err(EmbeddingError::InferenceError("session crashed".to_string()))
        }
    }

    fn char_hash(dimension: usize) -> Arc<CharHashEncoder> {
        Arc::new(CharHashEncoder {
            dimension,
            calls: AtomicUsize::new(0),
        })
    }

    #[test]
    fn test_missing_model_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let config = EmbeddingConfig {
            model_path: Some(dir.path().join("model.onnx")),
            dimension: 64,
            ..Default::default()
        };
        let generator = EmbeddingGenerator::from_config(&config);
        assert_eq!(generator.mode(), EmbeddingMode::Fallback);
        assert_eq!(generator.dimension(), 64);
        assert!(!generator.is_vocabulary_built());
    }

    #[test]
    fn test_fallback_before_vocabulary_is_zero_vector() {
        let generator = EmbeddingGenerator::fallback(32);
        let v = generator.embed("nothing is known yet");
        assert_eq!(v.len(), 32);
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_self_similarity_fallback() {
        let generator = EmbeddingGenerator::fallback(128);
        generator.build_vocabulary(&["water filtration keeps drinking water safe"]);
        let a = generator.embed("safe drinking water");
        let b = generator.embed("safe drinking water");
        assert_eq!(a, b);
        let sim = cosine_similarity(&a, &b).unwrap();
        assert!((sim - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_self_similarity_neural() {
        let generator = EmbeddingGenerator::with_encoder(char_hash(16));
        let a = generator.embed("grounded answers");
        let sim = cosine_similarity(&a, &generator.embed("grounded answers")).unwrap();
        assert!((sim - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_build_vocabulary_noop_in_neural_mode() {
        let generator = EmbeddingGenerator::with_encoder(char_hash(16));
        assert!(generator.is_vocabulary_built());
        assert_eq!(
            generator.build_vocabulary(&["some words here"]),
            VocabularyBuild::AlreadyBuilt
        );
        assert_eq!(generator.vocabulary_size(), 0);
    }

    #[test]
    fn test_build_vocabulary_capped_at_dimension() {
        let generator = EmbeddingGenerator::fallback(3);
        let outcome = generator.build_vocabulary(&["alpha beta gamma delta epsilon"]);
        assert_eq!(outcome, VocabularyBuild::Built { added: 3, total: 3 });
        assert!(generator.is_vocabulary_built());
        generator.clear_vocabulary();
        assert!(!generator.is_vocabulary_built());
    }

    #[test]
    fn test_neural_failure_switches_to_fallback() {
        let generator = EmbeddingGenerator::with_encoder(Arc::new(FailingEncoder))
            .with_vocabulary({
                let mut vocab = VocabularyState::new();
                vocab.extend(&["session recovery works"], 8);
                vocab
            });
        assert_eq!(generator.mode(), EmbeddingMode::Neural);

        let v = generator.embed("session recovery");
        assert_eq!(generator.mode(), EmbeddingMode::Fallback);
        assert_eq!(v.len(), 8);
        let magnitude: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_wrong_dimension_from_encoder_degrades() {
        struct ShortEncoder;
        impl TextEncoder for ShortEncoder {
            fn name(&self) -> &str {
                "short"
            }
            fn dimension(&self) -> usize {
                4
            }
            fn encode(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
                Ok(vec![1.0, 0.0])
            }
        }

        let generator = EmbeddingGenerator::with_encoder(Arc::new(ShortEncoder));
        assert_eq!(generator.embed("text").len(), 4);
        assert_eq!(generator.mode(), EmbeddingMode::Fallback);
    }

    #[test]
    fn test_embed_all_preserves_order() {
        let encoder = char_hash(16);
        let generator = EmbeddingGenerator::with_encoder(encoder.clone());
        let texts = ["first", "second", "third"];
        let all = generator.embed_all(&texts);
        assert_eq!(all.len(), 3);
        for (text, embedding) in texts.iter().zip(&all) {
            assert_eq!(embedding, &generator.embed(text));
        }
        assert_eq!(encoder.calls.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn test_query_instruction_only_in_neural_mode() {
        let generator = EmbeddingGenerator::with_encoder(char_hash(32))
            .with_query_instruction(Some("query: ".to_string()));
        assert_eq!(generator.embed_query("hello"), generator.embed("query: hello"));

        let fallback = EmbeddingGenerator::fallback(32)
            .with_query_instruction(Some("query: ".to_string()));
        fallback.build_vocabulary(&["hello query"]);
        assert_eq!(fallback.embed_query("hello"), fallback.embed("hello"));
    }
}
