use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::search::OutputFormat;
use crate::error::ConfigError;

pub const APP_DIR_NAME: &str = "pocketrag";
pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 384;
pub const DEFAULT_MAX_SEQUENCE_LENGTH: u32 = 512;
pub const DEFAULT_DATABASE_FILE: &str = "chunks.db";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub indexing: IndexingConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(APP_DIR_NAME).join("config.toml"))
    }

    pub fn data_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|p| p.join(APP_DIR_NAME))
    }

    pub fn models_dir() -> Option<PathBuf> {
        Self::data_dir().map(|p| p.join("models"))
    }

    pub fn load() -> Result<Self, ConfigError> {
        if let Some(path) = Self::config_path()
            && path.exists()
        {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            config.validate()?;
            return Ok(config);
        }
        Ok(Self::default())
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::config_path().ok_or_else(|| {
            ConfigError::PathError("could not determine config directory".to_string())
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.indexing.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "indexing.chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.indexing.chunk_overlap >= self.indexing.chunk_size {
            return Err(ConfigError::ValidationError(format!(
                "indexing.chunk_overlap ({}) must be smaller than indexing.chunk_size ({})",
                self.indexing.chunk_overlap, self.indexing.chunk_size
            )));
        }
        if self.embedding.dimension == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.dimension must be greater than zero".to_string(),
            ));
        }
        if self.embedding.max_sequence_length == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.max_sequence_length must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Database location, falling back to the platform data directory.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(ref path) = self.storage.database_path {
            return Ok(path.clone());
        }
        Self::data_dir()
            .map(|dir| dir.join(DEFAULT_DATABASE_FILE))
            .ok_or_else(|| ConfigError::PathError("could not determine data directory".to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// ONNX model file. Defaults to `<models_dir>/model.onnx`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_path: Option<PathBuf>,

    /// HuggingFace `tokenizer.json`. Defaults to a sibling of the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokenizer_path: Option<PathBuf>,

    #[serde(default = "default_dimension")]
    pub dimension: u32,

    #[serde(default = "default_max_sequence_length")]
    pub max_sequence_length: u32,

    /// Prefix prepended to queries when the neural encoder is active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_instruction: Option<String>,
}

fn default_dimension() -> u32 {
    DEFAULT_EMBEDDING_DIMENSION
}

fn default_max_sequence_length() -> u32 {
    DEFAULT_MAX_SEQUENCE_LENGTH
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            tokenizer_path: None,
            dimension: default_dimension(),
            max_sequence_length: default_max_sequence_length(),
            query_instruction: None,
        }
    }
}

impl EmbeddingConfig {
    pub fn resolved_model_path(&self) -> Option<PathBuf> {
        self.model_path
            .clone()
            .or_else(|| Config::models_dir().map(|dir| dir.join("model.onnx")))
    }

    pub fn resolved_tokenizer_path(&self) -> Option<PathBuf> {
        if let Some(ref path) = self.tokenizer_path {
            return Some(path.clone());
        }
        self.resolved_model_path()
            .and_then(|model| model.parent().map(|dir| dir.join("tokenizer.json")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Chunk window in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,

    /// Characters shared between adjacent chunks.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: u32,
}

fn default_chunk_size() -> u32 {
    500
}

fn default_chunk_overlap() -> u32 {
    50
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_top_k")]
    pub top_k: u32,

    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    #[serde(default = "default_max_context_length")]
    pub max_context_length: u32,

    #[serde(default)]
    pub default_format: OutputFormat,
}

fn default_top_k() -> u32 {
    3
}

fn default_similarity_threshold() -> f32 {
    0.3
}

fn default_max_context_length() -> u32 {
    2000
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            similarity_threshold: default_similarity_threshold(),
            max_context_length: default_max_context_length(),
            default_format: OutputFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.embedding.dimension, DEFAULT_EMBEDDING_DIMENSION);
        assert_eq!(config.embedding.max_sequence_length, 512);
        assert_eq!(config.indexing.chunk_size, 500);
        assert_eq!(config.indexing.chunk_overlap, 50);
        assert_eq!(config.search.top_k, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_path() {
        let path = Config::config_path();
        assert!(path.is_some());
    }

    #[test]
    fn test_validate_rejects_overlap() {
        let mut config = Config::default();
        config.indexing.chunk_overlap = config.indexing.chunk_size;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [search]
            top_k = 7

            [storage]
            database_path = "/tmp/chunks.db"
            "#,
        )
        .unwrap();
        assert_eq!(config.search.top_k, 7);
        assert_eq!(config.search.max_context_length, 2000);
        assert_eq!(config.indexing.chunk_size, 500);
        assert_eq!(
            config.database_path().unwrap(),
            PathBuf::from("/tmp/chunks.db")
        );
    }

    #[test]
    fn test_tokenizer_path_follows_model() {
        let config = EmbeddingConfig {
            model_path: Some(PathBuf::from("/models/bge/model.onnx")),
            ..Default::default()
        };
        assert_eq!(
            config.resolved_tokenizer_path(),
            Some(PathBuf::from("/models/bge/tokenizer.json"))
        );
    }
}
