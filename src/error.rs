//! Error types for the retrieval library and CLI.

use thiserror::Error;

/// Errors related to chunking parameters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkError {
    #[error("invalid chunk parameters: {0}")]
    InvalidArgument(String),
}

/// Errors related to embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },

    #[error("embedding backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("tokenizer error: {0}")]
    TokenizerError(String),

    #[error("inference error: {0}")]
    InferenceError(String),
}

/// Errors related to chunk persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("store lock poisoned")]
    LockPoisoned,
}

/// Errors related to indexing a document.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("chunking error: {0}")]
    Chunk(#[from] ChunkError),

    #[error("chunk store error: {0}")]
    Store(#[from] StoreError),

    #[error("indexing task failed: {0}")]
    Task(String),
}

/// Errors related to search operations.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("chunk store error: {0}")]
    Store(#[from] StoreError),

    #[error("search task failed: {0}")]
    Task(String),
}

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("path error: {0}")]
    PathError(String),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Errors raised while reading source documents.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("unsupported document: {0}")]
    Unsupported(String),
}
