mod config;
mod document;
mod search;
mod state;

pub use config::{
    APP_DIR_NAME, Config, DEFAULT_DATABASE_FILE, DEFAULT_EMBEDDING_DIMENSION,
    DEFAULT_MAX_SEQUENCE_LENGTH, EmbeddingConfig, IndexingConfig, SearchConfig, StorageConfig,
};
pub use document::{DocumentChunkRecord, IndexedDocumentSummary, ParsedDocument, TextChunk};
pub use search::{ChunkSearchResult, OutputFormat, SearchResults};
pub use state::IndexingState;
