mod chunk_store;
mod chunker;
mod embedding;
mod parser;
mod vector_store;

pub use chunk_store::{ChunkStore, SqliteChunkStore};
pub use chunker::{TextChunker, chunk_text};
pub use embedding::{
    EmbeddingGenerator, EmbeddingMode, OnnxEncoder, TextEncoder, VocabularyBuild,
    VocabularyState, embed_with_vocabulary,
};
pub use parser::{DocumentParser, PlainTextParser};
pub use vector_store::{
    CONTEXT_SEPARATOR, VectorStore, VocabularyBootstrap, build_context, render_context_block,
};
