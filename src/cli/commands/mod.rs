mod config;
mod documents;
mod index;
mod search;
mod status;

pub use config::ConfigCommand;
pub use documents::DeleteArgs;
pub use index::IndexArgs;
pub use search::{ContextArgs, SearchArgs};

pub use config::handle_config;
pub use documents::{handle_clear, handle_delete, handle_list};
pub use index::handle_index;
pub use search::{handle_context, handle_search};
pub use status::handle_status;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::models::Config;
use crate::services::{EmbeddingGenerator, SqliteChunkStore, VectorStore};

/// Open the chunk store and embedding backend described by `config`.
pub(crate) fn open_vector_store(config: &Config) -> Result<(VectorStore, PathBuf)> {
    let database_path = config.database_path()?;
    let store = SqliteChunkStore::open(&database_path).with_context(|| {
        format!("failed to open chunk store at {}", database_path.display())
    })?;
    let embedder = EmbeddingGenerator::from_config(&config.embedding);
    let vector_store = VectorStore::new(Arc::new(embedder), Arc::new(store));
    vector_store
        .restore_vocabulary()
        .context("failed to restore fallback vocabulary")?;
    Ok((vector_store, database_path))
}
