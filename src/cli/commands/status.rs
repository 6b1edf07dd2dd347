use anyhow::Result;

use crate::cli::output::{StatusInfo, get_formatter};
use crate::models::{Config, OutputFormat};
use crate::services::EmbeddingMode;

pub async fn handle_status(format: OutputFormat, _verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);

    let (vector_store, database_path) = super::open_vector_store(&config)?;
    let embedder = vector_store.embedder();

    let status = StatusInfo {
        embedding_mode: embedder.mode().to_string(),
        embedding_model: embedder.backend_name(),
        dimension: embedder.dimension(),
        vocabulary_size: embedder.vocabulary_size(),
        database_path: database_path.display().to_string(),
        documents: vector_store.list_indexed_documents()?.len() as u64,
        chunks: vector_store.chunk_count()?,
    };

    print!("{}", formatter.format_status(&status));

    if embedder.mode() == EmbeddingMode::Fallback {
        eprintln!();
        eprintln!("Hint: neural model not loaded, using term-frequency embeddings.");
        if let Some(model_path) = config.embedding.resolved_model_path() {
            eprintln!(
                "      Place model.onnx and tokenizer.json in {}",
                model_path
                    .parent()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default()
            );
        }
    }

    Ok(())
}
