//! Indexing and retrieval over the chunk store.

use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tracing::{debug, error, info, warn};

use crate::error::{IndexError, SearchError, StoreError};
use crate::models::{
    ChunkSearchResult, DocumentChunkRecord, IndexedDocumentSummary, IndexingState, ParsedDocument,
};
use crate::services::chunk_store::ChunkStore;
use crate::services::chunker::TextChunker;
use crate::services::embedding::{EmbeddingGenerator, EmbeddingMode};
use crate::utils::cosine_similarity;

/// Separator placed between context blocks.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// When the fallback vocabulary gets seeded during indexing.
///
/// `FirstDocument` builds it from the chunks of the first document indexed
/// while it is empty, which biases later documents toward that vocabulary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VocabularyBootstrap {
    #[default]
    FirstDocument,
    /// Leave vocabulary management to the caller.
    Manual,
}

#[derive(Clone)]
pub struct VectorStore {
    embedder: Arc<EmbeddingGenerator>,
    store: Arc<dyn ChunkStore>,
    state: Arc<watch::Sender<IndexingState>>,
    index_lock: Arc<Mutex<()>>,
    bootstrap: VocabularyBootstrap,
    #[cfg(test)]
    history: Arc<std::sync::Mutex<Vec<IndexingState>>>,
}

impl VectorStore {
    pub fn new(embedder: Arc<EmbeddingGenerator>, store: Arc<dyn ChunkStore>) -> Self {
        let (state, _) = watch::channel(IndexingState::Idle);
        Self {
            embedder,
            store,
            state: Arc::new(state),
            index_lock: Arc::new(Mutex::new(())),
            bootstrap: VocabularyBootstrap::default(),
            #[cfg(test)]
            history: Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    pub fn with_bootstrap(mut self, bootstrap: VocabularyBootstrap) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    /// Load a previously persisted fallback vocabulary into an embedder that
    /// has none. Returns whether a vocabulary was restored.
    pub fn restore_vocabulary(&self) -> Result<bool, StoreError> {
        if self.embedder.is_vocabulary_built() {
            return Ok(false);
        }
        let vocabulary = self.store.load_vocabulary()?;
        if vocabulary.is_empty() {
            return Ok(false);
        }
        debug!("Restored vocabulary of {} terms", vocabulary.len());
        self.embedder.set_vocabulary(vocabulary);
        Ok(true)
    }

    pub fn embedder(&self) -> &EmbeddingGenerator {
        &self.embedder
    }

    pub fn indexing_state(&self) -> IndexingState {
        self.state.borrow().clone()
    }

    /// Receiver for indexing state transitions.
    pub fn subscribe(&self) -> watch::Receiver<IndexingState> {
        self.state.subscribe()
    }

    /// Chunk, embed and store a document. Returns the number of chunks stored.
    ///
    /// Calls are serialised; the work runs on the blocking pool and holds the
    /// index lock until it finishes, even if the returned future is dropped.
    pub async fn index_document(
        &self,
        document: ParsedDocument,
        chunk_size: usize,
        overlap: usize,
    ) -> Result<usize, IndexError> {
        let guard = self.index_lock.clone().lock_owned().await;

        let this = self.clone();
        tokio::task::spawn_blocking(move || {
            let _guard = guard;
            let result = this.index_blocking(&document, chunk_size, overlap);
            this.publish_outcome(&result);
            result
        })
        .await
        .unwrap_or_else(|e| {
            let result = Err(IndexError::Task(e.to_string()));
            self.publish_outcome(&result);
            result
        })
    }

    fn publish_outcome(&self, result: &Result<usize, IndexError>) {
        match result {
            Ok(count) => self.publish(IndexingState::Complete {
                chunks_indexed: *count,
            }),
            Err(e) => {
                error!("Indexing failed: {}", e);
                self.publish(IndexingState::Error {
                    message: e.to_string(),
                });
            }
        }
    }

    fn publish(&self, state: IndexingState) {
        #[cfg(test)]
        self.history
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(state.clone());
        self.state.send_replace(state);
    }

    fn index_blocking(
        &self,
        document: &ParsedDocument,
        chunk_size: usize,
        overlap: usize,
    ) -> Result<usize, IndexError> {
        let document_id = DocumentChunkRecord::generate_document_id();
        self.publish(IndexingState::progress(0, 0));

        let chunks = TextChunker::new(chunk_size, overlap)?.chunk(&document.content);
        let total = chunks.len();
        info!(
            "Indexing {} as {} ({} chunks)",
            document.file_name, document_id, total
        );
        self.publish(IndexingState::progress(0, total));
        if chunks.is_empty() {
            warn!("Document {} has no content to index", document.file_name);
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let starting_mode = self.embedder.mode();
        self.bootstrap_vocabulary(&texts)?;

        let indexed_at = chrono::Utc::now().timestamp_millis();
        let mut records = Vec::with_capacity(total);
        for (i, chunk) in chunks.into_iter().enumerate() {
            let embedding = self.embedder.embed(&chunk.content);
            records.push(
                DocumentChunkRecord::from_chunk(
                    &document_id,
                    &document.file_name,
                    i as u32,
                    chunk,
                    embedding,
                )
                .with_timestamp(indexed_at),
            );
            self.publish(IndexingState::progress(i + 1, total));
        }

        // An encoder failure mid-document left earlier chunks in the neural
        // space; re-embed all of them in the fallback space.
        if starting_mode == EmbeddingMode::Neural
            && self.embedder.mode() == EmbeddingMode::Fallback
        {
            warn!(
                "Re-embedding {} chunks of {} with fallback embeddings",
                total, document.file_name
            );
            self.bootstrap_vocabulary(&texts)?;
            for record in &mut records {
                record.embedding = self.embedder.embed(&record.content);
            }
        }

        self.store.insert_many(&records)?;
        info!("Indexed {} chunks of {}", total, document.file_name);
        Ok(total)
    }

    /// Seed and persist the fallback vocabulary from `texts` when the
    /// bootstrap policy calls for it.
    fn bootstrap_vocabulary(&self, texts: &[String]) -> Result<(), StoreError> {
        if self.bootstrap == VocabularyBootstrap::FirstDocument
            && self.embedder.mode() == EmbeddingMode::Fallback
            && !self.embedder.is_vocabulary_built()
        {
            self.embedder.build_vocabulary(texts);
            self.store
                .save_vocabulary(&self.embedder.vocabulary_snapshot())?;
        }
        Ok(())
    }

    /// Top `top_k` chunks across all documents with similarity at least
    /// `threshold`. Failures are logged and yield no results.
    pub async fn search(&self, query: &str, top_k: usize, threshold: f32) -> Vec<ChunkSearchResult> {
        self.try_search(query, top_k, threshold)
            .await
            .unwrap_or_else(|e| {
                warn!("Search failed: {}", e);
                Vec::new()
            })
    }

    pub async fn try_search(
        &self,
        query: &str,
        top_k: usize,
        threshold: f32,
    ) -> Result<Vec<ChunkSearchResult>, SearchError> {
        let this = self.clone();
        let query = query.to_string();
        tokio::task::spawn_blocking(move || {
            let chunks = this.store.all()?;
            Ok::<_, SearchError>(this.rank(&query, chunks, top_k, Some(threshold)))
        })
        .await
        .map_err(|e| SearchError::Task(e.to_string()))?
    }

    /// Best `top_k` chunks of one document, without a similarity threshold.
    pub async fn search_in_document(
        &self,
        document_id: &str,
        query: &str,
        top_k: usize,
    ) -> Vec<ChunkSearchResult> {
        self.try_search_in_document(document_id, query, top_k)
            .await
            .unwrap_or_else(|e| {
                warn!("Search in document {} failed: {}", document_id, e);
                Vec::new()
            })
    }

    pub async fn try_search_in_document(
        &self,
        document_id: &str,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<ChunkSearchResult>, SearchError> {
        let this = self.clone();
        let document_id = document_id.to_string();
        let query = query.to_string();
        tokio::task::spawn_blocking(move || {
            let chunks = this.store.by_document(&document_id)?;
            Ok::<_, SearchError>(this.rank(&query, chunks, top_k, None))
        })
        .await
        .map_err(|e| SearchError::Task(e.to_string()))?
    }

    fn rank(
        &self,
        query: &str,
        chunks: Vec<DocumentChunkRecord>,
        top_k: usize,
        threshold: Option<f32>,
    ) -> Vec<ChunkSearchResult> {
        if chunks.is_empty() {
            debug!("No indexed chunks to search");
            return Vec::new();
        }

        let query_embedding = self.embedder.embed_query(query);
        let mut results: Vec<ChunkSearchResult> = chunks
            .into_iter()
            .filter_map(|chunk| match cosine_similarity(&query_embedding, &chunk.embedding) {
                Ok(similarity) => Some(ChunkSearchResult { chunk, similarity }),
                Err(e) => {
                    warn!("Skipping chunk {}: {}", chunk.id, e);
                    None
                }
            })
            .filter(|r| threshold.is_none_or(|t| r.similarity >= t))
            .collect();

        results.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        results.truncate(top_k);
        results
    }

    pub fn list_indexed_documents(&self) -> Result<Vec<IndexedDocumentSummary>, StoreError> {
        self.store.list_documents()
    }

    pub fn chunk_count(&self) -> Result<u64, StoreError> {
        self.store.count()
    }

    /// Irreversibly remove one document's chunks.
    pub fn delete_document(&self, document_id: &str) -> Result<usize, StoreError> {
        let deleted = self.store.delete_by_document(document_id)?;
        info!("Deleted document {} ({} chunks)", document_id, deleted);
        Ok(deleted)
    }

    /// Remove every chunk, forget the fallback vocabulary and reset the
    /// indexing state.
    pub async fn clear_all(&self) -> Result<usize, StoreError> {
        let _guard = self.index_lock.lock().await;
        let deleted = self.store.delete_all()?;
        self.embedder.clear_vocabulary();
        self.publish(IndexingState::Idle);
        info!("Cleared {} chunks", deleted);
        Ok(deleted)
    }
}

/// Provenance header and content of one result.
pub fn render_context_block(result: &ChunkSearchResult) -> String {
    format!(
        "[Source: {} | Chunk {} | Relevance: {:.0}%]\n{}",
        result.chunk.document_name,
        result.chunk.chunk_index + 1,
        result.similarity * 100.0,
        result.chunk.content
    )
}

/// Pack rendered results, in order, into at most `max_length` characters.
///
/// Whole blocks are appended while they fit; packing stops at the first
/// block that does not. A first block that alone exceeds the budget is
/// truncated to `max_length` instead of dropped.
pub fn build_context(results: &[ChunkSearchResult], max_length: usize) -> String {
    let separator_len = CONTEXT_SEPARATOR.chars().count();
    let mut context = String::new();
    let mut length = 0;

    for result in results {
        let block = render_context_block(result);
        let block_len = block.chars().count();

        if context.is_empty() {
            if block_len > max_length {
                context = block.chars().take(max_length).collect();
                break;
            }
            context.push_str(&block);
            length = block_len;
            continue;
        }

        if length + separator_len + block_len > max_length {
            break;
        }
        context.push_str(CONTEXT_SEPARATOR);
        context.push_str(&block);
        length += separator_len + block_len;
    }

    context
}
