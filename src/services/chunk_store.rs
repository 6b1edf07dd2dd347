//! Durable storage for embedded chunks.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, Row, params};
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::models::{DocumentChunkRecord, IndexedDocumentSummary};
use crate::services::embedding::VocabularyState;
use crate::utils::{format_embedding, parse_embedding};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS document_chunks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    document_id TEXT NOT NULL,
    document_name TEXT NOT NULL,
    chunk_index INTEGER NOT NULL,
    content TEXT NOT NULL,
    embedding TEXT NOT NULL,
    start_char INTEGER NOT NULL,
    end_char INTEGER NOT NULL,
    timestamp INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_document_chunks_document_id ON document_chunks(document_id);
CREATE INDEX IF NOT EXISTS idx_document_chunks_timestamp ON document_chunks(timestamp);

CREATE TABLE IF NOT EXISTS vocabulary (
    term TEXT PRIMARY KEY,
    slot INTEGER NOT NULL
);
"#;

const SELECT_COLUMNS: &str = "id, document_id, document_name, chunk_index, content, embedding, \
     start_char, end_char, timestamp";

/// Repository of chunk records keyed by store-assigned id.
///
/// Writes to one document are expected to be serialised by the caller.
pub trait ChunkStore: Send + Sync {
    /// Insert all records atomically and return the assigned ids in input
    /// order. An empty slice is a no-op.
    fn insert_many(&self, records: &[DocumentChunkRecord]) -> Result<Vec<i64>, StoreError>;

    /// Chunks of one document ordered by `chunk_index`.
    fn by_document(&self, document_id: &str) -> Result<Vec<DocumentChunkRecord>, StoreError>;

    /// Every chunk, newest first.
    fn all(&self) -> Result<Vec<DocumentChunkRecord>, StoreError>;

    /// One entry per document, most recently indexed first.
    fn list_documents(&self) -> Result<Vec<IndexedDocumentSummary>, StoreError>;

    fn delete_by_document(&self, document_id: &str) -> Result<usize, StoreError>;

    /// Remove every chunk and the persisted vocabulary.
    fn delete_all(&self) -> Result<usize, StoreError>;

    fn count(&self) -> Result<u64, StoreError>;

    /// Replace the persisted fallback vocabulary.
    fn save_vocabulary(&self, vocabulary: &VocabularyState) -> Result<(), StoreError>;

    fn load_vocabulary(&self) -> Result<VocabularyState, StoreError>;
}

pub struct SqliteChunkStore {
    conn: Mutex<Connection>,
}

impl SqliteChunkStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Run `sql` and map rows, skipping rows whose embedding cannot be parsed.
    fn query_records(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<DocumentChunkRecord>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, read_row)?;

        let mut records = Vec::new();
        for row in rows {
            match row? {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping corrupted chunk record: {}", e),
            }
        }
        Ok(records)
    }
}

/// Decode one row. The inner error marks a corrupt record rather than a
/// failed query.
fn read_row(row: &Row<'_>) -> rusqlite::Result<Result<DocumentChunkRecord, StoreError>> {
    let id: i64 = row.get(0)?;
    let embedding: String = row.get(5)?;
    let start_char: i64 = row.get(6)?;
    let end_char: i64 = row.get(7)?;

    let embedding = match parse_embedding(&embedding) {
        Ok(embedding) => embedding,
        Err(e) => {
            return Ok(Err(StoreError::InvalidRecord(format!("chunk {id}: {e}"))));
        }
    };

    Ok(Ok(DocumentChunkRecord {
        id,
        document_id: row.get(1)?,
        document_name: row.get(2)?,
        chunk_index: row.get(3)?,
        content: row.get(4)?,
        embedding,
        start_char: start_char.max(0) as usize,
        end_char: end_char.max(0) as usize,
        timestamp: row.get(8)?,
    }))
}

impl ChunkStore for SqliteChunkStore {
    fn insert_many(&self, records: &[DocumentChunkRecord]) -> Result<Vec<i64>, StoreError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut ids = Vec::with_capacity(records.len());
        {
            let mut stmt = tx.prepare(
                "INSERT INTO document_chunks (
                    document_id, document_name, chunk_index, content, embedding,
                    start_char, end_char, timestamp
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for record in records {
                stmt.execute(params![
                    record.document_id,
                    record.document_name,
                    record.chunk_index,
                    record.content,
                    format_embedding(&record.embedding),
                    record.start_char as i64,
                    record.end_char as i64,
                    record.timestamp,
                ])?;
                ids.push(tx.last_insert_rowid());
            }
        }
        tx.commit()?;

        debug!("Inserted {} chunk records", ids.len());
        Ok(ids)
    }

    fn by_document(&self, document_id: &str) -> Result<Vec<DocumentChunkRecord>, StoreError> {
        self.query_records(
            &format!(
                "SELECT {SELECT_COLUMNS} FROM document_chunks
                 WHERE document_id = ?1 ORDER BY chunk_index ASC"
            ),
            params![document_id],
        )
    }

    fn all(&self) -> Result<Vec<DocumentChunkRecord>, StoreError> {
        self.query_records(
            &format!(
                "SELECT {SELECT_COLUMNS} FROM document_chunks
                 ORDER BY timestamp DESC, id ASC"
            ),
            [],
        )
    }

    fn list_documents(&self) -> Result<Vec<IndexedDocumentSummary>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT document_id, MAX(document_name), MAX(timestamp) AS latest, MAX(id) AS last_id
             FROM document_chunks
             GROUP BY document_id
             ORDER BY latest DESC, last_id DESC",
        )?;
        let documents = stmt
            .query_map([], |row| {
                Ok(IndexedDocumentSummary {
                    document_id: row.get(0)?,
                    document_name: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(documents)
    }

    fn delete_by_document(&self, document_id: &str) -> Result<usize, StoreError> {
        let deleted = self.conn()?.execute(
            "DELETE FROM document_chunks WHERE document_id = ?1",
            params![document_id],
        )?;
        debug!("Deleted {} chunks of document {}", deleted, document_id);
        Ok(deleted)
    }

    fn delete_all(&self) -> Result<usize, StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let deleted = tx.execute("DELETE FROM document_chunks", [])?;
        tx.execute("DELETE FROM vocabulary", [])?;
        tx.commit()?;
        debug!("Deleted all {} chunks", deleted);
        Ok(deleted)
    }

    fn count(&self) -> Result<u64, StoreError> {
        let count: i64 =
            self.conn()?
                .query_row("SELECT COUNT(*) FROM document_chunks", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn save_vocabulary(&self, vocabulary: &VocabularyState) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM vocabulary", [])?;
        {
            let mut stmt = tx.prepare("INSERT INTO vocabulary (term, slot) VALUES (?1, ?2)")?;
            for (term, slot) in vocabulary.entries() {
                stmt.execute(params![term, slot as i64])?;
            }
        }
        tx.commit()?;
        debug!("Saved vocabulary of {} terms", vocabulary.len());
        Ok(())
    }

    fn load_vocabulary(&self) -> Result<VocabularyState, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT term, slot FROM vocabulary ORDER BY slot ASC")?;
        let entries = stmt
            .query_map([], |row| {
                let slot: i64 = row.get(1)?;
                Ok((row.get::<_, String>(0)?, slot.max(0) as usize))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(VocabularyState::from_entries(entries))
    }
}
