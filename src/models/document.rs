use serde::{Deserialize, Serialize};

/// Plain text handed over by a document parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub content: String,
    pub file_name: String,
}

impl ParsedDocument {
    pub fn new(content: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            file_name: file_name.into(),
        }
    }
}

/// A window of source text. Offsets count characters, not bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    pub content: String,
    pub start_char: usize,
    pub end_char: usize,
}

/// A persisted, embedded chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunkRecord {
    /// Assigned by the store on insert; zero until then.
    pub id: i64,
    pub document_id: String,
    pub document_name: String,
    pub chunk_index: u32,
    pub content: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub embedding: Vec<f32>,
    pub start_char: usize,
    pub end_char: usize,
    /// Creation time, milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl DocumentChunkRecord {
    pub fn generate_document_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    pub fn from_chunk(
        document_id: &str,
        document_name: &str,
        chunk_index: u32,
        chunk: TextChunk,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            id: 0,
            document_id: document_id.to_string(),
            document_name: document_name.to_string(),
            chunk_index,
            content: chunk.content,
            embedding,
            start_char: chunk.start_char,
            end_char: chunk.end_char,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Override the creation time, e.g. to share one across a document.
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// One entry per indexed document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedDocumentSummary {
    pub document_id: String,
    pub document_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_document_id() {
        let id = DocumentChunkRecord::generate_document_id();
        assert_eq!(id.len(), 36);
        assert_eq!(id.chars().filter(|c| *c == '-').count(), 4);
        assert_ne!(id, DocumentChunkRecord::generate_document_id());
    }

    #[test]
    fn test_from_chunk() {
        let chunk = TextChunk {
            content: "hello".to_string(),
            start_char: 10,
            end_char: 15,
        };
        let record = DocumentChunkRecord::from_chunk("doc", "notes.txt", 2, chunk, vec![1.0]);
        assert_eq!(record.id, 0);
        assert_eq!(record.document_name, "notes.txt");
        assert_eq!(record.chunk_index, 2);
        assert_eq!(record.start_char, 10);
        assert_eq!(record.end_char, 15);
        assert!(record.timestamp > 0);
        assert_eq!(record.with_timestamp(42).timestamp, 42);
    }
}
