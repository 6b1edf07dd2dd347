use serde::{Deserialize, Serialize};

/// Observable progress of the indexing pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum IndexingState {
    #[default]
    Idle,
    Indexing {
        /// Fraction of chunks embedded, in [0, 1]
        progress: f32,
        current_chunk: usize,
        total_chunks: usize,
    },
    Complete {
        chunks_indexed: usize,
    },
    Error {
        message: String,
    },
}

impl IndexingState {
    pub fn progress(current_chunk: usize, total_chunks: usize) -> Self {
        let progress = if total_chunks == 0 {
            0.0
        } else {
            current_chunk as f32 / total_chunks as f32
        };
        IndexingState::Indexing {
            progress,
            current_chunk,
            total_chunks,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            IndexingState::Complete { .. } | IndexingState::Error { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_fraction() {
        assert_eq!(
            IndexingState::progress(1, 4),
            IndexingState::Indexing {
                progress: 0.25,
                current_chunk: 1,
                total_chunks: 4,
            }
        );
        assert!(!IndexingState::progress(4, 4).is_terminal());
        assert!(matches!(
            IndexingState::progress(0, 0),
            IndexingState::Indexing { progress, .. } if progress == 0.0
        ));
        assert!(IndexingState::Complete { chunks_indexed: 4 }.is_terminal());
        assert_eq!(IndexingState::default(), IndexingState::Idle);
    }

    #[test]
    fn test_serializes_with_tag() {
        let json = serde_json::to_string(&IndexingState::Complete { chunks_indexed: 3 }).unwrap();
        assert_eq!(json, r#"{"state":"complete","chunks_indexed":3}"#);
    }
}
