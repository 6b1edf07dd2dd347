//! Utility modules.

pub mod text;
pub mod vector;

pub use text::{MIN_TOKEN_LENGTH, tokenize};
pub use vector::{cosine_similarity, format_embedding, l2_normalize, parse_embedding};
