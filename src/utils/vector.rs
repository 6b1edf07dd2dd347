//! Vector math and the textual embedding encoding used by the chunk store.

use crate::error::EmbeddingError;

/// Scale to unit length. A zero vector is returned unchanged.
pub fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}

/// Dot product of two unit vectors, clamped to [-1, 1].
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, EmbeddingError> {
    if a.len() != b.len() {
        return Err(EmbeddingError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    Ok(dot.clamp(-1.0, 1.0))
}

/// Comma-separated decimal rendering. `f32`'s `Display` is shortest
/// round-trip, so parsing the result yields the same bits.
pub fn format_embedding(v: &[f32]) -> String {
    v.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

pub fn parse_embedding(s: &str) -> Result<Vec<f32>, String> {
    if s.trim().is_empty() {
        return Ok(Vec::new());
    }
    s.split(',')
        .map(|part| {
            part.trim()
                .parse::<f32>()
                .map_err(|e| format!("invalid embedding component {part:?}: {e}"))
        })
        .collect()
}
