//! Deterministic term-frequency embeddings over an explicit vocabulary.

use std::collections::HashMap;

use crate::utils::{l2_normalize, tokenize};

/// Term → vector slot mapping used by the fallback embedder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VocabularyState {
    terms: HashMap<String, usize>,
}

impl VocabularyState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_built(&self) -> bool {
        !self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn index_of(&self, term: &str) -> Option<usize> {
        self.terms.get(term).copied()
    }

    pub fn clear(&mut self) {
        self.terms.clear();
    }

    /// Restore a vocabulary from `(term, slot)` pairs.
    pub fn from_entries<I: IntoIterator<Item = (String, usize)>>(entries: I) -> Self {
        Self {
            terms: entries.into_iter().collect(),
        }
    }

    /// `(term, slot)` pairs ordered by slot.
    pub fn entries(&self) -> Vec<(String, usize)> {
        let mut entries: Vec<(String, usize)> = self
            .terms
            .iter()
            .map(|(term, slot)| (term.clone(), *slot))
            .collect();
        entries.sort_by_key(|(_, slot)| *slot);
        entries
    }

    /// Rank terms across `documents` by frequency (ties alphabetical) and
    /// assign slots to unseen ones until `capacity` terms are known.
    /// Existing slots never move. Returns the number of terms added.
    pub fn extend<S: AsRef<str>>(&mut self, documents: &[S], capacity: usize) -> usize {
        let mut frequencies: HashMap<String, usize> = HashMap::new();
        for document in documents {
            for token in tokenize(document.as_ref()) {
                *frequencies.entry(token).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<(String, usize)> = frequencies
            .into_iter()
            .filter(|(term, _)| !self.terms.contains_key(term))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let room = capacity.saturating_sub(self.terms.len());
        let mut added = 0;
        for (term, _) in ranked.into_iter().take(room) {
            let slot = self.terms.len();
            self.terms.insert(term, slot);
            added += 1;
        }
        added
    }
}

/// Term frequency (relative to the most frequent term in `text`) scattered
/// into a `dimension`-length vector, then L2-normalised. Unknown terms are
/// ignored, so an empty vocabulary yields the zero vector.
pub fn embed_with_vocabulary(text: &str, vocabulary: &VocabularyState, dimension: usize) -> Vec<f32> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for token in tokenize(text) {
        *counts.entry(token).or_insert(0) += 1;
    }

    let mut vector = vec![0.0f32; dimension];
    let Some(max_count) = counts.values().copied().max() else {
        return vector;
    };

    for (term, count) in &counts {
        if let Some(slot) = vocabulary.index_of(term)
            && slot < dimension
        {
            vector[slot] = *count as f32 / max_count as f32;
        }
    }

    l2_normalize(&vector)
}
