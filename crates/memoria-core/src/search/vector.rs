//! Brute-force cosine-similarity search over stored embeddings.
//!
//! No ANN index: the expected corpus for an agent memory store does not
//! warrant HNSW/IVF infrastructure, and a linear scan keeps the ranking
//! pipeline's pure-math portion trivially auditable.

use std::collections::HashSet;

use crate::embeddings::cosine_similarity;
use crate::memory::MemoryType;

#[derive(Debug, Clone)]
pub struct EmbeddingRow<'a> {
    pub memory_id: &'a str,
    pub memory_type: MemoryType,
    pub vector: &'a [f32],
}

#[derive(Debug, Clone)]
pub struct VectorCandidate {
    pub memory_id: String,
    pub similarity: f32,
}

pub struct VectorSearcher {
    pub min_similarity: f32,
}

impl Default for VectorSearcher {
    fn default() -> Self {
        Self {
            min_similarity: 0.5,
        }
    }
}

impl VectorSearcher {
    pub fn new(min_similarity: f32) -> Self {
        Self { min_similarity }
    }

    /// Filters by type set (if any) before scoring to bound work, then
    /// returns the top-k candidates at or above the similarity floor,
    /// sorted descending by similarity.
    pub fn search(
        &self,
        query_vector: &[f32],
        candidates: &[EmbeddingRow<'_>],
        type_filter: Option<&HashSet<MemoryType>>,
        top_k: usize,
    ) -> Vec<VectorCandidate> {
        let mut scored: Vec<VectorCandidate> = candidates
            .iter()
            .filter(|row| {
                type_filter
                    .map(|types| types.contains(&row.memory_type))
                    .unwrap_or(true)
            })
            .map(|row| VectorCandidate {
                memory_id: row.memory_id.to_string(),
                similarity: cosine_similarity(query_vector, row.vector),
            })
            .filter(|c| c.similarity >= self.min_similarity)
            .collect();

        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);
        scored
    }
}
