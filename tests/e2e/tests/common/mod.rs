//! Minimal in-process remember/recall pipeline, wired the same way
//! `memoria-mcp`'s tool handlers are, so these tests exercise the engine
//! end-to-end without a transport in front of it.

use std::collections::HashSet;

use chrono::Utc;
use memoria_core::ranking::{normalize_sub_weights, CandidateMeta};
use memoria_core::search::{to_fts_match, EmbeddingRow, ScoredText, TextSearcher, VectorSearcher};
use memoria_core::{
    CoreResult, EmbeddingProvider, HybridRanker, Memory, MemoryType, PrivacyScope, Store,
};

pub struct Engine {
    pub store: Store,
    pub ranker: HybridRanker,
    pub provider: Box<dyn EmbeddingProvider>,
}

impl Engine {
    pub fn new_in_memory() -> Self {
        Self {
            store: Store::open_in_memory().expect("open in-memory store"),
            ranker: HybridRanker::default(),
            provider: memoria_core::build_provider(memoria_core::ProviderKind::Lexical, None, None, None),
        }
    }

    pub fn remember(
        &self,
        content: &str,
        memory_type: MemoryType,
        importance: f64,
        tags: &[String],
    ) -> CoreResult<Memory> {
        let memory = self.store.insert_memory(
            memory_type,
            content,
            importance,
            PrivacyScope::Private,
            tags,
            None,
        )?;
        if self.provider.available() {
            if let Ok((vector, model_tag, _usage)) = self.provider.embed(content) {
                self.store.upsert_embedding(&memory.id, &vector, &model_tag)?;
            }
        }
        Ok(memory)
    }

    pub fn recall(
        &self,
        query: &str,
        id_filter: Option<&[String]>,
        type_filter: Option<&[MemoryType]>,
        enable_hybrid: bool,
        limit: usize,
    ) -> CoreResult<Vec<(String, f64)>> {
        let mut candidates = self.store.list_live_memories()?;
        if let Some(ids) = id_filter {
            let wanted: HashSet<&String> = ids.iter().collect();
            candidates.retain(|m| wanted.contains(&m.id));
        }
        if let Some(types) = type_filter {
            let wanted: HashSet<MemoryType> = types.iter().copied().collect();
            candidates.retain(|m| wanted.contains(&m.memory_type));
        }

        let allowed_ids: HashSet<String> = candidates.iter().map(|m| m.id.clone()).collect();
        let by_id: std::collections::HashMap<String, Memory> =
            candidates.into_iter().map(|m| (m.id.clone(), m)).collect();

        let (vector_weight, text_weight) = normalize_sub_weights(None, None);
        let vector_enabled = enable_hybrid && self.provider.available();

        let normalized = memoria_core::search::normalize_query(query);
        let fts_match = to_fts_match(&normalized);
        let text_scored = match &fts_match {
            Some(m) => {
                let raw = self.store.text_search_candidates(m, limit.max(20))?;
                let filtered: Vec<_> = raw.into_iter().filter(|c| allowed_ids.contains(&c.memory_id)).collect();
                TextSearcher.score(&normalized, &[], &filtered, vector_enabled)
            }
            // Blank or stopword-only query: fall back to a match-all over
            // the already-filtered live set, ranked by recency.
            None => match_all_by_recency(&by_id),
        };

        let vector_scored = if vector_enabled {
            match self.provider.embed(query) {
                Ok((query_vector, _tag, _usage)) => {
                    let all_embeddings = self.store.all_embeddings()?;
                    let rows: Vec<EmbeddingRow<'_>> = all_embeddings
                        .iter()
                        .filter(|(id, _)| allowed_ids.contains(id))
                        .filter_map(|(id, vector)| {
                            by_id.get(id).map(|m| EmbeddingRow { memory_id: id.as_str(), memory_type: m.memory_type, vector })
                        })
                        .collect();
                    VectorSearcher::default().search(&query_vector, &rows, None, limit.max(20))
                }
                Err(_) => Vec::new(),
            }
        } else {
            Vec::new()
        };

        let now = Utc::now();
        let meta: Vec<CandidateMeta> = by_id
            .values()
            .map(|m| CandidateMeta {
                memory_id: m.id.clone(),
                memory_type: m.memory_type,
                importance: m.importance,
                pinned: m.pinned,
                created_at: m.created_at,
                age_days: (now - m.created_at).num_seconds() as f64 / 86_400.0,
                view_count: m.view_count,
                cite_count: m.cite_count,
                edit_count: m.edit_count,
                tags: m.tags.clone(),
            })
            .collect();

        let ranked = self.ranker.rank(&text_scored, &vector_scored, &meta, vector_weight, text_weight, limit);
        Ok(ranked.into_iter().map(|r| (r.memory_id, r.score)).collect())
    }
}

fn match_all_by_recency(by_id: &std::collections::HashMap<String, Memory>) -> Vec<ScoredText> {
    let mut ordered: Vec<&Memory> = by_id.values().collect();
    ordered.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let len = ordered.len().max(1) as f64;
    ordered
        .into_iter()
        .enumerate()
        .map(|(i, m)| ScoredText {
            memory_id: m.id.clone(),
            relevance: 1.0 - (i as f64 / len) * 0.5,
            recall_reason: "match-all: recency".to_string(),
        })
        .collect()
}
