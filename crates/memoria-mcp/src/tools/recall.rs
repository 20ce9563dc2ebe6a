//! `recall` tool — hybrid lexical+vector search through the five-signal
//! ranker, backed by the per-process query cache.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use memoria_core::memory::MAX_QUERY_LEN;
use memoria_core::ranking::{normalize_sub_weights, CandidateMeta};
use memoria_core::search::{to_fts_match, EmbeddingRow, ScoredText, TextSearcher, VectorSearcher};
use memoria_core::{CoreError, CoreResult, Memory, MemoryType, RecallInput};
use serde_json::Value;

use crate::context::AppContext;

pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "query": { "type": "string", "maxLength": MAX_QUERY_LEN },
            "filters": {
                "type": "object",
                "properties": {
                    "id": { "type": "array", "items": { "type": "string" } },
                    "type": { "type": "array", "items": { "type": "string" } },
                    "tags": { "type": "array", "items": { "type": "string" } },
                    "privacyScope": { "type": "array", "items": { "type": "string" } },
                    "timeFrom": { "type": "string", "format": "date-time" },
                    "timeTo": { "type": "string", "format": "date-time" },
                    "pinned": { "type": "boolean" }
                }
            },
            "limit": { "type": "integer", "minimum": 1 },
            "vectorWeight": { "type": "number" },
            "textWeight": { "type": "number" },
            "enableHybrid": { "type": "boolean", "default": true },
            "includeMetadata": { "type": "boolean", "default": false }
        },
        "required": ["query"]
    })
}

fn looks_like_script_injection(query: &str) -> bool {
    let lowered = query.to_lowercase();
    lowered.contains("<script") || lowered.contains("javascript:")
}

pub async fn execute(ctx: &Arc<AppContext>, args: Option<Value>) -> CoreResult<Value> {
    let args = args.ok_or_else(|| CoreError::invalid("missing arguments"))?;
    let input: RecallInput =
        serde_json::from_value(args).map_err(|e| CoreError::invalid(format!("invalid arguments: {e}")))?;

    if input.query.chars().count() > MAX_QUERY_LEN {
        return Err(CoreError::invalid(format!(
            "query exceeds {MAX_QUERY_LEN} characters"
        )));
    }
    if looks_like_script_injection(&input.query) {
        return Err(CoreError::invalid("query contains disallowed content"));
    }

    let limit = input
        .limit
        .unwrap_or(ctx.config.search_default_limit as i64)
        .clamp(1, ctx.config.search_max_limit as i64) as usize;

    let started = Instant::now();
    let normalized = memoria_core::search::normalize_query(&input.query);

    let fingerprint = memoria_core::QueryFingerprint::new(&normalized, &input.filters, limit);
    if let Some(cached) = ctx.query_cache.get(&fingerprint) {
        return Ok(cached);
    }

    let type_filter: Option<HashSet<MemoryType>> = input.filters.r#type.as_ref().map(|types| {
        types
            .iter()
            .filter_map(|t| MemoryType::parse_name(t))
            .collect()
    });

    let mut candidates = ctx.store.list_live_memories()?;
    apply_filters(&mut candidates, &input);

    let allowed_ids: HashSet<String> = candidates.iter().map(|m| m.id.clone()).collect();
    let by_id: std::collections::HashMap<String, Memory> =
        candidates.into_iter().map(|m| (m.id.clone(), m)).collect();

    let (vector_weight, text_weight) =
        normalize_sub_weights(input.vector_weight, input.text_weight);

    let vector_enabled = input.enable_hybrid && ctx.embedding_provider.available();

    let fts_match = to_fts_match(&normalized);
    let text_scored = match &fts_match {
        Some(m) => {
            let raw = ctx.store.text_search_candidates(m, ctx.config.search_max_limit * 4)?;
            let filtered: Vec<_> = raw.into_iter().filter(|c| allowed_ids.contains(&c.memory_id)).collect();
            TextSearcher.score(&normalized, input.filters.tags.as_deref().unwrap_or(&[]), &filtered, vector_enabled)
        }
        // Blank or stopword-only query: no FTS tokens to match on, so fall
        // back to a match-all over the already-filtered live set, ranked
        // by recency instead of relevance.
        None => match_all_by_recency(&by_id),
    };

    let vector_scored = if vector_enabled {
        match ctx.embedding_provider.embed(&input.query) {
            Ok((query_vector, _tag, _usage)) => {
                let all_embeddings = ctx.store.all_embeddings()?;
                let rows: Vec<EmbeddingRow<'_>> = all_embeddings
                    .iter()
                    .filter(|(id, _)| allowed_ids.contains(id))
                    .filter_map(|(id, vector)| {
                        by_id.get(id).map(|m| EmbeddingRow {
                            memory_id: id.as_str(),
                            memory_type: m.memory_type,
                            vector,
                        })
                    })
                    .collect();
                VectorSearcher::default().search(&query_vector, &rows, type_filter.as_ref(), ctx.config.search_max_limit * 4)
            }
            Err(_) => Vec::new(),
        }
    } else {
        Vec::new()
    };

    let search_type = if fts_match.is_some() && !vector_scored.is_empty() {
        "hybrid"
    } else if !vector_scored.is_empty() {
        "vector"
    } else {
        "text"
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

    let ranked = ctx
        .ranker
        .rank(&text_scored, &vector_scored, &meta, vector_weight, text_weight, limit);

    let mut items = Vec::with_capacity(ranked.len());
    for r in &ranked {
        ctx.store.touch_last_accessed(&r.memory_id)?;
        if let Some(m) = by_id.get(&r.memory_id) {
            let mut item = serde_json::json!({
                "id": m.id,
                "content": m.content,
                "type": m.memory_type.as_str(),
                "importance": m.importance,
                "pinned": m.pinned,
                "tags": m.tags,
                "score": r.score,
                "recallReason": r.recall_reason,
            });
            if input.include_metadata {
                item["createdAt"] = serde_json::json!(m.created_at.to_rfc3339());
                item["viewCount"] = serde_json::json!(m.view_count);
                item["citeCount"] = serde_json::json!(m.cite_count);
            }
            items.push(item);
        }
    }

    let result = serde_json::json!({
        "items": items,
        "totalCount": items.len(),
        "queryTimeMs": started.elapsed().as_secs_f64() * 1000.0,
        "searchType": search_type,
        "searchOptions": { "vectorWeight": vector_weight, "textWeight": text_weight },
    });

    ctx.query_cache.put(fingerprint, result.clone());
    Ok(result)
}

/// Match-all fallback for a blank/stopword-only query: every candidate
/// scores, ordered newest-first, with relevance decaying linearly from 1.0
/// so recency still dominates the rank once the hybrid ranker's own
/// recency signal is applied on top.
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

fn apply_filters(candidates: &mut Vec<Memory>, input: &RecallInput) {
    let filters = &input.filters;
    if let Some(ids) = &filters.id {
        let set: HashSet<&String> = ids.iter().collect();
        candidates.retain(|m| set.contains(&m.id));
    }
    if let Some(types) = &filters.r#type {
        let wanted: HashSet<String> = types.iter().map(|t| t.to_ascii_lowercase()).collect();
        candidates.retain(|m| wanted.contains(m.memory_type.as_str()));
    }
    if let Some(tags) = &filters.tags {
        let wanted: HashSet<&String> = tags.iter().collect();
        candidates.retain(|m| m.tags.iter().any(|t| wanted.contains(t)));
    }
    if let Some(scopes) = &filters.privacy_scope {
        let wanted: HashSet<String> = scopes.iter().map(|s| s.to_ascii_lowercase()).collect();
        candidates.retain(|m| wanted.contains(m.privacy_scope.as_str()));
    }
    if let Some(from) = filters.time_from {
        candidates.retain(|m| m.created_at >= from);
    }
    if let Some(to) = filters.time_to {
        candidates.retain(|m| m.created_at <= to);
    }
    if let Some(pinned) = filters.pinned {
        candidates.retain(|m| m.pinned == pinned);
    }
}
