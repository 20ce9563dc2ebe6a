//! `remember` tool — validate, persist, and queue embedding generation
//! for a new memory.

use std::sync::Arc;
use std::time::Duration;

use memoria_core::memory::MAX_CONTENT_LEN;
use memoria_core::tasks::{Priority, TaskKind};
use memoria_core::{CoreError, CoreResult, Memory, MemoryType, PrivacyScope, RememberInput};
use serde_json::Value;

use crate::context::AppContext;

pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "content": { "type": "string", "description": "The text to remember", "maxLength": MAX_CONTENT_LEN },
            "type": { "type": "string", "enum": ["working", "episodic", "semantic", "procedural"] },
            "tags": { "type": "array", "items": { "type": "string" } },
            "importance": { "type": "number", "minimum": 0.0, "maximum": 1.0 },
            "source": { "type": "string" },
            "privacyScope": { "type": "string", "enum": ["private", "team", "public"] }
        },
        "required": ["content"]
    })
}

/// Default importance when the caller doesn't specify one.
const DEFAULT_IMPORTANCE: f64 = 0.5;

pub async fn execute(ctx: &Arc<AppContext>, args: Option<Value>) -> CoreResult<Value> {
    let args = args.ok_or_else(|| CoreError::invalid("missing arguments"))?;
    let input: RememberInput =
        serde_json::from_value(args).map_err(|e| CoreError::invalid(format!("invalid arguments: {e}")))?;

    if input.content.trim().is_empty() {
        return Err(CoreError::invalid("content must not be empty"));
    }
    if input.content.chars().count() > MAX_CONTENT_LEN {
        return Err(CoreError::invalid(format!(
            "content exceeds {MAX_CONTENT_LEN} characters"
        )));
    }

    let memory_type = match &input.r#type {
        Some(raw) => MemoryType::parse_name(raw)
            .ok_or_else(|| CoreError::invalid(format!("unknown memory type '{raw}'")))?,
        None => MemoryType::Semantic,
    };

    let importance = Memory::clamp_importance(input.importance.unwrap_or(DEFAULT_IMPORTANCE));

    let privacy_scope = match &input.privacy_scope {
        Some(raw) => PrivacyScope::parse_name(raw)
            .ok_or_else(|| CoreError::invalid(format!("unknown privacy scope '{raw}'")))?,
        None => PrivacyScope::default(),
    };

    let memory = ctx.store.insert_memory(
        memory_type,
        input.content.trim(),
        importance,
        privacy_scope,
        &input.tags,
        input.source.as_deref(),
    )?;

    ctx.query_cache.invalidate_all();
    spawn_embedding_task(ctx, &memory);

    Ok(serde_json::json!({
        "id": memory.id,
        "createdAt": memory.created_at.to_rfc3339(),
        "type": memory.memory_type.as_str(),
        "importance": memory.importance,
    }))
}

/// Fire-and-forget: embedding generation never blocks or fails the write.
/// A provider failure is recorded by the task queue's failure stats and
/// the memory simply stays text-only searchable until a later retry.
fn spawn_embedding_task(ctx: &Arc<AppContext>, memory: &Memory) {
    let ctx = ctx.clone();
    let memory_id = memory.id.clone();
    let content = memory.content.clone();
    tokio::spawn(async move {
        let provider = ctx.embedding_provider.clone();
        let store = ctx.store.clone();
        let cache = ctx.embedding_cache.clone();
        let result = ctx
            .task_queue
            .run(TaskKind::Embedding, Priority::Normal, 2, Duration::from_secs(30), move || {
                let provider = provider.clone();
                let store = store.clone();
                let cache = cache.clone();
                let memory_id = memory_id.clone();
                let content = content.clone();
                async move {
                    if let Some(vector) = cache.get(&content) {
                        return store.upsert_embedding(&memory_id, &vector, provider.model_info().model_tag);
                    }
                    let (vector, model_tag, _usage) = provider.embed(&content)?;
                    cache.put(&content, vector.clone());
                    store.upsert_embedding(&memory_id, &vector, &model_tag)
                }
            })
            .await;

        if result.is_err() {
            tracing::warn!("embedding task failed after retries");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> Arc<AppContext> {
        Arc::new(AppContext::in_memory_for_tests())
    }

    #[tokio::test]
    async fn remember_stores_and_returns_id() {
        let ctx = ctx();
        let args = serde_json::json!({ "content": "spaced repetition improves long-term recall" });
        let result = execute(&ctx, Some(args)).await.unwrap();
        assert!(result["id"].as_str().unwrap().starts_with("mem_"));
        assert_eq!(result["type"], "semantic");
    }

    #[tokio::test]
    async fn remember_rejects_empty_content() {
        let ctx = ctx();
        let args = serde_json::json!({ "content": "   " });
        let err = execute(&ctx, Some(args)).await.unwrap_err();
        assert_eq!(err.code(), "invalid");
    }

    #[tokio::test]
    async fn remember_rejects_oversized_content() {
        let ctx = ctx();
        let args = serde_json::json!({ "content": "a".repeat(MAX_CONTENT_LEN + 1) });
        let err = execute(&ctx, Some(args)).await.unwrap_err();
        assert_eq!(err.code(), "invalid");
    }

    #[tokio::test]
    async fn remember_rejects_unknown_type() {
        let ctx = ctx();
        let args = serde_json::json!({ "content": "test", "type": "nonsense" });
        let err = execute(&ctx, Some(args)).await.unwrap_err();
        assert_eq!(err.code(), "invalid");
    }

    #[tokio::test]
    async fn remember_clamps_importance_into_bounds() {
        let ctx = ctx();
        let args = serde_json::json!({ "content": "test", "importance": 5.0 });
        let result = execute(&ctx, Some(args)).await.unwrap();
        assert_eq!(result["importance"], 1.0);
    }

    #[tokio::test]
    async fn remember_rejects_unknown_fields() {
        let ctx = ctx();
        let args = serde_json::json!({ "content": "test", "bogus": true });
        let err = execute(&ctx, Some(args)).await.unwrap_err();
        assert_eq!(err.code(), "invalid");
    }
}
