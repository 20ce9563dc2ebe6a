//! `forget` tool — soft or hard delete honoring pin invariants and the
//! feedback-cooldown deferral policy.

use std::sync::Arc;

use chrono::Utc;
use memoria_core::{CoreError, CoreResult};
use serde::Deserialize;
use serde_json::Value;

use crate::context::AppContext;

/// A memory fed back on within this window defers its hard-delete by one
/// sweep; see the ForgettingEngine's own use of the same constant.
const FEEDBACK_COOLDOWN_HOURS: i64 = 24;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ForgetArgs {
    id: String,
    #[serde(default)]
    hard: bool,
}

pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "id": { "type": "string" },
            "hard": { "type": "boolean", "default": false }
        },
        "required": ["id"]
    })
}

pub async fn execute(ctx: &Arc<AppContext>, args: Option<Value>) -> CoreResult<Value> {
    let args = args.ok_or_else(|| CoreError::invalid("missing arguments"))?;
    let input: ForgetArgs =
        serde_json::from_value(args).map_err(|e| CoreError::invalid(format!("invalid arguments: {e}")))?;

    let memory = ctx
        .store
        .get_memory(&input.id)?
        .ok_or_else(|| CoreError::not_found(format!("memory '{}' not found", input.id)))?;

    if memory.soft_deleted && !input.hard {
        return Err(CoreError::not_found(format!("memory '{}' not found", input.id)));
    }

    if input.hard {
        if memory.pinned {
            return Err(CoreError::conflict(format!(
                "memory '{}' is pinned and cannot be hard-deleted",
                input.id
            )));
        }
        if within_feedback_cooldown(ctx, &input.id)? {
            return Err(CoreError::conflict(format!(
                "memory '{}' had feedback within the last {FEEDBACK_COOLDOWN_HOURS}h; hard-delete deferred",
                input.id
            )));
        }
        ctx.store.hard_delete(&input.id)?;
    } else {
        ctx.store.soft_delete(&input.id)?;
    }

    ctx.query_cache.invalidate_all();

    Ok(serde_json::json!({
        "id": input.id,
        "hard": input.hard,
    }))
}

fn within_feedback_cooldown(ctx: &Arc<AppContext>, memory_id: &str) -> CoreResult<bool> {
    let events = ctx.store.feedback_events_for(memory_id)?;
    let cutoff = Utc::now() - chrono::Duration::hours(FEEDBACK_COOLDOWN_HOURS);
    Ok(events.iter().any(|e| e.timestamp >= cutoff))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> Arc<AppContext> {
        Arc::new(AppContext::in_memory_for_tests())
    }

    async fn remember(ctx: &Arc<AppContext>) -> String {
        let args = serde_json::json!({ "content": "ephemeral note" });
        let result = crate::tools::remember::execute(ctx, Some(args)).await.unwrap();
        result["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn soft_then_hard_delete_then_repeat_is_not_found() {
        let ctx = ctx();
        let id = remember(&ctx).await;

        let args = serde_json::json!({ "id": id });
        execute(&ctx, Some(args)).await.unwrap();

        let args = serde_json::json!({ "id": id, "hard": true });
        execute(&ctx, Some(args)).await.unwrap();

        let args = serde_json::json!({ "id": id, "hard": true });
        let err = execute(&ctx, Some(args)).await.unwrap_err();
        assert_eq!(err.code(), "not_found");
    }

    #[tokio::test]
    async fn pinned_memory_cannot_be_hard_deleted() {
        let ctx = ctx();
        let id = remember(&ctx).await;
        ctx.store.set_pinned(&id, true).unwrap();

        let args = serde_json::json!({ "id": id, "hard": true });
        let err = execute(&ctx, Some(args)).await.unwrap_err();
        assert_eq!(err.code(), "conflict");
    }

    #[tokio::test]
    async fn recent_feedback_defers_hard_delete() {
        let ctx = ctx();
        let id = remember(&ctx).await;
        ctx.store
            .append_feedback(&id, memoria_core::FeedbackKind::Cited, 1.0)
            .unwrap();

        let args = serde_json::json!({ "id": id, "hard": true });
        let err = execute(&ctx, Some(args)).await.unwrap_err();
        assert_eq!(err.code(), "conflict");
    }

    #[tokio::test]
    async fn forget_unknown_id_is_not_found() {
        let ctx = ctx();
        let args = serde_json::json!({ "id": "mem_missing" });
        let err = execute(&ctx, Some(args)).await.unwrap_err();
        assert_eq!(err.code(), "not_found");
    }
}
