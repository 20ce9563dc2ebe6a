//! `feedback` tool — appends a FeedbackEvent and lets the store's counter
//! update follow from its `kind`.

use std::sync::Arc;

use memoria_core::{CoreError, CoreResult, FeedbackKind};
use serde::Deserialize;
use serde_json::Value;

use crate::context::AppContext;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct FeedbackArgs {
    memory_id: String,
    helpful: bool,
    #[serde(default)]
    score: Option<f64>,
}

pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "memoryId": { "type": "string" },
            "helpful": { "type": "boolean" },
            "score": { "type": "number", "minimum": 0.0, "maximum": 1.0 }
        },
        "required": ["memoryId", "helpful"]
    })
}

pub async fn execute(ctx: &Arc<AppContext>, args: Option<Value>) -> CoreResult<Value> {
    let args = args.ok_or_else(|| CoreError::invalid("missing arguments"))?;
    let input: FeedbackArgs =
        serde_json::from_value(args).map_err(|e| CoreError::invalid(format!("invalid arguments: {e}")))?;

    let score = input.score.unwrap_or(if input.helpful { 1.0 } else { 0.0 }).clamp(0.0, 1.0);
    let kind = if input.helpful { FeedbackKind::Helpful } else { FeedbackKind::NotHelpful };

    ctx.store.append_feedback(&input.memory_id, kind, score)?;
    ctx.query_cache.invalidate_all();

    Ok(serde_json::json!({
        "memoryId": input.memory_id,
        "kind": kind.as_str(),
        "score": score,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> Arc<AppContext> {
        Arc::new(AppContext::in_memory_for_tests())
    }

    async fn remember(ctx: &Arc<AppContext>) -> String {
        let args = serde_json::json!({ "content": "note worth remembering" });
        let result = crate::tools::remember::execute(ctx, Some(args)).await.unwrap();
        result["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn helpful_feedback_defaults_score_to_one() {
        let ctx = ctx();
        let id = remember(&ctx).await;
        let args = serde_json::json!({ "memoryId": id, "helpful": true });
        let result = execute(&ctx, Some(args)).await.unwrap();
        assert_eq!(result["score"], 1.0);
        assert_eq!(result["kind"], "helpful");
    }

    #[tokio::test]
    async fn not_helpful_feedback_defaults_score_to_zero() {
        let ctx = ctx();
        let id = remember(&ctx).await;
        let args = serde_json::json!({ "memoryId": id, "helpful": false });
        let result = execute(&ctx, Some(args)).await.unwrap();
        assert_eq!(result["score"], 0.0);
        assert_eq!(result["kind"], "not_helpful");
    }

    #[tokio::test]
    async fn feedback_on_missing_memory_is_not_found() {
        let ctx = ctx();
        let args = serde_json::json!({ "memoryId": "mem_missing", "helpful": true });
        let err = execute(&ctx, Some(args)).await.unwrap_err();
        assert_eq!(err.code(), "not_found");
    }

    #[tokio::test]
    async fn explicit_score_is_clamped() {
        let ctx = ctx();
        let id = remember(&ctx).await;
        let args = serde_json::json!({ "memoryId": id, "helpful": true, "score": 5.0 });
        let result = execute(&ctx, Some(args)).await.unwrap();
        assert_eq!(result["score"], 1.0);
    }
}
