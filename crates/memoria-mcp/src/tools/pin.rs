//! `pin`/`unpin` tools — single-id or batch, sharing one handler keyed by
//! direction. High-importance (> 0.8) unpin requires an explicit confirm.

use std::sync::Arc;

use memoria_core::{CoreError, CoreResult, FeedbackKind};
use serde::Deserialize;
use serde_json::Value;

use crate::context::AppContext;

const HIGH_IMPORTANCE_THRESHOLD: f64 = 0.8;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct PinArgs {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    batch: Option<Vec<String>>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    confirm: bool,
}

pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "id": { "type": "string" },
            "batch": { "type": "array", "items": { "type": "string" } },
            "reason": { "type": "string" },
            "confirm": { "type": "boolean", "default": false }
        }
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Pin,
    Unpin,
}

pub async fn execute(ctx: &Arc<AppContext>, args: Option<Value>, direction: Direction) -> CoreResult<Value> {
    let args = args.ok_or_else(|| CoreError::invalid("missing arguments"))?;
    let input: PinArgs =
        serde_json::from_value(args).map_err(|e| CoreError::invalid(format!("invalid arguments: {e}")))?;

    let ids: Vec<String> = match (input.id, input.batch) {
        (Some(id), None) => vec![id],
        (None, Some(batch)) if !batch.is_empty() => batch,
        (None, Some(_)) => return Err(CoreError::invalid("batch must not be empty")),
        (Some(_), Some(_)) => return Err(CoreError::invalid("specify either id or batch, not both")),
        (None, None) => return Err(CoreError::invalid("either id or batch is required")),
    };

    let pinned = direction == Direction::Pin;
    let mut results = Vec::with_capacity(ids.len());

    for id in &ids {
        let outcome = pin_one(ctx, id, pinned, input.confirm);
        match outcome {
            Ok(()) => results.push(serde_json::json!({ "id": id, "success": true })),
            Err(e) => results.push(serde_json::json!({ "id": id, "success": false, "error": e.to_string() })),
        }
    }

    ctx.query_cache.invalidate_all();

    Ok(serde_json::json!({
        "results": results,
        "reason": input.reason,
    }))
}

fn pin_one(ctx: &Arc<AppContext>, id: &str, pinned: bool, confirm: bool) -> CoreResult<()> {
    let memory = ctx
        .store
        .get_memory(id)?
        .ok_or_else(|| CoreError::not_found(format!("memory '{id}' not found")))?;

    if !pinned && memory.importance > HIGH_IMPORTANCE_THRESHOLD && !confirm {
        return Err(CoreError::conflict(format!(
            "unpinning high-importance memory '{id}' requires confirm=true"
        )));
    }

    ctx.store.set_pinned(id, pinned)?;
    let kind = if pinned { FeedbackKind::Pinned } else { FeedbackKind::Unpinned };
    ctx.store.append_feedback(id, kind, 0.0)?;
    Ok(())
}
