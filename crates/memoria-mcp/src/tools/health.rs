//! `health` — store connectivity, search availability, uptime, and the
//! task/alert substrate's current counters. Backs `GET /health`.

use std::sync::Arc;

use memoria_core::CoreResult;
use serde_json::Value;

use crate::context::AppContext;

pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {}
    })
}

pub async fn execute(ctx: &Arc<AppContext>, _args: Option<Value>) -> CoreResult<Value> {
    let store_connected = ctx.store.list_live_memories().is_ok();
    let search_available = ctx.embedding_provider.available();
    let model = ctx.embedding_provider.model_info();
    let queue_stats = ctx.task_queue.stats();
    let active_alerts = ctx.alerts.active_alerts();

    let status = if store_connected {
        "ok"
    } else {
        "degraded"
    };

    Ok(serde_json::json!({
        "status": status,
        "version": env!("CARGO_PKG_VERSION"),
        "uptimeSeconds": ctx.started_at.elapsed().as_secs(),
        "store": { "connected": store_connected },
        "search": {
            "vectorAvailable": search_available,
            "modelTag": model.model_tag,
            "dimension": model.dimension,
        },
        "taskQueue": {
            "queueDepth": queue_stats.queue_depth,
            "inFlight": queue_stats.in_flight,
            "completedTotal": queue_stats.completed_total,
            "failedTotal": queue_stats.failed_total,
        },
        "activeAlertCount": active_alerts.len(),
    }))
}
