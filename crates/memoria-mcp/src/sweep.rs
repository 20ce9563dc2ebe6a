//! Periodic background passes: the forgetting sweep and the spaced-repetition
//! review scheduler, both driven off the same live-memory snapshot.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use memoria_core::forgetting::{DeletionKind, MemoryFeatures};
use memoria_core::memory::MemoryType;
use memoria_core::review::ReviewInput;
use memoria_core::ReviewSchedule;
use tracing::{info, warn};

use crate::context::AppContext;

/// Coarse same-type-count-over-total ratio, used as the forgetting engine's
/// duplication signal. Not a substitute for the ranker's tag-Jaccard MMR
/// pass over search results — this only informs which memories are sweep
/// candidates.
fn duplication_ratios(memories: &[memoria_core::Memory]) -> HashMap<String, f64> {
    let mut counts: HashMap<MemoryType, usize> = HashMap::new();
    for m in memories {
        *counts.entry(m.memory_type).or_insert(0) += 1;
    }
    let total = memories.len().max(1) as f64;
    memories
        .iter()
        .map(|m| {
            let same_type = *counts.get(&m.memory_type).unwrap_or(&0) as f64;
            (m.id.clone(), ((same_type - 1.0).max(0.0) / total).min(1.0))
        })
        .collect()
}

fn usage_score(m: &memoria_core::Memory) -> f64 {
    let raw = m.view_count as f64 + 2.0 * m.cite_count as f64;
    (raw / (raw + 10.0)).clamp(0.0, 1.0)
}

/// Runs one forgetting sweep: scores every live memory, soft- or
/// hard-deletes the candidates the engine flags.
pub async fn run_forgetting_sweep(ctx: &Arc<AppContext>) {
    let memories = match ctx.store.list_live_memories() {
        Ok(m) => m,
        Err(e) => {
            warn!("forgetting sweep: could not list memories: {e}");
            return;
        }
    };
    if memories.is_empty() {
        return;
    }

    let now = Utc::now();
    let ratios = duplication_ratios(&memories);

    let mut features = Vec::with_capacity(memories.len());
    for m in &memories {
        let age_days = (now - m.created_at).num_seconds() as f64 / 86_400.0;
        let recency = memoria_core::forgetting::recency_from_age(age_days, m.memory_type);
        let within_cooldown = ctx
            .store
            .feedback_events_for(&m.id)
            .map(|events| events.iter().any(|e| now - e.timestamp < chrono::Duration::hours(24)))
            .unwrap_or(false);

        features.push(MemoryFeatures {
            memory_id: m.id.clone(),
            memory_type: m.memory_type,
            age_days,
            importance: m.importance,
            pinned: m.pinned,
            recency,
            usage: usage_score(m),
            duplication_ratio: *ratios.get(&m.id).unwrap_or(&0.0),
            within_feedback_cooldown: within_cooldown,
        });
    }

    let decisions = ctx.forgetting.evaluate(&features);
    if decisions.is_empty() {
        return;
    }

    let mut soft = 0;
    let mut hard = 0;
    for d in &decisions {
        let result = match d.kind {
            DeletionKind::Soft => ctx.store.soft_delete(&d.memory_id).map(|_| soft += 1),
            DeletionKind::Hard => ctx.store.hard_delete(&d.memory_id).map(|_| hard += 1),
        };
        if let Err(e) = result {
            warn!("forgetting sweep: failed to delete {}: {e}", d.memory_id);
        }
    }
    if soft > 0 || hard > 0 {
        ctx.query_cache.invalidate_all();
        info!(soft, hard, "forgetting sweep applied decisions");
    }
}

/// Runs one review pass: recomputes each memory's next review interval and
/// logs which ones have dropped below the recall-probability threshold.
pub async fn run_review_pass(ctx: &Arc<AppContext>) {
    let memories = match ctx.store.list_live_memories() {
        Ok(m) => m,
        Err(e) => {
            warn!("review pass: could not list memories: {e}");
            return;
        }
    };

    let now = Utc::now();
    let mut due = 0;

    for m in &memories {
        let existing = ctx.store.get_review_schedule(&m.id).ok().flatten();
        let (current_interval, last_review) = match &existing {
            Some(s) => (s.interval_days, s.last_review),
            None => (1.0, m.created_at),
        };

        let events = ctx.store.feedback_events_for(&m.id).unwrap_or_default();
        let helpful = events
            .iter()
            .filter(|e| e.kind == memoria_core::FeedbackKind::Helpful)
            .count() as f64;
        let bad = events
            .iter()
            .filter(|e| e.kind == memoria_core::FeedbackKind::NotHelpful)
            .count() as f64;

        let input = ReviewInput {
            current_interval_days: current_interval,
            importance: m.importance,
            usage: usage_score(m),
            helpful: if helpful > 0.0 { 1.0 } else { 0.0 },
            bad: if bad > 0.0 { 1.0 } else { 0.0 },
            days_since_last_review: (now - last_review).num_seconds() as f64 / 86_400.0,
        };
        let outcome = ctx.review.schedule(&input);
        if outcome.needs_review {
            due += 1;
        }

        let schedule = ReviewSchedule {
            memory_id: m.id.clone(),
            interval_days: outcome.next_interval_days,
            last_review: now,
            next_review: now + chrono::Duration::days(outcome.next_interval_days.round() as i64),
            last_recall_probability: outcome.recall_probability,
        };
        if let Err(e) = ctx.store.upsert_review_schedule(&schedule) {
            warn!("review pass: failed to persist schedule for {}: {e}", m.id);
        }
    }

    if due > 0 {
        info!(due, "review pass found memories due for review");
    }
}
