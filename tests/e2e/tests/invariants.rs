//! Universal invariants from the engine's testable-properties list:
//! ranking determinism, forgetting monotonicity, and idempotent forget.

mod common;

use common::Engine;
use memoria_core::forgetting::{ForgettingEngine, MemoryFeatures};
use memoria_core::memory::MemoryType;

fn base_features(id: &str) -> MemoryFeatures {
    MemoryFeatures {
        memory_id: id.to_string(),
        memory_type: MemoryType::Semantic,
        age_days: 10.0,
        importance: 0.5,
        pinned: false,
        recency: 0.5,
        usage: 0.5,
        duplication_ratio: 0.2,
        within_feedback_cooldown: false,
    }
}

#[test]
fn increasing_importance_never_increases_forget_score() {
    let engine = ForgettingEngine::default();
    let low = base_features("mem_a");
    let mut high = base_features("mem_a");
    high.importance = 0.95;
    assert!(engine.forget_score(&high) <= engine.forget_score(&low));
}

#[test]
fn pinning_never_increases_forget_score() {
    let engine = ForgettingEngine::default();
    let unpinned = base_features("mem_a");
    let mut pinned = base_features("mem_a");
    pinned.pinned = true;
    assert!(engine.forget_score(&pinned) <= engine.forget_score(&unpinned));
}

#[test]
fn recall_ordering_is_deterministic_across_repeated_calls() {
    let engine = Engine::new_in_memory();
    for i in 0..5 {
        engine
            .remember(&format!("entry {i} about deterministic ranking behavior"), MemoryType::Semantic, 0.5, &[])
            .unwrap();
    }

    let first = engine.recall("deterministic ranking", None, None, true, 10).unwrap();
    let second = engine.recall("deterministic ranking", None, None, true, 10).unwrap();
    let first_ids: Vec<&String> = first.iter().map(|(id, _)| id).collect();
    let second_ids: Vec<&String> = second.iter().map(|(id, _)| id).collect();
    assert_eq!(first_ids, second_ids);
}

#[test]
fn repeated_hard_forget_is_not_found_not_internal() {
    let engine = Engine::new_in_memory();
    let memory = engine.remember("ephemeral fact", MemoryType::Semantic, 0.4, &[]).unwrap();

    engine.store.hard_delete(&memory.id).unwrap();
    let err = engine.store.hard_delete(&memory.id).unwrap_err();
    assert_eq!(err.code(), "not_found");
}
