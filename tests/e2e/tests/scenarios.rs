//! End-to-end scenarios seeded from the engine's concrete test list: store
//! and recall, id filtering, soft/hard delete, pin protection, hybrid vs.
//! text-only ranking, and review scheduling.

mod common;

use common::Engine;
use memoria_core::forgetting::{DeletionKind, MemoryFeatures};
use memoria_core::memory::MemoryType;
use memoria_core::review::ReviewInput;
use memoria_core::{ForgettingEngine, ReviewScheduler};

#[test]
fn store_and_recall() {
    let engine = Engine::new_in_memory();
    let memory = engine
        .remember("Testing spaced repetition algorithms", MemoryType::Semantic, 0.8, &[])
        .unwrap();

    let results = engine.recall("spaced repetition", None, None, true, 10).unwrap();
    assert!(results.iter().any(|(id, score)| id == &memory.id && *score > 0.0));
}

#[test]
fn filter_by_id() {
    let engine = Engine::new_in_memory();
    let memory = engine
        .remember("Some content worth tagging", MemoryType::Semantic, 0.5, &[])
        .unwrap();

    let results = engine
        .recall("  ", Some(std::slice::from_ref(&memory.id)), None, true, 1)
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0, memory.id);
}

#[test]
fn soft_then_hard_delete() {
    let engine = Engine::new_in_memory();
    let memory = engine.remember("a fact about rust ownership", MemoryType::Semantic, 0.5, &[]).unwrap();

    engine.store.soft_delete(&memory.id).unwrap();
    let results = engine.recall("ownership", None, None, true, 10).unwrap();
    assert!(results.iter().all(|(id, _)| id != &memory.id));

    engine.store.hard_delete(&memory.id).unwrap();
    assert!(engine.store.get_memory(&memory.id).unwrap().is_none());

    let err = engine.store.hard_delete(&memory.id).unwrap_err();
    assert_eq!(err.code(), "not_found");
}

#[test]
fn pin_protects_from_forgetting_sweep() {
    let engine = Engine::new_in_memory();
    let memory = engine.remember("pinned knowledge", MemoryType::Semantic, 0.9, &[]).unwrap();
    engine.store.set_pinned(&memory.id, true).unwrap();

    let forgetting = ForgettingEngine::default();
    let aged_feature = MemoryFeatures {
        memory_id: memory.id.clone(),
        memory_type: MemoryType::Semantic,
        age_days: 9999.0,
        importance: memory.importance,
        pinned: true,
        recency: 0.0,
        usage: 0.0,
        duplication_ratio: 1.0,
        within_feedback_cooldown: false,
    };
    let decisions = forgetting.evaluate(&[aged_feature]);
    assert!(decisions.iter().all(|d| d.kind != DeletionKind::Hard));
}

#[test]
fn hybrid_beats_text_when_embedding_matches() {
    let engine = Engine::new_in_memory();
    let a = engine.remember("React hooks tutorial", MemoryType::Semantic, 0.5, &[]).unwrap();
    let b = engine.remember("hooks and loops in fabric knitting", MemoryType::Semantic, 0.5, &[]).unwrap();

    let results = engine.recall("React state hooks", None, None, true, 10).unwrap();
    let rank_of = |id: &str| results.iter().position(|(rid, _)| rid == id);
    if let (Some(pos_a), Some(pos_b)) = (rank_of(&a.id), rank_of(&b.id)) {
        assert!(pos_a <= pos_b, "hybrid search should not rank the unrelated memory above the matching one");
    }
}

#[test]
fn review_schedule_worked_example() {
    let scheduler = ReviewScheduler::default();
    let input = ReviewInput {
        current_interval_days: 10.0,
        importance: 0.6,
        usage: 0.4,
        helpful: 1.0,
        bad: 0.0,
        days_since_last_review: 5.0,
    };
    let outcome = scheduler.schedule(&input);
    assert_eq!(outcome.next_interval_days, 21.0);
    assert!((outcome.recall_probability - 0.79).abs() < 0.01);
    assert!(!outcome.needs_review);
}

#[test]
fn stale_working_memory_ages_out_by_ttl() {
    let engine = Engine::new_in_memory();
    let memory = engine.remember("a scratch note from a long-closed session", MemoryType::Working, 0.3, &[]).unwrap();

    let forgetting = ForgettingEngine::default();
    let feature = MemoryFeatures {
        memory_id: memory.id,
        memory_type: MemoryType::Working,
        age_days: 5.0,
        importance: 0.3,
        pinned: false,
        recency: 0.1,
        usage: 0.1,
        duplication_ratio: 0.0,
        within_feedback_cooldown: false,
    };
    let decisions = forgetting.evaluate(&[feature]);
    assert_eq!(decisions.len(), 1);
    assert!(decisions[0].reasons.contains(&"aged"));
}
