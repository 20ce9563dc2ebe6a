//! Benchmarks for the pure-math hot paths: hybrid ranking, forget-score
//! computation, and cosine similarity. Run with: cargo bench -p memoria-core

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use memoria_core::embeddings::cosine_similarity;
use memoria_core::forgetting::{ForgettingEngine, MemoryFeatures};
use memoria_core::memory::MemoryType;
use memoria_core::ranking::{CandidateMeta, HybridRanker};
use memoria_core::search::{ScoredText, VectorCandidate};

fn bench_cosine_similarity(c: &mut Criterion) {
    let a: Vec<f32> = (0..512).map(|i| (i as f32).sin()).collect();
    let b: Vec<f32> = (0..512).map(|i| (i as f32).cos()).collect();

    c.bench_function("cosine_similarity_512d", |bencher| {
        bencher.iter(|| {
            black_box(cosine_similarity(&a, &b));
        })
    });
}

fn bench_forget_score(c: &mut Criterion) {
    let engine = ForgettingEngine::default();
    let features: Vec<MemoryFeatures> = (0..200)
        .map(|i| MemoryFeatures {
            memory_id: format!("mem_{i}"),
            memory_type: MemoryType::Episodic,
            age_days: (i % 40) as f64,
            importance: (i % 10) as f64 / 10.0,
            pinned: i % 17 == 0,
            recency: 1.0 - (i % 10) as f64 / 10.0,
            usage: (i % 7) as f64 / 7.0,
            duplication_ratio: (i % 5) as f64 / 5.0,
            within_feedback_cooldown: i % 13 == 0,
        })
        .collect();

    c.bench_function("forget_score_sweep_200", |bencher| {
        bencher.iter(|| {
            black_box(engine.evaluate(&features));
        })
    });
}

fn bench_hybrid_rank(c: &mut Criterion) {
    let ranker = HybridRanker::default();
    let now = Utc::now();

    let text: Vec<ScoredText> = (0..100)
        .map(|i| ScoredText {
            memory_id: format!("mem_{i}"),
            relevance: (i % 100) as f64 / 100.0,
            recall_reason: "bm25".to_string(),
        })
        .collect();
    let vector: Vec<VectorCandidate> = (0..100)
        .map(|i| VectorCandidate {
            memory_id: format!("mem_{i}"),
            similarity: (i % 100) as f32 / 100.0,
        })
        .collect();
    let meta: Vec<CandidateMeta> = (0..100)
        .map(|i| CandidateMeta {
            memory_id: format!("mem_{i}"),
            memory_type: MemoryType::Semantic,
            importance: (i % 10) as f64 / 10.0,
            pinned: i % 11 == 0,
            created_at: now,
            age_days: (i % 30) as f64,
            view_count: (i % 20) as u32,
            cite_count: (i % 5) as u32,
            edit_count: (i % 3) as u32,
            tags: vec![format!("tag{}", i % 8)],
        })
        .collect();

    c.bench_function("hybrid_rank_100x100", |bencher| {
        bencher.iter(|| {
            black_box(ranker.rank(&text, &vector, &meta, 0.7, 0.3, 10));
        })
    });
}

criterion_group!(benches, bench_cosine_similarity, bench_forget_score, bench_hybrid_rank);
criterion_main!(benches);
