//! Merges lexical and vector candidates, then applies the five-signal
//! ranking overlay (relevance, recency, importance, usage, duplication
//! penalty) from SPEC_FULL.md §4.5.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::memory::MemoryType;
use crate::search::{ScoredText, VectorCandidate};

/// Per-candidate metadata the ranker needs beyond the raw text/vector
/// scores — everything [`crate::storage::Store`] already has on hand for
/// a live memory.
#[derive(Debug, Clone)]
pub struct CandidateMeta {
    pub memory_id: String,
    pub memory_type: MemoryType,
    pub importance: f64,
    pub pinned: bool,
    pub created_at: DateTime<Utc>,
    pub age_days: f64,
    pub view_count: u32,
    pub cite_count: u32,
    pub edit_count: u32,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RankedResult {
    pub memory_id: String,
    pub score: f64,
    pub recall_reason: String,
}

/// Default sub-searcher weights. Not specified numerically in the source
/// beyond "summing to approximately 1"; chosen to favor vector recall
/// when an embedding is available, matching how the corpus this system's
/// hybrid search is modeled on weights its own RRF/linear fusion.
pub const DEFAULT_VECTOR_WEIGHT: f64 = 0.7;
pub const DEFAULT_TEXT_WEIGHT: f64 = 0.3;

#[derive(Debug, Clone, Copy)]
pub struct RankingWeights {
    pub alpha_relevance: f64,
    pub beta_recency: f64,
    pub gamma_importance: f64,
    pub delta_usage: f64,
    pub epsilon_duplication: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            alpha_relevance: 0.50,
            beta_recency: 0.20,
            gamma_importance: 0.20,
            delta_usage: 0.10,
            epsilon_duplication: 0.15,
        }
    }
}

/// Normalizes `(vector_weight, text_weight)` to sum to 1, falling back to
/// the module defaults when both are absent or non-positive.
pub fn normalize_sub_weights(vector_weight: Option<f64>, text_weight: Option<f64>) -> (f64, f64) {
    let (v, t) = match (vector_weight, text_weight) {
        (None, None) => (DEFAULT_VECTOR_WEIGHT, DEFAULT_TEXT_WEIGHT),
        (v, t) => (v.unwrap_or(0.0).max(0.0), t.unwrap_or(0.0).max(0.0)),
    };
    let sum = v + t;
    if sum <= 0.0 {
        (DEFAULT_VECTOR_WEIGHT, DEFAULT_TEXT_WEIGHT)
    } else {
        (v / sum, t / sum)
    }
}

/// A merged text+vector candidate before the five-signal overlay.
#[derive(Debug, Clone)]
struct MergedCandidate {
    memory_id: String,
    merged_relevance: f64,
    recall_reason: String,
}

fn merge_candidates(
    text: &[ScoredText],
    vector: &[VectorCandidate],
    vector_weight: f64,
    text_weight: f64,
) -> Vec<MergedCandidate> {
    let text_by_id: HashMap<&str, &ScoredText> =
        text.iter().map(|c| (c.memory_id.as_str(), c)).collect();
    let vector_by_id: HashMap<&str, f32> = vector
        .iter()
        .map(|c| (c.memory_id.as_str(), c.similarity))
        .collect();

    let mut ids: Vec<&str> = text_by_id.keys().chain(vector_by_id.keys()).copied().collect();
    ids.sort_unstable();
    ids.dedup();

    ids.into_iter()
        .map(|id| {
            let text_score = text_by_id.get(id).map(|c| c.relevance).unwrap_or(0.0);
            let vector_score = vector_by_id.get(id).copied().unwrap_or(0.0) as f64;
            let merged_relevance = vector_weight * vector_score + text_weight * text_score;

            let recall_reason = match (text_by_id.get(id), vector_by_id.get(id)) {
                (Some(_), Some(sim)) => {
                    let _ = sim;
                    "text+vector merged".to_string()
                }
                (None, Some(sim)) => format!("vector similarity: {sim:.3}"),
                (Some(t), None) => t.recall_reason.clone(),
                (None, None) => "no candidate signal".to_string(),
            };

            MergedCandidate {
                memory_id: id.to_string(),
                merged_relevance,
                recall_reason,
            }
        })
        .collect()
}

fn recency_score(age_days: f64, memory_type: MemoryType) -> f64 {
    let half_life = memory_type.recency_half_life_days();
    (-std::f64::consts::LN_2 * age_days / half_life).exp()
}

fn usage_raw(views: u32, cites: u32, edits: u32) -> f64 {
    (1.0 + views as f64).ln() + 2.0 * (1.0 + cites as f64).ln() + 0.5 * (1.0 + edits as f64).ln()
}

fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = (max - min).max(1e-9);
    values.iter().map(|v| (v - min) / range).collect()
}

fn tag_jaccard(a: &[String], b: &[String]) -> f64 {
    use std::collections::HashSet;
    let a: HashSet<&String> = a.iter().collect();
    let b: HashSet<&String> = b.iter().collect();
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(&b).count() as f64;
    let union = a.union(&b).count() as f64;
    if union == 0.0 {
        0.0
    } else {
        intersection / union
    }
}

pub struct HybridRanker {
    pub weights: RankingWeights,
}

impl Default for HybridRanker {
    fn default() -> Self {
        Self {
            weights: RankingWeights::default(),
        }
    }
}

impl HybridRanker {
    pub fn new(weights: RankingWeights) -> Self {
        Self { weights }
    }

    /// Merges text and vector candidate lists, applies the five-signal
    /// overlay with an MMR-style duplication penalty, and returns the
    /// top `limit` results in deterministic order.
    pub fn rank(
        &self,
        text: &[ScoredText],
        vector: &[VectorCandidate],
        meta: &[CandidateMeta],
        vector_weight: f64,
        text_weight: f64,
        limit: usize,
    ) -> Vec<RankedResult> {
        let merged = merge_candidates(text, vector, vector_weight, text_weight);
        if merged.is_empty() {
            return Vec::new();
        }

        let meta_by_id: HashMap<&str, &CandidateMeta> =
            meta.iter().map(|m| (m.memory_id.as_str(), m)).collect();

        let usage_raw_values: Vec<f64> = merged
            .iter()
            .map(|c| {
                meta_by_id
                    .get(c.memory_id.as_str())
                    .map(|m| usage_raw(m.view_count, m.cite_count, m.edit_count))
                    .unwrap_or(0.0)
            })
            .collect();
        let usage_norm = min_max_normalize(&usage_raw_values);

        struct Baseline<'a> {
            candidate: &'a MergedCandidate,
            meta: Option<&'a CandidateMeta>,
            baseline_score: f64,
        }

        let mut baseline: Vec<Baseline> = merged
            .iter()
            .zip(usage_norm.iter())
            .map(|(c, &usage)| {
                let m = meta_by_id.get(c.memory_id.as_str()).copied();
                let recency = m
                    .map(|m| recency_score(m.age_days, m.memory_type))
                    .unwrap_or(0.0);
                let importance = m.map(|m| m.importance).unwrap_or(0.0);
                let score = self.weights.alpha_relevance * c.merged_relevance
                    + self.weights.beta_recency * recency
                    + self.weights.gamma_importance * importance
                    + self.weights.delta_usage * usage;
                Baseline {
                    candidate: c,
                    meta: m,
                    baseline_score: score,
                }
            })
            .collect();

        // Deterministic initial ordering before MMR selection: score desc,
        // then the canonical tie-break (pinned desc, importance desc,
        // created_at desc, id asc).
        baseline.sort_by(|a, b| tie_break_cmp(a.baseline_score, a.meta, a.candidate, b.baseline_score, b.meta, b.candidate));

        let mut selected: Vec<&Baseline> = Vec::new();
        let mut remaining: Vec<&Baseline> = baseline.iter().collect();
        let mut results = Vec::with_capacity(limit.min(remaining.len()));

        while !remaining.is_empty() && results.len() < limit {
            let mut best_idx = 0;
            let mut best_final = f64::NEG_INFINITY;
            let mut best_tuple = None;

            for (idx, candidate) in remaining.iter().enumerate() {
                let duplication_penalty = selected
                    .iter()
                    .map(|s| {
                        let tags_a = candidate.meta.map(|m| m.tags.as_slice()).unwrap_or(&[]);
                        let tags_b = s.meta.map(|m| m.tags.as_slice()).unwrap_or(&[]);
                        tag_jaccard(tags_a, tags_b)
                    })
                    .fold(0.0_f64, f64::max);

                let final_score =
                    candidate.baseline_score - self.weights.epsilon_duplication * duplication_penalty;

                let better = match best_tuple {
                    None => true,
                    Some(_) => {
                        tie_break_cmp(
                            final_score,
                            candidate.meta,
                            candidate.candidate,
                            best_final,
                            remaining[best_idx].meta,
                            remaining[best_idx].candidate,
                        ) == std::cmp::Ordering::Less
                    }
                };

                if better {
                    best_idx = idx;
                    best_final = final_score;
                    best_tuple = Some(());
                }
            }

            let chosen = remaining.remove(best_idx);
            results.push(RankedResult {
                memory_id: chosen.candidate.memory_id.clone(),
                score: best_final,
                recall_reason: chosen.candidate.recall_reason.clone(),
            });
            selected.push(chosen);
        }

        results
    }
}

#[allow(clippy::too_many_arguments)]
fn tie_break_cmp(
    score_a: f64,
    meta_a: Option<&CandidateMeta>,
    cand_a: &MergedCandidate,
    score_b: f64,
    meta_b: Option<&CandidateMeta>,
    cand_b: &MergedCandidate,
) -> std::cmp::Ordering {
    use std::cmp::Ordering;

    score_b
        .partial_cmp(&score_a)
        .unwrap_or(Ordering::Equal)
        .then_with(|| {
            let pinned_a = meta_a.map(|m| m.pinned).unwrap_or(false);
            let pinned_b = meta_b.map(|m| m.pinned).unwrap_or(false);
            pinned_b.cmp(&pinned_a)
        })
        .then_with(|| {
            let imp_a = meta_a.map(|m| m.importance).unwrap_or(0.0);
            let imp_b = meta_b.map(|m| m.importance).unwrap_or(0.0);
            imp_b.partial_cmp(&imp_a).unwrap_or(Ordering::Equal)
        })
        .then_with(|| {
            let created_a = meta_a.map(|m| m.created_at);
            let created_b = meta_b.map(|m| m.created_at);
            created_b.cmp(&created_a)
        })
        .then_with(|| cand_a.memory_id.cmp(&cand_b.memory_id))
}
