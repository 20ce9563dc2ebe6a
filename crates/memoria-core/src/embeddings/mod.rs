//! Pluggable text → vector embedding providers.
//!
//! Three variants share one capability surface: [`External`](ExternalProvider)
//! delegates to a remote HTTP service, [`Lexical`](LexicalProvider) is a
//! deterministic hash-based fallback that is always available, and
//! [`Disabled`] turns vector search off entirely so recall degrades to
//! text-only. The active variant is fixed at startup (§4.2 of SPEC_FULL.md);
//! switching providers requires a regeneration pass, not a hot swap.

mod external;
mod lexical;

pub use external::ExternalProvider;
pub use lexical::LexicalProvider;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreResult;

/// Which embedding backend a deployment selects via `EMBEDDING_PROVIDER`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    External,
    Lexical,
    Disabled,
}

impl ProviderKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "external-a" | "external-b" | "external" => Some(Self::External),
            "lightweight" | "lexical" => Some(Self::Lexical),
            "disabled" | "none" => Some(Self::Disabled),
            _ => None,
        }
    }
}

/// A dense embedding plus the provenance needed to detect dimension drift
/// when the active provider changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    pub memory_id: String,
    pub vector: Vec<f32>,
    pub dimension: usize,
    pub model_tag: String,
    pub created_at: DateTime<Utc>,
}

/// Usage accounting returned alongside a freshly computed embedding
/// (token count billed, useful for external-provider cost tracking).
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddingUsage {
    pub input_tokens: usize,
}

/// Static facts about a provider's output space.
#[derive(Debug, Clone, Copy)]
pub struct ModelInfo {
    pub model_tag: &'static str,
    pub dimension: usize,
    pub max_tokens: usize,
}

/// Shared capability set across all three provider variants.
pub trait EmbeddingProvider: Send + Sync {
    fn available(&self) -> bool;
    fn embed(&self, text: &str) -> CoreResult<(Vec<f32>, String, EmbeddingUsage)>;
    fn model_info(&self) -> ModelInfo;
}

/// Always-available no-op provider. `embed` always fails with
/// `Unavailable`; callers are expected to check `available()` first and
/// degrade to text-only recall.
pub struct DisabledProvider;

impl EmbeddingProvider for DisabledProvider {
    fn available(&self) -> bool {
        false
    }

    fn embed(&self, _text: &str) -> CoreResult<(Vec<f32>, String, EmbeddingUsage)> {
        Err(crate::error::CoreError::unavailable(
            "embedding provider is disabled",
        ))
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            model_tag: "disabled",
            dimension: 0,
            max_tokens: 0,
        }
    }
}

/// Cosine similarity in `[-1, 1]`; `0.0` for degenerate (zero-length or
/// mismatched-dimension) inputs rather than panicking or returning `NaN`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f32>()
        .sqrt()
}

pub fn normalize(v: &[f32]) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        return v.to_vec();
    }
    v.iter().map(|x| x / norm).collect()
}

/// Build the embedding provider selected by configuration. Falls back to
/// [`LexicalProvider`] when `External` is requested but no API key/URL is
/// configured, since an unreachable provider should degrade rather than
/// fail the whole engine at startup.
pub fn build_provider(
    kind: ProviderKind,
    api_url: Option<String>,
    api_key: Option<String>,
    dimension: Option<usize>,
) -> Box<dyn EmbeddingProvider> {
    match kind {
        ProviderKind::Disabled => Box::new(DisabledProvider),
        ProviderKind::External => match (api_url, api_key) {
            (Some(url), Some(key)) => {
                Box::new(ExternalProvider::new(url, key, dimension.unwrap_or(1536)))
            }
            _ => Box::new(LexicalProvider::new()),
        },
        ProviderKind::Lexical => Box::new(LexicalProvider::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_similarity_identical_vectors_is_one() {
        let a = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_orthogonal_vectors_is_zero() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_mismatched_dims_is_zero_not_panic() {
        let a = vec![1.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn build_provider_falls_back_to_lexical_without_credentials() {
        let provider = build_provider(ProviderKind::External, None, None, None);
        assert!(provider.available());
        assert_eq!(provider.model_info().model_tag, "lexical-tfidf-512");
    }

    #[test]
    fn disabled_provider_reports_unavailable() {
        let provider = DisabledProvider;
        assert!(!provider.available());
        assert!(provider.embed("hello").is_err());
    }
}
