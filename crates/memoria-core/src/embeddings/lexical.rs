//! Deterministic, always-available embedding fallback.
//!
//! Hashes tokens into a fixed 512-dimensional vector weighted by a
//! heuristic IDF (favoring longer, identifier-shaped, or digit-bearing
//! tokens) after stripping a combined English/Korean stopword list. No
//! network access and no model download — this is what `recall` falls
//! back to when `EmbeddingProvider::Disabled` or no external credentials
//! are configured.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use super::{normalize, EmbeddingProvider, EmbeddingUsage, ModelInfo};
use crate::error::CoreResult;

const DIMENSION: usize = 512;

const ENGLISH_STOPWORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "if", "of", "in", "on", "at", "to", "for", "with",
    "is", "are", "was", "were", "be", "been", "being", "this", "that", "these", "those", "it",
    "as", "by", "from", "not", "do", "does", "did", "has", "have", "had", "will", "would",
    "can", "could", "should", "i", "you", "he", "she", "we", "they",
];

const KOREAN_STOPWORDS: &[&str] = &[
    "이", "그", "저", "것", "수", "등", "및", "를", "을", "는", "은", "가", "이다", "에서", "으로",
    "하다", "있다", "되다", "이런", "그런",
];

pub struct LexicalProvider;

impl LexicalProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LexicalProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddingProvider for LexicalProvider {
    fn available(&self) -> bool {
        true
    }

    fn embed(&self, text: &str) -> CoreResult<(Vec<f32>, String, EmbeddingUsage)> {
        let tokens = tokenize(text);
        let vector = hash_embed(&tokens);
        Ok((
            vector,
            "lexical-tfidf-512".to_string(),
            EmbeddingUsage {
                input_tokens: tokens.len(),
            },
        ))
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            model_tag: "lexical-tfidf-512",
            dimension: DIMENSION,
            max_tokens: usize::MAX,
        }
    }
}

fn is_stopword(token: &str) -> bool {
    ENGLISH_STOPWORDS.contains(&token) || KOREAN_STOPWORDS.contains(&token)
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || is_hangul(c)))
        .map(|t| t.to_lowercase())
        .filter(|t| !t.is_empty() && !is_stopword(t))
        .collect()
}

fn is_hangul(c: char) -> bool {
    matches!(c as u32, 0xAC00..=0xD7A3 | 0x1100..=0x11FF | 0x3130..=0x318F)
}

/// Heuristic IDF proxy: longer tokens, tokens containing digits, and
/// identifier-cased tokens (camelCase/snake_case/kebab-case) are treated
/// as more discriminative than short common words.
fn heuristic_idf_weight(token: &str) -> f32 {
    let mut weight = 1.0f32;
    if token.len() > 8 {
        weight += 0.5;
    }
    if token.chars().any(|c| c.is_ascii_digit()) {
        weight += 0.3;
    }
    if token.contains('_') || token.contains('-') {
        weight += 0.2;
    }
    if has_camel_case(token) {
        weight += 0.2;
    }
    weight
}

fn has_camel_case(token: &str) -> bool {
    let mut saw_lower = false;
    for c in token.chars() {
        if c.is_lowercase() {
            saw_lower = true;
        } else if c.is_uppercase() && saw_lower {
            return true;
        }
    }
    false
}

fn hash_embed(tokens: &[String]) -> Vec<f32> {
    let mut vector = vec![0.0f32; DIMENSION];
    if tokens.is_empty() {
        return vector;
    }
    for token in tokens {
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        let bucket = (hasher.finish() as usize) % DIMENSION;
        vector[bucket] += heuristic_idf_weight(token);
    }
    normalize(&vector)
}
