//! Query normalization and lexical relevance scoring.
//!
//! Everything here is pure: [`Store`](crate::storage::Store) runs the
//! actual FTS5 query and hands back raw rows; this module turns a raw
//! query string into safe FTS tokens and turns raw rows into a
//! normalized `[0,1]` relevance score.

use std::collections::HashSet;

const KOREAN_RANGE: std::ops::RangeInclusive<u32> = 0xAC00..=0xD7A3;

/// A row returned by the store's FTS lookup, before ranking.
#[derive(Debug, Clone)]
pub struct TextCandidate {
    pub memory_id: String,
    /// Raw bm25() score from SQLite FTS5 (more negative = more relevant).
    pub bm25_raw: f64,
    pub tags: Vec<String>,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct ScoredText {
    pub memory_id: String,
    pub relevance: f64,
    pub recall_reason: String,
}

/// Lowercase (preserving CJK), strip everything outside
/// `[word, whitespace, Hangul]`, collapse repeated whitespace, drop
/// stopwords.
pub fn normalize_query(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let filtered: String = lowered
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() || is_hangul(c) {
                c
            } else {
                ' '
            }
        })
        .collect();

    filtered
        .split_whitespace()
        .filter(|tok| !is_stopword(tok))
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_hangul(c: char) -> bool {
    KOREAN_RANGE.contains(&(c as u32))
}

fn is_stopword(token: &str) -> bool {
    const STOPWORDS: &[&str] = &[
        "a", "an", "the", "and", "or", "of", "in", "on", "at", "to", "for", "is", "are", "was",
        "were", "this", "that",
    ];
    STOPWORDS.contains(&token)
}

/// Turn a normalized query into a safe FTS5 MATCH expression: each token
/// is quoted to neutralize FTS operator syntax, with a prefix wildcard on
/// the final token (when it's long enough to be a meaningful prefix) so
/// partial typing still matches. An empty normalized query becomes a
/// match-all sentinel the caller substitutes for "sort by recency".
pub fn to_fts_match(normalized: &str) -> Option<String> {
    let tokens: Vec<&str> = normalized.split_whitespace().collect();
    if tokens.is_empty() {
        return None;
    }
    let mut parts = Vec::with_capacity(tokens.len());
    for (i, tok) in tokens.iter().enumerate() {
        let escaped = tok.replace('"', "\"\"");
        if i == tokens.len() - 1 && tok.len() >= 2 {
            parts.push(format!("\"{escaped}\"*"));
        } else {
            parts.push(format!("\"{escaped}\""));
        }
    }
    Some(parts.join(" "))
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    if union == 0.0 {
        0.0
    } else {
        intersection / union
    }
}

fn bigrams(s: &str) -> HashSet<String> {
    let chars: Vec<char> = s.chars().collect();
    chars
        .windows(2)
        .map(|w| w.iter().collect::<String>())
        .collect()
}

/// Scores a batch of FTS candidates for one query. `query_vector_present`
/// tells the weighting scheme whether an embedding-similarity component
/// will be folded in later by the hybrid ranker — when it will be, the
/// text-only weights here are renormalized over the remaining signals so
/// they still sum to 1 on their own.
pub struct TextSearcher;

impl TextSearcher {
    pub fn score(
        &self,
        normalized_query: &str,
        query_tags: &[String],
        candidates: &[TextCandidate],
        vector_component_pending: bool,
    ) -> Vec<ScoredText> {
        if candidates.is_empty() {
            return Vec::new();
        }

        let min_bm25 = candidates
            .iter()
            .map(|c| c.bm25_raw)
            .fold(f64::INFINITY, f64::min);
        let max_bm25 = candidates
            .iter()
            .map(|c| c.bm25_raw)
            .fold(f64::NEG_INFINITY, f64::max);
        let bm25_range = (max_bm25 - min_bm25).max(1e-9);

        let query_tag_set: HashSet<String> = query_tags.iter().cloned().collect();
        let query_bigrams = bigrams(normalized_query);

        let (w_bm25, w_tag, w_title) = if vector_component_pending {
            // The embedding-similarity term (0.60) is supplied by the
            // hybrid ranker once vector candidates are merged in; the
            // remaining 0.40 is split proportionally among the text-only
            // signals (0.30 / 0.05 / 0.05).
            (0.30, 0.05, 0.05)
        } else {
            // No vector signal will ever arrive for this query (provider
            // disabled) — renormalize the text-only weights to sum to 1.
            (0.30 / 0.40, 0.05 / 0.40, 0.05 / 0.40)
        };

        candidates
            .iter()
            .map(|c| {
                // bm25() in SQLite is more negative for better matches;
                // invert and min-max normalize so higher is better.
                let bm25_norm = 1.0 - (c.bm25_raw - min_bm25) / bm25_range;
                let tag_set: HashSet<String> = c.tags.iter().cloned().collect();
                let tag_jaccard = jaccard(&query_tag_set, &tag_set);
                let content_bigrams = bigrams(&c.content.to_lowercase());
                let title_hit = jaccard(&query_bigrams, &content_bigrams);

                let relevance = w_bm25 * bm25_norm + w_tag * tag_jaccard + w_title * title_hit;

                ScoredText {
                    memory_id: c.memory_id.clone(),
                    relevance: relevance.clamp(0.0, 1.0),
                    recall_reason: format!("text match: bm25={bm25_norm:.3}"),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_lowercases_and_strips_punctuation() {
        assert_eq!(normalize_query("Hello, World!!"), "hello world");
    }

    #[test]
    fn normalize_drops_stopwords() {
        assert_eq!(normalize_query("the cat and the hat"), "cat hat");
    }

    #[test]
    fn normalize_preserves_hangul() {
        let normalized = normalize_query("공간 반복 학습");
        assert!(normalized.contains("공간"));
    }

    #[test]
    fn to_fts_match_adds_prefix_wildcard_on_final_token() {
        let m = to_fts_match("spaced repetition").unwrap();
        assert_eq!(m, "\"spaced\" \"repetition\"*");
    }

    #[test]
    fn to_fts_match_empty_query_returns_none() {
        assert!(to_fts_match("").is_none());
    }

    #[test]
    fn to_fts_match_escapes_embedded_quotes() {
        let m = to_fts_match("say \"hi\"").unwrap();
        assert!(m.contains("\"\""));
    }

    #[test]
    fn score_ranks_best_bm25_highest_when_no_vector_pending() {
        let candidates = vec![
            TextCandidate {
                memory_id: "mem_a".to_string(),
                bm25_raw: -10.0,
                tags: vec![],
                content: "React hooks tutorial".to_string(),
            },
            TextCandidate {
                memory_id: "mem_b".to_string(),
                bm25_raw: -1.0,
                tags: vec![],
                content: "unrelated content".to_string(),
            },
        ];
        let scored = TextSearcher.score("react hooks", &[], &candidates, false);
        let a = scored.iter().find(|s| s.memory_id == "mem_a").unwrap();
        let b = scored.iter().find(|s| s.memory_id == "mem_b").unwrap();
        assert!(a.relevance > b.relevance);
    }

    #[test]
    fn score_weights_sum_to_full_budget_when_vector_absent() {
        // With vector_component_pending=false every candidate's relevance
        // should be able to reach 1.0 on maximal signals.
        let candidates = vec![TextCandidate {
            memory_id: "mem_a".to_string(),
            bm25_raw: -10.0,
            tags: vec!["rust".to_string()],
            content: "rust".to_string(),
        }];
        let scored = TextSearcher.score("rust", &["rust".to_string()], &candidates, false);
        assert!(scored[0].relevance <= 1.0);
    }
}
