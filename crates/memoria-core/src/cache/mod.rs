//! LRU + TTL caches for ranked query results and embeddings.
//!
//! Grounded in the same "bounded entry count, internal lock" model the
//! rest of this engine uses for shared mutable state: each cache wraps an
//! `lru::LruCache` behind a `Mutex` so reads/writes from concurrent tool
//! handlers never race.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;

use crate::memory::RecallFilters;

fn fingerprint_filters(filters: &RecallFilters) -> u64 {
    let mut hasher = DefaultHasher::new();
    filters.id.clone().unwrap_or_default().hash(&mut hasher);
    filters.r#type.clone().unwrap_or_default().hash(&mut hasher);
    filters.tags.clone().unwrap_or_default().hash(&mut hasher);
    filters
        .privacy_scope
        .clone()
        .unwrap_or_default()
        .hash(&mut hasher);
    filters.time_from.map(|t| t.timestamp()).hash(&mut hasher);
    filters.time_to.map(|t| t.timestamp()).hash(&mut hasher);
    filters.pinned.hash(&mut hasher);
    hasher.finish()
}

/// Derived from normalized query text + filter set + limit; keys the
/// QueryCache and is compared token-wise for the pattern-match fallback.
#[derive(Debug, Clone)]
pub struct QueryFingerprint {
    pub normalized_query: String,
    pub filters_hash: u64,
    pub limit: usize,
}

impl QueryFingerprint {
    pub fn new(normalized_query: &str, filters: &RecallFilters, limit: usize) -> Self {
        Self {
            normalized_query: normalized_query.to_string(),
            filters_hash: fingerprint_filters(filters),
            limit,
        }
    }

    fn cache_key(&self) -> String {
        format!("{}::{}::{}", self.normalized_query, self.filters_hash, self.limit)
    }

    fn query_tokens(&self) -> std::collections::HashSet<&str> {
        self.normalized_query.split_whitespace().collect()
    }
}

fn jaccard(a: &std::collections::HashSet<&str>, b: &std::collections::HashSet<&str>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    if union == 0.0 {
        0.0
    } else {
        intersection / union
    }
}

struct Entry<V> {
    value: V,
    expires_at: Instant,
    fingerprint: QueryFingerprint,
}

/// TTL applied when a result is promoted from a pattern-match hit rather
/// than an exact key hit — short, since it's an approximation.
const PATTERN_MATCH_TTL: Duration = Duration::from_secs(30);
const PATTERN_MATCH_THRESHOLD: f64 = 0.6;

pub struct QueryCache<V: Clone> {
    inner: Mutex<LruCache<String, Entry<V>>>,
    ttl: Duration,
}

impl<V: Clone> QueryCache<V> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity.max(1)).unwrap(),
            )),
            ttl,
        }
    }

    /// Exact-key lookup, falling back to a Jaccard pattern match over
    /// cached query tokens when the exact key misses.
    pub fn get(&self, fp: &QueryFingerprint) -> Option<V> {
        let key = fp.cache_key();
        let now = Instant::now();
        let mut guard = self.inner.lock().expect("query cache mutex poisoned");

        if let Some(entry) = guard.get(&key) {
            if entry.expires_at > now {
                return Some(entry.value.clone());
            }
            guard.pop(&key);
        }

        let fp_tokens = fp.query_tokens();
        let mut best: Option<(String, f64, V)> = None;
        for (k, entry) in guard.iter() {
            if entry.expires_at <= now {
                continue;
            }
            let score = jaccard(&fp_tokens, &entry.fingerprint.query_tokens());
            if score >= PATTERN_MATCH_THRESHOLD {
                if best.as_ref().map(|(_, s, _)| score > *s).unwrap_or(true) {
                    best = Some((k.clone(), score, entry.value.clone()));
                }
            }
        }

        if let Some((_, _, value)) = best {
            guard.put(
                key,
                Entry {
                    value: value.clone(),
                    expires_at: now + PATTERN_MATCH_TTL,
                    fingerprint: fp.clone(),
                },
            );
            return Some(value);
        }

        None
    }

    pub fn put(&self, fp: QueryFingerprint, value: V) {
        let key = fp.cache_key();
        let mut guard = self.inner.lock().expect("query cache mutex poisoned");
        guard.put(
            key,
            Entry {
                value,
                expires_at: Instant::now() + self.ttl,
                fingerprint: fp,
            },
        );
    }

    /// Coarse-grained invalidation: any write tool clears the whole
    /// cache, since query cost dominates over cache-miss cost.
    pub fn invalidate_all(&self) {
        let mut guard = self.inner.lock().expect("query cache mutex poisoned");
        guard.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("query cache mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Keyed by a stable hash of the input text; values are embedding
/// vectors. No pattern-match fallback — embedding cache keys are exact.
pub struct EmbeddingCache {
    inner: Mutex<LruCache<u64, (Vec<f32>, Instant)>>,
    ttl: Duration,
}

impl EmbeddingCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity.max(1)).unwrap(),
            )),
            ttl,
        }
    }

    pub fn key_for(text: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        hasher.finish()
    }

    pub fn get(&self, text: &str) -> Option<Vec<f32>> {
        let key = Self::key_for(text);
        let now = Instant::now();
        let mut guard = self.inner.lock().expect("embedding cache mutex poisoned");
        match guard.get(&key) {
            Some((vector, expires_at)) if *expires_at > now => Some(vector.clone()),
            Some(_) => {
                guard.pop(&key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, text: &str, vector: Vec<f32>) {
        let key = Self::key_for(text);
        let mut guard = self.inner.lock().expect("embedding cache mutex poisoned");
        guard.put(key, (vector, Instant::now() + self.ttl));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_cache_exact_hit_returns_value() {
        let cache: QueryCache<Vec<String>> = QueryCache::new(8, Duration::from_secs(60));
        let filters = RecallFilters::default();
        let fp = QueryFingerprint::new("spaced repetition", &filters, 10);
        cache.put(fp.clone(), vec!["mem_a".to_string()]);
        let hit = cache.get(&fp);
        assert_eq!(hit, Some(vec!["mem_a".to_string()]));
    }

    #[test]
    fn query_cache_pattern_match_on_overlapping_tokens() {
        let cache: QueryCache<Vec<String>> = QueryCache::new(8, Duration::from_secs(60));
        let filters = RecallFilters::default();
        let fp1 = QueryFingerprint::new("rust async runtime", &filters, 10);
        cache.put(fp1, vec!["mem_a".to_string()]);

        let fp2 = QueryFingerprint::new("rust async runtime tokio", &filters, 10);
        let hit = cache.get(&fp2);
        assert_eq!(hit, Some(vec!["mem_a".to_string()]));
    }

    #[test]
    fn query_cache_no_match_below_threshold() {
        let cache: QueryCache<Vec<String>> = QueryCache::new(8, Duration::from_secs(60));
        let filters = RecallFilters::default();
        let fp1 = QueryFingerprint::new("rust programming language", &filters, 10);
        cache.put(fp1, vec!["mem_a".to_string()]);

        let fp2 = QueryFingerprint::new("gardening tips winter", &filters, 10);
        assert!(cache.get(&fp2).is_none());
    }

    #[test]
    fn query_cache_invalidate_all_clears_everything() {
        let cache: QueryCache<Vec<String>> = QueryCache::new(8, Duration::from_secs(60));
        let filters = RecallFilters::default();
        let fp = QueryFingerprint::new("test", &filters, 10);
        cache.put(fp, vec!["mem_a".to_string()]);
        assert_eq!(cache.len(), 1);
        cache.invalidate_all();
        assert!(cache.is_empty());
    }

    #[test]
    fn query_cache_expired_entry_is_not_returned() {
        let cache: QueryCache<Vec<String>> = QueryCache::new(8, Duration::from_millis(1));
        let filters = RecallFilters::default();
        let fp = QueryFingerprint::new("test", &filters, 10);
        cache.put(fp.clone(), vec!["mem_a".to_string()]);
        std::thread::sleep(Duration::from_millis(10));
        assert!(cache.get(&fp).is_none());
    }

    #[test]
    fn embedding_cache_roundtrip() {
        let cache = EmbeddingCache::new(8, Duration::from_secs(60));
        cache.put("hello world", vec![1.0, 2.0, 3.0]);
        assert_eq!(cache.get("hello world"), Some(vec![1.0, 2.0, 3.0]));
        assert!(cache.get("different text").is_none());
    }
}
