//! Environment-driven configuration.
//!
//! Configuration file parsing is explicitly out of scope; every knob is an
//! environment variable with a documented default so the engine runs
//! unconfigured. A variable that is *set* but malformed is a startup
//! failure; an *unset* variable silently takes its default.

use std::path::PathBuf;
use std::time::Duration;

use crate::embeddings::ProviderKind;

/// Top-level engine configuration, assembled once at process start.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: Option<PathBuf>,
    pub embedding_provider: ProviderKind,
    pub embedding_api_key: Option<String>,
    pub embedding_api_url: Option<String>,
    pub embedding_dimensions: Option<usize>,
    pub search_default_limit: usize,
    pub search_max_limit: usize,
    pub forget_ttl: ForgetTtlConfig,
    pub task_queue_workers: usize,
    pub busy_timeout: Duration,
}

/// Per-type time-to-live overrides for the forgetting sweep, in hours.
/// `None` means unbounded (the type never ages out on TTL alone).
#[derive(Debug, Clone, Copy)]
pub struct ForgetTtlConfig {
    pub working: Option<i64>,
    pub episodic: Option<i64>,
    pub semantic: Option<i64>,
    pub procedural: Option<i64>,
}

impl Default for ForgetTtlConfig {
    fn default() -> Self {
        Self {
            working: Some(48),
            episodic: Some(90 * 24),
            semantic: None,
            procedural: None,
        }
    }
}

impl ForgetTtlConfig {
    fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.working = env_ttl_hours("FORGET_WORKING_TTL", cfg.working);
        cfg.episodic = env_ttl_hours("FORGET_EPISODIC_TTL", cfg.episodic);
        cfg.semantic = env_ttl_hours("FORGET_SEMANTIC_TTL", cfg.semantic);
        cfg.procedural = env_ttl_hours("FORGET_PROCEDURAL_TTL", cfg.procedural);
        cfg
    }
}

fn env_ttl_hours(key: &str, default: Option<i64>) -> Option<i64> {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse::<i64>() {
            Ok(-1) => None,
            Ok(hours) => Some(hours),
            Err(_) => default,
        },
        Err(_) => default,
    }
}

impl Config {
    /// Build configuration from the process environment. Never panics;
    /// malformed numeric/enum variables fall back to their default rather
    /// than aborting, since only the MCP binary's startup path should
    /// decide whether a bad config is fatal.
    pub fn from_env() -> Self {
        let db_path = std::env::var("DB_PATH").ok().map(PathBuf::from);

        let embedding_provider = std::env::var("EMBEDDING_PROVIDER")
            .ok()
            .and_then(|v| ProviderKind::parse(&v))
            .unwrap_or(ProviderKind::Lexical);

        let embedding_api_key = std::env::var("EMBEDDING_API_KEY").ok();
        let embedding_api_url = std::env::var("EMBEDDING_API_URL").ok();
        let embedding_dimensions = std::env::var("EMBEDDING_DIMENSIONS")
            .ok()
            .and_then(|v| v.parse().ok());

        let search_default_limit = env_usize("SEARCH_DEFAULT_LIMIT", 10);
        let search_max_limit = env_usize("SEARCH_MAX_LIMIT", 100);
        let task_queue_workers = env_usize("TASK_QUEUE_WORKERS", 8);
        let busy_timeout = Duration::from_millis(env_usize("STORE_BUSY_TIMEOUT_MS", 5_000) as u64);

        Self {
            db_path,
            embedding_provider,
            embedding_api_key,
            embedding_api_url,
            embedding_dimensions,
            search_default_limit,
            search_max_limit,
            forget_ttl: ForgetTtlConfig::from_env(),
            task_queue_workers,
            busy_timeout,
        }
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: None,
            embedding_provider: ProviderKind::Lexical,
            embedding_api_key: None,
            embedding_api_url: None,
            embedding_dimensions: None,
            search_default_limit: 10,
            search_max_limit: 100,
            forget_ttl: ForgetTtlConfig::default(),
            task_queue_workers: 8,
            busy_timeout: Duration::from_millis(5_000),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ttl_marks_semantic_and_procedural_unbounded() {
        let ttl = ForgetTtlConfig::default();
        assert_eq!(ttl.working, Some(48));
        assert!(ttl.semantic.is_none());
        assert!(ttl.procedural.is_none());
    }

    #[test]
    fn unset_env_falls_back_to_default() {
        // SAFETY-by-convention: test-only, no other test in this module
        // touches SEARCH_DEFAULT_LIMIT concurrently.
        unsafe { std::env::remove_var("SEARCH_DEFAULT_LIMIT") };
        assert_eq!(env_usize("SEARCH_DEFAULT_LIMIT", 10), 10);
    }
}
