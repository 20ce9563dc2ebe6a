//! Persistent memory engine for AI agents: typed storage, hybrid
//! lexical+vector retrieval, a five-signal ranking overlay, a
//! forgetting/retention sweep, and spaced-repetition review scheduling.
//!
//! This crate is the engine only — no transport, no process lifecycle.
//! `memoria-mcp` wires it to stdio/HTTP/WebSocket and owns the binary.

pub mod alerts;
pub mod cache;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod forgetting;
pub mod memory;
pub mod ranking;
pub mod review;
pub mod search;
pub mod storage;
pub mod tasks;

pub use alerts::AlertMonitor;
pub use cache::{EmbeddingCache, QueryCache, QueryFingerprint};
pub use config::Config;
pub use embeddings::{build_provider, EmbeddingProvider, ProviderKind};
pub use error::{CoreError, CoreResult};
pub use forgetting::ForgettingEngine;
pub use memory::{
    FeedbackEvent, FeedbackKind, Memory, MemoryType, PrivacyScope, RecallFilters, RecallInput,
    RememberInput, ReviewSchedule,
};
pub use ranking::HybridRanker;
pub use review::ReviewScheduler;
pub use storage::Store;
pub use tasks::TaskQueue;
