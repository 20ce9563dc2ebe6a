//! Core entity types: [`Memory`], [`MemoryType`], [`FeedbackEvent`],
//! [`ReviewSchedule`], and the typed tool-input structs that validate at
//! the API boundary before anything touches the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One of the four retention classes a memory can belong to. Controls the
/// recency half-life used by [`crate::ranking`] and the default TTL used
/// by [`crate::forgetting`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    Working,
    Episodic,
    Semantic,
    Procedural,
}

impl MemoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Working => "working",
            Self::Episodic => "episodic",
            Self::Semantic => "semantic",
            Self::Procedural => "procedural",
        }
    }

    pub fn parse_name(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "working" => Some(Self::Working),
            "episodic" => Some(Self::Episodic),
            "semantic" => Some(Self::Semantic),
            "procedural" => Some(Self::Procedural),
            _ => None,
        }
    }

    /// Exponential-decay half-life, in days, used by the recency signal.
    pub fn recency_half_life_days(&self) -> f64 {
        match self {
            Self::Working => 2.0,
            Self::Episodic => 30.0,
            Self::Semantic => 180.0,
            Self::Procedural => 90.0,
        }
    }

    /// Soft-delete TTL in hours, or `None` if unbounded by age alone.
    pub fn default_soft_ttl_hours(&self) -> Option<i64> {
        match self {
            Self::Working => Some(48),
            Self::Episodic => Some(90 * 24),
            Self::Semantic => None,
            Self::Procedural => None,
        }
    }
}

impl std::fmt::Display for MemoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Advisory visibility tag. The engine does not enforce access control on
/// this field — authentication/authorization is out of scope — it is
/// carried through as metadata and usable as a recall filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrivacyScope {
    Private,
    Team,
    Public,
}

impl PrivacyScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Team => "team",
            Self::Public => "public",
        }
    }

    pub fn parse_name(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "private" => Some(Self::Private),
            "team" => Some(Self::Team),
            "public" => Some(Self::Public),
            _ => None,
        }
    }
}

impl Default for PrivacyScope {
    fn default() -> Self {
        Self::Private
    }
}

/// A durable unit of agent memory. Mutable fields (`pinned`, counters,
/// `last_accessed`, `soft_deleted`) are updated in place by [`crate::storage::Store`];
/// everything else is set once at `remember` time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct Memory {
    pub id: String,
    pub memory_type: MemoryType,
    pub content: String,
    pub importance: f64,
    pub privacy_scope: PrivacyScope,
    pub created_at: DateTime<Utc>,
    pub last_accessed: Option<DateTime<Utc>>,
    pub pinned: bool,
    pub tags: Vec<String>,
    pub source: Option<String>,
    pub view_count: u32,
    pub cite_count: u32,
    pub edit_count: u32,
    pub soft_deleted: bool,
}

impl Memory {
    pub fn clamp_importance(v: f64) -> f64 {
        v.clamp(0.0, 1.0)
    }
}

/// One entry in the append-only feedback log. Drives counter updates and
/// the usage signal consumed by ranking, forgetting, and review scheduling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEvent {
    pub memory_id: String,
    pub kind: FeedbackKind,
    pub score: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    Viewed,
    Cited,
    Edited,
    Helpful,
    NotHelpful,
    Pinned,
    Unpinned,
}

impl FeedbackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Viewed => "viewed",
            Self::Cited => "cited",
            Self::Edited => "edited",
            Self::Helpful => "helpful",
            Self::NotHelpful => "not_helpful",
            Self::Pinned => "pinned",
            Self::Unpinned => "unpinned",
        }
    }

    pub fn parse_name(s: &str) -> Option<Self> {
        match s {
            "viewed" => Some(Self::Viewed),
            "cited" => Some(Self::Cited),
            "edited" => Some(Self::Edited),
            "helpful" => Some(Self::Helpful),
            "not_helpful" => Some(Self::NotHelpful),
            "pinned" => Some(Self::Pinned),
            "unpinned" => Some(Self::Unpinned),
            _ => None,
        }
    }
}

/// Zero-or-one per memory. Written by [`crate::review::ReviewScheduler`];
/// destroyed transactionally alongside its memory on hard delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSchedule {
    pub memory_id: String,
    pub interval_days: f64,
    pub last_review: DateTime<Utc>,
    pub next_review: DateTime<Utc>,
    pub last_recall_probability: f64,
}

/// Validated input for the `remember` tool. `#[serde(deny_unknown_fields)]`
/// rejects stray/injected fields instead of silently ignoring them.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RememberInput {
    pub content: String,
    #[serde(default)]
    pub r#type: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub importance: Option<f64>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub privacy_scope: Option<String>,
}

pub const MAX_CONTENT_LEN: usize = 1000;

/// Nested recall filter set. The source toggled between flat and nested
/// filter schemas at different points; this implementation accepts only
/// the nested form as canonical (see SPEC_FULL.md §9).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RecallFilters {
    #[serde(default)]
    pub id: Option<Vec<String>>,
    #[serde(default)]
    pub r#type: Option<Vec<String>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub privacy_scope: Option<Vec<String>>,
    #[serde(default)]
    pub time_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub time_to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pinned: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RecallInput {
    pub query: String,
    #[serde(default)]
    pub filters: RecallFilters,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub vector_weight: Option<f64>,
    #[serde(default)]
    pub text_weight: Option<f64>,
    #[serde(default = "default_true")]
    pub enable_hybrid: bool,
    #[serde(default)]
    pub include_metadata: bool,
}

fn default_true() -> bool {
    true
}

pub const MAX_QUERY_LEN: usize = 1000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_type_roundtrips_through_str() {
        for t in [
            MemoryType::Working,
            MemoryType::Episodic,
            MemoryType::Semantic,
            MemoryType::Procedural,
        ] {
            assert_eq!(MemoryType::parse_name(t.as_str()), Some(t));
        }
    }

    #[test]
    fn remember_input_deny_unknown_fields() {
        let json = serde_json::json!({
            "content": "hello",
            "sneaky_field": "should fail"
        });
        let result: Result<RememberInput, _> = serde_json::from_value(json);
        assert!(result.is_err());
    }

    #[test]
    fn recall_input_defaults_hybrid_to_enabled() {
        let json = serde_json::json!({ "query": "test" });
        let input: RecallInput = serde_json::from_value(json).unwrap();
        assert!(input.enable_hybrid);
        assert!(input.filters.id.is_none());
    }

    #[test]
    fn recall_filters_reject_flat_legacy_fields() {
        // The flat schema (top-level `type` instead of `filters.type`) is
        // explicitly not accepted; deny_unknown_fields on RecallInput
        // surfaces it as an error rather than silently ignoring it.
        let json = serde_json::json!({ "query": "test", "type": "semantic" });
        let result: Result<RecallInput, _> = serde_json::from_value(json);
        assert!(result.is_err());
    }
}
