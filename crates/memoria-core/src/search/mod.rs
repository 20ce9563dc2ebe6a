//! Lexical and vector candidate retrieval, kept as pure-math modules that
//! operate on rows the [`Store`](crate::storage::Store) already fetched.

mod text;
mod vector;

pub use text::{normalize_query, to_fts_match, ScoredText, TextCandidate, TextSearcher};
pub use vector::{EmbeddingRow, VectorCandidate, VectorSearcher};
