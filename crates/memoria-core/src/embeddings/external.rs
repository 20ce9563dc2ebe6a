//! Remote HTTP embedding provider.
//!
//! Talks to a configurable embedding endpoint (`EMBEDDING_API_URL`) using a
//! blocking `reqwest` client, since [`EmbeddingProvider::embed`] is a sync
//! capability called from both async task-queue workers (via
//! `spawn_blocking`) and plain synchronous test code. Network failures
//! degrade to `CoreError::Unavailable` rather than panicking, matching §7's
//! rule that embedding failures never fail the surrounding write.

use super::{EmbeddingProvider, EmbeddingUsage, ModelInfo};
use crate::error::{CoreError, CoreResult};

/// Conservative default token budget; input is truncated (by character
/// count, a cheap proxy for tokens) before it is sent upstream.
const DEFAULT_MAX_TOKENS: usize = 8192;

pub struct ExternalProvider {
    client: reqwest::blocking::Client,
    api_url: String,
    api_key: String,
    dimension: usize,
}

impl ExternalProvider {
    pub fn new(api_url: String, api_key: String, dimension: usize) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            api_url,
            api_key,
            dimension,
        }
    }

    fn truncate_input<'a>(&self, text: &'a str) -> &'a str {
        if text.len() <= DEFAULT_MAX_TOKENS {
            return text;
        }
        // Truncate on a char boundary so we never split a UTF-8 sequence.
        let mut end = DEFAULT_MAX_TOKENS;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        &text[..end]
    }
}

impl EmbeddingProvider for ExternalProvider {
    fn available(&self) -> bool {
        !self.api_key.is_empty() && !self.api_url.is_empty()
    }

    fn embed(&self, text: &str) -> CoreResult<(Vec<f32>, String, EmbeddingUsage)> {
        let input = self.truncate_input(text);
        let body = serde_json::json!({ "input": input });

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                CoreError::unavailable(format!("embedding request failed: {e}"))
            })?;

        if !response.status().is_success() {
            return Err(CoreError::unavailable(format!(
                "embedding provider returned status {}",
                response.status()
            )));
        }

        let json: serde_json::Value = response
            .json()
            .map_err(|e| CoreError::unavailable(format!("malformed embedding response: {e}")))?;

        let vector: Vec<f32> = json["embedding"]
            .as_array()
            .or_else(|| json["data"][0]["embedding"].as_array())
            .ok_or_else(|| CoreError::unavailable("malformed embedding response"))?
            .iter()
            .filter_map(|v| v.as_f64())
            .map(|v| v as f32)
            .collect();

        if vector.is_empty() {
            return Err(CoreError::unavailable("empty embedding vector returned"));
        }

        Ok((vector, "external".to_string(), EmbeddingUsage::default()))
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            model_tag: "external",
            dimension: self.dimension,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}
