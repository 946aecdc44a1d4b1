//! Response types

use serde::{Deserialize, Serialize};

use super::model::Provider;

/// Token counts reported by the inference backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// Raw completion returned by an [`InferenceBackend`](crate::providers::InferenceBackend).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Completion {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

/// Token usage plus the computed cost of a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    pub cost_usd: f64,
}

impl Usage {
    pub fn new(tokens: TokenUsage, cost_usd: f64) -> Self {
        Self {
            prompt_tokens: tokens.prompt_tokens,
            completion_tokens: tokens.completion_tokens,
            total_tokens: tokens.total_tokens,
            cost_usd,
        }
    }
}

/// Response handed back to adapter callers, fresh or from cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiResponse {
    pub content: String,
    /// Backend name of the model that produced the content.
    pub model: String,
    pub provider: Provider,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    pub cached: bool,
    /// Wall-clock latency of the request that produced the content. Cache
    /// hits report the original latency, not the lookup time.
    pub latency_ms: u64,
}
