//! Model catalog types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Backend family a model is served by.
///
/// `Auto` only appears in request configuration, where it means "any
/// provider"; catalog entries always name a concrete provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
    Local,
    #[default]
    Auto,
}

impl Provider {
    /// Lowercase wire name (`"openai"`, `"anthropic"`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Local => "local",
            Provider::Auto => "auto",
        }
    }

    /// Whether a model served by `other` satisfies this request filter.
    pub fn admits(&self, other: Provider) -> bool {
        *self == Provider::Auto || *self == other
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static description of a model: pricing, speed and quality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Registry key (e.g. `"claude-3-opus"`).
    pub id: String,
    /// Model name sent to the backend (e.g. `"claude-3-opus-20240229"`).
    pub name: String,
    pub provider: Provider,
    /// USD per 1,000 tokens, prompt and completion alike.
    pub cost_per_1k_tokens: f64,
    pub avg_latency_ms: u64,
    /// Relative quality in `0.0..=1.0`.
    pub accuracy_score: f64,
    /// Largest completion the model accepts.
    pub max_tokens: u32,
}

impl ModelDescriptor {
    /// Create a descriptor whose backend name equals its registry id.
    pub fn new(id: impl Into<String>, provider: Provider) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            provider,
            cost_per_1k_tokens: 0.0,
            avg_latency_ms: 0,
            accuracy_score: 0.0,
            max_tokens: 4096,
        }
    }

    /// Set the backend model name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_cost(mut self, cost_per_1k_tokens: f64) -> Self {
        self.cost_per_1k_tokens = cost_per_1k_tokens;
        self
    }

    pub fn with_latency(mut self, avg_latency_ms: u64) -> Self {
        self.avg_latency_ms = avg_latency_ms;
        self
    }

    pub fn with_accuracy(mut self, accuracy_score: f64) -> Self {
        self.accuracy_score = accuracy_score;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}
