//! Inference backend trait.
//!
//! The adapter never talks HTTP directly; it drives an
//! [`InferenceBackend`]. Backends report failures through
//! [`HuginnError`](crate::HuginnError) variants so the executor can tell
//! transient failures (retried) from permanent ones (surfaced at once):
//!
//! - `Http`, `RateLimited`, `Api { status >= 500 }`, `EmptyResponse`: retried
//! - `AuthenticationFailed`, `Validation`, `Api { 4xx }`: terminal
//!
//! # Example
//!
//! ```ignore
//! async fn generate(&self, request: &GenerateRequest) -> Result<Completion> {
//!     if self.api_key_rejected {
//!         return Err(HuginnError::AuthenticationFailed);
//!     }
//!     // ... call the model
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::types::{Completion, Message};

/// Request input: a single prompt or a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Input {
    Prompt(String),
    Messages(Vec<Message>),
}

impl Input {
    /// Size of the input in bytes, as recorded in usage rows.
    pub fn size(&self) -> usize {
        match self {
            Input::Prompt(prompt) => prompt.len(),
            Input::Messages(_) => crate::cache::serialize_messages(self.messages()).len(),
        }
    }

    fn messages(&self) -> &[Message] {
        match self {
            Input::Messages(messages) => messages,
            Input::Prompt(_) => &[],
        }
    }
}

/// A single completion request sent to the backend.
///
/// Serializes to the backend wire shape:
/// `{"prompt"|"messages": ..., "model", "max_tokens", "temperature"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    #[serde(flatten)]
    pub input: Input,
    /// Backend model name.
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Downstream large-language-model backend.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Backend name for logging/debugging.
    fn name(&self) -> &str;

    /// Produce a completion for a prompt or conversation.
    async fn generate(&self, request: &GenerateRequest) -> Result<Completion>;

    /// Describe an image (base64-encoded) according to `prompt`.
    async fn vision(&self, image: &str, prompt: &str) -> Result<String>;
}
