//! Response caching.
//!
//! - [`Fingerprint`]: normalized, stable hash of request content used as
//!   the cache key.
//! - [`response::CacheStore`]: bounded TTL store of previously returned
//!   responses. Owned by the adapter; see the [`response`] module docs for
//!   eviction and locking details.

pub mod response;

pub use response::{CacheConfig, CacheEntry, CacheStats, CacheStore, EvictionPolicy};

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::types::Message;

/// Cache key derived from request content.
///
/// Prompts are hashed after trimming surrounding whitespace; conversations
/// are hashed as the JSON serialization of their trimmed messages. The
/// input kind is part of the hash, so a prompt never collides with a
/// conversation whose serialization happens to equal it.
///
/// Uses `DefaultHasher` (SipHash with fixed keys): deterministic within a
/// process, which is all an in-memory cache needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(u64);

impl Fingerprint {
    /// Fingerprint a single prompt.
    pub fn of_prompt(prompt: &str) -> Self {
        Self::hash(&["prompt", prompt.trim()])
    }

    /// Fingerprint a conversation.
    pub fn of_messages(messages: &[Message]) -> Self {
        Self::hash(&["messages", &serialize_messages(messages)])
    }

    /// Scope this fingerprint to an explicitly requested model, so the same
    /// input sent to different pinned models is cached separately.
    pub fn with_model(self, model: Option<&str>) -> Self {
        match model {
            Some(model) => {
                let mut hasher = DefaultHasher::new();
                self.0.hash(&mut hasher);
                model.hash(&mut hasher);
                Self(hasher.finish())
            }
            None => self,
        }
    }

    fn hash(parts: &[&str]) -> Self {
        let mut hasher = DefaultHasher::new();
        for part in parts {
            part.hash(&mut hasher);
        }
        Self(hasher.finish())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Stable JSON serialization of a conversation with trimmed contents.
pub(crate) fn serialize_messages(messages: &[Message]) -> String {
    let normalized: Vec<Message> = messages.iter().map(Message::normalized).collect();
    // Serializing plain structs of strings cannot fail.
    serde_json::to_string(&normalized).unwrap_or_default()
}
