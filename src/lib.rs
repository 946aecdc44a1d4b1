//! Huginn - AI request adapter for LLM backends
//!
//! A single [`AiAdapter`] sits in front of an inference backend and handles
//! everything around the model call: it picks a model for the request's
//! priority (speed, accuracy, cost or a balanced score), serves repeated
//! requests from a bounded TTL cache, retries transient failures with
//! linear backoff, falls back once to a cheap baseline model, and records
//! token usage and cost per tenant.
//!
//! # Example
//!
//! ```rust,no_run
//! use huginn::{Huginn, HttpBackend, Message, Priority, RequestConfig};
//!
//! #[tokio::main]
//! async fn main() -> huginn::Result<()> {
//!     let adapter = Huginn::builder()
//!         .backend(HttpBackend::new("http://localhost:8080/ai"))
//!         .tenant("acme")
//!         .build()?;
//!
//!     let response = adapter
//!         .chat(
//!             &[
//!                 Message::system("You are a helpful assistant."),
//!                 Message::user("What is the capital of France?"),
//!             ],
//!             &RequestConfig::new().priority(Priority::Cost),
//!         )
//!         .await?;
//!
//!     println!("{} (via {})", response.content, response.model);
//!     adapter.flush_usage().await;
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod cache;
pub mod config;
pub mod error;
pub mod providers;
pub mod registry;
pub mod routing;
pub mod telemetry;
pub mod types;
pub mod usage;

// Re-export main types at crate root
pub use adapter::{AdapterBuilder, AiAdapter, Huginn};
pub use cache::{CacheConfig, CacheStats, EvictionPolicy, Fingerprint};
pub use config::AdapterConfig;
pub use error::{HuginnError, Result};
pub use providers::{GenerateRequest, HttpBackend, InferenceBackend, Input};
pub use registry::ModelRegistry;
pub use routing::{CachedPreferences, NoPreferences, PreferenceProvider, StaticPreferences};
pub use usage::{JsonlUsageSink, MemoryUsageSink, UsageSink};

// Re-export all types
pub use types::{
    AiResponse, Breakdown, Completion, Message, ModelDescriptor, Operation, Priority, Provider,
    RequestConfig, RequestDefaults, ResolvedConfig, Role, TokenUsage, Usage, UsageRecord,
    UsageStats,
};

/// Crate version.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");
