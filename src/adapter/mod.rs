//! Adapter facade, request executor and builder.
//!
//! A request flows through the adapter as:
//!
//! ```text
//! RequestConfig ─► resolve ─► Fingerprint ─► CacheStore ──hit──► response
//!                                               │ miss
//!                                               ▼
//!                          ModelSelector ─► RequestExecutor ─► backend
//!                                               │ (retry, one fallback hop)
//!                                               ▼
//!                              cost ─► CacheStore.put ─► UsageRecorder
//! ```

mod builder;
mod executor;
mod facade;

pub use builder::{AdapterBuilder, DEFAULT_BASELINE_MODEL, DEFAULT_VISION_MODEL, Huginn};
pub use executor::{Executed, RequestExecutor};
pub use facade::AiAdapter;
