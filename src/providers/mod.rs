//! Inference backends and the retry machinery that drives them.
//!
//! - [`traits::InferenceBackend`]: the seam the adapter calls through
//! - [`http::HttpBackend`]: JSON-over-HTTP implementation
//! - [`retry`]: per-attempt deadlines and linear backoff

pub mod http;
pub mod retry;
pub mod traits;

pub use http::HttpBackend;
pub use retry::RetryPolicy;
pub use traits::{GenerateRequest, InferenceBackend, Input};
