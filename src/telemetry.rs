//! Telemetry metric name constants.
//!
//! Centralised metric names for adapter operations. Consumers install their
//! own `metrics` recorder (e.g. prometheus, statsd); without a recorder
//! installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `huginn_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`, `_usd`).
//!
//! # Common labels
//!
//! - `model`: registry id of the model that served the request
//! - `operation`: facade entry point (e.g. "generate", "chat", "vision")
//! - `status`: outcome: "ok" or "error"
//! - `direction`: token direction: "prompt" or "completion"

/// Total requests dispatched to the inference backend.
///
/// Labels: `model`, `operation`, `status` ("ok" | "error").
pub const REQUESTS_TOTAL: &str = "huginn_requests_total";

/// Request duration in seconds, measured around the whole attempt sequence.
///
/// Labels: `model`, `operation`.
pub const REQUEST_DURATION_SECONDS: &str = "huginn_request_duration_seconds";

/// Total retry attempts (not counting the initial request).
///
/// Labels: `model`, `operation`.
pub const RETRIES_TOTAL: &str = "huginn_retries_total";

/// Total fallback hops to the baseline model.
///
/// Labels: `from`, `to`.
pub const FALLBACKS_TOTAL: &str = "huginn_fallbacks_total";

/// Total tokens consumed.
///
/// Labels: `model`, `direction` ("prompt" | "completion").
pub const TOKENS_TOTAL: &str = "huginn_tokens_total";

/// Cost of each fresh request in USD.
///
/// Labels: `model`.
pub const REQUEST_COST_USD: &str = "huginn_request_cost_usd";

/// Total response cache hits.
///
/// Labels: `operation`.
pub const CACHE_HITS_TOTAL: &str = "huginn_cache_hits_total";

/// Total response cache misses (absent or expired).
///
/// Labels: `operation`.
pub const CACHE_MISSES_TOTAL: &str = "huginn_cache_misses_total";

/// Total entries evicted to make room under the capacity bound.
pub const CACHE_EVICTIONS_TOTAL: &str = "huginn_cache_evictions_total";

/// Total usage records the sink failed to persist.
pub const RECORDING_FAILURES_TOTAL: &str = "huginn_recording_failures_total";
