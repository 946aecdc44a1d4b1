//! Usage records and aggregate statistics.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::model::Provider;

/// Facade entry point a usage record was produced by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Generate,
    Chat,
    Analyze,
    Vision,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Generate => "generate",
            Operation::Chat => "chat",
            Operation::Analyze => "analyze",
            Operation::Vision => "vision",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One completed adapter call. Append-only once handed to a sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub operation: Operation,
    pub model: String,
    pub provider: Provider,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    pub cost_usd: f64,
    pub latency_ms: u64,
    pub cached: bool,
    /// Size of the request input in bytes (prompt, serialized messages or
    /// encoded image).
    pub input_size: usize,
    pub created_at: DateTime<Utc>,
}

impl UsageRecord {
    /// Whether the record falls inside the inclusive `[start, end]` window.
    pub fn in_window(&self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> bool {
        start.is_none_or(|s| self.created_at >= s) && end.is_none_or(|e| self.created_at <= e)
    }
}

/// Per-model or per-operation totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Breakdown {
    pub count: u64,
    pub tokens: u64,
    pub cost: f64,
}

/// Aggregated usage over a set of records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    pub total_requests: u64,
    pub total_tokens: u64,
    pub total_cost: f64,
    /// Mean latency in milliseconds; 0 when there are no records.
    pub avg_latency: f64,
    /// Fraction of records served from cache; 0 when there are no records.
    pub cache_hit_rate: f64,
    pub by_model: BTreeMap<String, Breakdown>,
    pub by_operation: BTreeMap<String, Breakdown>,
}
