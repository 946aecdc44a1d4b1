//! Aggregation of usage records.

use crate::types::{Breakdown, UsageRecord, UsageStats};

/// Fold records into totals and per-model / per-operation breakdowns.
///
/// Empty input yields all-zero stats (no division by zero).
pub fn aggregate(records: &[UsageRecord]) -> UsageStats {
    let mut stats = UsageStats::default();
    let mut latency_sum: u64 = 0;
    let mut cached: u64 = 0;

    for record in records {
        let tokens = u64::from(record.total_tokens);
        stats.total_requests += 1;
        stats.total_tokens += tokens;
        stats.total_cost += record.cost_usd;
        latency_sum += record.latency_ms;
        if record.cached {
            cached += 1;
        }

        add(
            stats.by_model.entry(record.model.clone()).or_default(),
            tokens,
            record.cost_usd,
        );
        add(
            stats
                .by_operation
                .entry(record.operation.as_str().to_string())
                .or_default(),
            tokens,
            record.cost_usd,
        );
    }

    if stats.total_requests > 0 {
        let n = stats.total_requests as f64;
        stats.avg_latency = latency_sum as f64 / n;
        stats.cache_hit_rate = cached as f64 / n;
    }
    stats
}

fn add(breakdown: &mut Breakdown, tokens: u64, cost: f64) {
    breakdown.count += 1;
    breakdown.tokens += tokens;
    breakdown.cost += cost;
}
