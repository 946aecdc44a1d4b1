//! Fire-and-forget usage recording.
//!
//! [`UsageRecorder::record`] hands the record to the sink on a spawned task
//! and returns immediately. A failing sink is logged and counted in
//! [`telemetry::RECORDING_FAILURES_TOTAL`]; the caller never sees the error.
//! [`UsageRecorder::flush`] waits for every outstanding write, which is what
//! tests and graceful shutdown want. Writes are detached from the recorder:
//! dropping it (or the adapter owning it) never cancels a queued record.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{error, warn};

use super::sink::UsageSink;
use super::stats::aggregate;
use crate::Result;
use crate::telemetry;
use crate::types::{ModelDescriptor, UsageRecord, UsageStats};

/// Cost in USD of `total_tokens` on `model`.
pub fn cost(total_tokens: u32, model: &ModelDescriptor) -> f64 {
    (f64::from(total_tokens) / 1000.0) * model.cost_per_1k_tokens
}

/// Persists usage records in the background and aggregates them on demand.
pub struct UsageRecorder {
    sink: Arc<dyn UsageSink>,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl UsageRecorder {
    pub fn new(sink: Arc<dyn UsageSink>) -> Self {
        Self {
            sink,
            pending: Mutex::new(Vec::new()),
        }
    }

    fn pending(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.pending.lock().unwrap_or_else(|poisoned| {
            warn!("usage recorder lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Queue `record` for persistence. Must be called within a tokio runtime.
    pub fn record(&self, record: UsageRecord) {
        let sink = Arc::clone(&self.sink);
        let mut pending = self.pending();
        // reap finished writes so the list does not grow without bound
        pending.retain(|handle| !handle.is_finished());
        pending.push(tokio::spawn(async move {
            let model = record.model.clone();
            let operation = record.operation;
            if let Err(e) = sink.insert(record).await {
                metrics::counter!(telemetry::RECORDING_FAILURES_TOTAL).increment(1);
                error!(%model, %operation, error = %e, "failed to record usage");
            }
        }));
    }

    /// Wait until every queued record has been handed to the sink.
    pub async fn flush(&self) {
        let pending = std::mem::take(&mut *self.pending());
        for handle in pending {
            if let Err(e) = handle.await {
                metrics::counter!(telemetry::RECORDING_FAILURES_TOTAL).increment(1);
                error!(error = %e, "usage recording task failed");
            }
        }
    }

    /// Aggregate the records of `tenant` inside the inclusive window.
    pub async fn stats(
        &self,
        tenant: Option<&str>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<UsageStats> {
        let records = self.sink.query(tenant, start, end).await?;
        Ok(aggregate(&records))
    }
}
