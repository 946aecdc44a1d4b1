//! Usage record persistence.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};

use crate::types::UsageRecord;
use crate::{HuginnError, Result};

/// Append-only store of usage records.
///
/// `query` filters by tenant (`company_id`) and by the inclusive
/// `[start, end]` window on `created_at`. A `None` tenant matches only
/// records without a tenant.
#[async_trait]
pub trait UsageSink: Send + Sync {
    async fn insert(&self, record: UsageRecord) -> Result<()>;

    async fn query(
        &self,
        tenant: Option<&str>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<UsageRecord>>;
}

fn matches(
    record: &UsageRecord,
    tenant: Option<&str>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> bool {
    record.company_id.as_deref() == tenant && record.in_window(start, end)
}

/// In-process sink. Records live as long as the sink.
#[derive(Debug, Default)]
pub struct MemoryUsageSink {
    records: RwLock<Vec<UsageRecord>>,
}

impl MemoryUsageSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record inserted so far, in insertion order.
    pub async fn records(&self) -> Vec<UsageRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl UsageSink for MemoryUsageSink {
    async fn insert(&self, record: UsageRecord) -> Result<()> {
        self.records.write().await.push(record);
        Ok(())
    }

    async fn query(
        &self,
        tenant: Option<&str>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<UsageRecord>> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .filter(|r| matches(r, tenant, start, end))
            .cloned()
            .collect())
    }
}

/// Sink appending one JSON object per line to a file.
///
/// Writes are serialized through an internal lock so concurrent inserts
/// never interleave within a line. Queries re-read the whole file; lines
/// that fail to parse are skipped.
#[derive(Debug)]
pub struct JsonlUsageSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlUsageSink {
    /// Use `path`, creating the file on first insert.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl UsageSink for JsonlUsageSink {
    async fn insert(&self, record: UsageRecord) -> Result<()> {
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                HuginnError::Recording(format!("open {}: {e}", self.path.display()))
            })?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn query(
        &self,
        tenant: Option<&str>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<UsageRecord>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut records = Vec::new();
        for (lineno, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<UsageRecord>(line) {
                Ok(record) if matches(&record, tenant, start, end) => records.push(record),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), line = lineno + 1, error = %e, "skipping malformed usage line");
                }
            }
        }
        Ok(records)
    }
}
