//! Bounded, time-expiring response cache.
//!
//! [`CacheStore`] maps request [`Fingerprint`]s to previously returned
//! [`AiResponse`]s. Entries expire lazily: an expired entry is dropped by
//! the read that finds it. When the store is full, exactly one entry is
//! evicted per insertion, chosen by the configured [`EvictionPolicy`].
//!
//! # Concurrency
//!
//! All state sits behind one mutex, so "check capacity, evict, insert" is a
//! single critical section and the store can never overshoot its capacity
//! under concurrent writers. No lock is held across an `.await`.
//!
//! # Eviction order
//!
//! Each entry carries a sequence number; a `BTreeMap` from sequence to key
//! gives the eviction order. Under [`EvictionPolicy::Fifo`] the sequence is
//! assigned at insertion and never changes. Under [`EvictionPolicy::Lru`] a
//! hit re-stamps the entry with a fresh sequence.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use serde::Deserialize;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::Fingerprint;
use crate::telemetry;
use crate::types::AiResponse;

/// Which entry to drop when the store is full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    /// Oldest insertion first; reads do not affect the order.
    #[default]
    Fifo,
    /// Least recently inserted-or-hit first.
    Lru,
}

/// Configuration for the response cache.
///
/// ```rust
/// # use huginn::cache::{CacheConfig, EvictionPolicy};
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(500)
///     .ttl(Duration::from_secs(600))
///     .policy(EvictionPolicy::Lru);
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of resident entries. Default: 1,000.
    pub max_entries: usize,
    /// Time-to-live for entries. Default: 1 hour.
    pub ttl: Duration,
    /// Eviction order. Default: FIFO.
    pub policy: EvictionPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1_000,
            ttl: Duration::from_secs(3600),
            policy: EvictionPolicy::Fifo,
        }
    }
}

impl CacheConfig {
    /// Create a new config with the default bounds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of resident entries.
    pub fn max_entries(mut self, n: usize) -> Self {
        self.max_entries = n;
        self
    }

    /// Set the time-to-live for entries.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the eviction policy.
    pub fn policy(mut self, policy: EvictionPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// A resident cache entry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: Fingerprint,
    /// Stored response, already marked `cached = true`.
    pub response: AiResponse,
    pub created_at: Instant,
    /// Number of hits served from this entry, including the current one
    /// when returned from [`CacheStore::get`].
    pub hit_count: u64,
    seq: u64,
}

/// Snapshot of cache occupancy.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CacheStats {
    pub size: usize,
    /// `hits / (hits + resident entries)`, over resident entries only.
    pub hit_rate: f64,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<Fingerprint, CacheEntry>,
    order: BTreeMap<u64, Fingerprint>,
    next_seq: u64,
}

impl Inner {
    fn stamp(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    fn remove(&mut self, key: &Fingerprint) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.order.remove(&entry.seq);
        Some(entry)
    }
}

/// Bounded response cache keyed by request fingerprint.
pub struct CacheStore {
    inner: Mutex<Inner>,
    config: CacheConfig,
}

impl CacheStore {
    /// Create an empty store with the given configuration.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            config,
        }
    }

    /// The configuration this store was built with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            warn!("cache lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Look up an entry, counting the hit.
    ///
    /// Returns `None` when the key is absent or its entry has outlived the
    /// TTL; an expired entry is removed as part of the read.
    pub fn get(&self, key: &Fingerprint) -> Option<CacheEntry> {
        let mut inner = self.lock();
        let expired = match inner.entries.get(key) {
            None => return None,
            Some(entry) => entry.created_at.elapsed() > self.config.ttl,
        };
        if expired {
            inner.remove(key);
            debug!(%key, "cache entry expired");
            return None;
        }

        let fresh_seq = match self.config.policy {
            EvictionPolicy::Lru => Some(inner.stamp()),
            EvictionPolicy::Fifo => None,
        };
        let Inner { entries, order, .. } = &mut *inner;
        let entry = entries.get_mut(key)?;
        entry.hit_count += 1;
        if let Some(seq) = fresh_seq {
            order.remove(&entry.seq);
            order.insert(seq, *key);
            entry.seq = seq;
        }
        Some(entry.clone())
    }

    /// Store a response under `key`.
    ///
    /// The stored copy is marked `cached = true`. If the store is at
    /// capacity and `key` is new, exactly one entry is evicted first.
    /// Re-inserting an existing key replaces it and resets its age and hits.
    pub fn put(&self, key: Fingerprint, response: AiResponse) {
        if self.config.max_entries == 0 {
            return;
        }
        let mut inner = self.lock();
        if inner.remove(&key).is_none() && inner.entries.len() >= self.config.max_entries {
            let victim = inner.order.first_key_value().map(|(_, k)| *k);
            if let Some(victim) = victim {
                inner.remove(&victim);
                metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL).increment(1);
                debug!(key = %victim, "evicted cache entry");
            }
        }
        let seq = inner.stamp();
        inner.order.insert(seq, key);
        inner.entries.insert(
            key,
            CacheEntry {
                key,
                response: AiResponse {
                    cached: true,
                    ..response
                },
                created_at: Instant::now(),
                hit_count: 0,
                seq,
            },
        );
    }

    /// Whether `key` is resident, without counting a hit or checking TTL.
    pub fn contains(&self, key: &Fingerprint) -> bool {
        self.lock().entries.contains_key(key)
    }

    /// Number of resident entries (expired ones included until read).
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    /// Occupancy and hit rate over the resident entries.
    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        let size = inner.entries.len();
        let hits: u64 = inner.entries.values().map(|e| e.hit_count).sum();
        let total = hits + size as u64;
        CacheStats {
            size,
            hit_rate: if total > 0 {
                hits as f64 / total as f64
            } else {
                0.0
            },
        }
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
