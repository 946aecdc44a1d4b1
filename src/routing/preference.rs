//! Tenant model preferences.
//!
//! The selector asks a [`PreferenceProvider`] for a tenant's preferred
//! model. Lookups are allowed to fail: the selector treats any error as
//! "no preference". In production the provider is usually backed by the
//! tenant settings table; wrap it in [`CachedPreferences`] so every request
//! does not hit the database.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;

use crate::Result;

/// Source of per-tenant preferred model ids.
#[async_trait]
pub trait PreferenceProvider: Send + Sync {
    /// Preferred model id for `tenant`, if the tenant configured one.
    async fn preferred_model(&self, tenant: &str) -> Result<Option<String>>;
}

/// Provider for deployments without tenant preferences.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPreferences;

#[async_trait]
impl PreferenceProvider for NoPreferences {
    async fn preferred_model(&self, _tenant: &str) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Fixed tenant → model map, typically loaded from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticPreferences {
    models: HashMap<String, String>,
}

impl StaticPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the preferred model for a tenant.
    pub fn with(mut self, tenant: impl Into<String>, model: impl Into<String>) -> Self {
        self.models.insert(tenant.into(), model.into());
        self
    }
}

impl From<HashMap<String, String>> for StaticPreferences {
    fn from(models: HashMap<String, String>) -> Self {
        Self { models }
    }
}

#[async_trait]
impl PreferenceProvider for StaticPreferences {
    async fn preferred_model(&self, tenant: &str) -> Result<Option<String>> {
        Ok(self.models.get(tenant).cloned())
    }
}

/// Default number of tenants kept in the preference cache.
const DEFAULT_MAX_TENANTS: u64 = 10_000;

/// Default time a looked-up preference stays cached.
const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// TTL cache in front of another [`PreferenceProvider`].
///
/// Successful lookups (including "no preference") are cached per tenant.
/// Failed lookups are not cached, so a transient database error does not
/// pin a tenant to "no preference" for the whole TTL.
pub struct CachedPreferences {
    inner: Arc<dyn PreferenceProvider>,
    cache: Cache<String, Option<String>>,
}

impl CachedPreferences {
    /// Cache `inner` with the default bounds (10,000 tenants, 5 minutes).
    pub fn new(inner: Arc<dyn PreferenceProvider>) -> Self {
        Self::with_ttl(inner, DEFAULT_MAX_TENANTS, DEFAULT_TTL)
    }

    /// Cache `inner` with custom bounds.
    pub fn with_ttl(inner: Arc<dyn PreferenceProvider>, max_tenants: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_tenants)
            .time_to_live(ttl)
            .build();
        Self { inner, cache }
    }

    /// Forget every cached preference, e.g. after tenant settings change.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }
}

#[async_trait]
impl PreferenceProvider for CachedPreferences {
    async fn preferred_model(&self, tenant: &str) -> Result<Option<String>> {
        if let Some(cached) = self.cache.get(tenant).await {
            return Ok(cached);
        }
        let looked_up = self.inner.preferred_model(tenant).await?;
        self.cache
            .insert(tenant.to_string(), looked_up.clone())
            .await;
        Ok(looked_up)
    }
}
