//! Per-request configuration and adapter-wide defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::model::Provider;
use crate::{HuginnError, Result};

/// Optimisation objective used when no explicit model is requested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Speed,
    Accuracy,
    Cost,
    #[default]
    Balanced,
}

/// Options for a single adapter call.
///
/// Every field is optional; unset fields take the adapter's
/// [`RequestDefaults`].
///
/// ```rust
/// # use huginn::{Priority, RequestConfig};
/// let config = RequestConfig::new()
///     .priority(Priority::Cost)
///     .caching(false)
///     .max_retries(2);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<Provider>,
    /// Explicit model id; bypasses selection scoring.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caching: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// Total attempts per model, including the first one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    /// Deadline for each individual backend attempt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Tenant (company) the call is made on behalf of.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
}

impl RequestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn provider(mut self, provider: Provider) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn caching(mut self, enabled: bool) -> Self {
        self.caching = Some(enabled);
        self
    }

    pub fn fallback(mut self, enabled: bool) -> Self {
        self.fallback = Some(enabled);
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = Some(n);
        self
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = Some(ms);
        self
    }

    pub fn tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }

    /// Merge this config over `defaults` and validate the result.
    pub fn resolve(&self, defaults: &RequestDefaults) -> Result<ResolvedConfig> {
        let resolved = ResolvedConfig {
            provider: self.provider.unwrap_or(defaults.provider),
            model: self.model.clone(),
            caching: self.caching.unwrap_or(defaults.caching),
            fallback: self.fallback.unwrap_or(defaults.fallback),
            priority: self.priority.unwrap_or(defaults.priority),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            timeout: Duration::from_millis(self.timeout_ms.unwrap_or(defaults.timeout_ms)),
            tenant: self.tenant.clone().or_else(|| defaults.tenant.clone()),
        };
        resolved.validate()?;
        Ok(resolved)
    }
}

/// Adapter-wide request defaults.
///
/// ```toml
/// [defaults]
/// provider = "auto"
/// priority = "balanced"
/// max_retries = 3
/// timeout_ms = 30000
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestDefaults {
    pub provider: Provider,
    pub caching: bool,
    pub fallback: bool,
    pub priority: Priority,
    pub max_retries: u32,
    pub timeout_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            provider: Provider::Auto,
            caching: true,
            fallback: true,
            priority: Priority::Balanced,
            max_retries: 3,
            timeout_ms: 30_000,
            tenant: None,
        }
    }
}

/// A [`RequestConfig`] with every default applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub provider: Provider,
    pub model: Option<String>,
    pub caching: bool,
    pub fallback: bool,
    pub priority: Priority,
    pub max_retries: u32,
    pub timeout: Duration,
    pub tenant: Option<String>,
}

impl ResolvedConfig {
    fn validate(&self) -> Result<()> {
        if self.max_retries == 0 {
            return Err(HuginnError::Validation(
                "max_retries must be at least 1".into(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(HuginnError::Validation(
                "timeout_ms must be greater than zero".into(),
            ));
        }
        if let Some(model) = &self.model
            && model.trim().is_empty()
        {
            return Err(HuginnError::Validation("model must not be empty".into()));
        }
        Ok(())
    }
}
