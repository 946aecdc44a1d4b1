//! Adapter configuration file.
//!
//! ```toml
//! [defaults]
//! priority = "balanced"
//! max_retries = 3
//! timeout_ms = 30000
//! tenant = "acme"
//!
//! [cache]
//! max_entries = 1000
//! ttl_secs = 3600
//! policy = "fifo"
//!
//! [backend]
//! base_url = "http://localhost:8080/ai"
//! api_key_env = "HUGINN_API_KEY"
//!
//! [models]
//! baseline = "gpt-3.5-turbo"
//! vision = "gpt-4-vision-preview"
//!
//! [execution]
//! retry_base_delay_ms = 1000
//! max_output_tokens = 1000
//! temperature = 0.7
//!
//! [usage]
//! log_path = "/var/lib/huginn/usage.jsonl"
//!
//! [preferences]
//! acme = "claude-3-opus"
//! ```
//!
//! Every section is optional.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::adapter::{DEFAULT_BASELINE_MODEL, DEFAULT_VISION_MODEL};
use crate::cache::{CacheConfig, EvictionPolicy};
use crate::types::{ModelDescriptor, RequestDefaults};
use crate::{HuginnError, Result};

/// Complete adapter configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    pub defaults: RequestDefaults,
    pub cache: CacheSection,
    pub backend: Option<BackendConfig>,
    pub models: ModelsConfig,
    pub execution: ExecutionConfig,
    pub usage: UsageConfig,
    /// Tenant → preferred model id.
    pub preferences: HashMap<String, String>,
}

/// `[cache]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    pub max_entries: usize,
    pub ttl_secs: u64,
    pub policy: EvictionPolicy,
}

impl Default for CacheSection {
    fn default() -> Self {
        let defaults = CacheConfig::default();
        Self {
            max_entries: defaults.max_entries,
            ttl_secs: defaults.ttl.as_secs(),
            policy: defaults.policy,
        }
    }
}

impl CacheSection {
    pub fn to_cache_config(&self) -> CacheConfig {
        CacheConfig::new()
            .max_entries(self.max_entries)
            .ttl(Duration::from_secs(self.ttl_secs))
            .policy(self.policy)
    }
}

/// `[backend]` section: HTTP inference service.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    /// Environment variable holding the bearer token.
    #[serde(default)]
    pub api_key_env: Option<String>,
}

impl BackendConfig {
    /// Bearer token from the configured environment variable, if set.
    pub fn api_key(&self) -> Option<String> {
        self.api_key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|key| !key.is_empty())
    }
}

/// `[models]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Registry id of the fallback target.
    pub baseline: String,
    /// Model name for vision calls.
    pub vision: String,
    /// Extra catalog entries, added to (or replacing) the embedded seed.
    pub catalog: Vec<ModelDescriptor>,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            baseline: DEFAULT_BASELINE_MODEL.to_string(),
            vision: DEFAULT_VISION_MODEL.to_string(),
            catalog: Vec::new(),
        }
    }
}

/// `[execution]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub retry_base_delay_ms: u64,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            retry_base_delay_ms: 1000,
            max_output_tokens: 1000,
            temperature: 0.7,
        }
    }
}

/// `[usage]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UsageConfig {
    /// JSON-lines file receiving usage rows. In-memory when unset.
    pub log_path: Option<PathBuf>,
    /// User id stamped on every usage row.
    pub user_id: Option<String>,
}

impl AdapterConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            HuginnError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            HuginnError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| HuginnError::Configuration(format!("Failed to parse config: {e}")))
    }
}
