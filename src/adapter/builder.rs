//! Builder for configuring adapter instances

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use super::executor::RequestExecutor;
use super::facade::AiAdapter;
use crate::cache::{CacheConfig, CacheStore};
use crate::config::AdapterConfig;
use crate::providers::{HttpBackend, InferenceBackend};
use crate::registry::ModelRegistry;
use crate::routing::{ModelSelector, NoPreferences, PreferenceProvider, StaticPreferences};
use crate::types::{ModelDescriptor, Provider, RequestConfig, RequestDefaults};
use crate::usage::{JsonlUsageSink, MemoryUsageSink, UsageRecorder, UsageSink};
use crate::{HuginnError, Result};

/// Registry id of the default fallback target.
pub const DEFAULT_BASELINE_MODEL: &str = "gpt-3.5-turbo";

/// Model name used for image analysis.
pub const DEFAULT_VISION_MODEL: &str = "gpt-4-vision-preview";

const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 1000;
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

/// Main entry point for creating adapter instances.
pub struct Huginn;

impl Huginn {
    /// Create a new builder for configuring the adapter.
    pub fn builder() -> AdapterBuilder {
        AdapterBuilder::new()
    }
}

/// Builder for configuring adapter instances.
///
/// Only the backend is required. Everything else defaults to the embedded
/// model catalog, an in-memory usage sink and no tenant preferences.
///
/// ```rust,no_run
/// # use huginn::{Huginn, HttpBackend, Priority, RequestDefaults};
/// # fn demo() -> huginn::Result<()> {
/// let adapter = Huginn::builder()
///     .backend(HttpBackend::new("http://localhost:8080/ai"))
///     .defaults(RequestDefaults {
///         priority: Priority::Cost,
///         ..RequestDefaults::default()
///     })
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct AdapterBuilder {
    backend: Option<Arc<dyn InferenceBackend>>,
    registry: Option<ModelRegistry>,
    preferences: Arc<dyn PreferenceProvider>,
    sink: Option<Arc<dyn UsageSink>>,
    cache: CacheConfig,
    defaults: RequestDefaults,
    baseline_model: String,
    vision_model: ModelDescriptor,
    retry_base_delay: Duration,
    max_output_tokens: u32,
    temperature: f32,
    user_id: Option<String>,
}

impl AdapterBuilder {
    pub fn new() -> Self {
        Self {
            backend: None,
            registry: None,
            preferences: Arc::new(NoPreferences),
            sink: None,
            cache: CacheConfig::default(),
            defaults: RequestDefaults::default(),
            baseline_model: DEFAULT_BASELINE_MODEL.to_string(),
            vision_model: ModelDescriptor::new(DEFAULT_VISION_MODEL, Provider::OpenAi),
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            user_id: None,
        }
    }

    /// Start from a loaded [`AdapterConfig`].
    ///
    /// Applies every section of the config. When a `[backend]` section is
    /// present an [`HttpBackend`] is configured from it, and a
    /// `[usage] log_path` selects a [`JsonlUsageSink`].
    pub fn from_config(config: &AdapterConfig) -> Result<Self> {
        let mut registry = ModelRegistry::with_embedded_seed();
        for model in &config.models.catalog {
            registry.insert(model.clone())?;
        }

        let mut builder = Self::new()
            .registry(registry)
            .defaults(config.defaults.clone())
            .cache(config.cache.to_cache_config())
            .baseline_model(&config.models.baseline)
            .vision_model(&config.models.vision)
            .retry_base_delay(Duration::from_millis(config.execution.retry_base_delay_ms))
            .max_output_tokens(config.execution.max_output_tokens)
            .temperature(config.execution.temperature);

        if !config.preferences.is_empty() {
            builder = builder.preferences(StaticPreferences::from(config.preferences.clone()));
        }
        if let Some(user_id) = &config.usage.user_id {
            builder = builder.user_id(user_id);
        }
        if let Some(path) = &config.usage.log_path {
            builder = builder.usage_sink(JsonlUsageSink::new(path));
        }
        if let Some(backend) = &config.backend {
            let mut http = HttpBackend::new(&backend.base_url);
            if let Some(key) = backend.api_key() {
                http = http.api_key(key);
            }
            builder = builder.backend(http);
        }
        Ok(builder)
    }

    /// Set the inference backend.
    pub fn backend(mut self, backend: impl InferenceBackend + 'static) -> Self {
        self.backend = Some(Arc::new(backend));
        self
    }

    /// Set an already shared inference backend.
    pub fn shared_backend(mut self, backend: Arc<dyn InferenceBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Replace the embedded model catalog.
    pub fn registry(mut self, registry: ModelRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Set the tenant preference source.
    pub fn preferences(mut self, preferences: impl PreferenceProvider + 'static) -> Self {
        self.preferences = Arc::new(preferences);
        self
    }

    /// Set the usage sink (default: in-memory).
    pub fn usage_sink(mut self, sink: impl UsageSink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Set an already shared usage sink.
    pub fn shared_usage_sink(mut self, sink: Arc<dyn UsageSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Configure the response cache.
    pub fn cache(mut self, config: CacheConfig) -> Self {
        self.cache = config;
        self
    }

    /// Set the defaults merged under every request config.
    pub fn defaults(mut self, defaults: RequestDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Set the default tenant (used by [`AiAdapter::get_usage_stats`] and
    /// requests that don't name one).
    pub fn tenant(mut self, tenant: impl Into<String>) -> Self {
        self.defaults.tenant = Some(tenant.into());
        self
    }

    /// Set the user id stamped on usage rows.
    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Set the fallback target. Must be a registered model id.
    pub fn baseline_model(mut self, id: impl Into<String>) -> Self {
        self.baseline_model = id.into();
        self
    }

    /// Set the model name used for vision calls.
    pub fn vision_model(mut self, name: impl Into<String>) -> Self {
        self.vision_model = ModelDescriptor::new(name, Provider::OpenAi);
        self
    }

    /// Set the linear backoff unit between attempts.
    pub fn retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    /// Set the completion token limit sent to the backend. Clamped to each
    /// model's own limit.
    pub fn max_output_tokens(mut self, n: u32) -> Self {
        self.max_output_tokens = n;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Build the adapter.
    ///
    /// Fails with [`HuginnError::Configuration`] when no backend is set,
    /// the baseline model is not registered, or the defaults are invalid.
    pub fn build(self) -> Result<AiAdapter> {
        let backend = self.backend.ok_or_else(|| {
            HuginnError::Configuration("an inference backend is required".into())
        })?;
        let registry = self
            .registry
            .unwrap_or_else(ModelRegistry::with_embedded_seed);
        let baseline = registry
            .lookup(&self.baseline_model)
            .cloned()
            .ok_or_else(|| {
                HuginnError::Configuration(format!(
                    "baseline model '{}' is not registered",
                    self.baseline_model
                ))
            })?;
        RequestConfig::new()
            .resolve(&self.defaults)
            .map_err(|e| HuginnError::Configuration(format!("invalid request defaults: {e}")))?;

        let sink = self
            .sink
            .unwrap_or_else(|| Arc::new(MemoryUsageSink::new()));

        info!(
            backend = backend.name(),
            models = registry.len(),
            baseline = %baseline.id,
            cache_entries = self.cache.max_entries,
            "adapter ready"
        );

        Ok(AiAdapter {
            selector: ModelSelector::new(Arc::new(registry), self.preferences),
            executor: RequestExecutor::new(
                backend,
                baseline,
                self.retry_base_delay,
                self.max_output_tokens,
                self.temperature,
            ),
            cache: CacheStore::new(self.cache),
            recorder: UsageRecorder::new(sink),
            defaults: self.defaults,
            vision_model: self.vision_model,
            user_id: self.user_id,
        })
    }
}

impl Default for AdapterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
