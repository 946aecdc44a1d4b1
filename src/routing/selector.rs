//! Model selection.
//!
//! Resolution order for a request:
//!
//! 1. An explicit model id wins outright (unknown ids are rejected).
//! 2. Under `balanced` priority, the tenant's preferred model wins when it
//!    is registered and matches the provider filter.
//! 3. Otherwise every candidate is scored for the requested priority and
//!    the best one is chosen. Ties go to the earliest registered model.
//!
//! # Balanced score
//!
//! ```text
//! score = 0.4 * accuracy
//!       + 0.3 * (1 / cost_per_1k_tokens) * K_COST
//!       + 0.3 * (1 / avg_latency_ms)     * K_LATENCY
//! ```
//!
//! `K_COST` and `K_LATENCY` bring the reciprocal terms onto roughly the same
//! scale as the accuracy score for the seeded catalog (costs in the
//! 0.001–0.03 USD range, latencies in the 500–2000 ms range).

use std::sync::Arc;

use tracing::{debug, warn};

use super::preference::PreferenceProvider;
use crate::registry::ModelRegistry;
use crate::types::{ModelDescriptor, Operation, Priority, Provider, ResolvedConfig};
use crate::{HuginnError, Result};

/// Scale applied to `1 / cost_per_1k_tokens` in the balanced score.
pub const K_COST: f64 = 0.0001;

/// Scale applied to `1 / avg_latency_ms` in the balanced score.
pub const K_LATENCY: f64 = 1000.0;

/// Balanced score of a model; higher is better.
pub fn balanced_score(model: &ModelDescriptor) -> f64 {
    0.4 * model.accuracy_score
        + 0.3 * (1.0 / model.cost_per_1k_tokens) * K_COST
        + 0.3 * (1.0 / model.avg_latency_ms as f64) * K_LATENCY
}

/// Pick the best registered model for `priority` among those `provider`
/// admits. Pure function of the registry; no preference lookup.
///
/// Returns `None` when no candidate matches the provider filter.
pub fn rank(
    registry: &ModelRegistry,
    priority: Priority,
    provider: Provider,
) -> Option<&ModelDescriptor> {
    let mut best: Option<(&ModelDescriptor, f64)> = None;
    for model in registry.iter().filter(|m| provider.admits(m.provider)) {
        // Every priority is expressed as "higher is better"; strict `>`
        // keeps the earliest registered model on ties.
        let score = match priority {
            Priority::Speed => -(model.avg_latency_ms as f64),
            Priority::Accuracy => model.accuracy_score,
            Priority::Cost => -model.cost_per_1k_tokens,
            Priority::Balanced => balanced_score(model),
        };
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((model, score)),
        }
    }
    best.map(|(model, _)| model)
}

/// Chooses the model that serves a request.
pub struct ModelSelector {
    registry: Arc<ModelRegistry>,
    preferences: Arc<dyn PreferenceProvider>,
}

impl ModelSelector {
    pub fn new(registry: Arc<ModelRegistry>, preferences: Arc<dyn PreferenceProvider>) -> Self {
        Self {
            registry,
            preferences,
        }
    }

    /// The catalog this selector chooses from.
    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Select a model for `task` under the resolved request config.
    pub async fn select(
        &self,
        task: Operation,
        config: &ResolvedConfig,
    ) -> Result<ModelDescriptor> {
        if let Some(id) = &config.model {
            return self.registry.lookup(id).cloned().ok_or_else(|| {
                HuginnError::Validation(format!("unknown model '{id}'"))
            });
        }

        if config.priority == Priority::Balanced
            && let Some(preferred) = self.tenant_preference(config.tenant.as_deref()).await
            && let Some(model) = self.registry.lookup(&preferred)
            && config.provider.admits(model.provider)
        {
            debug!(%task, model = %model.id, "using tenant preferred model");
            return Ok(model.clone());
        }

        let model = rank(&self.registry, config.priority, config.provider)
            .cloned()
            .ok_or_else(|| {
                HuginnError::Validation(format!(
                    "no registered model for provider '{}'",
                    config.provider
                ))
            })?;
        debug!(%task, priority = ?config.priority, model = %model.id, "selected model");
        Ok(model)
    }

    /// Look up the tenant preference, treating every failure as "none".
    async fn tenant_preference(&self, tenant: Option<&str>) -> Option<String> {
        let tenant = tenant?;
        match self.preferences.preferred_model(tenant).await {
            Ok(preferred) => preferred,
            Err(e) => {
                warn!(tenant, error = %e, "preference lookup failed, ignoring");
                None
            }
        }
    }
}
