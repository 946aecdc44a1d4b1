//! Model registry: static catalog of selectable models.
//!
//! The registry is populated once at startup, either from the compiled-in
//! seed or programmatically, and is read-only afterwards. Lookups go through
//! a key index; iteration always follows registration order, which is what
//! makes selection tie-breaking deterministic.

use std::collections::HashMap;

use tracing::error;

use crate::types::{ModelDescriptor, Provider};
use crate::{HuginnError, Result};

/// Catalog of models with their cost, latency and accuracy characteristics.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    entries: Vec<ModelDescriptor>,
    index: HashMap<String, usize>,
}

impl ModelRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model, replacing any existing entry with the same id.
    ///
    /// A replaced entry keeps its original registration position.
    pub fn insert(&mut self, model: ModelDescriptor) -> Result<()> {
        if model.provider == Provider::Auto {
            return Err(HuginnError::Configuration(format!(
                "model '{}' must name a concrete provider",
                model.id
            )));
        }
        if !(model.cost_per_1k_tokens > 0.0) || model.avg_latency_ms == 0 {
            return Err(HuginnError::Configuration(format!(
                "model '{}' needs a positive cost and latency",
                model.id
            )));
        }
        match self.index.get(&model.id) {
            Some(&idx) => self.entries[idx] = model,
            None => {
                self.index.insert(model.id.clone(), self.entries.len());
                self.entries.push(model);
            }
        }
        Ok(())
    }

    /// Look up a model by registry id.
    pub fn lookup(&self, id: &str) -> Option<&ModelDescriptor> {
        self.index.get(id).map(|&idx| &self.entries[idx])
    }

    /// Whether a model with this id is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Iterate models in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ModelDescriptor> {
        self.entries.iter()
    }

    /// Number of registered models.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Create a registry pre-populated with the embedded seed catalog.
    ///
    /// The seed holds gpt-4, gpt-3.5-turbo, claude-3-opus and claude-instant
    /// in that order.
    pub fn with_embedded_seed() -> Self {
        let mut registry = Self::new();
        match serde_json::from_str::<Vec<ModelDescriptor>>(EMBEDDED_SEED) {
            Ok(entries) => {
                for entry in entries {
                    if let Err(e) = registry.insert(entry) {
                        error!(error = %e, "skipping invalid seed entry");
                    }
                }
            }
            Err(e) => {
                // Seed is compiled in and tested; an empty registry is still usable.
                error!(error = %e, "failed to parse embedded model seed");
            }
        }
        registry
    }
}

/// Raw JSON seed data compiled into the binary.
const EMBEDDED_SEED: &str = include_str!("seed.json");
