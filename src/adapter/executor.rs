//! Request execution: retries against the selected model and the single
//! fallback hop to the baseline.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::Result;
use crate::providers::retry::{RetryPolicy, with_retry};
use crate::providers::{GenerateRequest, InferenceBackend, Input};
use crate::telemetry;
use crate::types::{Completion, ModelDescriptor, Operation, ResolvedConfig};

/// A completion together with the model that actually produced it.
#[derive(Debug, Clone)]
pub struct Executed {
    pub completion: Completion,
    pub model: ModelDescriptor,
}

/// Drives the backend for one request.
pub struct RequestExecutor {
    backend: Arc<dyn InferenceBackend>,
    baseline: ModelDescriptor,
    base_delay: Duration,
    max_output_tokens: u32,
    temperature: f32,
}

impl RequestExecutor {
    pub fn new(
        backend: Arc<dyn InferenceBackend>,
        baseline: ModelDescriptor,
        base_delay: Duration,
        max_output_tokens: u32,
        temperature: f32,
    ) -> Self {
        Self {
            backend,
            baseline,
            base_delay,
            max_output_tokens,
            temperature,
        }
    }

    /// The model fallback hops go to.
    pub fn baseline(&self) -> &ModelDescriptor {
        &self.baseline
    }

    fn policy(&self, config: &ResolvedConfig) -> RetryPolicy {
        RetryPolicy::new()
            .max_attempts(config.max_retries)
            .base_delay(self.base_delay)
            .timeout(config.timeout)
            .max_delay(config.timeout)
    }

    /// Run `input` against `model`, falling back to the baseline at most
    /// once when every attempt on `model` failed transiently.
    ///
    /// The fallback call runs with fallback disabled, so its outcome is
    /// final. A permanent error never triggers the fallback.
    pub async fn execute(
        &self,
        operation: Operation,
        input: &Input,
        model: ModelDescriptor,
        config: &ResolvedConfig,
    ) -> Result<Executed> {
        let policy = self.policy(config);
        let mut attempted: HashSet<String> = HashSet::new();
        let mut fallback = config.fallback;
        let mut current = model;

        loop {
            attempted.insert(current.id.clone());
            let request = GenerateRequest {
                input: input.clone(),
                model: current.name.clone(),
                max_tokens: self.max_output_tokens.min(current.max_tokens),
                temperature: self.temperature,
            };
            let outcome = with_retry(&policy, &current.id, operation.as_str(), || {
                self.backend.generate(&request)
            })
            .await;

            match outcome {
                Ok(completion) => {
                    return Ok(Executed {
                        completion,
                        model: current,
                    });
                }
                Err(e)
                    if fallback
                        && e.is_fallback_trigger()
                        && !attempted.contains(&self.baseline.id) =>
                {
                    warn!(
                        from = %current.id,
                        to = %self.baseline.id,
                        %operation,
                        error = %e,
                        "falling back to baseline model"
                    );
                    metrics::counter!(telemetry::FALLBACKS_TOTAL,
                        "from" => current.id.clone(),
                        "to" => self.baseline.id.clone(),
                    )
                    .increment(1);
                    fallback = false;
                    current = self.baseline.clone();
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Describe an image with `vision_model`. Same retry and deadline
    /// policy as completions; never falls back.
    pub async fn execute_vision(
        &self,
        image: &str,
        prompt: &str,
        vision_model: &ModelDescriptor,
        config: &ResolvedConfig,
    ) -> Result<String> {
        let policy = self.policy(config);
        with_retry(&policy, &vision_model.id, Operation::Vision.as_str(), || {
            self.backend.vision(image, prompt)
        })
        .await
    }
}
