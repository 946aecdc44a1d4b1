//! The public adapter surface.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, instrument};

use super::executor::RequestExecutor;
use crate::Result;
use crate::cache::{CacheStats, CacheStore, Fingerprint};
use crate::providers::Input;
use crate::routing::ModelSelector;
use crate::telemetry;
use crate::types::{
    AiResponse, Message, ModelDescriptor, Operation, RequestConfig, RequestDefaults,
    ResolvedConfig, Usage, UsageRecord, UsageStats,
};
use crate::usage::{UsageRecorder, cost};

/// AI request adapter.
///
/// One instance is shared (typically behind an `Arc`) by every caller in
/// the process: it owns the response cache, the model catalog and the usage
/// recorder. Build one with [`Huginn::builder`](super::Huginn::builder).
pub struct AiAdapter {
    pub(super) selector: ModelSelector,
    pub(super) executor: RequestExecutor,
    pub(super) cache: CacheStore,
    pub(super) recorder: UsageRecorder,
    pub(super) defaults: RequestDefaults,
    pub(super) vision_model: ModelDescriptor,
    pub(super) user_id: Option<String>,
}

impl AiAdapter {
    /// Complete a single prompt.
    #[instrument(skip_all, fields(operation = "generate"))]
    pub async fn generate(&self, prompt: &str, config: &RequestConfig) -> Result<AiResponse> {
        self.complete(Operation::Generate, Input::Prompt(prompt.to_string()), config)
            .await
    }

    /// Continue a conversation.
    #[instrument(skip_all, fields(operation = "chat", messages = messages.len()))]
    pub async fn chat(&self, messages: &[Message], config: &RequestConfig) -> Result<AiResponse> {
        self.complete(Operation::Chat, Input::Messages(messages.to_vec()), config)
            .await
    }

    /// Ask the model to perform `task` over a JSON rendering of `data`.
    #[instrument(skip_all, fields(operation = "analyze"))]
    pub async fn analyze<T>(&self, data: &T, task: &str, config: &RequestConfig) -> Result<AiResponse>
    where
        T: Serialize + ?Sized,
    {
        let prompt = analysis_prompt(data, task)?;
        self.complete(Operation::Analyze, Input::Prompt(prompt), config)
            .await
    }

    /// Describe a base64-encoded image.
    ///
    /// Bypasses model selection and the response cache; the call goes to
    /// the configured vision model with the usual retry and deadline
    /// policy, and no fallback.
    #[instrument(skip_all, fields(operation = "vision", image_bytes = image.len()))]
    pub async fn vision(
        &self,
        image: &str,
        prompt: &str,
        config: &RequestConfig,
    ) -> Result<AiResponse> {
        let resolved = config.resolve(&self.defaults)?;
        let started = Instant::now();
        let outcome = self
            .executor
            .execute_vision(image, prompt, &self.vision_model, &resolved)
            .await;
        let elapsed = started.elapsed();
        observe(&self.vision_model.id, Operation::Vision, elapsed, outcome.is_ok());
        let content = outcome?;

        let response = AiResponse {
            content,
            model: self.vision_model.name.clone(),
            provider: self.vision_model.provider,
            usage: None,
            cached: false,
            latency_ms: elapsed.as_millis() as u64,
        };
        self.record(Operation::Vision, &resolved, &response, image.len());
        Ok(response)
    }

    async fn complete(
        &self,
        operation: Operation,
        input: Input,
        config: &RequestConfig,
    ) -> Result<AiResponse> {
        let resolved = config.resolve(&self.defaults)?;
        let key = match &input {
            Input::Prompt(prompt) => Fingerprint::of_prompt(prompt),
            Input::Messages(messages) => Fingerprint::of_messages(messages),
        }
        .with_model(resolved.model.as_deref());
        let input_size = input.size();

        if resolved.caching {
            if let Some(entry) = self.cache.get(&key) {
                metrics::counter!(telemetry::CACHE_HITS_TOTAL, "operation" => operation.as_str())
                    .increment(1);
                debug!(%key, hits = entry.hit_count, model = %entry.response.model, "cache hit");
                self.record(operation, &resolved, &entry.response, input_size);
                return Ok(entry.response);
            }
            metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "operation" => operation.as_str())
                .increment(1);
            debug!(%key, "cache miss");
        }

        let selected = self.selector.select(operation, &resolved).await?;
        let selected_id = selected.id.clone();

        let started = Instant::now();
        let outcome = self
            .executor
            .execute(operation, &input, selected, &resolved)
            .await;
        let elapsed = started.elapsed();
        let served_by = match &outcome {
            Ok(executed) => executed.model.id.as_str(),
            Err(_) => selected_id.as_str(),
        };
        observe(served_by, operation, elapsed, outcome.is_ok());
        let executed = outcome?;

        let tokens = executed.completion.usage.unwrap_or_default();
        let usage = Usage::new(tokens, cost(tokens.total_tokens, &executed.model));
        metrics::counter!(telemetry::TOKENS_TOTAL,
            "model" => executed.model.id.clone(), "direction" => "prompt")
        .increment(u64::from(tokens.prompt_tokens));
        metrics::counter!(telemetry::TOKENS_TOTAL,
            "model" => executed.model.id.clone(), "direction" => "completion")
        .increment(u64::from(tokens.completion_tokens));
        metrics::histogram!(telemetry::REQUEST_COST_USD, "model" => executed.model.id.clone())
            .record(usage.cost_usd);

        let response = AiResponse {
            content: executed.completion.content,
            model: executed.model.name.clone(),
            provider: executed.model.provider,
            usage: Some(usage),
            cached: false,
            latency_ms: elapsed.as_millis() as u64,
        };

        // fallback answers to pinned requests are not cached
        let pinned_elsewhere = resolved
            .model
            .as_deref()
            .is_some_and(|pinned| pinned != executed.model.id);
        if resolved.caching && !pinned_elsewhere {
            self.cache.put(key, response.clone());
        } else if resolved.caching {
            debug!(
                %key,
                served_by = %executed.model.id,
                "fallback answer to pinned request not cached"
            );
        }
        self.record(operation, &resolved, &response, input_size);
        Ok(response)
    }

    /// Queue a usage row for `response`. Cached responses are recorded with
    /// zero tokens and zero cost.
    fn record(
        &self,
        operation: Operation,
        config: &ResolvedConfig,
        response: &AiResponse,
        input_size: usize,
    ) {
        let usage = if response.cached {
            Usage::default()
        } else {
            response.usage.unwrap_or_default()
        };
        self.recorder.record(UsageRecord {
            company_id: config.tenant.clone(),
            user_id: self.user_id.clone(),
            operation,
            model: response.model.clone(),
            provider: response.provider,
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
            cost_usd: usage.cost_usd,
            latency_ms: response.latency_ms,
            cached: response.cached,
            input_size,
            created_at: Utc::now(),
        });
    }

    /// Usage statistics for the adapter's default tenant.
    pub async fn get_usage_stats(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<UsageStats> {
        self.recorder
            .stats(self.defaults.tenant.as_deref(), start, end)
            .await
    }

    /// Usage statistics for an explicit tenant.
    pub async fn get_tenant_usage_stats(
        &self,
        tenant: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<UsageStats> {
        self.recorder.stats(Some(tenant), start, end).await
    }

    /// Drop every cached response.
    pub fn clear_cache(&self) {
        self.cache.clear();
        debug!("response cache cleared");
    }

    pub fn get_cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Wait for queued usage rows to reach the sink.
    pub async fn flush_usage(&self) {
        self.recorder.flush().await;
    }

    /// The model used for fallback hops.
    pub fn baseline_model(&self) -> &ModelDescriptor {
        self.executor.baseline()
    }

    /// Defaults applied to every [`RequestConfig`].
    pub fn defaults(&self) -> &RequestDefaults {
        &self.defaults
    }
}

fn observe(model: &str, operation: Operation, elapsed: Duration, ok: bool) {
    let status = if ok { "ok" } else { "error" };
    metrics::counter!(telemetry::REQUESTS_TOTAL,
        "model" => model.to_owned(),
        "operation" => operation.as_str(),
        "status" => status,
    )
    .increment(1);
    metrics::histogram!(telemetry::REQUEST_DURATION_SECONDS,
        "model" => model.to_owned(),
        "operation" => operation.as_str(),
    )
    .record(elapsed.as_secs_f64());
}

/// `Task: {task}\n\nData: {pretty JSON}\n\nProvide analysis:`
pub(crate) fn analysis_prompt<T: Serialize + ?Sized>(data: &T, task: &str) -> Result<String> {
    let pretty = serde_json::to_string_pretty(data)?;
    Ok(format!("Task: {task}\n\nData: {pretty}\n\nProvide analysis:"))
}
