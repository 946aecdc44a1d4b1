//! End-to-end tests for the adapter facade against a scripted backend.
//!
//! Retry and expiry tests run on a paused clock, so backoff sleeps and TTLs
//! elapse instantly while remaining observable through `tokio::time`.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::future::join_all;

use huginn::{
    AiAdapter, CacheConfig, Completion, GenerateRequest, Huginn, HuginnError, InferenceBackend,
    Input, MemoryUsageSink, Message, ModelRegistry, Operation, Priority, RequestConfig, Result,
    StaticPreferences, TokenUsage, UsageRecord, UsageSink,
};

// ============================================================================
// Mock backend
// ============================================================================

type Script = dyn Fn(u32, &GenerateRequest) -> Result<Completion> + Send + Sync;

/// Backend whose behaviour is decided per call by a script receiving the
/// 0-based call index and the request.
struct MockBackend {
    calls: AtomicU32,
    requests: Mutex<Vec<GenerateRequest>>,
    delay: Option<Duration>,
    script: Box<Script>,
}

impl MockBackend {
    fn new(
        script: impl Fn(u32, &GenerateRequest) -> Result<Completion> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
            delay: None,
            script: Box::new(script),
        })
    }

    fn echo() -> Arc<Self> {
        Self::new(|_, request| Ok(echo(request)))
    }

    fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
            delay: Some(delay),
            script: Box::new(|_, request| Ok(echo(request))),
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn models(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.model.clone())
            .collect()
    }

    fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<Completion> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.script)(n, request)
    }

    async fn vision(&self, image: &str, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{prompt}: {} bytes", image.len()))
    }
}

fn echo(request: &GenerateRequest) -> Completion {
    let text = match &request.input {
        Input::Prompt(prompt) => prompt.clone(),
        Input::Messages(messages) => messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default(),
    };
    Completion {
        content: format!("re: {text}"),
        usage: Some(TokenUsage {
            prompt_tokens: 10,
            completion_tokens: 20,
            total_tokens: 30,
        }),
    }
}

/// Sink that rejects every write.
struct BrokenSink;

#[async_trait]
impl UsageSink for BrokenSink {
    async fn insert(&self, _record: UsageRecord) -> Result<()> {
        Err(HuginnError::Recording("connection refused".into()))
    }

    async fn query(
        &self,
        _tenant: Option<&str>,
        _start: Option<DateTime<Utc>>,
        _end: Option<DateTime<Utc>>,
    ) -> Result<Vec<UsageRecord>> {
        Ok(Vec::new())
    }
}

/// Sink that takes a while to accept each write.
struct SlowSink(MemoryUsageSink);

#[async_trait]
impl UsageSink for SlowSink {
    async fn insert(&self, record: UsageRecord) -> Result<()> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.0.insert(record).await
    }

    async fn query(
        &self,
        tenant: Option<&str>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<UsageRecord>> {
        self.0.query(tenant, start, end).await
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn adapter(backend: &Arc<MockBackend>) -> (AiAdapter, Arc<MemoryUsageSink>) {
    let sink = Arc::new(MemoryUsageSink::new());
    let adapter = Huginn::builder()
        .shared_backend(backend.clone())
        .shared_usage_sink(sink.clone())
        .tenant("acme")
        .user_id("user-1")
        .build()
        .unwrap();
    (adapter, sink)
}

fn gpt4() -> RequestConfig {
    RequestConfig::new().model("gpt-4")
}

// ============================================================================
// Caching
// ============================================================================

#[tokio::test]
async fn cache_hit_makes_no_backend_call() {
    let backend = MockBackend::echo();
    let (adapter, sink) = adapter(&backend);

    let first = adapter.generate("hello", &RequestConfig::new()).await.unwrap();
    let second = adapter.generate("hello", &RequestConfig::new()).await.unwrap();

    assert_eq!(backend.calls(), 1);
    assert!(!first.cached);
    assert!(second.cached);
    assert_eq!(second.content, first.content);
    assert_eq!(second.latency_ms, first.latency_ms);

    adapter.flush_usage().await;
    let records = sink.records().await;
    assert_eq!(records.len(), 2);
    let hits: Vec<_> = records.iter().filter(|r| r.cached).collect();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].total_tokens, 0);
    assert_eq!(hits[0].cost_usd, 0.0);
}

#[tokio::test]
async fn surrounding_whitespace_shares_cache_entry() {
    let backend = MockBackend::echo();
    let (adapter, _) = adapter(&backend);

    adapter.generate("hello", &RequestConfig::new()).await.unwrap();
    let hit = adapter
        .generate("  hello \n", &RequestConfig::new())
        .await
        .unwrap();

    assert!(hit.cached);
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn caching_disabled_always_calls_backend() {
    let backend = MockBackend::echo();
    let (adapter, _) = adapter(&backend);
    let config = RequestConfig::new().caching(false);

    adapter.generate("hello", &config).await.unwrap();
    let again = adapter.generate("hello", &config).await.unwrap();

    assert!(!again.cached);
    assert_eq!(backend.calls(), 2);
    assert_eq!(adapter.get_cache_stats().size, 0);
}

#[tokio::test]
async fn explicit_model_is_part_of_cache_key() {
    let backend = MockBackend::echo();
    let (adapter, _) = adapter(&backend);

    adapter.generate("hello", &gpt4()).await.unwrap();
    let other = adapter
        .generate("hello", &RequestConfig::new().model("claude-3-opus"))
        .await
        .unwrap();

    assert!(!other.cached);
    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn chat_message_order_matters() {
    let backend = MockBackend::echo();
    let (adapter, _) = adapter(&backend);

    let a = [Message::user("one"), Message::user("two")];
    let b = [Message::user("two"), Message::user("one")];
    adapter.chat(&a, &RequestConfig::new()).await.unwrap();
    adapter.chat(&b, &RequestConfig::new()).await.unwrap();
    let hit = adapter.chat(&a, &RequestConfig::new()).await.unwrap();

    assert!(hit.cached);
    assert_eq!(backend.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn expired_entry_triggers_exactly_one_fresh_call() {
    let backend = MockBackend::echo();
    let adapter = Huginn::builder()
        .shared_backend(backend.clone())
        .cache(CacheConfig::new().ttl(Duration::from_secs(60)))
        .build()
        .unwrap();

    adapter.generate("hello", &RequestConfig::new()).await.unwrap();
    tokio::time::advance(Duration::from_secs(30)).await;
    assert!(adapter.generate("hello", &RequestConfig::new()).await.unwrap().cached);

    tokio::time::advance(Duration::from_secs(31)).await;
    let fresh = adapter.generate("hello", &RequestConfig::new()).await.unwrap();
    assert!(!fresh.cached);
    let cached = adapter.generate("hello", &RequestConfig::new()).await.unwrap();
    assert!(cached.cached);

    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn clear_cache_forces_fresh_call() {
    let backend = MockBackend::echo();
    let (adapter, _) = adapter(&backend);

    adapter.generate("hello", &RequestConfig::new()).await.unwrap();
    adapter.generate("hello", &RequestConfig::new()).await.unwrap();
    let stats = adapter.get_cache_stats();
    assert_eq!(stats.size, 1);
    assert!((stats.hit_rate - 0.5).abs() < f64::EPSILON);

    adapter.clear_cache();
    assert_eq!(adapter.get_cache_stats().size, 0);
    assert!(!adapter.generate("hello", &RequestConfig::new()).await.unwrap().cached);
    assert_eq!(backend.calls(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_respect_capacity() {
    let backend = MockBackend::echo();
    let adapter = Arc::new(
        Huginn::builder()
            .shared_backend(backend.clone())
            .cache(CacheConfig::new().max_entries(5))
            .build()
            .unwrap(),
    );

    let tasks = (0..20).map(|i| {
        let adapter = Arc::clone(&adapter);
        async move {
            adapter
                .generate(&format!("prompt {i}"), &RequestConfig::new())
                .await
        }
    });
    let results = join_all(tasks).await;

    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(backend.calls(), 20);
    assert_eq!(adapter.get_cache_stats().size, 5);
}

// ============================================================================
// Selection and request shape
// ============================================================================

#[tokio::test]
async fn priority_drives_model_choice() {
    let backend = MockBackend::echo();
    let (adapter, _) = adapter(&backend);

    let by_priority = |p| RequestConfig::new().priority(p).caching(false);
    let accurate = adapter
        .generate("q", &by_priority(Priority::Accuracy))
        .await
        .unwrap();
    let cheap = adapter.generate("q", &by_priority(Priority::Cost)).await.unwrap();
    let fast = adapter.generate("q", &by_priority(Priority::Speed)).await.unwrap();
    let balanced = adapter
        .generate("q", &by_priority(Priority::Balanced))
        .await
        .unwrap();

    assert_eq!(accurate.model, "gpt-4");
    assert_eq!(cheap.model, "claude-instant-1.2");
    assert_eq!(fast.model, "claude-instant-1.2");
    assert_eq!(balanced.model, "claude-instant-1.2");
}

#[tokio::test]
async fn tenant_preference_applies_to_balanced_requests() {
    let backend = MockBackend::echo();
    let adapter = Huginn::builder()
        .shared_backend(backend.clone())
        .preferences(StaticPreferences::new().with("acme", "claude-3-opus"))
        .tenant("acme")
        .build()
        .unwrap();

    let response = adapter.generate("q", &RequestConfig::new()).await.unwrap();
    assert_eq!(response.model, "claude-3-opus-20240229");
}

#[tokio::test]
async fn unknown_model_is_rejected_without_backend_call() {
    let backend = MockBackend::echo();
    let (adapter, _) = adapter(&backend);

    let err = adapter
        .generate("q", &RequestConfig::new().model("gpt-7"))
        .await
        .unwrap_err();

    assert!(matches!(err, HuginnError::Validation(_)));
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn invalid_config_is_rejected() {
    let backend = MockBackend::echo();
    let (adapter, _) = adapter(&backend);

    let err = adapter
        .generate("q", &RequestConfig::new().max_retries(0))
        .await
        .unwrap_err();
    assert!(matches!(err, HuginnError::Validation(_)));
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn request_carries_generation_parameters() {
    let backend = MockBackend::echo();
    let adapter = Huginn::builder()
        .shared_backend(backend.clone())
        .max_output_tokens(6000)
        .build()
        .unwrap();

    adapter.generate("q", &gpt4()).await.unwrap();
    adapter
        .generate("q", &RequestConfig::new().model("claude-instant"))
        .await
        .unwrap();

    let requests = backend.requests();
    assert_eq!(requests[0].model, "gpt-4");
    assert_eq!(requests[0].max_tokens, 6000);
    assert!((requests[0].temperature - 0.7).abs() < f32::EPSILON);
    assert_eq!(requests[1].model, "claude-instant-1.2");
    assert_eq!(requests[1].max_tokens, 4096, "clamped to the model limit");
}

#[tokio::test]
async fn cost_is_computed_from_total_tokens() {
    let backend = MockBackend::new(|_, _| {
        Ok(Completion {
            content: "ok".into(),
            usage: Some(TokenUsage {
                prompt_tokens: 500,
                completion_tokens: 1000,
                total_tokens: 1500,
            }),
        })
    });
    let (adapter, _) = adapter(&backend);

    let response = adapter.generate("q", &gpt4()).await.unwrap();
    let usage = response.usage.unwrap();
    assert_eq!(usage.total_tokens, 1500);
    assert!((usage.cost_usd - 0.045).abs() < 1e-12);
}

#[tokio::test]
async fn missing_usage_counts_as_zero() {
    let backend = MockBackend::new(|_, _| {
        Ok(Completion {
            content: "ok".into(),
            usage: None,
        })
    });
    let (adapter, _) = adapter(&backend);

    let usage = adapter.generate("q", &gpt4()).await.unwrap().usage.unwrap();
    assert_eq!(usage.total_tokens, 0);
    assert_eq!(usage.cost_usd, 0.0);
}

// ============================================================================
// Retry and fallback
// ============================================================================

#[tokio::test(start_paused = true)]
async fn transient_failures_then_success_makes_k_plus_one_calls() {
    let backend = MockBackend::new(|n, request| {
        if n < 2 {
            Err(HuginnError::Http("connection reset".into()))
        } else {
            Ok(echo(request))
        }
    });
    let (adapter, _) = adapter(&backend);

    let started = tokio::time::Instant::now();
    let response = adapter.generate("q", &gpt4()).await.unwrap();

    assert_eq!(backend.calls(), 3);
    assert_eq!(response.model, "gpt-4");
    // linear backoff: 1s after the first failure, 2s after the second
    assert!(started.elapsed() >= Duration::from_secs(3));
    assert!(response.latency_ms >= 3000);
}

#[tokio::test(start_paused = true)]
async fn retry_after_hint_overrides_backoff() {
    let backend = MockBackend::new(|n, request| {
        if n == 0 {
            Err(HuginnError::RateLimited {
                retry_after: Some(Duration::from_secs(7)),
            })
        } else {
            Ok(echo(request))
        }
    });
    let (adapter, _) = adapter(&backend);

    let started = tokio::time::Instant::now();
    adapter.generate("q", &gpt4()).await.unwrap();
    assert!(started.elapsed() >= Duration::from_secs(7));
    assert_eq!(backend.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn retry_after_hint_is_capped_by_attempt_deadline() {
    let backend = MockBackend::new(|n, request| {
        if n == 0 {
            Err(HuginnError::RateLimited {
                retry_after: Some(Duration::from_secs(86_400)),
            })
        } else {
            Ok(echo(request))
        }
    });
    let (adapter, _) = adapter(&backend);

    let started = tokio::time::Instant::now();
    let response = adapter
        .generate("q", &gpt4().timeout_ms(1000))
        .await
        .unwrap();

    assert_eq!(backend.calls(), 2);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(1));
    assert!(elapsed < Duration::from_secs(2), "hint was not capped: {elapsed:?}");
    assert!(response.latency_ms < 2000);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_fall_back_exactly_once() {
    let backend = MockBackend::new(|_, _| {
        Err(HuginnError::Api {
            status: 503,
            message: "overloaded".into(),
        })
    });
    let (adapter, _) = adapter(&backend);

    let err = adapter
        .generate("q", &gpt4().max_retries(2))
        .await
        .unwrap_err();

    assert_eq!(
        backend.models(),
        ["gpt-4", "gpt-4", "gpt-3.5-turbo", "gpt-3.5-turbo"]
    );
    match err {
        HuginnError::RetriesExhausted { model, attempts, .. } => {
            assert_eq!(model, "gpt-3.5-turbo");
            assert_eq!(attempts, 2);
        }
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn fallback_success_is_served_by_baseline() {
    let backend = MockBackend::new(|_, request| {
        if request.model == "gpt-4" {
            Err(HuginnError::Timeout(Duration::from_secs(30)))
        } else {
            Ok(Completion {
                content: "from baseline".into(),
                usage: Some(TokenUsage {
                    prompt_tokens: 0,
                    completion_tokens: 1000,
                    total_tokens: 1000,
                }),
            })
        }
    });
    let (adapter, sink) = adapter(&backend);

    let response = adapter.generate("q", &gpt4()).await.unwrap();
    assert_eq!(response.model, "gpt-3.5-turbo");
    assert_eq!(response.content, "from baseline");
    assert!((response.usage.unwrap().cost_usd - 0.002).abs() < 1e-12);
    assert_eq!(backend.calls(), 4);

    adapter.flush_usage().await;
    let records = sink.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].model, "gpt-3.5-turbo");
}

#[tokio::test(start_paused = true)]
async fn fallback_answer_to_pinned_request_is_not_cached() {
    // gpt-4 is down for the first request only
    let backend = MockBackend::new(|n, request| {
        if request.model == "gpt-4" && n < 3 {
            Err(HuginnError::Http("down".into()))
        } else {
            Ok(Completion {
                content: format!("from {}", request.model),
                usage: None,
            })
        }
    });
    let (adapter, _) = adapter(&backend);

    let first = adapter.generate("q", &gpt4()).await.unwrap();
    assert_eq!(first.content, "from gpt-3.5-turbo");
    assert_eq!(adapter.get_cache_stats().size, 0);

    let second = adapter.generate("q", &gpt4()).await.unwrap();
    assert!(!second.cached);
    assert_eq!(second.content, "from gpt-4");
    assert_eq!(backend.calls(), 5);

    let third = adapter.generate("q", &gpt4()).await.unwrap();
    assert!(third.cached);
    assert_eq!(third.content, "from gpt-4");
}

#[tokio::test(start_paused = true)]
async fn fallback_answer_to_selected_model_is_cached() {
    let backend = MockBackend::new(|_, request| {
        if request.model == "gpt-3.5-turbo" {
            Ok(echo(request))
        } else {
            Err(HuginnError::Http("down".into()))
        }
    });
    let (adapter, _) = adapter(&backend);

    let first = adapter.generate("q", &RequestConfig::new()).await.unwrap();
    let second = adapter.generate("q", &RequestConfig::new()).await.unwrap();

    assert_eq!(first.model, "gpt-3.5-turbo");
    assert!(second.cached);
    assert_eq!(backend.calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn no_fallback_when_disabled() {
    let backend = MockBackend::new(|_, _| Err(HuginnError::Http("down".into())));
    let (adapter, _) = adapter(&backend);

    let err = adapter
        .generate("q", &gpt4().fallback(false))
        .await
        .unwrap_err();

    assert!(err.is_fallback_trigger());
    assert_eq!(backend.models(), ["gpt-4", "gpt-4", "gpt-4"]);
}

#[tokio::test(start_paused = true)]
async fn baseline_failure_does_not_fall_back_to_itself() {
    let backend = MockBackend::new(|_, _| Err(HuginnError::Http("down".into())));
    let (adapter, _) = adapter(&backend);

    let err = adapter
        .generate("q", &RequestConfig::new().model("gpt-3.5-turbo"))
        .await
        .unwrap_err();

    assert!(matches!(err, HuginnError::RetriesExhausted { .. }));
    assert_eq!(backend.calls(), 3);
}

#[tokio::test]
async fn permanent_error_is_not_retried() {
    let backend = MockBackend::new(|_, _| Err(HuginnError::AuthenticationFailed));
    let (adapter, _) = adapter(&backend);

    let err = adapter.generate("q", &gpt4()).await.unwrap_err();

    assert!(matches!(err, HuginnError::AuthenticationFailed));
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn client_error_is_not_retried() {
    let backend = MockBackend::new(|_, _| {
        Err(HuginnError::Api {
            status: 400,
            message: "bad request".into(),
        })
    });
    let (adapter, _) = adapter(&backend);

    let err = adapter.generate("q", &gpt4()).await.unwrap_err();
    assert!(matches!(err, HuginnError::Api { status: 400, .. }));
    assert_eq!(backend.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn attempt_deadline_counts_as_transient() {
    let backend = MockBackend::slow(Duration::from_secs(10));
    let (adapter, _) = adapter(&backend);

    let err = adapter
        .generate("q", &gpt4().timeout_ms(100).max_retries(2).fallback(false))
        .await
        .unwrap_err();

    assert_eq!(backend.calls(), 2);
    match err {
        HuginnError::RetriesExhausted { source, .. } => {
            assert!(matches!(*source, HuginnError::Timeout(_)));
        }
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn failed_request_is_not_cached() {
    let backend = MockBackend::new(|n, request| {
        if n == 0 {
            Err(HuginnError::AuthenticationFailed)
        } else {
            Ok(echo(request))
        }
    });
    let (adapter, _) = adapter(&backend);

    assert!(adapter.generate("q", &gpt4()).await.is_err());
    let response = adapter.generate("q", &gpt4()).await.unwrap();
    assert!(!response.cached);
    assert_eq!(backend.calls(), 2);
}

// ============================================================================
// Analyze and vision
// ============================================================================

#[tokio::test]
async fn analyze_builds_prompt_and_records_operation() {
    let backend = MockBackend::echo();
    let (adapter, sink) = adapter(&backend);

    let data = serde_json::json!({ "revenue": 100 });
    adapter
        .analyze(&data, "Find trends", &RequestConfig::new())
        .await
        .unwrap();

    let requests = backend.requests();
    assert_eq!(
        requests[0].input,
        Input::Prompt(
            "Task: Find trends\n\nData: {\n  \"revenue\": 100\n}\n\nProvide analysis:".into()
        )
    );

    adapter.flush_usage().await;
    assert_eq!(sink.records().await[0].operation, Operation::Analyze);
}

#[tokio::test]
async fn vision_bypasses_selection_and_cache() {
    let backend = MockBackend::echo();
    let (adapter, sink) = adapter(&backend);
    let image = "aGVsbG8gd29ybGQ=";

    let first = adapter
        .vision(image, "describe", &RequestConfig::new())
        .await
        .unwrap();
    let second = adapter
        .vision(image, "describe", &RequestConfig::new())
        .await
        .unwrap();

    assert_eq!(first.content, "describe: 16 bytes");
    assert_eq!(first.model, "gpt-4-vision-preview");
    assert!(first.usage.is_none());
    assert!(!second.cached);
    assert_eq!(backend.calls(), 2);

    adapter.flush_usage().await;
    let records = sink.records().await;
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].operation, Operation::Vision);
    assert_eq!(records[0].total_tokens, 0);
    assert_eq!(records[0].input_size, image.len());
}

// ============================================================================
// Usage accounting
// ============================================================================

#[tokio::test]
async fn usage_rows_carry_tenant_and_user() {
    let backend = MockBackend::echo();
    let (adapter, sink) = adapter(&backend);

    adapter.generate("hello", &gpt4()).await.unwrap();
    adapter.flush_usage().await;

    let record = &sink.records().await[0];
    assert_eq!(record.company_id.as_deref(), Some("acme"));
    assert_eq!(record.user_id.as_deref(), Some("user-1"));
    assert_eq!(record.operation, Operation::Generate);
    assert_eq!(record.model, "gpt-4");
    assert_eq!(record.total_tokens, 30);
    assert_eq!(record.input_size, "hello".len());
}

#[tokio::test]
async fn usage_stats_per_tenant() {
    let backend = MockBackend::echo();
    let (adapter, _) = adapter(&backend);

    adapter.generate("a", &gpt4()).await.unwrap();
    adapter.generate("a", &gpt4()).await.unwrap();
    adapter
        .generate("b", &gpt4().tenant("globex"))
        .await
        .unwrap();
    adapter.flush_usage().await;

    let acme = adapter.get_usage_stats(None, None).await.unwrap();
    assert_eq!(acme.total_requests, 2);
    assert_eq!(acme.total_tokens, 30);
    assert!((acme.cache_hit_rate - 0.5).abs() < f64::EPSILON);
    assert_eq!(acme.by_model["gpt-4"].count, 2);
    assert_eq!(acme.by_operation["generate"].count, 2);

    let globex = adapter
        .get_tenant_usage_stats("globex", None, None)
        .await
        .unwrap();
    assert_eq!(globex.total_requests, 1);
    assert!((globex.total_cost - 0.0009).abs() < 1e-12);
}

#[tokio::test]
async fn usage_window_excludes_future_start() {
    let backend = MockBackend::echo();
    let (adapter, _) = adapter(&backend);

    adapter.generate("a", &gpt4()).await.unwrap();
    adapter.flush_usage().await;

    let tomorrow = Utc::now() + chrono::Duration::days(1);
    let stats = adapter.get_usage_stats(Some(tomorrow), None).await.unwrap();
    assert_eq!(stats.total_requests, 0);
    assert_eq!(stats.avg_latency, 0.0);
}

#[tokio::test]
async fn usage_survives_dropping_the_adapter() {
    let backend = MockBackend::echo();
    let sink = Arc::new(SlowSink(MemoryUsageSink::new()));
    let adapter = Huginn::builder()
        .shared_backend(backend.clone())
        .shared_usage_sink(sink.clone())
        .build()
        .unwrap();

    adapter.generate("hello", &RequestConfig::new()).await.unwrap();
    drop(adapter);

    tokio::time::sleep(Duration::from_millis(200)).await;
    let records = sink.0.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].total_tokens, 30);
}

#[tokio::test]
async fn recording_failure_is_invisible_to_caller() {
    let backend = MockBackend::echo();
    let adapter = Huginn::builder()
        .shared_backend(backend.clone())
        .usage_sink(BrokenSink)
        .build()
        .unwrap();

    let response = adapter.generate("hello", &RequestConfig::new()).await;
    adapter.flush_usage().await;

    assert!(response.is_ok());
}

// ============================================================================
// Builder
// ============================================================================

#[test]
fn build_requires_backend() {
    let err = Huginn::builder().build().err().unwrap();
    assert!(matches!(err, HuginnError::Configuration(_)));
}

#[test]
fn build_rejects_unregistered_baseline() {
    let err = Huginn::builder()
        .shared_backend(MockBackend::echo())
        .registry(ModelRegistry::new())
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, HuginnError::Configuration(_)));
}

#[test]
fn build_accepts_custom_baseline() {
    let adapter = Huginn::builder()
        .shared_backend(MockBackend::echo())
        .baseline_model("claude-instant")
        .build()
        .unwrap();
    assert_eq!(adapter.baseline_model().id, "claude-instant");
}
