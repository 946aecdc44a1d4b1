//! HTTP inference backend.
//!
//! Talks to an inference service exposing two endpoints:
//!
//! - `POST {base_url}/generate` with
//!   `{"prompt"|"messages", "model", "max_tokens", "temperature"}`,
//!   answering `{"content", "usage": {"prompt_tokens", "completion_tokens", "total_tokens"}}`
//! - `POST {base_url}/vision` with `{"image", "prompt"}`, answering `{"analysis"}`
//!
//! Status mapping: 401/403 → `AuthenticationFailed`, 429 → `RateLimited`
//! (with the `Retry-After` seconds, if sent), anything else non-2xx →
//! `Api { status }`. Connection failures map to `Http`. A successful answer
//! with blank content is `EmptyResponse`, which the executor retries.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::traits::{GenerateRequest, InferenceBackend};
use crate::types::Completion;
use crate::{HuginnError, Result};

/// [`InferenceBackend`] over HTTP/JSON.
#[derive(Clone)]
pub struct HttpBackend {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpBackend {
    /// Create a backend rooted at `base_url` (no trailing slash needed).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http_client(base_url, Client::new())
    }

    /// Create a backend sharing an existing HTTP client.
    pub fn with_http_client(base_url: impl Into<String>, http: Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            api_key: None,
        }
    }

    /// Send `Authorization: Bearer <key>` with every request.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    async fn post<B: Serialize + ?Sized>(&self, endpoint: &str, body: &B) -> Result<Response> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let mut request = self.http.post(&url).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request
            .send()
            .await
            .map_err(|e| HuginnError::Http(e.to_string()))?;
        check_status(response).await
    }
}

#[derive(Serialize)]
struct VisionRequest<'a> {
    image: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct VisionResponse {
    analysis: String,
}

/// Map a non-success response to the matching error.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(HuginnError::AuthenticationFailed),
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            Err(HuginnError::RateLimited { retry_after })
        }
        _ => {
            let message = response.text().await.unwrap_or_default();
            Err(HuginnError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait]
impl InferenceBackend for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<Completion> {
        let completion: Completion = self
            .post("generate", request)
            .await?
            .json()
            .await
            .map_err(|e| HuginnError::Http(e.to_string()))?;
        if completion.content.trim().is_empty() {
            return Err(HuginnError::EmptyResponse);
        }
        Ok(completion)
    }

    async fn vision(&self, image: &str, prompt: &str) -> Result<String> {
        let body: VisionResponse = self
            .post("vision", &VisionRequest { image, prompt })
            .await?
            .json()
            .await
            .map_err(|e| HuginnError::Http(e.to_string()))?;
        if body.analysis.trim().is_empty() {
            return Err(HuginnError::EmptyResponse);
        }
        Ok(body.analysis)
    }
}
