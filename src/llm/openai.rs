//! OpenAI Chat Completions API generator.
//!
//! Sends non-streaming requests to the `/chat/completions` endpoint and
//! retries transient failures a bounded number of times with linear backoff.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::warn;

use crate::llm::{GenerationRequest, LlmError, LlmRole, TextGenerator};

/// Default ceiling on completion attempts.
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Backoff unit between attempts (attempt N waits N-1 units).
const RETRY_BACKOFF_MS: u64 = 500;

/// OpenAI Chat Completions API generator.
#[derive(Debug)]
pub struct OpenAiGenerator {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_attempts: u32,
}

impl OpenAiGenerator {
    pub fn new(api_key: String, model: String) -> Result<Self, LlmError> {
        if api_key.trim().is_empty() {
            return Err(LlmError::InvalidApiKey(
                "API key must not be empty".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| LlmError::Provider(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key,
            base_url: "https://api.openai.com/v1".to_string(),
            model,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        })
    }

    pub fn with_base_url(mut self, url: String) -> Result<Self, LlmError> {
        let parsed = url::Url::parse(&url)
            .map_err(|e| LlmError::InvalidBaseUrl(format!("invalid URL \"{url}\": {e}")))?;
        let host = parsed.host_str().unwrap_or("");
        let is_loopback =
            host == "localhost" || host == "127.0.0.1" || host == "::1" || host == "[::1]";
        if parsed.scheme() != "https" && !is_loopback {
            return Err(LlmError::InvalidBaseUrl(format!(
                "base URL must use https scheme (or http for localhost), got \"{}\"",
                parsed.scheme()
            )));
        }
        // Strip trailing slash for consistent path joining
        self.base_url = url.trim_end_matches('/').to_string();
        Ok(self)
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Build the JSON body for the OpenAI Chat Completions API.
    fn build_body(&self, request: &GenerationRequest) -> Value {
        let mut messages: Vec<Value> = Vec::new();

        if let Some(ref system) = request.system {
            messages.push(json!({
                "role": "system",
                "content": system,
            }));
        }

        for msg in &request.messages {
            let role = match msg.role {
                LlmRole::User => "user",
                LlmRole::Assistant => "assistant",
            };
            messages.push(json!({
                "role": role,
                "content": msg.content,
            }));
        }

        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "max_completion_tokens": request.max_tokens,
        });

        if let Some(temp) = request.temperature {
            body["temperature"] = json!(temp);
        }

        if request.json_response {
            body["response_format"] = json!({ "type": "json_object" });
        }

        body
    }
}

/// Pull the completion text out of a Chat Completions response body.
fn extract_completion_text(parsed: &Value) -> Result<String, LlmError> {
    parsed
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| {
            LlmError::Provider("response missing choices[0].message.content".to_string())
        })
}

/// Whether an HTTP status is worth retrying (rate limit or server-side).
fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    status.as_u16() == 429 || status.is_server_error()
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<String, LlmError> {
        let body = self.build_body(&request);
        let url = format!("{}/chat/completions", self.base_url);

        let mut last_error = LlmError::Provider("no completion attempts made".to_string());

        for attempt in 1..=self.max_attempts {
            if attempt > 1 {
                tokio::time::sleep(std::time::Duration::from_millis(
                    RETRY_BACKOFF_MS * u64::from(attempt - 1),
                ))
                .await;
            }

            let response = match self
                .client
                .post(&url)
                .header("authorization", format!("Bearer {}", self.api_key))
                .header("content-type", "application/json")
                .json(&body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    warn!(target: "llm", attempt, error = %e, "completion request failed");
                    last_error = LlmError::Provider(format!("HTTP request failed: {e}"));
                    continue;
                }
            };

            let status = response.status();
            if !status.is_success() {
                let text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "<unreadable>".to_string());
                last_error = LlmError::Provider(format!("API returned {status}: {text}"));
                if is_retryable_status(status) {
                    warn!(target: "llm", attempt, %status, "retryable API error");
                    continue;
                }
                return Err(last_error);
            }

            let parsed: Value = match response.json().await {
                Ok(v) => v,
                Err(e) => {
                    warn!(target: "llm", attempt, error = %e, "failed to decode response body");
                    last_error = LlmError::Provider(format!("failed to decode response body: {e}"));
                    continue;
                }
            };

            return extract_completion_text(&parsed);
        }

        Err(last_error)
    }
}
