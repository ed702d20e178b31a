//! LLM text generation layer.
//!
//! Mode handlers talk to the model through the [`TextGenerator`] trait so
//! tests can substitute scripted generators for the real OpenAI client.

pub mod json;
pub mod openai;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// LLM layer errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("LLM provider error: {0}")]
    Provider(String),

    #[error("invalid API key: {0}")]
    InvalidApiKey(String),

    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("no API key configured: set llm.openai.apiKey or OPENAI_API_KEY")]
    MissingApiKey,

    #[error("unknown LLM provider: {0}")]
    UnknownProvider(String),
}

/// Role of a message in the LLM conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmRole {
    User,
    Assistant,
}

/// A message in the LLM conversation.
#[derive(Debug, Clone)]
pub struct LlmMessage {
    pub role: LlmRole,
    pub content: String,
}

impl LlmMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: LlmRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: LlmRole::Assistant,
            content: content.into(),
        }
    }
}

/// A request for a single non-streaming completion.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system: Option<String>,
    pub messages: Vec<LlmMessage>,
    pub max_tokens: u32,
    pub temperature: Option<f64>,
    /// Ask the provider to force a JSON object response.
    pub json_response: bool,
}

impl Default for GenerationRequest {
    fn default() -> Self {
        Self {
            system: None,
            messages: Vec::new(),
            max_tokens: 1024,
            temperature: None,
            json_response: false,
        }
    }
}

/// Trait for text generation backends (OpenAI-compatible APIs, test doubles).
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<String, LlmError>;
}

/// Build a shared generator from the raw config value.
///
/// The API key resolves from `llm.openai.apiKey` first, then the
/// `OPENAI_API_KEY` environment variable.
pub fn build_generator(config: &Value) -> Result<Arc<dyn TextGenerator>, LlmError> {
    let provider = config
        .get("llm")
        .and_then(|l| l.get("provider"))
        .and_then(|v| v.as_str())
        .unwrap_or("openai");

    match provider {
        "openai" => {
            let openai = config.get("llm").and_then(|l| l.get("openai"));

            let api_key = openai
                .and_then(|o| o.get("apiKey"))
                .and_then(|v| v.as_str())
                .filter(|s| !s.trim().is_empty())
                .map(|s| s.to_string())
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                .ok_or(LlmError::MissingApiKey)?;

            let model = openai
                .and_then(|o| o.get("model"))
                .and_then(|v| v.as_str())
                .unwrap_or("gpt-4o-mini")
                .to_string();

            let mut generator = openai::OpenAiGenerator::new(api_key, model)?;

            if let Some(base_url) = openai
                .and_then(|o| o.get("baseUrl"))
                .and_then(|v| v.as_str())
            {
                generator = generator.with_base_url(base_url.to_string())?;
            }

            if let Some(attempts) = openai
                .and_then(|o| o.get("maxAttempts"))
                .and_then(|v| v.as_u64())
            {
                generator = generator.with_max_attempts(attempts as u32);
            }

            Ok(Arc::new(generator))
        }
        other => Err(LlmError::UnknownProvider(other.to_string())),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    /// Mutex to serialize tests that modify environment variables
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_message_helpers() {
        let user = LlmMessage::user("hello");
        assert_eq!(user.role, LlmRole::User);
        assert_eq!(user.content, "hello");

        let assistant = LlmMessage::assistant("hi");
        assert_eq!(assistant.role, LlmRole::Assistant);
        assert_eq!(assistant.content, "hi");
    }

    #[test]
    fn test_generation_request_defaults() {
        let request = GenerationRequest::default();
        assert!(request.system.is_none());
        assert!(request.messages.is_empty());
        assert_eq!(request.max_tokens, 1024);
        assert!(request.temperature.is_none());
        assert!(!request.json_response);
    }

    #[test]
    fn test_build_generator_from_config_key() {
        let _lock = ENV_LOCK.lock().unwrap();
        std::env::remove_var("OPENAI_API_KEY");

        let config = json!({
            "llm": {
                "provider": "openai",
                "openai": { "apiKey": "sk-test", "model": "gpt-4o-mini" }
            }
        });

        let result = build_generator(&config);
        assert!(result.is_ok(), "expected generator, got {:?}", result.err());
    }

    #[test]
    fn test_build_generator_missing_key() {
        let _lock = ENV_LOCK.lock().unwrap();
        std::env::remove_var("OPENAI_API_KEY");

        let config = json!({
            "llm": { "provider": "openai", "openai": {} }
        });

        let result = build_generator(&config);
        assert!(matches!(result, Err(LlmError::MissingApiKey)));
    }

    #[test]
    fn test_build_generator_env_key_fallback() {
        let _lock = ENV_LOCK.lock().unwrap();
        std::env::set_var("OPENAI_API_KEY", "sk-from-env");

        let config = json!({
            "llm": { "provider": "openai", "openai": {} }
        });

        let result = build_generator(&config);
        assert!(result.is_ok(), "expected generator, got {:?}", result.err());

        std::env::remove_var("OPENAI_API_KEY");
    }

    #[test]
    fn test_build_generator_blank_config_key_ignored() {
        let _lock = ENV_LOCK.lock().unwrap();
        std::env::remove_var("OPENAI_API_KEY");

        let config = json!({
            "llm": { "openai": { "apiKey": "   " } }
        });

        let result = build_generator(&config);
        assert!(matches!(result, Err(LlmError::MissingApiKey)));
    }

    #[test]
    fn test_build_generator_unknown_provider() {
        let config = json!({
            "llm": { "provider": "wishful" }
        });

        let result = build_generator(&config);
        assert!(
            matches!(result, Err(LlmError::UnknownProvider(ref p)) if p == "wishful"),
            "expected UnknownProvider"
        );
    }

    #[test]
    fn test_build_generator_rejects_bad_base_url() {
        let _lock = ENV_LOCK.lock().unwrap();
        std::env::remove_var("OPENAI_API_KEY");

        let config = json!({
            "llm": {
                "openai": {
                    "apiKey": "sk-test",
                    "baseUrl": "http://remote.example.com"
                }
            }
        });

        let result = build_generator(&config);
        assert!(matches!(result, Err(LlmError::InvalidBaseUrl(_))));
    }
}
