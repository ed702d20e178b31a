//! Config defaults application
//!
//! Merges user-provided config with sane defaults so that partial configs work
//! correctly.
//!
//! The top-level entry point is [`apply_defaults`], which takes a raw
//! `serde_json::Value` (the JSON5-parsed config) and fills in any missing
//! sections/fields with production-ready defaults.
//!
//! Design:
//! - We use typed structs with `#[serde(default)]` so that serde fills in
//!   missing fields automatically during deserialization.
//! - The result is serialized back to `Value` so existing code that reads raw
//!   JSON values continues to work.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

// ---------------------------------------------------------------------------
// Top-level typed config (only the sections that need defaults)
// ---------------------------------------------------------------------------

/// Top-level config with all sections that receive defaults.
///
/// Sections not listed here pass through unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigWithDefaults {
    #[serde(default)]
    api: ApiDefaults,

    #[serde(default)]
    llm: LlmDefaults,

    #[serde(default)]
    logging: LoggingDefaults,

    #[serde(default)]
    tutor: TutorDefaults,
}

// ---------------------------------------------------------------------------
// API server defaults
// ---------------------------------------------------------------------------

/// Default API port.
const DEFAULT_API_PORT: u16 = 8470;

/// Default bind host (loopback only).
const DEFAULT_API_HOST: &str = "127.0.0.1";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiDefaults {
    #[serde(default = "default_api_host")]
    host: String,

    #[serde(default = "default_api_port")]
    port: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
}

impl Default for ApiDefaults {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
            token: None,
        }
    }
}

fn default_api_host() -> String {
    DEFAULT_API_HOST.to_string()
}
fn default_api_port() -> u16 {
    DEFAULT_API_PORT
}

// ---------------------------------------------------------------------------
// LLM defaults
// ---------------------------------------------------------------------------

/// Default LLM provider.
const DEFAULT_LLM_PROVIDER: &str = "openai";

/// Default OpenAI model for tutoring turns.
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Default OpenAI-compatible base URL.
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default max completion attempts before giving up.
const DEFAULT_LLM_MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LlmDefaults {
    #[serde(default = "default_llm_provider")]
    provider: String,

    #[serde(default)]
    openai: OpenAiDefaults,
}

impl Default for LlmDefaults {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            openai: OpenAiDefaults::default(),
        }
    }
}

fn default_llm_provider() -> String {
    DEFAULT_LLM_PROVIDER.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpenAiDefaults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_key: Option<String>,

    #[serde(default = "default_openai_model")]
    model: String,

    #[serde(default = "default_openai_base_url")]
    base_url: String,

    #[serde(default = "default_llm_max_attempts")]
    max_attempts: u32,
}

impl Default for OpenAiDefaults {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_openai_model(),
            base_url: default_openai_base_url(),
            max_attempts: default_llm_max_attempts(),
        }
    }
}

fn default_openai_model() -> String {
    DEFAULT_OPENAI_MODEL.to_string()
}
fn default_openai_base_url() -> String {
    DEFAULT_OPENAI_BASE_URL.to_string()
}
fn default_llm_max_attempts() -> u32 {
    DEFAULT_LLM_MAX_ATTEMPTS
}

// ---------------------------------------------------------------------------
// Logging defaults
// ---------------------------------------------------------------------------

/// Default log level.
const DEFAULT_LOG_LEVEL: &str = "info";

/// Default log format (plain text for interactive use).
const DEFAULT_LOG_FORMAT: &str = "plain";

/// Default log output destination.
const DEFAULT_LOG_OUTPUT: &str = "stdout";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoggingDefaults {
    #[serde(default = "default_log_level")]
    level: String,

    #[serde(default = "default_log_format")]
    format: String,

    #[serde(default = "default_log_output")]
    output: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    file: Option<String>,
}

impl Default for LoggingDefaults {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            output: default_log_output(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_log_format() -> String {
    DEFAULT_LOG_FORMAT.to_string()
}
fn default_log_output() -> String {
    DEFAULT_LOG_OUTPUT.to_string()
}

// ---------------------------------------------------------------------------
// Tutor defaults
// ---------------------------------------------------------------------------

/// Product name used for persona framing in prompts.
const DEFAULT_DISPLAY_NAME: &str = "Preceptor";

/// Default question count for a practice round when the student doesn't ask
/// for a specific number.
const DEFAULT_QUESTION_COUNT: u32 = 3;

/// Hard ceiling on questions per practice round.
const DEFAULT_MAX_QUESTION_COUNT: u32 = 5;

/// How many recent dialogue turns to include in LLM prompts.
const DEFAULT_HISTORY_TURNS: u32 = 12;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TutorDefaults {
    #[serde(default = "default_display_name")]
    display_name: String,

    #[serde(default = "default_question_count")]
    default_question_count: u32,

    #[serde(default = "default_max_question_count")]
    max_question_count: u32,

    #[serde(default = "default_history_turns")]
    history_turns: u32,
}

impl Default for TutorDefaults {
    fn default() -> Self {
        Self {
            display_name: default_display_name(),
            default_question_count: default_question_count(),
            max_question_count: default_max_question_count(),
            history_turns: default_history_turns(),
        }
    }
}

fn default_display_name() -> String {
    DEFAULT_DISPLAY_NAME.to_string()
}
fn default_question_count() -> u32 {
    DEFAULT_QUESTION_COUNT
}
fn default_max_question_count() -> u32 {
    DEFAULT_MAX_QUESTION_COUNT
}
fn default_history_turns() -> u32 {
    DEFAULT_HISTORY_TURNS
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Apply production-ready defaults to a raw config `Value`.
///
/// This function:
/// 1. Deserializes known sections into typed structs (which fill missing fields
///    via `#[serde(default)]`).
/// 2. Serializes those structs back.
/// 3. Deep-merges the defaults *under* the original value so user-provided
///    values always win.
///
/// Sections not covered by the typed structs pass through untouched.
pub fn apply_defaults(config: &mut Value) {
    if !config.is_object() {
        *config = Value::Object(serde_json::Map::new());
    }

    // Deserialize into typed struct; missing fields get defaults.
    let with_defaults: ConfigWithDefaults = match serde_json::from_value(config.clone()) {
        Ok(v) => v,
        Err(e) => {
            debug!("config defaults: deserialization failed, using all defaults: {e}");
            ConfigWithDefaults {
                api: ApiDefaults::default(),
                llm: LlmDefaults::default(),
                logging: LoggingDefaults::default(),
                tutor: TutorDefaults::default(),
            }
        }
    };

    // Serialize the defaulted structs back to Value.
    let defaults_value = serde_json::to_value(&with_defaults).unwrap_or_default();

    // Deep-merge: defaults go *under* user values (user wins).
    merge_defaults(config, defaults_value);
}

/// Deep-merge `defaults` into `target`.
///
/// - For objects: recursively merge; keys in `target` are preserved (user wins).
/// - For all other types: `target` keeps its value if present.
fn merge_defaults(target: &mut Value, defaults: Value) {
    if let (Value::Object(target_obj), Value::Object(defaults_obj)) = (target, defaults) {
        for (key, default_value) in defaults_obj {
            match target_obj.get_mut(&key) {
                Some(existing) => {
                    // Recurse into nested objects.
                    merge_defaults(existing, default_value);
                }
                None => {
                    // Key missing in target, insert the default.
                    target_obj.insert(key, default_value);
                }
            }
        }
    }
    // target already has a non-object value: user wins, keep it.
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_config_gets_all_defaults() {
        let mut config = json!({});
        apply_defaults(&mut config);

        // API defaults
        assert_eq!(config["api"]["host"], DEFAULT_API_HOST);
        assert_eq!(config["api"]["port"], DEFAULT_API_PORT);
        assert!(config["api"].get("token").is_none());

        // LLM defaults
        assert_eq!(config["llm"]["provider"], DEFAULT_LLM_PROVIDER);
        assert_eq!(config["llm"]["openai"]["model"], DEFAULT_OPENAI_MODEL);
        assert_eq!(config["llm"]["openai"]["baseUrl"], DEFAULT_OPENAI_BASE_URL);
        assert_eq!(
            config["llm"]["openai"]["maxAttempts"],
            DEFAULT_LLM_MAX_ATTEMPTS
        );

        // Logging defaults
        assert_eq!(config["logging"]["level"], DEFAULT_LOG_LEVEL);
        assert_eq!(config["logging"]["format"], DEFAULT_LOG_FORMAT);
        assert_eq!(config["logging"]["output"], DEFAULT_LOG_OUTPUT);

        // Tutor defaults
        assert_eq!(config["tutor"]["displayName"], DEFAULT_DISPLAY_NAME);
        assert_eq!(
            config["tutor"]["defaultQuestionCount"],
            DEFAULT_QUESTION_COUNT
        );
        assert_eq!(
            config["tutor"]["maxQuestionCount"],
            DEFAULT_MAX_QUESTION_COUNT
        );
        assert_eq!(config["tutor"]["historyTurns"], DEFAULT_HISTORY_TURNS);
    }

    #[test]
    fn test_user_values_win_over_defaults() {
        let mut config = json!({
            "api": { "port": 9000 },
            "logging": { "level": "debug" }
        });
        apply_defaults(&mut config);

        // User values preserved
        assert_eq!(config["api"]["port"], 9000);
        assert_eq!(config["logging"]["level"], "debug");

        // Missing siblings filled in
        assert_eq!(config["api"]["host"], DEFAULT_API_HOST);
        assert_eq!(config["logging"]["format"], DEFAULT_LOG_FORMAT);
    }

    #[test]
    fn test_nested_user_values_win() {
        let mut config = json!({
            "llm": {
                "openai": { "model": "gpt-4o", "apiKey": "sk-user" }
            }
        });
        apply_defaults(&mut config);

        assert_eq!(config["llm"]["openai"]["model"], "gpt-4o");
        assert_eq!(config["llm"]["openai"]["apiKey"], "sk-user");
        assert_eq!(config["llm"]["openai"]["baseUrl"], DEFAULT_OPENAI_BASE_URL);
        assert_eq!(config["llm"]["provider"], DEFAULT_LLM_PROVIDER);
    }

    #[test]
    fn test_unknown_sections_pass_through() {
        let mut config = json!({
            "custom": { "anything": true }
        });
        apply_defaults(&mut config);

        assert_eq!(config["custom"]["anything"], true);
        // Defaults still applied alongside
        assert_eq!(config["api"]["port"], DEFAULT_API_PORT);
    }

    #[test]
    fn test_non_object_root_replaced() {
        let mut config = json!("not an object");
        apply_defaults(&mut config);

        assert!(config.is_object());
        assert_eq!(config["api"]["port"], DEFAULT_API_PORT);
    }

    #[test]
    fn test_tutor_counts_override() {
        let mut config = json!({
            "tutor": { "maxQuestionCount": 10, "displayName": "PrepPal" }
        });
        apply_defaults(&mut config);

        assert_eq!(config["tutor"]["maxQuestionCount"], 10);
        assert_eq!(config["tutor"]["displayName"], "PrepPal");
        assert_eq!(
            config["tutor"]["defaultQuestionCount"],
            DEFAULT_QUESTION_COUNT
        );
    }
}
