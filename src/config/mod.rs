//! Configuration parsing module
//!
//! Handles JSON5 configuration with environment variable substitution and
//! caching. Partial configs work: missing sections get production defaults.

pub mod defaults;

use parking_lot::RwLock;
use regex::Regex;
use serde_json::Value;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Default config cache TTL in milliseconds
const DEFAULT_CACHE_TTL_MS: u64 = 200;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse JSON5 at {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("Failed to read config file {path}: {message}")]
    ReadError { path: String, message: String },

    #[error("Missing environment variable: {var}")]
    MissingEnvVar { var: String },
}

/// Cached configuration entry
struct CachedConfig {
    value: Value,
    loaded_at: Instant,
}

/// Global config cache
static CONFIG_CACHE: LazyLock<RwLock<Option<CachedConfig>>> = LazyLock::new(|| RwLock::new(None));

/// Get the config file path.
/// Priority: PRECEPTOR_CONFIG_PATH > PRECEPTOR_STATE_DIR/preceptor.json5 > ~/.preceptor/preceptor.json5
/// Falls back to .json extension if the .json5 file doesn't exist.
pub fn get_config_path() -> PathBuf {
    if let Ok(path) = env::var("PRECEPTOR_CONFIG_PATH") {
        return PathBuf::from(path);
    }

    if let Ok(state_dir) = env::var("PRECEPTOR_STATE_DIR") {
        let dir = PathBuf::from(state_dir);
        let json5 = dir.join("preceptor.json5");
        if json5.exists() {
            return json5;
        }
        return dir.join("preceptor.json");
    }

    let base = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".preceptor");
    let json5 = base.join("preceptor.json5");
    if json5.exists() {
        return json5;
    }
    base.join("preceptor.json")
}

/// Get the state directory where student records and other runtime data live.
/// Priority: PRECEPTOR_STATE_DIR > ~/.preceptor
pub fn get_state_dir() -> PathBuf {
    if let Ok(state_dir) = env::var("PRECEPTOR_STATE_DIR") {
        return PathBuf::from(state_dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".preceptor")
}

/// Get the cache TTL duration
fn get_cache_ttl() -> Option<Duration> {
    // Check if caching is disabled
    if env::var("PRECEPTOR_DISABLE_CONFIG_CACHE").is_ok() {
        return None;
    }

    let ms = env::var("PRECEPTOR_CONFIG_CACHE_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(DEFAULT_CACHE_TTL_MS);

    Some(Duration::from_millis(ms))
}

/// Load and parse the configuration file with caching.
/// Returns defaults if the file doesn't exist.
///
/// The returned value has all config defaults applied so that missing
/// sections/fields have production-ready values.
pub fn load_config() -> Result<Value, ConfigError> {
    let path = get_config_path();

    // Check cache first
    if let Some(ttl) = get_cache_ttl() {
        let cache = CONFIG_CACHE.read();
        if let Some(cached) = cache.as_ref() {
            if cached.loaded_at.elapsed() < ttl {
                return Ok(cached.value.clone());
            }
        }
    }

    // Load fresh config
    let config = load_config_uncached(&path)?;

    // Update cache if caching is enabled
    if get_cache_ttl().is_some() {
        let mut cache = CONFIG_CACHE.write();
        *cache = Some(CachedConfig {
            value: config.clone(),
            loaded_at: Instant::now(),
        });
    }

    Ok(config)
}

/// Load config without using the cache.
///
/// After parsing and env var substitution, this applies config defaults so
/// that missing sections/fields have sensible values.
pub fn load_config_uncached(path: &Path) -> Result<Value, ConfigError> {
    // Return empty object with defaults if file doesn't exist
    if !path.exists() {
        let mut empty = Value::Object(serde_json::Map::new());
        defaults::apply_defaults(&mut empty);
        return Ok(empty);
    }

    // Read and parse the config file
    let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let mut value = parse_json5(&content, path)?;

    // Apply environment variable substitution
    substitute_env_vars(&mut value)?;

    // Fill in missing sections/fields with production-ready values
    defaults::apply_defaults(&mut value);

    Ok(value)
}

/// Parse JSON5 content
fn parse_json5(content: &str, path: &Path) -> Result<Value, ConfigError> {
    json5::from_str(content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Substitute environment variables in string values.
/// Pattern: ${VAR} where VAR matches [A-Z_][A-Z0-9_]*
/// Escape with $${VAR} to get literal ${VAR}
fn substitute_env_vars(value: &mut Value) -> Result<(), ConfigError> {
    match value {
        Value::String(s) => {
            *s = substitute_env_in_string(s)?;
        }
        Value::Object(obj) => {
            for (_, v) in obj.iter_mut() {
                substitute_env_vars(v)?;
            }
        }
        Value::Array(arr) => {
            for item in arr.iter_mut() {
                substitute_env_vars(item)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Substitute environment variables in a single string
fn substitute_env_in_string(s: &str) -> Result<String, ConfigError> {
    // Regex pattern for env vars: ${VAR} where VAR is uppercase with underscores and digits
    static ENV_VAR_PATTERN: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\$\$?\{([A-Z_][A-Z0-9_]*)\}").unwrap());

    let mut result = String::with_capacity(s.len());
    let mut last_end = 0;

    for caps in ENV_VAR_PATTERN.captures_iter(s) {
        let full_match = caps.get(0).unwrap();
        let var_name = caps.get(1).unwrap().as_str();

        // Add text before this match
        result.push_str(&s[last_end..full_match.start()]);

        // Check if this is an escaped pattern ($${ instead of ${)
        let match_str = full_match.as_str();
        if match_str.starts_with("$$") {
            // Escaped - output literal ${VAR}
            result.push_str(&format!("${{{}}}", var_name));
        } else {
            // Not escaped - substitute with env var value
            let value = env::var(var_name).map_err(|_| ConfigError::MissingEnvVar {
                var: var_name.to_string(),
            })?;
            result.push_str(&value);
        }

        last_end = full_match.end();
    }

    // Add remaining text
    result.push_str(&s[last_end..]);

    Ok(result)
}

/// Clear the config cache (useful for testing or forced reload)
pub fn clear_cache() {
    let mut cache = CONFIG_CACHE.write();
    *cache = None;
}

/// Validation error with path context
#[derive(Debug)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

/// Validate a config value against basic structural expectations.
/// Returns a list of validation issues (empty if valid).
pub fn validate_config(config: &Value) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if let Value::Object(obj) = config {
        // Check for unknown top-level keys
        let known_keys = ["api", "llm", "logging", "storage", "tutor"];

        for key in obj.keys() {
            if !known_keys.contains(&key.as_str()) {
                issues.push(ValidationIssue {
                    path: format!(".{}", key),
                    message: format!("Unknown configuration key: {}", key),
                });
            }
        }

        // Validate api section if present
        if let Some(Value::Object(api)) = obj.get("api") {
            if let Some(port) = api.get("port") {
                if !port.is_number() {
                    issues.push(ValidationIssue {
                        path: ".api.port".to_string(),
                        message: "port must be a number".to_string(),
                    });
                }
            }
        }

        // Validate tutor section if present
        if let Some(Value::Object(tutor)) = obj.get("tutor") {
            for key in ["defaultQuestionCount", "maxQuestionCount"] {
                if let Some(count) = tutor.get(key) {
                    if !count.is_number() {
                        issues.push(ValidationIssue {
                            path: format!(".tutor.{}", key),
                            message: format!("{} must be a number", key),
                        });
                    }
                }
            }
        }
    } else {
        issues.push(ValidationIssue {
            path: ".".to_string(),
            message: "Config root must be an object".to_string(),
        });
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Mutex to serialize tests that modify environment variables
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Helper to create a temp config file
    fn create_temp_config(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_parse_json5_basic() {
        let content = r#"{
            // This is a comment
            "key": "value",
            "number": 42,
            trailing: "comma",
        }"#;

        let path = Path::new("test.json5");
        let result = parse_json5(content, path).unwrap();

        assert_eq!(result["key"], "value");
        assert_eq!(result["number"], 42);
        assert_eq!(result["trailing"], "comma");
    }

    #[test]
    fn test_parse_json5_error() {
        let content = r#"{ invalid json }"#;
        let path = Path::new("test.json5");
        let result = parse_json5(content, path);

        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_env_var_substitution() {
        let _lock = ENV_LOCK.lock().unwrap();
        env::set_var("TEST_VAR_ONE", "hello");
        env::set_var("TEST_VAR_TWO", "world");

        let result = substitute_env_in_string("${TEST_VAR_ONE} ${TEST_VAR_TWO}!").unwrap();
        assert_eq!(result, "hello world!");

        env::remove_var("TEST_VAR_ONE");
        env::remove_var("TEST_VAR_TWO");
    }

    #[test]
    fn test_env_var_escaped() {
        let result = substitute_env_in_string("$${ESCAPED_VAR}").unwrap();
        assert_eq!(result, "${ESCAPED_VAR}");
    }

    #[test]
    fn test_env_var_missing() {
        let _lock = ENV_LOCK.lock().unwrap();
        env::remove_var("NONEXISTENT_VAR_12345");
        let result = substitute_env_in_string("${NONEXISTENT_VAR_12345}");

        assert!(
            matches!(result, Err(ConfigError::MissingEnvVar { var }) if var == "NONEXISTENT_VAR_12345")
        );
    }

    #[test]
    fn test_env_var_partial_string() {
        let _lock = ENV_LOCK.lock().unwrap();
        env::set_var("TEST_API_KEY", "sk-secret");

        let result = substitute_env_in_string("Bearer ${TEST_API_KEY}").unwrap();
        assert_eq!(result, "Bearer sk-secret");

        env::remove_var("TEST_API_KEY");
    }

    #[test]
    fn test_config_not_exists_returns_defaults() {
        let path = PathBuf::from("/nonexistent/path/config.json");
        let result = load_config_uncached(&path).unwrap();

        assert!(result.is_object());
        // When config file doesn't exist, defaults are applied so the object
        // is non-empty and contains the essential sections.
        let obj = result.as_object().unwrap();
        assert!(!obj.is_empty(), "missing config should return defaults");
        assert!(obj.contains_key("api"), "should have api defaults");
        assert_eq!(result["api"]["port"], 8470);
        assert_eq!(result["api"]["host"], "127.0.0.1");
        assert!(obj.contains_key("logging"), "should have logging defaults");
        assert_eq!(result["logging"]["level"], "info");
    }

    #[test]
    fn test_validation_unknown_key() {
        let config = serde_json::json!({
            "api": { "port": 8470 },
            "unknownKey": "value"
        });

        let issues = validate_config(&config);

        assert_eq!(issues.len(), 1);
        assert!(issues[0].path.contains("unknownKey"));
    }

    #[test]
    fn test_validation_known_keys_pass() {
        let config = serde_json::json!({
            "api": { "port": 8470 },
            "tutor": { "defaultQuestionCount": 3 },
            "logging": { "level": "debug" }
        });

        let issues = validate_config(&config);

        assert!(issues.is_empty());
    }

    #[test]
    fn test_validation_invalid_port_type() {
        let config = serde_json::json!({
            "api": { "port": "not-a-number" }
        });

        let issues = validate_config(&config);

        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("port must be a number"));
    }

    #[test]
    fn test_validation_invalid_question_count_type() {
        let config = serde_json::json!({
            "tutor": { "maxQuestionCount": "five" }
        });

        let issues = validate_config(&config);

        assert_eq!(issues.len(), 1);
        assert!(issues[0].path.contains("maxQuestionCount"));
    }

    #[test]
    fn test_config_cache_ttl_default() {
        let _lock = ENV_LOCK.lock().unwrap();
        env::remove_var("PRECEPTOR_CONFIG_CACHE_MS");
        env::remove_var("PRECEPTOR_DISABLE_CONFIG_CACHE");

        let ttl = get_cache_ttl();
        assert_eq!(ttl, Some(Duration::from_millis(200)));
    }

    #[test]
    fn test_config_cache_ttl_custom() {
        let _lock = ENV_LOCK.lock().unwrap();
        // Ensure disabled cache env var is not set
        env::remove_var("PRECEPTOR_DISABLE_CONFIG_CACHE");
        env::set_var("PRECEPTOR_CONFIG_CACHE_MS", "500");

        let ttl = get_cache_ttl();
        assert_eq!(ttl, Some(Duration::from_millis(500)));

        env::remove_var("PRECEPTOR_CONFIG_CACHE_MS");
    }

    #[test]
    fn test_config_cache_disabled() {
        let _lock = ENV_LOCK.lock().unwrap();
        env::set_var("PRECEPTOR_DISABLE_CONFIG_CACHE", "1");

        let ttl = get_cache_ttl();
        assert!(ttl.is_none());

        env::remove_var("PRECEPTOR_DISABLE_CONFIG_CACHE");
    }

    #[test]
    fn test_get_config_path_default() {
        let _lock = ENV_LOCK.lock().unwrap();
        env::remove_var("PRECEPTOR_CONFIG_PATH");
        env::remove_var("PRECEPTOR_STATE_DIR");

        let path = get_config_path();
        // Falls back to .json when .json5 doesn't exist on disk
        assert!(path.ends_with(".preceptor/preceptor.json"));
    }

    #[test]
    fn test_get_config_path_override() {
        let _lock = ENV_LOCK.lock().unwrap();
        env::remove_var("PRECEPTOR_STATE_DIR");
        env::set_var("PRECEPTOR_CONFIG_PATH", "/custom/path/config.json");

        let path = get_config_path();
        assert_eq!(path, PathBuf::from("/custom/path/config.json"));

        env::remove_var("PRECEPTOR_CONFIG_PATH");
    }

    #[test]
    fn test_get_config_path_state_dir() {
        let _lock = ENV_LOCK.lock().unwrap();
        env::remove_var("PRECEPTOR_CONFIG_PATH");
        env::set_var("PRECEPTOR_STATE_DIR", "/custom/state");

        let path = get_config_path();
        // Falls back to .json when .json5 doesn't exist on disk
        assert_eq!(path, PathBuf::from("/custom/state/preceptor.json"));

        env::remove_var("PRECEPTOR_STATE_DIR");
    }

    #[test]
    fn test_get_state_dir_env_override() {
        let _lock = ENV_LOCK.lock().unwrap();
        env::set_var("PRECEPTOR_STATE_DIR", "/custom/state");

        let dir = get_state_dir();
        assert_eq!(dir, PathBuf::from("/custom/state"));

        env::remove_var("PRECEPTOR_STATE_DIR");
    }

    #[test]
    fn test_env_substitution_in_nested_config() {
        let _lock = ENV_LOCK.lock().unwrap();
        env::set_var("TEST_OPENAI_KEY", "sk-test-key");

        let dir = TempDir::new().unwrap();
        let main_path = create_temp_config(
            &dir,
            "config.json5",
            r#"{
                "llm": {
                    "openai": { "apiKey": "${TEST_OPENAI_KEY}" }
                }
            }"#,
        );

        let config = load_config_uncached(&main_path).unwrap();

        assert_eq!(config["llm"]["openai"]["apiKey"], "sk-test-key");

        env::remove_var("TEST_OPENAI_KEY");
    }

    #[test]
    fn test_clear_cache() {
        // Just verify it doesn't panic
        clear_cache();
    }
}
