//! CLI subcommand definitions and handlers.
//!
//! Uses clap derive to define the subcommand hierarchy:
//! - `start` (default) -- start the API server
//! - `config show|get|path` -- read configuration
//! - `normalize <file>` -- run the question text cleanup passes
//! - `version` -- print version info

use std::path::Path;

use clap::{Parser, Subcommand};
use serde_json::Value;

use crate::config;
use crate::normalize;

/// Preceptor SAT tutoring backend.
#[derive(Parser, Debug)]
#[command(
    name = "preceptor",
    version = env!("CARGO_PKG_VERSION"),
    about = "Preceptor: SAT tutoring backend"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the API server (default when no subcommand is given).
    Start,

    /// Read configuration values.
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Clean up exported question rows (embedded topic labels, clumped
    /// option text). Dry run unless --write is given.
    Normalize {
        /// Path to a JSON array file of question rows.
        file: String,

        /// Rewrite the file in place instead of dry-running.
        #[arg(long)]
        write: bool,
    },

    /// Print version information.
    Version,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the fully loaded configuration (secrets redacted) as JSON.
    Show,

    /// Print a specific configuration value by dot-notation path.
    Get {
        /// Dot-notation key (e.g. "api.port", "tutor.displayName").
        key: String,
    },

    /// Print the resolved configuration file path.
    Path,
}

// ---------------------------------------------------------------------------
// Subcommand handlers
// ---------------------------------------------------------------------------

/// Secrets that should be redacted when printing config.
const SECRET_KEYS: &[&str] = &["apikey", "api_key", "token", "secret", "password"];

/// Run the `config show` subcommand.
pub fn handle_config_show() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::load_config()?;
    let redacted = redact_secrets(cfg);
    println!("{}", serde_json::to_string_pretty(&redacted)?);
    Ok(())
}

/// Run the `config get <key>` subcommand.
pub fn handle_config_get(key: &str) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::load_config()?;
    match get_value_at_path(&cfg, key) {
        Some(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        None => {
            eprintln!("Key not found: {}", key);
            std::process::exit(1);
        }
    }
    Ok(())
}

/// Run the `config path` subcommand.
pub fn handle_config_path() {
    println!("{}", config::get_config_path().display());
}

/// Run the `normalize` subcommand.
pub fn handle_normalize(file: &str, write: bool) -> Result<(), Box<dyn std::error::Error>> {
    let report = normalize::normalize_file(Path::new(file), write)?;

    for row in &report.details {
        let id = if row.id.is_empty() {
            "<no id>"
        } else {
            row.id.as_str()
        };
        if let Some(topic) = &row.topic_extracted {
            println!("{}: moved topic label \"{}\"", id, topic);
        }
        if row.options_split {
            println!("{}: split option clump into 4 options", id);
        }
        for note in &row.notes {
            println!("{}: {}", id, note);
        }
    }

    println!("{}", report.summary_line());
    if report.changed() && !write {
        println!("Dry run; pass --write to apply.");
    }
    Ok(())
}

/// Run the `version` subcommand.
pub fn handle_version() {
    println!("preceptor {}", env!("CARGO_PKG_VERSION"));
    println!(
        "  Platform: {} ({})",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Navigate a JSON value by dot-notation path and return the leaf value.
fn get_value_at_path(root: &Value, path: &str) -> Option<Value> {
    let mut current = root;
    for part in path.split('.') {
        current = current.as_object()?.get(part)?;
    }
    Some(current.clone())
}

/// Redact known secret keys in a JSON value (recursive).
fn redact_secrets(mut value: Value) -> Value {
    match &mut value {
        Value::Object(map) => {
            let keys: Vec<String> = map.keys().cloned().collect();
            for key in keys {
                let lower = key.to_lowercase();
                if SECRET_KEYS.iter().any(|s| lower.contains(s)) {
                    map.insert(key, Value::String("[REDACTED]".to_string()));
                } else if let Some(child) = map.remove(&key) {
                    map.insert(key, redact_secrets(child));
                }
            }
        }
        Value::Array(arr) => {
            for item in arr.iter_mut() {
                *item = redact_secrets(item.clone());
            }
        }
        _ => {}
    }
    value
}
