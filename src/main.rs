use std::sync::Arc;

use clap::Parser;
use serde_json::Value;
use tracing::{info, warn};

use preceptor::cli::{self, Cli, Command, ConfigCommand};
use preceptor::config;
use preceptor::llm;
use preceptor::logging;
use preceptor::server::{self, AppState, ServerConfig};
use preceptor::store::{FileStateStore, StateStore};
use preceptor::tutor::{AppSettings, TutorEngine};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        // No subcommand or explicit `start` both launch the server.
        None | Some(Command::Start) => run_server().await,

        Some(Command::Config(sub)) => {
            match sub {
                ConfigCommand::Show => cli::handle_config_show()?,
                ConfigCommand::Get { key } => cli::handle_config_get(&key)?,
                ConfigCommand::Path => cli::handle_config_path(),
            }
            Ok(())
        }

        Some(Command::Normalize { file, write }) => cli::handle_normalize(&file, write),

        Some(Command::Version) => {
            cli::handle_version();
            Ok(())
        }
    }
}

/// Run the tutoring server (the default command).
async fn run_server() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = load_and_validate_config()?;

    let state_dir = config::get_state_dir();
    std::fs::create_dir_all(&state_dir)?;

    let store: Arc<dyn StateStore> = Arc::new(FileStateStore::new());

    let generator = match llm::build_generator(&cfg) {
        Ok(g) => Some(g),
        Err(e) => {
            warn!("LLM provider unavailable: {}; chat will be disabled", e);
            None
        }
    };

    let settings = AppSettings::from_config(&cfg);
    let server_config = ServerConfig::from_config(&cfg);

    let engine = generator.map(|g| Arc::new(TutorEngine::new(store.clone(), g, settings)));

    log_startup_banner(&state_dir, engine.is_some());

    let state = AppState::new(engine, store, server_config.token.clone());
    server::serve(&server_config, state, async {
        let trigger = await_shutdown_trigger().await;
        info!("Received {}, shutting down", trigger);
    })
    .await?;

    info!("Server shut down");
    Ok(())
}

/// Load the config file and initialize logging from it. Logging is
/// configured by the same file, so problems found while loading are
/// reported only once the subscriber is installed.
fn load_and_validate_config() -> Result<Value, Box<dyn std::error::Error>> {
    let mut load_error = None;
    let cfg = match config::load_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            load_error = Some(e);
            Value::Object(serde_json::Map::new())
        }
    };

    logging::init_logging(logging::build_log_config(&cfg))?;

    if let Some(e) = load_error {
        warn!("Failed to load config: {}, using defaults", e);
    }
    for issue in config::validate_config(&cfg) {
        warn!("Config warning at {}: {}", issue.path, issue.message);
    }

    Ok(cfg)
}

/// Log the startup banner with version, config path, state dir, and LLM status.
fn log_startup_banner(state_dir: &std::path::Path, llm_enabled: bool) {
    info!("Preceptor v{}", env!("CARGO_PKG_VERSION"));
    info!("Config: {}", config::get_config_path().display());
    info!("State directory: {}", state_dir.display());
    if llm_enabled {
        info!("LLM: enabled");
    } else {
        info!("LLM: disabled, chat requests will be rejected");
    }
}

/// Wait for either Ctrl+C or SIGTERM (Unix only) and return a label for logging.
#[cfg(unix)]
async fn await_shutdown_trigger() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => "ctrl-c",
                _ = sigterm.recv() => "SIGTERM",
            }
        }
        Err(e) => {
            warn!(
                "Failed to install SIGTERM handler: {}; falling back to Ctrl+C only",
                e
            );
            match tokio::signal::ctrl_c().await {
                Ok(()) => "ctrl-c",
                Err(e) => {
                    panic!("Failed to install Ctrl+C handler: {}", e);
                }
            }
        }
    }
}

/// On non-Unix platforms, only Ctrl+C is available.
#[cfg(not(unix))]
async fn await_shutdown_trigger() -> &'static str {
    match tokio::signal::ctrl_c().await {
        Ok(()) => "ctrl-c",
        Err(e) => {
            panic!("Failed to install Ctrl+C handler: {}", e);
        }
    }
}
