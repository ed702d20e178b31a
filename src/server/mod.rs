//! HTTP API for the tutoring engine.
//!
//! Endpoints:
//! - `GET  /health` - liveness probe, always open
//! - `POST /api/tutor/chat` - run one tutoring turn
//! - `GET  /api/tutor/state/:user_id` - inspect a student record
//! - `GET  /api/questions/search` - query the practice question bank
//!
//! The `/api` routes require `Authorization: Bearer <token>` when a token is
//! configured (`api.token` in config, or the PRECEPTOR_API_TOKEN env var).
//! With no token configured the API is open; the default bind is loopback
//! only, so that is acceptable for local use.

use std::future::Future;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::questions::{self, BankQuestion, Difficulty};
use crate::store::StateStore;
use crate::tutor::TutorEngine;

/// Server settings read from the `api` config section.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Bearer token for `/api` routes. `None` leaves the API open.
    pub token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8470,
            token: None,
        }
    }
}

impl ServerConfig {
    /// Typed view over a loaded config value. The token falls back to the
    /// PRECEPTOR_API_TOKEN env var when the config leaves it unset.
    pub fn from_config(config: &Value) -> Self {
        let defaults = Self::default();
        let api = config.get("api");

        let host = api
            .and_then(|a| a.get("host"))
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .unwrap_or(defaults.host);

        let port = api
            .and_then(|a| a.get("port"))
            .and_then(|v| v.as_u64())
            .and_then(|p| u16::try_from(p).ok())
            .unwrap_or(defaults.port);

        let token = api
            .and_then(|a| a.get("token"))
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .or_else(|| {
                std::env::var("PRECEPTOR_API_TOKEN")
                    .ok()
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
            });

        Self { host, port, token }
    }
}

/// Shared state for all routes.
#[derive(Clone)]
pub struct AppState {
    /// Dialogue engine. `None` when no LLM provider is configured; the chat
    /// endpoint answers 503 in that case, the read endpoints keep working.
    pub engine: Option<Arc<TutorEngine>>,
    pub store: Arc<dyn StateStore>,
    pub api_token: Option<String>,
    /// Server start time (Unix timestamp)
    pub start_time: i64,
}

impl AppState {
    pub fn new(
        engine: Option<Arc<TutorEngine>>,
        store: Arc<dyn StateStore>,
        api_token: Option<String>,
    ) -> Self {
        Self {
            engine,
            store,
            api_token,
            start_time: chrono::Utc::now().timestamp(),
        }
    }
}

/// Create the HTTP router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/tutor/chat", post(chat_handler))
        .route("/api/tutor/state/:user_id", get(state_handler))
        .route("/api/questions/search", get(search_handler))
        .with_state(state)
}

/// Bind and serve until `shutdown` resolves.
pub async fn serve(
    config: &ServerConfig,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let app = create_router(state);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    info!(target: "server", %local_addr, "API listening");
    if config.token.is_none() {
        warn!(
            target: "server",
            "no api.token configured; /api routes are open to anyone who can reach this address"
        );
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

/// Bearer check for `/api` routes. Returns the rejection response, or `None`
/// when the request may proceed.
fn check_api_auth(state: &AppState, headers: &HeaderMap) -> Option<Response> {
    let expected = state.api_token.as_deref()?;
    match extract_bearer_token(headers) {
        Some(provided) if validate_token(&provided, expected) => None,
        _ => Some(error_response(StatusCode::UNAUTHORIZED, "unauthorized")),
    }
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth = headers.get("authorization")?.to_str().ok()?;
    auth.strip_prefix("Bearer ").map(|t| t.trim().to_string())
}

/// Timing-safe comparison of the provided token against the configured one.
fn validate_token(provided: &str, configured: &str) -> bool {
    if provided.is_empty() || provided.len() != configured.len() {
        return false;
    }
    let mut result: u8 = 0;
    for (x, y) in provided.bytes().zip(configured.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /health - lightweight liveness probe.
async fn health_handler(State(state): State<AppState>) -> Response {
    let uptime = chrono::Utc::now().timestamp() - state.start_time;
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
            "uptimeSeconds": uptime,
        })),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest {
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    message: String,
}

/// POST /api/tutor/chat - run one tutoring turn.
async fn chat_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(rejection) = check_api_auth(&state, &headers) {
        return rejection;
    }

    let request: ChatRequest = match serde_json::from_slice(&body) {
        Ok(parsed) => parsed,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                &format!("invalid JSON body: {}", e),
            );
        }
    };

    let user_id = request.user_id.trim();
    let message = request.message.trim();
    if user_id.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "userId required");
    }
    if message.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "message required");
    }

    let Some(engine) = state.engine.as_ref() else {
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "no LLM provider configured",
        );
    };

    let outcome = engine.chat(user_id, message).await;
    (
        StatusCode::OK,
        Json(json!({ "reply": outcome.reply, "mode": outcome.mode })),
    )
        .into_response()
}

/// GET /api/tutor/state/:user_id - inspect a student record.
///
/// Unknown users get the same default view the engine would start them with.
async fn state_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> Response {
    if let Some(rejection) = check_api_auth(&state, &headers) {
        return rejection;
    }

    let record = state.store.load(&user_id);
    (
        StatusCode::OK,
        Json(json!({
            "userId": record.user_id,
            "mode": record.mode.label(),
            "preferences": record.preferences,
            "mastery": record.mastery,
            "messageCount": record.session_log.len(),
        })),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
    limit: Option<usize>,
    difficulty: Option<String>,
}

/// Wire form of a bank entry.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QuestionView {
    id: String,
    topic: String,
    difficulty: String,
    text: String,
    options: [String; 4],
    correct_answer: char,
    explanation: String,
}

impl From<&BankQuestion> for QuestionView {
    fn from(q: &BankQuestion) -> Self {
        Self {
            id: q.id.clone(),
            topic: q.topic.clone(),
            difficulty: q.difficulty.to_string(),
            text: q.text.clone(),
            options: q.options.clone(),
            correct_answer: q.correct_answer,
            explanation: q.explanation.clone(),
        }
    }
}

/// GET /api/questions/search?q=...&limit=...&difficulty=... - query the bank.
async fn search_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
) -> Response {
    if let Some(rejection) = check_api_auth(&state, &headers) {
        return rejection;
    }

    let query = params.q.trim();
    if query.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "q required");
    }

    let limit = params.limit.unwrap_or(10).clamp(1, 50);

    let difficulty = match params.difficulty.as_deref() {
        None => None,
        Some(raw) => match Difficulty::parse(raw) {
            Some(d) => Some(d),
            None => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    "difficulty must be easy, medium, or hard",
                );
            }
        },
    };

    let results = questions::search(query, limit, difficulty);
    let views: Vec<QuestionView> = results.iter().map(QuestionView::from).collect();
    (
        StatusCode::OK,
        Json(json!({ "count": views.len(), "questions": views })),
    )
        .into_response()
}
