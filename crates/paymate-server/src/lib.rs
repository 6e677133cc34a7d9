//! HTTP surface for the payment agent
//!
//! Exposes the loop over plain request/response HTTP: one `POST /api/chat`
//! drives one complete loop execution to a terminal state and returns the
//! reply together with the user-visible slice of the audit trail. Sessions
//! are isolated: each holds its own agent behind an async mutex, which
//! serializes messages within a session while distinct sessions run
//! concurrently. If a client disconnects mid-request, the request future
//! is dropped at the next suspension point; completed action calls are
//! neither retried nor rolled back.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use paymate_core::agent::{Agent, ReplyStatus};
use paymate_core::audit::LogEntry;
use paymate_core::factory::AgentFactory;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3001".parse().expect("valid default address"),
            enable_cors: true,
        }
    }
}

impl ServerConfig {
    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    pub fn with_cors(mut self, enable: bool) -> Self {
        self.enable_cors = enable;
        self
    }
}

type SessionMap = HashMap<String, Arc<Mutex<Agent>>>;

/// Shared application state: the factory building per-session agents and
/// the live session map.
#[derive(Clone)]
pub struct AppState {
    factory: Arc<AgentFactory>,
    sessions: Arc<Mutex<SessionMap>>,
}

impl AppState {
    pub fn new(factory: AgentFactory) -> Self {
        Self {
            factory: Arc::new(factory),
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    async fn session(&self, session_id: &str) -> Arc<Mutex<Agent>> {
        let mut sessions = self.sessions.lock().await;
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(self.factory.new_session())))
            .clone()
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResponsePayload {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub status: ReplyStatus,
    pub response: ResponsePayload,
    pub session_id: String,
    /// User-visible audit entries produced by this request.
    pub logs: Vec<LogEntry>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: &'static str,
}

/// Run one chat message through its session's agent.
pub async fn process_chat(state: &AppState, request: ChatRequest) -> ChatResponse {
    let session_id = request
        .session_id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let agent = state.session(&session_id).await;

    // The lock serializes messages for this session: one loop execution
    // reaches its terminal state before the next message is accepted.
    let mut agent = agent.lock().await;
    let seen = agent.audit().user_visible().len();
    let reply = agent.handle_message(&request.message).await;
    let mut visible = agent.audit().user_visible();
    let logs = visible.split_off(seen.min(visible.len()));

    ChatResponse {
        status: reply.status,
        response: ResponsePayload {
            kind: match reply.status {
                ReplyStatus::Success => "message",
                ReplyStatus::Error => "error",
            },
            message: reply.message,
            details: reply.details,
        },
        session_id,
        logs,
    }
}

async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Json<ChatResponse> {
    Json(process_chat(&state, request).await)
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    let mut router = Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if config.enable_cors {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    router
}

/// Resolves when the process receives ctrl-c, for graceful shutdown.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
    }
    log::info!("Shutdown signal received");
}
