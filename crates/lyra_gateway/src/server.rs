use crate::error::ApiError;
use crate::types::{now, PromptRequest, ResetResponse, StatusResponse};
use anyhow::Context;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use lyra_reasoning::{ModuleReport, Orchestrator, TickReport};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

/// Shared state for the gateway server.
///
/// The mutex serializes ticks: one prompt is processed at a time.
#[derive(Clone)]
pub struct AppState {
    core: Arc<Mutex<Orchestrator>>,
}

impl AppState {
    pub fn new(core: Orchestrator) -> Self {
        Self {
            core: Arc::new(Mutex::new(core)),
        }
    }
}

/// Build the HTTP routes:
/// - `POST /lyra`: run one tick with a prompt
/// - `GET /status`: simulation time, memory size, alert flag
/// - `GET /modules`: per-module status snapshots
/// - `POST /reset`: return the core to time zero
/// - `GET /health`: health check
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/lyra", post(run_lyra))
        .route("/status", get(status))
        .route("/modules", get(modules))
        .route("/reset", post(reset))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// The gateway HTTP server.
pub struct GatewayServer {
    state: AppState,
    host: String,
    port: u16,
}

impl GatewayServer {
    pub fn new(core: Orchestrator, host: &str, port: u16) -> Self {
        Self {
            state: AppState::new(core),
            host: host.to_string(),
            port,
        }
    }

    /// Bind and serve until the server stops.
    pub async fn serve(self) -> anyhow::Result<()> {
        let addr = format!("{}:{}", self.host, self.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Gateway failed to bind {}", addr))?;
        tracing::info!("Gateway listening on {}", addr);
        axum::serve(listener, router(self.state))
            .await
            .context("Gateway server error")
    }

    /// Start the server in a background task.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(e) = self.serve().await {
                tracing::error!("{:#}", e);
            }
        })
    }
}

// ============================================================================
// Route handlers
// ============================================================================

async fn health() -> &'static str {
    "ok"
}

async fn run_lyra(
    State(state): State<AppState>,
    Json(req): Json<PromptRequest>,
) -> Result<Json<TickReport>, ApiError> {
    if req.prompt.trim().is_empty() {
        return Err(ApiError::EmptyPrompt);
    }
    let mut core = state.core.lock().await;
    Ok(Json(core.tick(&req.prompt).await))
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let core = state.core.lock().await;
    let status = core.status();
    Json(StatusResponse {
        timestamp: now(),
        t: status.sim_time,
        memory_traces: status.active_traces,
        alert: status.alert,
    })
}

async fn modules(State(state): State<AppState>) -> Json<ModuleReport> {
    Json(state.core.lock().await.module_status())
}

async fn reset(State(state): State<AppState>) -> Result<Json<ResetResponse>, ApiError> {
    state.core.lock().await.reset()?;
    Ok(Json(ResetResponse::done()))
}
