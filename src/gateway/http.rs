use crate::config::ConsoleConfig;
use crate::core::simulation::SimulationHandle;
use crate::domain::model::{Call, PoolSnapshot, TranscriptEntry, ViewerId};
use crate::domain::ports::TipsProvider;
use crate::gateway::ws;
use crate::utils::error::{ConsoleError, Result};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub sim: SimulationHandle,
    pub tips: Arc<dyn TipsProvider>,
    next_viewer: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(sim: SimulationHandle, tips: Arc<dyn TipsProvider>) -> Self {
        Self {
            sim,
            tips,
            next_viewer: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn next_viewer_id(&self) -> ViewerId {
        self.next_viewer.fetch_add(1, Ordering::Relaxed)
    }
}

struct ApiError(ConsoleError);

impl From<ConsoleError> for ApiError {
    fn from(err: ConsoleError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            ConsoleError::SimulationClosed => StatusCode::SERVICE_UNAVAILABLE,
            ConsoleError::CallNotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::warn!("HTTP request failed: {}", self.0);
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    active_calls: usize,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct ReceiveCallRequest {
    from: String,
    #[serde(default)]
    to: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TipsRequest {
    #[serde(default)]
    transcript: String,
}

#[derive(Debug, Serialize)]
struct TipsResponse {
    tips: Vec<String>,
}

pub fn router(state: AppState, cors_allow_any: bool) -> Router {
    let app = Router::new()
        .route("/health", get(health))
        .route("/ws", get(ws::viewer_socket))
        .route("/api/calls", get(list_calls).post(receive_call))
        .route("/api/calls/{call_id}/transcript", get(call_transcript))
        .route("/api/services", get(services))
        .route("/api/gemini-tips", post(gemini_tips))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if cors_allow_any {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

pub async fn serve(config: &ConsoleConfig, state: AppState, shutdown: CancellationToken) -> Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!("🚀 Dispatch console listening on {}", addr);
    tracing::info!("🔌 WebSocket endpoint: ws://{}/ws", addr);
    tracing::info!("📊 Health check: http://{}/health", addr);

    axum::serve(listener, router(state, config.server.cors_allow_any))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}

async fn health(State(state): State<AppState>) -> std::result::Result<Json<HealthResponse>, ApiError> {
    let calls = state.sim.list_calls().await?;
    Ok(Json(HealthResponse {
        status: "healthy",
        active_calls: calls.len(),
        timestamp: Utc::now(),
    }))
}

async fn list_calls(State(state): State<AppState>) -> std::result::Result<Json<Vec<Call>>, ApiError> {
    Ok(Json(state.sim.list_calls().await?))
}

async fn receive_call(
    State(state): State<AppState>,
    Json(request): Json<ReceiveCallRequest>,
) -> std::result::Result<(StatusCode, Json<Call>), ApiError> {
    let call = state
        .sim
        .receive_call(&request.from, request.to.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(call)))
}

async fn call_transcript(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> std::result::Result<Json<Vec<TranscriptEntry>>, ApiError> {
    Ok(Json(state.sim.transcript(&call_id).await?))
}

async fn services(State(state): State<AppState>) -> std::result::Result<Json<PoolSnapshot>, ApiError> {
    Ok(Json(state.sim.snapshot().await?))
}

/// The tips service is optional: any failure degrades to an empty list.
async fn gemini_tips(State(state): State<AppState>, Json(request): Json<TipsRequest>) -> Json<TipsResponse> {
    let tips = match state.tips.tips(&request.transcript).await {
        Ok(tips) => tips,
        Err(err) => {
            tracing::warn!("Tips unavailable, returning fallback: {}", err);
            Vec::new()
        }
    };
    Json(TipsResponse { tips })
}
