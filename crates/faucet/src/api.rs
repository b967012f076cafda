//! HTTP API for chat adapters

use crate::commands::{ChatMessage, CommandRouter};
use crate::error::FaucetResult;
use crate::service::FaucetStatus;
use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Success response
#[derive(Debug, Serialize)]
pub struct SuccessResponse<T> {
    pub data: T,
    pub timestamp: String,
}

impl<T> SuccessResponse<T> {
    fn new(data: T) -> Self {
        Self { data, timestamp: chrono::Utc::now().to_rfc3339() }
    }
}

#[derive(Debug, Serialize)]
pub struct CommandReply {
    pub reply: Option<String>,
}

/// Routes served by `tap serve`.
pub fn router(commands: Arc<CommandRouter>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/api/status", get(status_handler))
        .route("/api/command", post(command_handler))
        .with_state(commands)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Command handler
pub async fn command_handler(
    State(commands): State<Arc<CommandRouter>>,
    Json(message): Json<ChatMessage>,
) -> Json<SuccessResponse<CommandReply>> {
    info!(
        "Command from {} ({}) in #{}",
        message.requester_name, message.requester_id, message.channel
    );
    let reply = commands.handle(&message).await;
    Json(SuccessResponse::new(CommandReply { reply }))
}

/// Status handler
pub async fn status_handler(
    State(commands): State<Arc<CommandRouter>>,
) -> FaucetResult<Json<SuccessResponse<FaucetStatus>>> {
    let status = commands.service().status().await?;
    Ok(Json(SuccessResponse::new(status)))
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Root handler with info
pub async fn root_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": "Tap Faucet",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Chat-driven token faucet for Cosmos SDK chains",
        "endpoints": {
            "POST /api/command": "Handle a chat command",
            "GET /api/status": "Get faucet status",
            "GET /health": "Health check"
        }
    }))
}
