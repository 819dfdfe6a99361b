//! Chat REST routes.
//!
//! `POST /api/chat/message` is the one-shot turn: history is loaded from the
//! database, the text-generation API is called once, and the completed
//! exchange is persisted before the reply is returned.  History and feedback
//! are thin reads/writes over the same store.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::info;
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::schemas::chat::{ChatRequest, ChatResponse, ExchangeResponse, FeedbackRequest};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(chat_message, chat_history, chat_feedback),
    components(schemas(ChatRequest, ChatResponse, ExchangeResponse, FeedbackRequest))
)]
pub struct ChatApi;

/// Register chat REST routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/message", post(chat_message))
        .route("/history/{session_id}", get(chat_history))
        .route("/feedback", post(chat_feedback))
}

// ── Chat handlers ─────────────────────────────────────────────────────────────

/// One-shot chat turn (`POST /api/chat/message`).
///
/// When `session_id` is omitted a fresh one is generated and returned, so
/// the client can keep the conversation going.
#[utoipa::path(
    post,
    path = "/api/chat/message",
    tag = "chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Reply generated", body = ChatResponse),
        (status = 400, description = "Bad request"),
        (status = 500, description = "Backend error"),
    )
)]
pub async fn chat_message(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ServerError> {
    let reply = state.chat.handle_message(&req.message, req.session_id).await?;
    info!(
        session_id = %reply.session_id,
        response_len = reply.response.len(),
        "chat turn completed"
    );
    Ok(Json(ChatResponse {
        response: reply.response,
        session_id: reply.session_id,
    }))
}

/// Recent exchanges for a session (`GET /api/chat/history/{session_id}`),
/// oldest first.
#[utoipa::path(
    get,
    path = "/api/chat/history/{session_id}",
    tag = "chat",
    responses(
        (status = 200, description = "Session history retrieved", body = Vec<ExchangeResponse>),
        (status = 500, description = "Backend error"),
    )
)]
pub async fn chat_history(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<ExchangeResponse>>, ServerError> {
    let exchanges = state.chat.history(&session_id).await?;
    Ok(Json(exchanges.iter().map(|e| e.to_response()).collect()))
}

/// Record visitor feedback for an exchange (`POST /api/chat/feedback`).
#[utoipa::path(
    post,
    path = "/api/chat/feedback",
    tag = "chat",
    request_body = FeedbackRequest,
    responses(
        (status = 200, description = "Feedback recorded", body = serde_json::Value),
        (status = 404, description = "Exchange not found"),
        (status = 500, description = "Backend error"),
    )
)]
pub async fn chat_feedback(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FeedbackRequest>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let updated = state.chat.set_feedback(req.exchange_id, req.is_useful).await?;
    if !updated {
        return Err(ServerError::NotFound(format!(
            "exchange {} not found",
            req.exchange_id
        )));
    }
    Ok(Json(serde_json::json!({ "updated": true })))
}

// ── Tests ──────────────────────────────────────────────────────────────────────
