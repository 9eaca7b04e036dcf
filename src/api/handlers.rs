//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{
    CancelResponse, ErrorResponse, MessageRequest, MessageResponse, RecordsResponse,
    RosterResponse,
};
use super::AppState;
use crate::report::render_recent;
use crate::runtime::LedgerStore;
use crate::state_machine::{Command, Event};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Local;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Chat input
        .route("/api/conversations/:id/messages", post(send_message))
        .route("/api/conversations/:id/cancel", post(cancel_conversation))
        // Replies
        .route("/api/conversations/:id/stream", get(stream_conversation))
        // Read-only views
        .route("/api/records", get(get_records))
        .route("/api/roster", get(get_roster))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Chat
// ============================================================

async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<MessageRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let event = Event::from_message(&req.text, Local::now().naive_local());
    tracing::debug!(conv_id = %id, command = matches!(event, Event::Command(_)), "Message received");

    state
        .runtime
        .send_event(&id, event)
        .await
        .map_err(AppError::Internal)?;

    Ok(Json(MessageResponse { queued: true }))
}

async fn cancel_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CancelResponse>, AppError> {
    state
        .runtime
        .send_event(&id, Event::Command(Command::Cancel))
        .await
        .map_err(AppError::Internal)?;

    Ok(Json(CancelResponse { ok: true }))
}

async fn stream_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let broadcast_rx = state.runtime.subscribe(&id).await;
    sse_stream(id, broadcast_rx)
}

// ============================================================
// Read-only Views
// ============================================================

async fn get_records(State(state): State<AppState>) -> Result<Json<RecordsResponse>, AppError> {
    let limit = state.runtime.settings().recent_limit;
    let ledger = state.runtime.ledger();

    let usage = ledger.recent_usage(limit).await.map_err(AppError::Internal)?;
    let fuel = ledger.recent_fuel(limit).await.map_err(AppError::Internal)?;

    Ok(Json(RecordsResponse {
        text: render_recent(&usage, &fuel),
    }))
}

async fn get_roster(State(state): State<AppState>) -> Json<RosterResponse> {
    Json(RosterResponse {
        roster: state.runtime.settings().roster.clone(),
    })
}

async fn get_version() -> &'static str {
    concat!("carshare-ledger ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

enum AppError {
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let AppError::Internal(message) = self;
        tracing::error!(error = %message, "Request failed");

        let body = Json(ErrorResponse::new(message));
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}
