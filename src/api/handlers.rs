//! HTTP request handlers

use super::types::{ErrorResponse, HistoryQuery, MessageRequest};
use super::AppState;
use crate::state_machine::{ConversationOutcome, HistorySnapshot};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Upper bound for `limit` on the history endpoint
const MAX_HISTORY_LIMIT: usize = 1_000;

/// Longest accepted message body text
const MAX_TEXT_LEN: usize = 1_024;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Conversation input
        .route("/api/users/:user_id/messages", post(submit_message))
        .route("/api/users/:user_id/reset", post(reset_session))
        // History
        .route("/api/users/:user_id/history", get(get_history))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Conversation
// ============================================================

async fn submit_message(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    req: Result<Json<MessageRequest>, JsonRejection>,
) -> Result<Json<ConversationOutcome>, AppError> {
    validate_user_id(&user_id)?;
    let Json(req) = req.map_err(|e| AppError::BadRequest(e.body_text()))?;
    if req.text.len() > MAX_TEXT_LEN {
        return Err(AppError::BadRequest(format!(
            "Message longer than {MAX_TEXT_LEN} bytes"
        )));
    }

    let outcome = state.manager.submit(&user_id, &req.text).await;
    tracing::debug!(user_id = %user_id, outcome = outcome.kind(), "Handled message");
    Ok(Json(outcome))
}

async fn reset_session(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ConversationOutcome>, AppError> {
    validate_user_id(&user_id)?;
    tracing::info!(user_id = %user_id, "Session reset requested");
    Ok(Json(state.manager.reset(&user_id).await))
}

// ============================================================
// History
// ============================================================

async fn get_history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<HistorySnapshot>, AppError> {
    validate_user_id(&user_id)?;
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let limit = query
        .limit
        .unwrap_or(state.history_window)
        .min(MAX_HISTORY_LIMIT);

    state
        .manager
        .history(&user_id, limit)
        .await
        .map(Json)
        .map_err(|e| AppError::Internal(e.to_string()))
}

async fn get_version() -> &'static str {
    concat!("bayes-coach ", env!("CARGO_PKG_VERSION"))
}

fn validate_user_id(user_id: &str) -> Result<(), AppError> {
    if user_id.trim().is_empty() || user_id.len() > 128 {
        return Err(AppError::BadRequest("Invalid user id".to_string()));
    }
    Ok(())
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    crate::state_machine::outcome::UNAVAILABLE_MESSAGE.to_string(),
                )
            }
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
