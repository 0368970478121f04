// src/api/handlers.rs

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::api::{types::*, ApiState};
use crate::core::assistant::Health;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// POST /api/chat — Run one conversation turn.
pub async fn chat(
    State(state): State<ApiState>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let session_id = body.session_id.trim();
    if session_id.is_empty() || session_id.chars().count() > MAX_SESSION_ID_CHARS {
        return Err(bad_request(format!(
            "session_id must be 1 to {MAX_SESSION_ID_CHARS} characters"
        )));
    }
    let message = body.message.trim();
    if message.is_empty() {
        return Err(bad_request("Message cannot be empty"));
    }
    if message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(bad_request(format!(
            "Message is longer than {MAX_MESSAGE_CHARS} characters"
        )));
    }

    match state.assistant.turn(session_id, message).await {
        Ok(reply) => Ok(Json(ChatResponse {
            session_id: session_id.to_string(),
            reply,
        })),
        Err(e) => {
            // Details stay in the log.
            tracing::error!(session_id, "Chat turn failed: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "An internal error occurred. Please try again.".into(),
                }),
            ))
        }
    }
}

/// GET /api/health
pub async fn health(State(state): State<ApiState>) -> Json<Health> {
    Json(state.assistant.health())
}
