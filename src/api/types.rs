// src/api/types.rs

use serde::{Deserialize, Serialize};

/// Longest message accepted from a client.
pub const MAX_MESSAGE_CHARS: usize = 2000;
pub const MAX_SESSION_ID_CHARS: usize = 100;

/// Request body for one chat turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub reply: String,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
