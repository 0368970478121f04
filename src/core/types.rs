// src/core/types.rs — Conversation data model shared by the orchestrator, tools and store

use serde::{Deserialize, Serialize};

/// Who produced a message in the session log.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
    Tool,
}

/// A structured request, emitted by the capable model, to run a named tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    /// Malformed or out-of-range arguments. The model can correct and retry.
    Validation,
    UnknownTool,
    /// The external service kept failing after bounded retries.
    Transient,
    /// The external service rejected the request (e.g. slot taken).
    Permanent,
    NotFound,
    /// The outcome of a write could not be determined.
    Ambiguous,
    /// A multi-step operation stopped half-way (e.g. cancelled but not rebooked).
    PartialFailure,
}

impl ToolErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolErrorKind::Validation => "validation",
            ToolErrorKind::UnknownTool => "unknown_tool",
            ToolErrorKind::Transient => "transient",
            ToolErrorKind::Permanent => "permanent",
            ToolErrorKind::NotFound => "not_found",
            ToolErrorKind::Ambiguous => "ambiguous",
            ToolErrorKind::PartialFailure => "partial_failure",
        }
    }
}

impl std::fmt::Display for ToolErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    Ok { payload: serde_json::Value },
    Error { kind: ToolErrorKind, message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResult {
    pub call_id: String,
    pub outcome: ToolOutcome,
}

impl ToolResult {
    pub fn ok(call_id: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            call_id: call_id.into(),
            outcome: ToolOutcome::Ok { payload },
        }
    }

    pub fn error(call_id: impl Into<String>, kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            outcome: ToolOutcome::Error {
                kind,
                message: message.into(),
            },
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Error { .. })
    }

    /// Text form handed back to the model.
    pub fn to_model_text(&self) -> String {
        serde_json::to_string(&self.outcome).unwrap_or_else(|_| "{}".to_string())
    }
}

/// One entry in a session's append-only log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_result: Option<ToolResult>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_result: None,
        }
    }

    pub fn agent(content: impl Into<String>) -> Self {
        Self {
            role: Role::Agent,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_result: None,
        }
    }

    pub fn agent_with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Agent,
            content: content.into(),
            tool_calls,
            tool_result: None,
        }
    }

    pub fn tool(result: ToolResult) -> Self {
        Self {
            role: Role::Tool,
            content: result.to_model_text(),
            tool_calls: Vec::new(),
            tool_result: Some(result),
        }
    }

    /// User text and agent replies without tool plumbing.
    pub fn is_conversational(&self) -> bool {
        match self.role {
            Role::User => true,
            Role::Agent => self.tool_calls.is_empty() && !self.content.trim().is_empty(),
            Role::Tool => false,
        }
    }
}

/// Per-turn classification. Never stored in the visible message log.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Intent {
    Faq,
    Booking,
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Intent::Faq => write!(f, "FAQ"),
            Intent::Booking => write!(f, "BOOKING"),
        }
    }
}

/// Check the pairing rule: every tool call in an agent message is answered by
/// exactly one tool message with the same id before the next agent message.
pub fn tool_calls_are_paired(messages: &[Message]) -> bool {
    let mut pending: Vec<&str> = Vec::new();
    for m in messages {
        match m.role {
            Role::Agent => {
                if !pending.is_empty() {
                    return false;
                }
                pending = m.tool_calls.iter().map(|c| c.id.as_str()).collect();
            }
            Role::Tool => {
                let Some(result) = &m.tool_result else {
                    return false;
                };
                match pending.iter().position(|id| *id == result.call_id) {
                    Some(idx) => {
                        pending.remove(idx);
                    }
                    None => return false,
                }
            }
            Role::User => {}
        }
    }
    pending.is_empty()
}
