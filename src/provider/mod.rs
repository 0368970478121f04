// src/provider/mod.rs — Model provider layer

pub mod anthropic;
pub mod tiers;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::types::{Message, ToolCall};
use crate::infra::errors::FrontdeskError;

/// Core trait that all model backends implement: produce text, optionally
/// with requested tool calls, given a message history.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    fn id(&self) -> &str;

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, FrontdeskError>;
}

#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDef>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub system: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ChatResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub usage: TokenUsage,
    pub stop_reason: StopReason,
}

impl ChatResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            stop_reason: StopReason::EndTurn,
            ..Default::default()
        }
    }

    pub fn with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: content.into(),
            tool_calls,
            stop_reason: StopReason::ToolUse,
            ..Default::default()
        }
    }

    pub fn wants_tools(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// The model stopped at the output token limit; the text may be cut off.
    pub fn truncated(&self) -> bool {
        self.stop_reason == StopReason::MaxTokens
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    ToolUse,
    StopSequence,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDef {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Reference to a specific model on a specific provider.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct ModelRef {
    pub provider: String,
    pub model: String,
}

impl ModelRef {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
        }
    }

    /// Parse "provider/model" format
    pub fn parse(s: &str) -> Option<Self> {
        let (provider, model) = s.split_once('/')?;
        if provider.is_empty() || model.is_empty() {
            return None;
        }
        Some(Self {
            provider: provider.to_string(),
            model: model.to_string(),
        })
    }
}

impl std::fmt::Display for ModelRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ─── ModelRef tests ─────────────────────────────────────────

    #[test]
    fn test_model_ref_parse() {
        let r = ModelRef::parse("anthropic/claude-haiku-4-5").unwrap();
        assert_eq!(r.provider, "anthropic");
        assert_eq!(r.model, "claude-haiku-4-5");
    }

    #[test]
    fn test_model_ref_parse_no_slash() {
        assert!(ModelRef::parse("no-slash").is_none());
    }

    #[test]
    fn test_model_ref_parse_empty_parts() {
        assert!(ModelRef::parse("").is_none());
        assert!(ModelRef::parse("anthropic/").is_none());
        assert!(ModelRef::parse("/model").is_none());
    }

    #[test]
    fn test_model_ref_display() {
        let r = ModelRef::new("anthropic", "claude-sonnet-4-5");
        assert_eq!(format!("{}", r), "anthropic/claude-sonnet-4-5");
    }

    // ─── ChatResponse tests ─────────────────────────────────────

    #[test]
    fn test_chat_response_text() {
        let r = ChatResponse::text("hello");
        assert!(!r.wants_tools());
        assert_eq!(r.stop_reason, StopReason::EndTurn);
    }

    #[test]
    fn test_chat_response_tool_calls() {
        let r = ChatResponse::with_tool_calls(
            "",
            vec![ToolCall {
                id: "t1".into(),
                name: "search_faq".into(),
                arguments: serde_json::json!({"query": "price"}),
            }],
        );
        assert!(r.wants_tools());
        assert_eq!(r.stop_reason, StopReason::ToolUse);
        assert!(!r.truncated());
    }

    #[test]
    fn test_chat_response_truncated() {
        let r = ChatResponse {
            content: "Your appointment is on".into(),
            stop_reason: StopReason::MaxTokens,
            ..Default::default()
        };
        assert!(r.truncated());
        assert!(!ChatResponse::text("done").truncated());
    }

    #[test]
    fn test_token_usage_total() {
        let u = TokenUsage {
            input_tokens: 100,
            output_tokens: 50,
        };
        assert_eq!(u.total(), 150);
    }
}
