// src/provider/anthropic.rs — Anthropic Messages API provider

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use super::{ChatRequest, ChatResponse, ModelProvider, StopReason, TokenUsage};
use crate::core::types::{Message, Role, ToolCall, ToolOutcome};
use crate::infra::errors::FrontdeskError;

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT_SECS: u64 = 60;

pub struct AnthropicProvider {
    api_key: String,
    api_url: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            api_key,
            api_url: API_URL.to_string(),
            client,
        }
    }

    /// Point at a different endpoint (proxies, local fakes).
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    fn build_request_body(&self, request: &ChatRequest) -> Value {
        let mut body = json!({
            "model": request.model,
            "messages": build_messages(&request.messages),
            "max_tokens": request.max_tokens.unwrap_or(1024),
        });

        if let Some(system) = &request.system {
            body["system"] = json!([{
                "type": "text",
                "text": system,
                "cache_control": { "type": "ephemeral" }
            }]);
        }

        if let Some(temp) = request.temperature {
            body["temperature"] = json!(temp);
        }

        if !request.tools.is_empty() {
            let tools: Vec<Value> = request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "name": t.name,
                        "description": t.description,
                        "input_schema": t.parameters,
                    })
                })
                .collect();
            body["tools"] = json!(tools);
        }

        body
    }
}

/// Convert the session log into Messages API turns.
///
/// Agent tool calls become `tool_use` blocks, tool messages become `tool_result`
/// blocks on the user side, and consecutive blocks of the same side are merged
/// so the turns alternate.
fn build_messages(messages: &[Message]) -> Vec<Value> {
    let mut turns: Vec<(&'static str, Vec<Value>)> = Vec::new();

    for m in messages {
        let (side, blocks) = match m.role {
            Role::User => ("user", vec![json!({"type": "text", "text": m.content})]),
            Role::Agent => {
                let mut blocks = Vec::new();
                if !m.content.trim().is_empty() {
                    blocks.push(json!({"type": "text", "text": m.content}));
                }
                for tc in &m.tool_calls {
                    blocks.push(json!({
                        "type": "tool_use",
                        "id": tc.id,
                        "name": tc.name,
                        "input": tc.arguments,
                    }));
                }
                ("assistant", blocks)
            }
            Role::Tool => {
                let Some(result) = &m.tool_result else {
                    continue;
                };
                let is_error = matches!(result.outcome, ToolOutcome::Error { .. });
                (
                    "user",
                    vec![json!({
                        "type": "tool_result",
                        "tool_use_id": result.call_id,
                        "content": m.content,
                        "is_error": is_error,
                    })],
                )
            }
        };

        if blocks.is_empty() {
            continue;
        }
        match turns.last_mut() {
            Some((last_side, last_blocks)) if *last_side == side => last_blocks.extend(blocks),
            _ => turns.push((side, blocks)),
        }
    }

    turns
        .into_iter()
        .map(|(role, content)| json!({"role": role, "content": content}))
        .collect()
}

fn parse_response(resp: &Value) -> ChatResponse {
    let blocks = resp["content"].as_array().cloned().unwrap_or_default();

    let content = blocks
        .iter()
        .filter(|c| c["type"] == "text")
        .map(|c| c["text"].as_str().unwrap_or(""))
        .collect::<Vec<_>>()
        .join("");

    let tool_calls = blocks
        .iter()
        .filter(|c| c["type"] == "tool_use")
        .map(|c| ToolCall {
            id: c["id"].as_str().unwrap_or("").to_string(),
            name: c["name"].as_str().unwrap_or("").to_string(),
            arguments: c["input"].clone(),
        })
        .collect();

    let usage = TokenUsage {
        input_tokens: resp["usage"]["input_tokens"].as_u64().unwrap_or(0) as u32,
        output_tokens: resp["usage"]["output_tokens"].as_u64().unwrap_or(0) as u32,
    };

    let stop_reason = match resp["stop_reason"].as_str() {
        Some("end_turn") => StopReason::EndTurn,
        Some("max_tokens") => StopReason::MaxTokens,
        Some("tool_use") => StopReason::ToolUse,
        Some("stop_sequence") => StopReason::StopSequence,
        _ => StopReason::Unknown,
    };

    ChatResponse {
        content,
        tool_calls,
        usage,
        stop_reason,
    }
}

#[async_trait]
impl ModelProvider for AnthropicProvider {
    fn id(&self) -> &str {
        "anthropic"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, FrontdeskError> {
        let body = self.build_request_body(&request);

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| FrontdeskError::Provider {
                provider: "anthropic".into(),
                message: e.to_string(),
                retriable: e.is_timeout() || e.is_connect(),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(5);
            return Err(FrontdeskError::RateLimited {
                provider: "anthropic".into(),
                retry_after_ms: retry_after * 1000,
            });
        }

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(FrontdeskError::Provider {
                provider: "anthropic".into(),
                message: format!("HTTP {}: {}", status, error_body),
                retriable: status.is_server_error(),
            });
        }

        let resp: Value = response.json().await.map_err(|e| FrontdeskError::Provider {
            provider: "anthropic".into(),
            message: format!("Failed to parse response: {}", e),
            retriable: false,
        })?;

        Ok(parse_response(&resp))
    }
}
