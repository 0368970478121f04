// src/provider/tiers.rs — Cost tiers: one provider seam, two configured clients

use std::sync::Arc;
use std::time::Duration;

use super::{ChatRequest, ChatResponse, ModelProvider, ModelRef, ToolDef};
use crate::core::types::Message;
use crate::infra::config::ModelsConfig;
use crate::infra::errors::FrontdeskError;
use crate::infra::retry::RetryConfig;

/// A provider bound to one model and sampling setup.
#[derive(Clone)]
pub struct ModelClient {
    provider: Arc<dyn ModelProvider>,
    model: ModelRef,
    max_tokens: u32,
    temperature: f32,
    retry: RetryConfig,
}

impl ModelClient {
    /// A single attempt per call until `with_retry` says otherwise.
    pub fn new(provider: Arc<dyn ModelProvider>, model: ModelRef) -> Self {
        Self {
            provider,
            model,
            max_tokens: 1024,
            temperature: 0.1,
            retry: RetryConfig::immediate(1),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_sampling(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    pub fn model(&self) -> &ModelRef {
        &self.model
    }

    pub async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[ToolDef],
    ) -> Result<ChatResponse, FrontdeskError> {
        let request = ChatRequest {
            model: self.model.model.clone(),
            messages: messages.to_vec(),
            tools: tools.to_vec(),
            max_tokens: Some(self.max_tokens),
            temperature: Some(self.temperature),
            system: Some(system.to_string()),
        };
        let response = self.chat_with_retry(request).await?;
        tracing::debug!(
            model = %self.model,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            total_tokens = response.usage.total(),
            tool_calls = response.tool_calls.len(),
            "model call complete"
        );
        if response.truncated() {
            tracing::warn!(
                model = %self.model,
                output_tokens = response.usage.output_tokens,
                max_tokens = self.max_tokens,
                "Model reply hit the output token limit and may be cut off"
            );
        }
        Ok(response)
    }

    /// Retries retriable provider errors (overload, 5xx, 429, timeouts).
    async fn chat_with_retry(&self, request: ChatRequest) -> Result<ChatResponse, FrontdeskError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.provider.chat(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) if !e.is_retriable() || attempt >= max_attempts => return Err(e),
                Err(e) => {
                    let delay = self.retry.delay_for_attempt(attempt - 1, rate_limit_delay(&e));
                    tracing::warn!(
                        provider = self.provider.id(),
                        model = %self.model,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying model call after error: {}",
                        e
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

fn rate_limit_delay(error: &FrontdeskError) -> Option<Duration> {
    match error {
        FrontdeskError::RateLimited { retry_after_ms, .. } => {
            Some(Duration::from_millis(*retry_after_ms))
        }
        _ => None,
    }
}

/// The cheap tier classifies and answers FAQs; the capable tier runs the tool loop.
#[derive(Clone)]
pub struct ModelTiers {
    pub cheap: ModelClient,
    pub capable: ModelClient,
}

impl ModelTiers {
    /// Both tiers on one backend (the usual deployment).
    pub fn from_config(
        provider: Arc<dyn ModelProvider>,
        config: &ModelsConfig,
    ) -> Result<Self, FrontdeskError> {
        let cheap = parse_model(&config.cheap)?;
        let capable = parse_model(&config.capable)?;
        let retry = RetryConfig {
            max_attempts: config.max_attempts,
            ..RetryConfig::default()
        };
        Ok(Self {
            cheap: ModelClient::new(provider.clone(), cheap)
                .with_sampling(config.max_tokens, config.temperature)
                .with_retry(retry.clone()),
            capable: ModelClient::new(provider, capable)
                .with_sampling(config.max_tokens, config.temperature)
                .with_retry(retry),
        })
    }

    /// Separate backends per tier.
    pub fn new(cheap: ModelClient, capable: ModelClient) -> Self {
        Self { cheap, capable }
    }
}

fn parse_model(s: &str) -> Result<ModelRef, FrontdeskError> {
    ModelRef::parse(s)
        .ok_or_else(|| FrontdeskError::Config(format!("Model '{s}' is not in provider/model form")))
}
