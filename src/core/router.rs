// src/core/router.rs — Per-turn intent classification on the cheap tier
//
// Anything other than a clean FAQ/BOOKING label, a model error or a timeout
// routes to BOOKING: that path has tools and can still answer questions.

use std::time::Duration;

use super::prompts::ROUTER_PROMPT;
use super::types::{Intent, Message, Role};
use crate::infra::config::RouterConfig;
use crate::provider::tiers::ModelClient;

pub struct IntentRouter {
    model: ModelClient,
    timeout: Duration,
    context_exchanges: usize,
}

impl IntentRouter {
    pub fn new(model: ModelClient, config: &RouterConfig) -> Self {
        Self {
            model,
            timeout: config.timeout(),
            context_exchanges: config.context_exchanges.max(1),
        }
    }

    pub async fn classify(&self, messages: &[Message]) -> Intent {
        let context = recent_context(messages, self.context_exchanges);
        if context.is_empty() {
            return Intent::Booking;
        }

        let call = self.model.complete(ROUTER_PROMPT, &context, &[]);
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(response)) => match parse_label(&response.content) {
                Some(intent) => {
                    tracing::debug!(%intent, "Routed turn");
                    intent
                }
                None => {
                    tracing::warn!(label = %response.content, "Unrecognised router label, defaulting to BOOKING");
                    Intent::Booking
                }
            },
            Ok(Err(e)) => {
                tracing::warn!("Router call failed, defaulting to BOOKING: {}", e);
                Intent::Booking
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Router timed out, defaulting to BOOKING"
                );
                Intent::Booking
            }
        }
    }
}

/// The last `exchanges` user messages and everything said after the first of
/// them, without tool plumbing.
pub fn recent_context(messages: &[Message], exchanges: usize) -> Vec<Message> {
    let conversational: Vec<&Message> = messages.iter().filter(|m| m.is_conversational()).collect();

    let start = conversational
        .iter()
        .enumerate()
        .rev()
        .filter(|(_, m)| m.role == Role::User)
        .nth(exchanges.saturating_sub(1))
        .map(|(i, _)| i)
        .unwrap_or_else(|| {
            conversational
                .iter()
                .position(|m| m.role == Role::User)
                .unwrap_or(conversational.len())
        });

    conversational[start..].iter().map(|m| (*m).clone()).collect()
}

/// Exact label match after trimming whitespace and punctuation, any case.
pub fn parse_label(raw: &str) -> Option<Intent> {
    let label = raw.trim_matches(|c: char| !c.is_alphanumeric());
    if label.eq_ignore_ascii_case("FAQ") {
        Some(Intent::Faq)
    } else if label.eq_ignore_ascii_case("BOOKING") {
        Some(Intent::Booking)
    } else {
        None
    }
}
