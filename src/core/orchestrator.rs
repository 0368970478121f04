// src/core/orchestrator.rs — Turn state machine
//
//   Routing ─┬─> FaqRespond ─────────────────────────────> Done
//            └─> BookingRespond ⇄ ExecutingTools (≤ N) ──> Done
//
// `step` never fails: model errors and an exhausted tool budget end the turn
// with a fixed reply, and everything appended so far stays in the session.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;

use super::prompts::{build_booking_prompt, build_faq_prompt};
use super::router::IntentRouter;
use super::types::{Intent, Message, ToolCall};
use crate::infra::config::{ClinicConfig, Config};
use crate::knowledge::KnowledgeBase;
use crate::provider::tiers::ModelTiers;
use crate::session::Session;
use crate::tools::ToolExecutor;

/// Sent when the model keeps asking for tools past the per-turn budget.
pub const TOOL_LOOP_REPLY: &str = "I'm sorry, I wasn't able to finish that request. \
Could you try again, or tell me a bit more about what you need?";

/// Sent when a model call fails mid-turn.
pub const MODEL_FAILURE_REPLY: &str = "I'm sorry, I'm having trouble responding right now. \
Please try again in a moment.";

#[derive(Debug)]
enum TurnState {
    Routing,
    FaqRespond,
    /// `round` counts completed tool round-trips this turn.
    BookingRespond { round: u32 },
    ExecutingTools { calls: Vec<ToolCall>, round: u32 },
    Done(String),
}

pub struct ConversationOrchestrator {
    router: IntentRouter,
    tiers: ModelTiers,
    executor: Arc<ToolExecutor>,
    kb: Arc<KnowledgeBase>,
    clinic: ClinicConfig,
    max_tool_rounds: u32,
}

impl ConversationOrchestrator {
    pub fn new(
        tiers: ModelTiers,
        executor: Arc<ToolExecutor>,
        kb: Arc<KnowledgeBase>,
        config: &Config,
    ) -> Self {
        Self {
            router: IntentRouter::new(tiers.cheap.clone(), &config.router),
            tiers,
            executor,
            kb,
            clinic: config.clinic.clone(),
            max_tool_rounds: config.conversation.max_tool_rounds,
        }
    }

    /// Process one user message. Returns the updated session and the reply text.
    pub async fn step(&self, mut session: Session, user_text: &str) -> (Session, String) {
        session.push(Message::user(user_text));

        let mut state = TurnState::Routing;
        loop {
            state = match state {
                TurnState::Routing => {
                    let intent = self.router.classify(&session.messages).await;
                    session.last_intent = Some(intent);
                    match intent {
                        Intent::Faq => TurnState::FaqRespond,
                        Intent::Booking => TurnState::BookingRespond { round: 0 },
                    }
                }

                TurnState::FaqRespond => {
                    let system = build_faq_prompt(&self.clinic, &self.kb, Utc::now());
                    let history: Vec<Message> = session
                        .messages
                        .iter()
                        .filter(|m| m.is_conversational())
                        .cloned()
                        .collect();
                    let reply = match self.tiers.cheap.complete(&system, &history, &[]).await {
                        Ok(response) if !response.content.trim().is_empty() => response.content,
                        Ok(_) => {
                            tracing::warn!(session_id = %session.id, "Empty FAQ reply");
                            MODEL_FAILURE_REPLY.to_string()
                        }
                        Err(e) => {
                            tracing::error!(session_id = %session.id, "FAQ model call failed: {}", e);
                            MODEL_FAILURE_REPLY.to_string()
                        }
                    };
                    TurnState::Done(reply)
                }

                TurnState::BookingRespond { round } => {
                    let system = build_booking_prompt(&self.clinic, &self.kb, Utc::now());
                    let tools = self.executor.definitions();
                    match self
                        .tiers
                        .capable
                        .complete(&system, &session.messages, &tools)
                        .await
                    {
                        Ok(response) if response.wants_tools() => {
                            if round >= self.max_tool_rounds {
                                tracing::warn!(
                                    session_id = %session.id,
                                    rounds = round,
                                    "Tool loop budget exhausted, ending turn"
                                );
                                TurnState::Done(TOOL_LOOP_REPLY.to_string())
                            } else {
                                let calls = with_call_ids(response.tool_calls);
                                session.push(Message::agent_with_tool_calls(
                                    response.content,
                                    calls.clone(),
                                ));
                                TurnState::ExecutingTools {
                                    calls,
                                    round: round + 1,
                                }
                            }
                        }
                        Ok(response) if !response.content.trim().is_empty() => {
                            TurnState::Done(response.content)
                        }
                        Ok(_) => {
                            tracing::warn!(session_id = %session.id, "Empty booking reply");
                            TurnState::Done(MODEL_FAILURE_REPLY.to_string())
                        }
                        Err(e) => {
                            tracing::error!(session_id = %session.id, round, "Booking model call failed: {}", e);
                            TurnState::Done(MODEL_FAILURE_REPLY.to_string())
                        }
                    }
                }

                TurnState::ExecutingTools { calls, round } => {
                    tracing::debug!(session_id = %session.id, round, calls = calls.len(), "Dispatching tools");
                    for result in self.executor.dispatch_all(&calls).await {
                        session.push(Message::tool(result));
                    }
                    TurnState::BookingRespond { round }
                }

                TurnState::Done(reply) => {
                    session.push(Message::agent(reply.clone()));
                    tracing::info!(
                        session_id = %session.id,
                        intent = ?session.last_intent,
                        messages = session.messages.len(),
                        "Turn complete"
                    );
                    return (session, reply);
                }
            };
        }
    }
}

/// Give every call a unique id so each result pairs with exactly one call.
/// Blank ids and repeats of an earlier id in the batch are replaced.
fn with_call_ids(calls: Vec<ToolCall>) -> Vec<ToolCall> {
    let mut seen = HashSet::with_capacity(calls.len());
    calls
        .into_iter()
        .map(|mut c| {
            if c.id.trim().is_empty() || seen.contains(&c.id) {
                let fresh = format!("call_{}", uuid::Uuid::new_v4().simple());
                if !c.id.trim().is_empty() {
                    tracing::warn!(tool = %c.name, duplicate = %c.id, "Replacing repeated tool call id");
                }
                c.id = fresh;
            }
            seen.insert(c.id.clone());
            c
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_with_call_ids_fills_blanks_only() {
        let calls = with_call_ids(vec![
            ToolCall {
                id: "keep".into(),
                name: "search_faq".into(),
                arguments: json!({}),
            },
            ToolCall {
                id: "".into(),
                name: "search_faq".into(),
                arguments: json!({}),
            },
        ]);
        assert_eq!(calls[0].id, "keep");
        assert!(calls[1].id.starts_with("call_"));
    }

    #[test]
    fn test_with_call_ids_replaces_repeats() {
        let call = |id: &str| ToolCall {
            id: id.into(),
            name: "search_faq".into(),
            arguments: json!({}),
        };
        let calls = with_call_ids(vec![call("dup"), call("dup"), call("other"), call("dup")]);
        assert_eq!(calls[0].id, "dup");
        assert_eq!(calls[2].id, "other");
        let ids: HashSet<&str> = calls.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids.len(), 4);
    }
}
