// src/core/assistant.rs — Turn service: load, step, save with optimistic retry
//
// Each turn runs on its own task so a dropped caller cannot abort external
// calls half-way. If the caller is gone by the time the step finishes, the
// result is discarded and nothing is saved.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{oneshot, Semaphore};

use super::orchestrator::ConversationOrchestrator;
use crate::infra::config::ConversationConfig;
use crate::infra::errors::FrontdeskError;
use crate::session::{Checkpoint, SessionStore};

/// Reply when every save attempt lost a race with another turn.
pub const BUSY_REPLY: &str = "Sorry, I'm still working on your previous message. \
Please send that again in a moment.";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Health {
    pub status: &'static str,
    pub turns_in_flight: usize,
}

pub struct Assistant {
    orchestrator: Arc<ConversationOrchestrator>,
    store: Arc<dyn SessionStore>,
    permits: Arc<Semaphore>,
    max_concurrent_turns: usize,
    max_save_attempts: u32,
}

impl Assistant {
    pub fn new(
        orchestrator: Arc<ConversationOrchestrator>,
        store: Arc<dyn SessionStore>,
        config: &ConversationConfig,
    ) -> Self {
        let max_concurrent_turns = config.max_concurrent_turns.max(1);
        Self {
            orchestrator,
            store,
            permits: Arc::new(Semaphore::new(max_concurrent_turns)),
            max_concurrent_turns,
            max_save_attempts: config.max_save_attempts.max(1),
        }
    }

    /// Run one turn for `session_id` and return the reply text.
    pub async fn turn(&self, session_id: &str, user_text: &str) -> Result<String, FrontdeskError> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| FrontdeskError::Storage("turn pool closed".into()))?;

        let (reply_tx, reply_rx) = oneshot::channel();
        let job = TurnJob {
            orchestrator: self.orchestrator.clone(),
            store: self.store.clone(),
            session_id: session_id.to_string(),
            user_text: user_text.to_string(),
            max_save_attempts: self.max_save_attempts,
        };

        tokio::spawn(async move {
            let _permit = permit;
            match job.run(&reply_tx).await {
                Ok(Some(reply)) => {
                    let _ = reply_tx.send(Ok(reply));
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(session_id = %job.session_id, "Turn failed: {}", e);
                    let _ = reply_tx.send(Err(e));
                }
            }
        });

        reply_rx
            .await
            .map_err(|_| FrontdeskError::Storage("turn task ended without a reply".into()))?
    }

    pub fn health(&self) -> Health {
        Health {
            status: "ok",
            turns_in_flight: self.max_concurrent_turns - self.permits.available_permits(),
        }
    }
}

struct TurnJob {
    orchestrator: Arc<ConversationOrchestrator>,
    store: Arc<dyn SessionStore>,
    session_id: String,
    user_text: String,
    max_save_attempts: u32,
}

impl TurnJob {
    /// `Ok(None)` means the caller left and the turn was discarded.
    async fn run(
        &self,
        reply_tx: &oneshot::Sender<Result<String, FrontdeskError>>,
    ) -> Result<Option<String>, FrontdeskError> {
        for attempt in 1..=self.max_save_attempts {
            let Checkpoint { session, version } = self.store.get_or_create(&self.session_id).await?;
            let (session, reply) = self.orchestrator.step(session, &self.user_text).await;

            if reply_tx.is_closed() {
                tracing::info!(session_id = %self.session_id, "Caller disconnected, discarding turn");
                return Ok(None);
            }

            match self.store.save(&self.session_id, &session, version).await {
                Ok(saved) => {
                    tracing::debug!(session_id = %self.session_id, version = saved, "Session saved");
                    return Ok(Some(reply));
                }
                Err(e) if e.is_version_conflict() => {
                    tracing::warn!(
                        session_id = %self.session_id,
                        attempt,
                        max_attempts = self.max_save_attempts,
                        "Session changed during turn, replaying: {}",
                        e
                    );
                }
                Err(e) => return Err(e),
            }
        }

        tracing::warn!(session_id = %self.session_id, "Giving up after repeated save conflicts");
        Ok(Some(BUSY_REPLY.to_string()))
    }
}
