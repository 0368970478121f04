// src/session/mod.rs — Per-session conversation checkpoints with optimistic versioning

pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::types::{Intent, Message};
use crate::infra::config::{SessionBackend, SessionConfig};
use crate::infra::errors::FrontdeskError;

pub use memory::MemorySessionStore;
pub use sqlite::SqliteSessionStore;

/// Conversation state for one end user. Mutated only by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    /// Append-only, in order.
    pub messages: Vec<Message>,
    pub last_intent: Option<Intent>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            messages: Vec::new(),
            last_intent: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
        self.updated_at = Utc::now();
    }
}

/// A session as loaded, with the version a later save must match.
/// Version 0 means nothing has been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    pub session: Session,
    pub version: u64,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the session, or a fresh one (version 0) if none exists. Does not persist.
    async fn get_or_create(&self, session_id: &str) -> Result<Checkpoint, FrontdeskError>;

    /// Store `session` if the stored version still equals `expected_version`.
    /// Returns the new version, or `VersionConflict` when another turn saved first.
    async fn save(
        &self,
        session_id: &str,
        session: &Session,
        expected_version: u64,
    ) -> Result<u64, FrontdeskError>;
}

/// Build the configured backend.
pub fn open_store(config: &SessionConfig) -> anyhow::Result<Arc<dyn SessionStore>> {
    match config.backend {
        SessionBackend::Memory => Ok(Arc::new(MemorySessionStore::new())),
        SessionBackend::Sqlite => {
            let path = config.sqlite_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            tracing::info!(path = %path.display(), "Opening session database");
            Ok(Arc::new(SqliteSessionStore::open(&path)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_empty() {
        let s = Session::new("abc");
        assert_eq!(s.id, "abc");
        assert!(s.messages.is_empty());
        assert!(s.last_intent.is_none());
        assert_eq!(s.created_at, s.updated_at);
    }

    #[test]
    fn test_push_appends_and_touches() {
        let mut s = Session::new("abc");
        let created = s.created_at;
        s.push(Message::user("hi"));
        s.push(Message::agent("hello"));
        assert_eq!(s.messages.len(), 2);
        assert_eq!(s.messages[1].content, "hello");
        assert!(s.updated_at >= created);
    }

    #[test]
    fn test_open_store_memory() {
        assert!(open_store(&SessionConfig::default()).is_ok());
    }
}
