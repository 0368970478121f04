// src/session/memory.rs — In-process session store

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{Checkpoint, Session, SessionStore};
use crate::infra::errors::FrontdeskError;

/// Single-process backend. Lost on restart.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, (Session, u64)>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> FrontdeskError {
    FrontdeskError::Storage("session map lock poisoned".into())
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get_or_create(&self, session_id: &str) -> Result<Checkpoint, FrontdeskError> {
        let sessions = self.sessions.lock().map_err(|_| poisoned())?;
        Ok(match sessions.get(session_id) {
            Some((session, version)) => Checkpoint {
                session: session.clone(),
                version: *version,
            },
            None => Checkpoint {
                session: Session::new(session_id),
                version: 0,
            },
        })
    }

    async fn save(
        &self,
        session_id: &str,
        session: &Session,
        expected_version: u64,
    ) -> Result<u64, FrontdeskError> {
        let mut sessions = self.sessions.lock().map_err(|_| poisoned())?;
        let found = sessions.get(session_id).map(|(_, v)| *v).unwrap_or(0);
        if found != expected_version {
            return Err(FrontdeskError::VersionConflict {
                session_id: session_id.to_string(),
                expected: expected_version,
                found,
            });
        }
        let next = found + 1;
        sessions.insert(session_id.to_string(), (session.clone(), next));
        Ok(next)
    }
}
