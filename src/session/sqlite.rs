// src/session/sqlite.rs — Durable session store on SQLite
//
// The whole message log is one JSON column; the version column carries the
// optimistic check, so any process sharing the file sees the same conflicts.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{Checkpoint, Session, SessionStore};
use crate::core::types::{Intent, Message};
use crate::infra::errors::FrontdeskError;

/// A schema step, applied once and recorded in `_migrations`.
struct Migration {
    version: u32,
    name: &'static str,
    up: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "sessions",
    up: "CREATE TABLE sessions (
            id          TEXT PRIMARY KEY,
            messages    TEXT NOT NULL,
            last_intent TEXT,
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL,
            version     INTEGER NOT NULL
        );",
}];

fn run_migrations(conn: &Connection) -> Result<(), FrontdeskError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM _migrations",
        [],
        |r| r.get(0),
    )?;

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        tracing::info!("Applying migration {}: {}", migration.version, migration.name);
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(migration.up)?;
        tx.execute(
            "INSERT INTO _migrations (version, name) VALUES (?1, ?2)",
            params![migration.version, migration.name],
        )?;
        tx.commit()?;
    }
    Ok(())
}

pub struct SqliteSessionStore {
    conn: Mutex<Connection>,
}

impl SqliteSessionStore {
    pub fn open(path: &Path) -> Result<Self, FrontdeskError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::init(conn)
    }

    /// In-memory database (for testing).
    pub fn in_memory() -> Result<Self, FrontdeskError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, FrontdeskError> {
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, FrontdeskError> {
        self.conn
            .lock()
            .map_err(|_| FrontdeskError::Storage("session database lock poisoned".into()))
    }
}

fn stored_version(conn: &Connection, session_id: &str) -> Result<u64, FrontdeskError> {
    let v: Option<i64> = conn
        .query_row(
            "SELECT version FROM sessions WHERE id = ?1",
            params![session_id],
            |r| r.get(0),
        )
        .optional()?;
    Ok(v.unwrap_or(0) as u64)
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>, FrontdeskError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| FrontdeskError::Storage(format!("bad timestamp '{raw}': {e}")))
}

fn parse_intent(raw: Option<String>) -> Option<Intent> {
    match raw.as_deref() {
        Some("FAQ") => Some(Intent::Faq),
        Some("BOOKING") => Some(Intent::Booking),
        _ => None,
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn get_or_create(&self, session_id: &str) -> Result<Checkpoint, FrontdeskError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT messages, last_intent, created_at, updated_at, version
                 FROM sessions WHERE id = ?1",
                params![session_id],
                |r| {
                    Ok((
                        r.get::<_, String>(0)?,
                        r.get::<_, Option<String>>(1)?,
                        r.get::<_, String>(2)?,
                        r.get::<_, String>(3)?,
                        r.get::<_, i64>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((messages, last_intent, created_at, updated_at, version)) = row else {
            return Ok(Checkpoint {
                session: Session::new(session_id),
                version: 0,
            });
        };

        let messages: Vec<Message> = serde_json::from_str(&messages)?;
        Ok(Checkpoint {
            session: Session {
                id: session_id.to_string(),
                messages,
                last_intent: parse_intent(last_intent),
                created_at: parse_time(&created_at)?,
                updated_at: parse_time(&updated_at)?,
            },
            version: version as u64,
        })
    }

    async fn save(
        &self,
        session_id: &str,
        session: &Session,
        expected_version: u64,
    ) -> Result<u64, FrontdeskError> {
        let messages = serde_json::to_string(&session.messages)?;
        let last_intent = session.last_intent.map(|i| i.to_string());
        let created_at = session.created_at.to_rfc3339();
        let updated_at = session.updated_at.to_rfc3339();
        let next = expected_version + 1;

        let conn = self.lock()?;
        let changed = if expected_version == 0 {
            conn.execute(
                "INSERT INTO sessions (id, messages, last_intent, created_at, updated_at, version)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO NOTHING",
                params![session_id, messages, last_intent, created_at, updated_at, next as i64],
            )?
        } else {
            conn.execute(
                "UPDATE sessions SET messages = ?2, last_intent = ?3, updated_at = ?4, version = ?5
                 WHERE id = ?1 AND version = ?6",
                params![
                    session_id,
                    messages,
                    last_intent,
                    updated_at,
                    next as i64,
                    expected_version as i64
                ],
            )?
        };

        if changed == 0 {
            return Err(FrontdeskError::VersionConflict {
                session_id: session_id.to_string(),
                expected: expected_version,
                found: stored_version(&conn, session_id)?,
            });
        }
        Ok(next)
    }
}
