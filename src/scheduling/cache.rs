// src/scheduling/cache.rs — Byte-bounded LRU cache for scheduling API responses
//
// Entries are JSON values weighed by their serialized length. A put evicts
// least-recently-used entries until the new one fits; a value larger than the
// whole budget is not stored. Availability is never cached.

use std::sync::{Mutex, PoisonError};

use lru::LruCache;
use serde_json::Value;

pub const DEFAULT_MAX_BYTES: usize = 20 * 1024 * 1024;

/// Key prefix for a patient's active scheduled events (email lowercased).
pub const EVENTS_BY_EMAIL: &str = "events_by_email:";
/// Key prefix for one scheduled event's invitees.
pub const INVITEES: &str = "invitees:";

pub fn events_by_email_key(email: &str) -> String {
    format!("{EVENTS_BY_EMAIL}{}", email.trim().to_lowercase())
}

pub fn invitees_key(event_uuid: &str) -> String {
    format!("{INVITEES}{event_uuid}")
}

struct Entry {
    value: Value,
    size: usize,
}

struct Inner {
    entries: LruCache<String, Entry>,
    bytes: usize,
}

pub struct ResponseCache {
    inner: Mutex<Inner>,
    max_bytes: usize,
}

impl ResponseCache {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::unbounded(),
                bytes: 0,
            }),
            max_bytes,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached value for `key`, marking it most recently used.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.lock().entries.get(key).map(|e| e.value.clone())
    }

    pub fn put(&self, key: impl Into<String>, value: Value) {
        let key = key.into();
        let size = value.to_string().len();
        let mut inner = self.lock();

        if let Some(old) = inner.entries.pop(&key) {
            inner.bytes -= old.size;
        }
        if size > self.max_bytes {
            tracing::debug!(key = %key, size, max = self.max_bytes, "Response too large to cache");
            return;
        }
        while inner.bytes + size > self.max_bytes {
            match inner.entries.pop_lru() {
                Some((evicted, entry)) => {
                    inner.bytes -= entry.size;
                    tracing::debug!(key = %evicted, "Evicted cached response");
                }
                None => break,
            }
        }
        inner.bytes += size;
        inner.entries.put(key, Entry { value, size });
    }

    /// Drop `key`. Returns whether it was present.
    pub fn invalidate(&self, key: &str) -> bool {
        let mut inner = self.lock();
        match inner.entries.pop(key) {
            Some(entry) => {
                inner.bytes -= entry.size;
                true
            }
            None => false,
        }
    }

    /// First key under `prefix` whose serialized value mentions `needle`.
    /// Does not change recency.
    pub fn find_key_containing(&self, prefix: &str, needle: &str) -> Option<String> {
        let inner = self.lock();
        let found = inner
            .entries
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .find(|(_, e)| e.value.to_string().contains(needle))
            .map(|(k, _)| k.clone());
        found
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn current_bytes(&self) -> usize {
        self.lock().bytes
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BYTES)
    }
}
