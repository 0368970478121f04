// src/infra/errors.rs — Error types for frontdesk

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrontdeskError {
    // Model provider errors (possibly retriable)
    #[error("Provider '{provider}' error: {message}")]
    Provider {
        provider: String,
        message: String,
        retriable: bool,
    },

    #[error("Rate limited by '{provider}', retry after {retry_after_ms}ms")]
    RateLimited {
        provider: String,
        retry_after_ms: u64,
    },

    // Session persistence
    #[error("Session '{session_id}' changed concurrently (expected version {expected}, found {found})")]
    VersionConflict {
        session_id: String,
        expected: u64,
        found: u64,
    },

    #[error("Session store error: {0}")]
    Storage(String),

    // Infra
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FrontdeskError {
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            FrontdeskError::Provider {
                retriable: true,
                ..
            } | FrontdeskError::RateLimited { .. }
        )
    }

    /// A lost optimistic-concurrency race; the whole turn can be replayed.
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, FrontdeskError::VersionConflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retriable_provider() {
        let err = FrontdeskError::Provider {
            provider: "anthropic".into(),
            message: "HTTP 529".into(),
            retriable: true,
        };
        assert!(err.is_retriable());
        assert!(!err.is_version_conflict());
    }

    #[test]
    fn test_rate_limited_is_retriable() {
        let err = FrontdeskError::RateLimited {
            provider: "anthropic".into(),
            retry_after_ms: 1000,
        };
        assert!(err.is_retriable());
    }

    #[test]
    fn test_version_conflict() {
        let err = FrontdeskError::VersionConflict {
            session_id: "s-1".into(),
            expected: 2,
            found: 3,
        };
        assert!(err.is_version_conflict());
        assert!(!err.is_retriable());
        assert!(err.to_string().contains("expected version 2"));
    }

    #[test]
    fn test_config_not_retriable() {
        assert!(!FrontdeskError::Config("bad".into()).is_retriable());
    }
}
