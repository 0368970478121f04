// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::infra::paths;
use crate::infra::retry::RetryConfig;
use crate::scheduling::cache::DEFAULT_MAX_BYTES;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub clinic: ClinicConfig,

    #[serde(default)]
    pub models: ModelsConfig,

    #[serde(default)]
    pub router: RouterConfig,

    #[serde(default)]
    pub conversation: ConversationConfig,

    #[serde(default)]
    pub scheduling: SchedulingConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClinicConfig {
    pub name: String,
    pub assistant_name: String,
    /// IANA zone sent to the scheduling API with new invitees.
    pub timezone: String,
    pub slot_minutes: u32,
}

impl Default for ClinicConfig {
    fn default() -> Self {
        Self {
            name: "Acme Dental".into(),
            assistant_name: "Linda".into(),
            timezone: "Europe/London".into(),
            slot_minutes: 30,
        }
    }
}

/// Two tiers: a cheap model for routing and FAQ, a capable one for tool use.
/// Values are "provider/model".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub cheap: String,
    pub capable: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Attempts per model call, counting the first.
    pub max_attempts: u32,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            cheap: "anthropic/claude-haiku-4-5".into(),
            capable: "anthropic/claude-opus-4-6".into(),
            max_tokens: 1024,
            temperature: 0.1,
            max_attempts: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub timeout_ms: u64,
    /// How many user exchanges (user message + replies) the classifier sees.
    pub context_exchanges: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            context_exchanges: 3,
        }
    }
}

impl RouterConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    pub max_tool_rounds: u32,
    /// Whole-step replays allowed when a save loses a version race.
    pub max_save_attempts: u32,
    pub max_concurrent_turns: usize,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: 5,
            max_save_attempts: 3,
            max_concurrent_turns: 32,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulingConfig {
    pub base_url: String,
    /// Label used for metrics records.
    pub service_name: String,
    pub request_timeout_secs: u64,
    pub max_range_days: i64,
    /// Byte budget of the response cache.
    pub cache_max_bytes: usize,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.calendly.com".into(),
            service_name: "calendly".into(),
            request_timeout_secs: 15,
            max_range_days: 7,
            cache_max_bytes: DEFAULT_MAX_BYTES,
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub backend: SessionBackend,
    #[serde(default)]
    pub sqlite_path: Option<PathBuf>,
}

impl SessionConfig {
    pub fn sqlite_path(&self) -> PathBuf {
        self.sqlite_path
            .clone()
            .unwrap_or_else(paths::sessions_db_path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    pub path: PathBuf,
    pub max_results: usize,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("KNOWLEDGE_BASE.md"),
            max_results: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8000,
            cors_origins: vec![
                "http://localhost:3000".into(),
                "http://localhost:5173".into(),
            ],
        }
    }
}

impl Config {
    /// Load config from file, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = paths::config_file_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Read a secret from the environment. Placeholder values are treated as missing.
pub fn require_secret(name: &str) -> anyhow::Result<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() && !v.starts_with("your_") => Ok(v),
        _ => anyhow::bail!("Missing required configuration: {name}. Set it in the environment."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_reasonable() {
        let c = Config::default();
        assert_eq!(c.clinic.slot_minutes, 30);
        assert_eq!(c.router.context_exchanges, 3);
        assert_eq!(c.router.timeout(), Duration::from_millis(5000));
        assert_eq!(c.conversation.max_tool_rounds, 5);
        assert_eq!(c.scheduling.retry.max_attempts, 3);
        assert_eq!(c.scheduling.max_range_days, 7);
        assert_eq!(c.session.backend, SessionBackend::Memory);
        assert_eq!(c.knowledge.max_results, 3);
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.conversation.max_tool_rounds, 5);
        assert_eq!(config.models.cheap, "anthropic/claude-haiku-4-5");
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config: Config = toml::from_str("[clinic]\nname = \"Bright Smiles\"\n\n[scheduling.retry]\nmax_attempts = 5\n").unwrap();
        assert_eq!(config.clinic.name, "Bright Smiles");
        assert_eq!(config.clinic.assistant_name, "Linda");
        assert_eq!(config.scheduling.retry.max_attempts, 5);
        assert_eq!(config.scheduling.retry.initial_delay_ms, 500);
        assert_eq!(config.models.max_attempts, 2);
    }

    #[test]
    fn test_parse_full_toml() {
        let toml_str = r#"
[clinic]
name = "Bright Smiles"
assistant_name = "Sam"
timezone = "Europe/Dublin"
slot_minutes = 30

[models]
cheap = "anthropic/claude-haiku-4-5"
capable = "anthropic/claude-sonnet-4-5"
max_tokens = 2048
temperature = 0.0

[router]
timeout_ms = 2500
context_exchanges = 4

[conversation]
max_tool_rounds = 3
max_save_attempts = 5
max_concurrent_turns = 8

[scheduling]
base_url = "http://localhost:9999"
service_name = "calendly"
request_timeout_secs = 5
max_range_days = 7
cache_max_bytes = 1048576

[scheduling.retry]
max_attempts = 4
initial_delay_ms = 100
backoff_factor = 3.0
max_delay_ms = 1000
jitter_fraction = 0.1

[session]
backend = "sqlite"
sqlite_path = "/tmp/fd.db"

[server]
host = "0.0.0.0"
port = 9000
cors_origins = ["https://clinic.example"]
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.clinic.assistant_name, "Sam");
        assert_eq!(config.models.capable, "anthropic/claude-sonnet-4-5");
        assert_eq!(config.router.timeout_ms, 2500);
        assert_eq!(config.conversation.max_tool_rounds, 3);
        assert_eq!(config.scheduling.retry.max_attempts, 4);
        assert_eq!(config.scheduling.cache_max_bytes, 1_048_576);
        assert_eq!(
            config.scheduling.retry.initial_delay(),
            Duration::from_millis(100)
        );
        assert_eq!(config.session.backend, SessionBackend::Sqlite);
        assert_eq!(config.session.sqlite_path(), PathBuf::from("/tmp/fd.db"));
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.cors_origins.len(), 1);
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = Config::default();
        let serialized = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized.server.port, config.server.port);
        assert_eq!(
            deserialized.scheduling.retry.max_attempts,
            config.scheduling.retry.max_attempts
        );
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = Config::load_from(Path::new("/nonexistent/frontdesk/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_require_secret_rejects_placeholder() {
        std::env::set_var("FRONTDESK_TEST_SECRET_PLACEHOLDER", "your_token_here");
        assert!(require_secret("FRONTDESK_TEST_SECRET_PLACEHOLDER").is_err());
        std::env::set_var("FRONTDESK_TEST_SECRET_REAL", "tok-123");
        assert_eq!(
            require_secret("FRONTDESK_TEST_SECRET_REAL").unwrap(),
            "tok-123"
        );
    }
}
