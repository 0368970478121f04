// src/infra/logger.rs — Structured logging with tracing

use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber. `FRONTDESK_LOG` wins over `RUST_LOG`,
/// which wins over `level`.
pub fn init_logging(level: &str) {
    let filter = std::env::var("FRONTDESK_LOG")
        .ok()
        .and_then(|v| EnvFilter::try_new(v).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(level));

    // stderr keeps the chat REPL's stdout clean. try_init: tests may have
    // installed a subscriber already.
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}

/// Default filter for the CLI: quiet HTTP internals unless debugging.
pub fn default_level(debug: bool) -> &'static str {
    if debug {
        "debug"
    } else {
        "frontdesk=info,warn"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_level() {
        assert_eq!(default_level(true), "debug");
        assert!(default_level(false).contains("frontdesk=info"));
    }

    #[test]
    fn test_init_logging_twice_does_not_panic() {
        init_logging("warn");
        init_logging("warn");
    }
}
