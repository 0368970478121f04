// src/cli/serve.rs — `frontdesk serve`

use crate::api::{self, ApiState};
use crate::infra::config::Config;

use super::bootstrap::build_assistant;

pub async fn run_serve(config: &Config, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let mut server = config.server.clone();
    if let Some(host) = host {
        server.host = host;
    }
    if let Some(port) = port {
        server.port = port;
    }

    let assistant = build_assistant(config)?;
    api::start_server(&server, ApiState::new(assistant)).await
}
