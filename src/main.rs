// src/main.rs — frontdesk entry point

use clap::Parser;

use frontdesk::cli::{Cli, Commands};
use frontdesk::infra::config::Config;
use frontdesk::infra::logger;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Respects FRONTDESK_LOG / RUST_LOG
    logger::init_logging(logger::default_level(cli.debug));

    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Falls back to defaults if no config.toml
    let config = if let Some(ref path) = cli.config {
        Config::load_from(std::path::Path::new(path))?
    } else {
        Config::load()?
    };

    match cli.command {
        Some(Commands::Serve { host, port }) => {
            frontdesk::cli::serve::run_serve(&config, host, port).await
        }
        Some(Commands::Chat) | None => frontdesk::cli::chat::run_chat(&config).await,
    }
}
