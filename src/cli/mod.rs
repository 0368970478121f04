// src/cli/mod.rs — CLI definition (clap derive)

pub mod bootstrap;
pub mod chat;
pub mod serve;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "frontdesk", about = "Dental clinic booking assistant", version)]
pub struct Cli {
    /// Config file path
    #[arg(long)]
    pub config: Option<String>,

    /// Verbose logging, including outbound HTTP calls
    #[arg(long)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Chat with the assistant in the terminal (default)
    Chat,
    /// Run the HTTP API
    Serve {
        /// Override the configured bind address
        #[arg(long)]
        host: Option<String>,
        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_none() {
        let cli = Cli::parse_from(["frontdesk"]);
        assert!(cli.command.is_none());
        assert!(!cli.debug);
    }

    #[test]
    fn test_serve_overrides() {
        let cli = Cli::parse_from(["frontdesk", "--debug", "serve", "--port", "9000"]);
        assert!(cli.debug);
        match cli.command {
            Some(Commands::Serve { host, port }) => {
                assert_eq!(host, None);
                assert_eq!(port, Some(9000));
            }
            _ => panic!("expected serve"),
        }
    }
}
