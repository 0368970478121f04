// src/cli/chat.rs — Interactive REPL

use std::sync::Arc;

use crate::core::assistant::Assistant;
use crate::infra::config::Config;

use super::bootstrap::build_assistant;

/// What the REPL should do with one line of input.
#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Quit,
    NewSession,
    Skip,
    Say(&'a str),
}

fn parse_command(input: &str) -> Command<'_> {
    let trimmed = input.trim();
    match trimmed.to_lowercase().as_str() {
        "" => Command::Skip,
        "quit" | "exit" | "q" => Command::Quit,
        "new" => Command::NewSession,
        _ => Command::Say(trimmed),
    }
}

fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Run the interactive chat REPL.
pub async fn run_chat(config: &Config) -> anyhow::Result<()> {
    let assistant = build_assistant(config)?;
    chat_loop(assistant, config).await
}

async fn chat_loop(assistant: Arc<Assistant>, config: &Config) -> anyhow::Result<()> {
    eprintln!(
        "{} assistant v{} | type 'new' for a fresh conversation, 'quit' to exit\n",
        config.clinic.name,
        env!("CARGO_PKG_VERSION"),
    );

    let mut session_id = new_session_id();
    tracing::info!(session_id = %session_id, "Started session");

    while let Some(input) = read_input() {
        match parse_command(&input) {
            Command::Quit => break,
            Command::Skip => continue,
            Command::NewSession => {
                session_id = new_session_id();
                tracing::info!(session_id = %session_id, "Started session");
                eprintln!("(new conversation)\n");
            }
            Command::Say(text) => match assistant.turn(&session_id, text).await {
                Ok(reply) => println!("\n{}: {}\n", config.clinic.assistant_name, reply),
                Err(e) => eprintln!("\nerror: {e}\n"),
            },
        }
    }

    eprintln!("Goodbye!");
    Ok(())
}

fn read_input() -> Option<String> {
    use std::io::{self, BufRead, Write};

    print!("You: ");
    io::stdout().flush().ok();

    let stdin = io::stdin();
    let mut line = String::new();
    match stdin.lock().read_line(&mut line) {
        Ok(0) => None, // EOF
        Ok(_) => Some(line),
        Err(_) => None,
    }
}
