//! Avandra - a dice-rolling D&D session agent
//!
//! Bridges a chat adapter to Claude, giving the model tools for rolling
//! dice and reading character sheets. This binary runs the interactive
//! terminal adapter; chat-platform adapters reuse the same
//! `Conversation::handle_prompt` entry point.

mod conversation;
mod llm;
mod prompt;
mod sheets;
mod tools;

use conversation::Conversation;
use llm::{AnthropicClient, LlmService, LoggingService};
use sheets::{SheetStore, StaticSheets};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Process configuration, read once at startup
struct Config {
    anthropic_api_key: Option<String>,
    model: String,
    character: String,
}

impl Config {
    fn from_env() -> Self {
        Self {
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY").ok(),
            model: std::env::var("AVANDRA_MODEL").unwrap_or_else(|_| llm::DEFAULT_MODEL.to_string()),
            character: std::env::var("AVANDRA_CHARACTER").unwrap_or_else(|_| "Hoglat".to_string()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "avandra=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env();
    let Some(api_key) = config.anthropic_api_key else {
        return Err("ANTHROPIC_API_KEY is not set".into());
    };

    // Construct the external clients once and inject them; nothing below
    // reaches for process-wide state.
    let anthropic = Arc::new(AnthropicClient::new(api_key, config.model));
    let llm: Arc<dyn LlmService> = Arc::new(LoggingService::new(anthropic));
    let sheets: Arc<dyn SheetStore> = Arc::new(StaticSheets::party());
    let conversation = Conversation::new(llm, sheets);

    tracing::info!(character = %config.character, "Starting interactive session");
    run_interactive(&conversation, &config.character).await
}

/// Read prompts from stdin and print replies until `exit` or EOF
async fn run_interactive(
    conversation: &Conversation,
    character: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let user_prompt = line.trim();
        if user_prompt == "exit" {
            break;
        }
        if user_prompt.is_empty() {
            continue;
        }

        let (tx, mut rx) = mpsc::channel(16);
        let printer = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                println!("{message}\n");
            }
        });

        conversation.handle_prompt(character, user_prompt, &tx).await;
        drop(tx);
        printer.await?;
    }

    Ok(())
}
