use std::path::PathBuf;
use std::process::ExitCode;

use chia::builder::LLMBackend;
use chia::conversation::{self, DEMO_MESSAGES};
use chia::display::{DisplaySink, HtmlPage, Tee, TerminalSink};
use chia::persona::{self, SessionOptions};
use chia::secret_store::{resolve_api_key, SecretStore};
use clap::{Parser, Subcommand};
use colored::*;

/// Command line arguments for the Chia client
#[derive(Parser)]
#[clap(
    name = "chia",
    about = "Chat with Chia and print her structured replies"
)]
struct CliArgs {
    #[command(subcommand)]
    command: Option<Command>,

    /// LLM backend to use (google)
    #[arg(long, global = true)]
    backend: Option<LLMBackend>,

    /// Gemini API key (falls back to the secret store, then API_KEY / GEMINI_API_KEY / GOOGLE_API_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Model name to use
    #[arg(long, global = true)]
    model: Option<String>,

    /// Base URL for the API
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Request timeout in seconds (none by default)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Also write the conversation to this HTML file
    #[arg(long, global = true)]
    html: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Send messages to Chia (defaults to the two demo messages)
    Run {
        /// Messages to send, in order
        messages: Vec<String>,
    },
    #[command(flatten)]
    Secret(SecretCommand),
}

#[derive(Subcommand)]
enum SecretCommand {
    /// Store a secret
    Set { key: String, value: String },
    /// Show a stored secret
    Get { key: String },
    /// Remove a stored secret
    Delete { key: String },
}

fn manage_secrets(command: &SecretCommand) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        SecretCommand::Set { key, value } => {
            let mut store = SecretStore::new()?;
            store.set(key, value)?;
            println!(
                "{} Secret '{}' has been set in {}.",
                "✓".bright_green(),
                key,
                store.path().display()
            );
        }
        SecretCommand::Get { key } => {
            let store = SecretStore::new()?;
            match store.get(key) {
                Some(value) => println!("{}: {}", key, value),
                None => println!("{} Secret '{}' not found", "!".bright_yellow(), key),
            }
        }
        SecretCommand::Delete { key } => {
            let mut store = SecretStore::new()?;
            store.delete(key)?;
            println!("{} Secret '{}' has been deleted.", "✓".bright_green(), key);
        }
    }
    Ok(())
}

async fn converse(args: &CliArgs, messages: &[String], sink: &mut dyn DisplaySink) -> bool {
    let store = match SecretStore::new() {
        Ok(store) => Some(store),
        Err(e) => {
            log::warn!("secret store unavailable: {e}");
            None
        }
    };

    let options = SessionOptions {
        api_key: resolve_api_key(args.api_key.clone(), store.as_ref()),
        model: args.model.clone(),
        base_url: args.base_url.clone(),
        timeout_seconds: args.timeout,
        backend: args.backend.clone(),
    };

    let mut session = match persona::open_session(options) {
        Ok(session) => session,
        Err(e) => {
            conversation::report_failure(sink, &e);
            return false;
        }
    };

    conversation::run(&mut session, sink, messages).await
}

#[tokio::main]
async fn main() -> ExitCode {
    chia::init_logging();
    let args = CliArgs::parse();

    let messages = match &args.command {
        None => DEMO_MESSAGES.iter().map(|m| m.to_string()).collect(),
        Some(Command::Run { messages }) if messages.is_empty() => {
            DEMO_MESSAGES.iter().map(|m| m.to_string()).collect()
        }
        Some(Command::Run { messages }) => messages.clone(),
        Some(Command::Secret(command)) => {
            return match manage_secrets(command) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("{} {}", "Error:".bright_red(), e);
                    ExitCode::FAILURE
                }
            };
        }
    };

    let mut page = HtmlPage::new("Chia");
    let completed = {
        let mut sink = Tee(TerminalSink, &mut page);
        converse(&args, &messages, &mut sink).await
    };

    if let Some(path) = &args.html {
        match page.write_to(path) {
            Ok(()) => println!("Conversation written to {}", path.display()),
            Err(e) => {
                eprintln!("{} could not write {}: {}", "Error:".bright_red(), path.display(), e);
                return ExitCode::FAILURE;
            }
        }
    }

    if completed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
