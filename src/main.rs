// src/main.rs
// session-reflect - watches the OpenCode event stream for idle sessions

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};
use url::Url;

use session_reflect::client::{OpencodeClient, SessionPrompter};
use session_reflect::config;
use session_reflect::reflect::{IdleReflectionTrigger, REFLECT_AGENT, REFLECT_PROMPT};
use session_reflect::stream;

#[derive(Parser)]
#[command(name = "session-reflect")]
#[command(about = "Prompts the memory-extractor agent when an OpenCode session goes idle")]
#[command(version)]
struct Cli {
    /// OpenCode server base URL
    #[arg(
        long,
        env = "OPENCODE_URL",
        default_value = config::DEFAULT_SERVER_URL,
        global = true
    )]
    server: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Subscribe to the event stream and run the trigger (default)
    Serve,

    /// Send one reflection prompt to a session, bypassing the cooldown
    Trigger {
        /// Target session id
        #[arg(long)]
        session: String,
    },

    /// Probe the server and the extractor agent definition
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let base_url = config::normalize_base_url(&cli.server)?;
    let client = Arc::new(OpencodeClient::new(base_url.clone()));

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_serve(base_url, client).await,
        Commands::Trigger { session } => run_trigger(&client, &session).await,
        Commands::Check => run_check(&client).await,
    }
}

async fn run_serve(base_url: Url, client: Arc<OpencodeClient>) -> Result<()> {
    if let Err(e) = client.health().await {
        warn!(error = %e, server = %base_url, "host server not reachable yet, subscribing anyway");
    }
    if !config::agent_definition_present() {
        warn!(
            agent = REFLECT_AGENT,
            "agent definition not found, reflection prompts will target a missing agent"
        );
    }

    info!(server = %base_url, "watching for idle sessions");
    let trigger = IdleReflectionTrigger::new(client);
    stream::run(&base_url, &trigger).await?;
    Ok(())
}

async fn run_trigger(client: &OpencodeClient, session: &str) -> Result<()> {
    client
        .prompt_session(session, REFLECT_AGENT, REFLECT_PROMPT)
        .await?;
    println!("Reflection prompt sent to session {session}");
    Ok(())
}

async fn run_check(client: &OpencodeClient) -> Result<()> {
    client.health().await?;
    println!("Server reachable at {}", client.base_url());

    match config::agent_definition_path() {
        Ok(path) if path.exists() => {
            println!("Agent definition found: {}", path.display());
        }
        Ok(path) => {
            println!(
                "Agent definition missing: {} (sync your opencode config)",
                path.display()
            );
        }
        Err(e) => {
            println!("Cannot locate agent definition: {e}");
        }
    }
    Ok(())
}
