//! herald - talk to a historical figure from the terminal

mod commands;
mod config;
mod persona;
mod repl;
mod utils;

use clap::Parser;
use herald_chat::{ChatConfig, ConversationController};
use herald_wire::GenerationClient;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// herald - streamed chat with a historical persona
#[derive(Parser, Debug)]
#[command(name = "herald")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Generation endpoint URL
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Capability tier requested from the service (default: smart)
    #[arg(short, long)]
    model: Option<String>,

    /// Let the service consult external knowledge
    #[arg(short, long)]
    grounding: bool,

    /// Persona definition file (TOML)
    #[arg(short, long)]
    persona: Option<String>,

    /// Ask a single question and exit
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr so they never mix with the streamed answer
    let default_filter = if args.verbose { "herald=debug" } else { "herald=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    // Initialize config and exit
    if args.init_config {
        match config::Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let config = config::Config::load();

    // CLI args take precedence over the config file
    let endpoint = args
        .endpoint
        .or(config.endpoint)
        .unwrap_or_else(|| herald_wire::client::DEFAULT_ENDPOINT.to_string());
    let persona_file = args.persona.or(config.persona_file);
    let persona = persona::load(persona_file.as_deref())?;

    let mut chat_config = ChatConfig::new(persona);
    if let Some(model) = args.model.or(config.ai_model) {
        chat_config.ai_model = model;
    }
    chat_config.use_grounding = args.grounding || config.use_grounding.unwrap_or(false);

    tracing::debug!(
        endpoint = %endpoint,
        ai_model = %chat_config.ai_model,
        use_grounding = chat_config.use_grounding,
        persona = %chat_config.persona.name,
        "starting"
    );

    let client = GenerationClient::new(&endpoint)?;
    let controller = ConversationController::new(chat_config, Arc::new(client));

    // Non-interactive mode
    if let Some(question) = args.command {
        let outcome = repl::run_once(&controller, &question).await?;
        if !outcome.is_success() {
            std::process::exit(1);
        }
        return Ok(());
    }

    repl::run_interactive(&controller).await
}
