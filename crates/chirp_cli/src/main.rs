use anyhow::{bail, Result};
use chirp_core::{ChirpConfig, PersonalityTone};
use chirp_gateway::GatewayServer;
use chirp_reasoning::providers::{LlamaCppEngine, MockEngine};
use chirp_reasoning::{Dispatcher, GenerationEngine};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "chirp.toml")]
    config: PathBuf,

    /// Generation engine: "llamacpp" or "mock"
    #[arg(short, long)]
    engine: Option<String>,

    /// Starting personality for new conversations
    #[arg(short, long)]
    tone: Option<PersonalityTone>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Chat in the terminal
    Chat,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();
    let args = Args::parse();

    let mut config = ChirpConfig::load_or_default(&args.config);
    if let Some(engine) = args.engine {
        config.engine.provider = engine;
    }
    if let Some(tone) = args.tone {
        config.conversation.default_tone = tone;
    }

    let engine = build_engine(&config)?;
    info!(
        "Using {} engine, default tone {}",
        engine.name(),
        config.conversation.default_tone
    );
    let dispatcher = Arc::new(Dispatcher::new(engine, &config));

    match args.command.unwrap_or(Command::Serve { host: None, port: None }) {
        Command::Serve { host, port } => {
            let host = host.unwrap_or(config.server.host);
            let port = port.unwrap_or(config.server.port);
            GatewayServer::new(dispatcher, &host, port).run().await
        }
        Command::Chat => chat_loop(&dispatcher).await,
    }
}

fn build_engine(config: &ChirpConfig) -> Result<Arc<dyn GenerationEngine>> {
    match config.engine.provider.as_str() {
        "mock" => Ok(Arc::new(MockEngine::new())),
        "llamacpp" | "llama.cpp" => {
            info!("Connecting to llama.cpp at {}", config.engine.base_url);
            Ok(Arc::new(LlamaCppEngine::new(&config.engine)?))
        }
        other => bail!("Unknown engine provider '{}' (expected llamacpp or mock)", other),
    }
}

async fn chat_loop(dispatcher: &Dispatcher) -> Result<()> {
    println!("Chirp is listening. Type 'quit' to exit.");
    print!("> ");
    io::stdout().flush()?;

    let stdin = io::stdin();
    let mut input = String::new();

    loop {
        input.clear();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        let trimmed = input.trim();

        if trimmed == "quit" || trimmed == "exit" {
            break;
        }

        if !trimmed.is_empty() {
            let reply = dispatcher.handle(trimmed).await;
            println!("\nChirp: {}\n", reply);
        }

        print!("> ");
        io::stdout().flush()?;
    }

    Ok(())
}
