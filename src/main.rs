//! Mnemograph - memory-augmented chat with a knowledge graph view
//!
//! Command-line entry point: serves the HTTP API and exposes every core
//! operation as a subcommand.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mnemograph::{
    agent::{MemoryAgent, OpenAiCompatClient},
    api::{build_app, AppState},
    config::{resolve_secret, MemoryProvider, MnemographConfig},
    graph::{GraphService, Neo4jHttpStore},
    memory::{InMemoryStore, Mem0HttpStore, MemoryStore},
};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mnemograph")]
#[command(version)]
#[command(about = "Memory-augmented chat with a knowledge graph view")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "MNEMOGRAPH_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Host to bind to (overrides the configuration)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides the configuration)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Run a single chat turn
    Chat {
        /// Message to send
        message: String,

        /// User id
        #[arg(short, long)]
        user: Option<String>,
    },

    /// Chunk a UTF-8 text file and store it as memories
    Ingest {
        /// File to ingest
        file: PathBuf,

        /// User id
        #[arg(short, long)]
        user: Option<String>,

        /// Source name recorded in memory metadata (defaults to the file name)
        #[arg(long)]
        source: Option<String>,

        /// Maximum chunk size in characters
        #[arg(long)]
        max_chunk_size: Option<usize>,
    },

    /// List stored memories
    Memories {
        /// User id
        #[arg(short, long)]
        user: Option<String>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete every memory of a user
    Clear {
        /// User id
        #[arg(short, long)]
        user: Option<String>,
    },

    /// Render the knowledge graph to an HTML file
    Graph {
        /// User id
        #[arg(short, long)]
        user: Option<String>,

        /// Output path (overrides the configuration)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check configuration and collaborator connectivity
    Doctor,

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("mnemograph={},tower_http={}", log_level, log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match &cli.config {
        Some(path) => MnemographConfig::from_file(path)?,
        None => MnemographConfig::default(),
    };

    match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.gateway.host.clone());
            let port = port.unwrap_or(config.gateway.port);
            run_server(&config, &host, port).await?;
        }
        Commands::Chat { message, user } => {
            let user = user_or_default(&config, user);
            let outcome = build_agent(&config).chat(&user, &message).await;
            println!("{}", outcome.text());
            if !outcome.is_answered() {
                std::process::exit(1);
            }
        }
        Commands::Ingest {
            file,
            user,
            source,
            max_chunk_size,
        } => {
            let user = user_or_default(&config, user);
            run_ingest(&config, &user, file, source, max_chunk_size).await?;
        }
        Commands::Memories { user, json } => {
            let user = user_or_default(&config, user);
            let memories = build_agent(&config).memories(&user).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&memories)?);
            } else if memories.is_empty() {
                println!("No memories stored for {}", user);
            } else {
                for memory in &memories {
                    println!("- {}", memory.text);
                }
            }
        }
        Commands::Clear { user } => {
            let user = user_or_default(&config, user);
            build_agent(&config).clear(&user).await;
            println!("Cleared memories for {}", user);
        }
        Commands::Graph { user, output } => {
            let user = user_or_default(&config, user);
            let output = output.unwrap_or_else(|| config.render.output.clone());
            match build_graph_service(&config).save_graph(&user, &output).await? {
                Some(rendered) => println!(
                    "Wrote {} ({} nodes, {} edges)",
                    rendered.path.display(),
                    rendered.node_count,
                    rendered.edge_count
                ),
                None => println!("No relationships found for {}", user),
            }
        }
        Commands::Doctor => {
            run_doctor(&config).await;
        }
        Commands::Config { default } => {
            show_config(if default { None } else { Some(&config) })?;
        }
    }

    Ok(())
}

fn user_or_default(config: &MnemographConfig, user: Option<String>) -> String {
    user.unwrap_or_else(|| config.memory.default_user_id.clone())
}

// =============================================================================
// Collaborator wiring
// =============================================================================

fn build_memory_store(config: &MnemographConfig) -> Arc<dyn MemoryStore> {
    match config.memory.provider {
        MemoryProvider::Mem0 => Arc::new(Mem0HttpStore::new(
            config.memory.base_url.clone(),
            resolve_secret(&config.memory.api_key_ref),
        )),
        MemoryProvider::InMemory => Arc::new(InMemoryStore::new()),
    }
}

fn build_agent(config: &MnemographConfig) -> MemoryAgent {
    let api_key = resolve_secret(&config.model.api_key_ref);
    if api_key.is_none() {
        tracing::warn!(
            "No API key found in ${}, completion requests will be unauthenticated",
            config.model.api_key_ref.to_uppercase()
        );
    }
    let completion = OpenAiCompatClient::new(
        config.model.resolved_base_url(),
        config.model.model.clone(),
        api_key,
    );
    MemoryAgent::new(
        build_memory_store(config),
        Arc::new(completion),
        config.context.max_memories,
    )
}

fn build_graph_service(config: &MnemographConfig) -> GraphService {
    let password = resolve_secret(&config.graph.password_ref);
    GraphService::new(Arc::new(Neo4jHttpStore::new(&config.graph, password)))
}

// =============================================================================
// Commands
// =============================================================================

async fn run_server(config: &MnemographConfig, host: &str, port: u16) -> Result<()> {
    let state = AppState {
        agent: Arc::new(build_agent(config)),
        graph: Arc::new(build_graph_service(config)),
        default_user_id: config.memory.default_user_id.clone(),
        max_chunk_size: config.ingest.max_chunk_size,
    };
    let app = build_app(state, &config.gateway.cors_origins);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("Mnemograph API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down...");
        })
        .await?;
    Ok(())
}

async fn run_ingest(
    config: &MnemographConfig,
    user: &str,
    file: PathBuf,
    source: Option<String>,
    max_chunk_size: Option<usize>,
) -> Result<()> {
    let text = tokio::fs::read_to_string(&file)
        .await
        .with_context(|| format!("failed to read {} as UTF-8 text", file.display()))?;

    let source = source.unwrap_or_else(|| {
        file.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.display().to_string())
    });
    let mut metadata = Map::new();
    metadata.insert("source".to_string(), Value::String(source.clone()));

    let report = build_agent(config)
        .ingest(
            user,
            &text,
            Some(&metadata),
            max_chunk_size.unwrap_or(config.ingest.max_chunk_size),
        )
        .await;

    println!(
        "Ingested {}: {} chunks, {} stored",
        source,
        report.chunks,
        report.stored.len()
    );
    if report.failed() > 0 {
        anyhow::bail!("{} chunks could not be stored", report.failed());
    }
    Ok(())
}

async fn run_doctor(config: &MnemographConfig) {
    println!("Mnemograph Doctor");
    println!();

    println!("Checking secrets...");
    for (what, reference) in [
        ("model API key", &config.model.api_key_ref),
        ("mem0 API key", &config.memory.api_key_ref),
        ("graph password", &config.graph.password_ref),
    ] {
        if resolve_secret(reference).is_some() {
            println!("  ✓ {} found in ${}", what, reference.to_uppercase());
        } else {
            println!("  ✗ {} not set (${})", what, reference.to_uppercase());
        }
    }

    println!();
    println!("Checking memory store ({})...", config.memory.base_url);
    let store = build_memory_store(config);
    match store.get_all(&config.memory.default_user_id).await {
        Ok(_) => println!("  ✓ {} reachable", store.name()),
        Err(e) => println!("  ✗ {}", e),
    }

    println!();
    println!("Checking graph store ({})...", config.graph.url);
    if build_graph_service(config).test_connection().await {
        println!("  ✓ Graph store reachable");
    } else {
        println!("  ✗ Graph store unreachable");
    }

    println!();
    println!("Doctor check complete!");
}

fn show_config(config: Option<&MnemographConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default();
    let toml = toml::to_string_pretty(&config)?;
    println!("{}", toml);
    Ok(())
}
