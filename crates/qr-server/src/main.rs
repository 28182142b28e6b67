use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use qr_agents::{Depth, ResearchQuery};
use qr_server::{Config, Server};

/// Log level for tracing output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// Everything, including request and response bodies
    Trace,
    /// Agent iterations and tool calls
    Debug,
    /// Requests and completions
    Info,
    /// Degraded output and failures
    Warn,
    Error,
}

impl LogLevel {
    fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Parser)]
#[command(name = "qr")]
#[command(author, version, long_about = None)]
#[command(about = "Quick-research: a tool-using research agent")]
pub struct Cli {
    /// Config file (defaults to ./qr.toml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level; RUST_LOG overrides it when set
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Write JSON logs to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the HTTP API (default)
    Serve {
        /// Address to bind, overriding server.bind
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Research a single query and print the JSON response
    Ask {
        query: String,

        /// quick, detailed or academic (defaults to agent.default_depth)
        #[arg(short, long)]
        depth: Option<Depth>,
    },
}

fn init_logging(cli: &Cli) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_filter()));

    if let Some(log_path) = &cli.log_file {
        let file = std::fs::File::create(log_path)
            .with_context(|| format!("Failed to create log file: {:?}", log_path))?;
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::sync::Mutex::new(file)))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(&cli)?;

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Some(Commands::Ask { query, depth }) => {
            let researcher = config
                .build_researcher()
                .context("Failed to build research agent")?;
            let query = ResearchQuery::new(query, depth.unwrap_or(config.agent.default_depth))?;
            let response = researcher.answer(&query).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
            if !response.is_success() {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Commands::Serve { bind }) => serve(&config, bind).await,
        None => serve(&config, None).await,
    }
}

async fn serve(config: &Config, bind: Option<String>) -> Result<()> {
    let bind = bind.unwrap_or_else(|| config.server.bind.clone());
    let server = Server::from_config(config).context("Failed to build research agent")?;
    tracing::info!(
        model = %config.llm.model,
        max_iterations = config.agent.max_iterations,
        default_depth = %config.agent.default_depth,
        "Starting quick-research server"
    );
    server
        .run(&bind)
        .await
        .with_context(|| format!("Server on {} failed", bind))
}
