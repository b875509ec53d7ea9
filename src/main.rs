use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Read;
use std::net::SocketAddr;
use std::path::PathBuf;
use text_analyzer::config::Config;
use text_analyzer::server::Server;
use text_analyzer::text_stats::TextStats;
use text_analyzer::text_utils::{content_hash, has_content_changed};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "text-analyzer",
    version,
    about = "Text statistics API with per-client throttling"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Override BIND_ADDR
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Print statistics for a file, or stdin when no path is given
    Analyze {
        path: Option<PathBuf>,
        /// Content hash of an earlier version; reports whether the text changed
        #[arg(long)]
        since: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    if let Some(Command::Analyze { path, since }) = &cli.command {
        return analyze(path.as_deref(), since.as_deref());
    }

    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(Command::Serve { bind: Some(bind) }) = cli.command {
        config.bind_addr = bind;
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("text_analyzer={},tower_http=debug", config.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting text analyzer service");
    tracing::info!(
        bind_addr = %config.bind_addr,
        storage = if config.redis_url().is_some() { "redis" } else { "memory" },
        throttle_limit = config.throttle_limit,
        key_strategy = %config.throttle_key_strategy,
        "Configuration loaded"
    );

    let server = Server::new(config)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create server: {}", e))?;

    server
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisReport {
    content_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    changed: Option<bool>,
    stats: TextStats,
}

fn analyze(path: Option<&std::path::Path>, since: Option<&str>) -> Result<()> {
    let content = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };

    let report = AnalysisReport {
        content_hash: content_hash(&content),
        changed: since.map(|previous| has_content_changed(previous, &content)),
        stats: TextStats::compute(&content),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
