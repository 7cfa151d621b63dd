use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod search_cli;

use nostr_search::Config;
use search_cli::SearchCommands;

#[derive(Parser)]
#[command(name = "nostr-search")]
#[command(about = "Search Nostr relays with a small query language")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: SearchCommands,

    /// Configuration file path (default: ~/.nostr-search/config.toml)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())
        .with_context(|| "Failed to load configuration")?;

    init_logging(&config.logging.level)?;

    config
        .validate()
        .with_context(|| "Configuration validation failed")?;

    search_cli::handle_command(cli.command, config).await
}

fn init_logging(level: &str) -> Result<()> {
    let filter = match level.to_lowercase().as_str() {
        "error" => tracing::Level::ERROR,
        "warn" => tracing::Level::WARN,
        "info" => tracing::Level::INFO,
        "debug" => tracing::Level::DEBUG,
        "trace" => tracing::Level::TRACE,
        _ => tracing::Level::INFO,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter.to_string())),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();

    Ok(())
}
