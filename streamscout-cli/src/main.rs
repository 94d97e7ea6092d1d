//! Command-line driver for the resolution engine.
//!
//! Stands in for the UI/download callers: load config, init logging, run
//! one command against the source registry, print JSON. Empty results exit
//! zero; only hard errors (unknown source, bad episode id, broken config)
//! are failures.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::debug;

use streamscout_core::logging::init_logging;
use streamscout_core::{Config, HttpFetcher, SourceRegistry};

#[derive(Parser)]
#[command(name = "streamscout", about = "Resolve streaming sources into playable media links")]
struct Cli {
    /// Path to a config file (TOML/YAML/JSON); defaults apply without one.
    #[arg(short, long, env = "STREAMSCOUT_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve an episode to playable links
    Resolve {
        /// Source id (see `sources`)
        source: String,
        /// Catalog content id
        content_id: String,
        /// Episode route, e.g. "7", "e7", "s2e7", "2x7"
        episode: String,
    },
    /// Search a source's catalog
    Search {
        source: String,
        query: String,
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Show a source's home page rows
    Home { source: String },
    /// List episodes of a catalog entry
    Episodes {
        source: String,
        content_id: String,
        #[arg(short, long)]
        season: Option<u32>,
    },
    /// Probe a source's base URL for liveness
    Ping { source: String },
    /// List configured source ids
    Sources,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    init_logging(&config.logging).context("initializing logging")?;
    debug!(sources = config.sources.len(), "configuration loaded");

    let fetcher = Arc::new(HttpFetcher::from_config(&config.http)?);
    let registry = SourceRegistry::from_config(&config, fetcher);

    match cli.command {
        Command::Resolve {
            source,
            content_id,
            episode,
        } => {
            let links = registry.resolve_links(&source, &content_id, &episode).await?;
            println!("{}", serde_json::to_string_pretty(&links)?);
        }
        Command::Search { source, query, page } => {
            let items = registry.get(&source)?.search(&query, page).await?;
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
        Command::Home { source } => {
            let rows = registry.get(&source)?.home_page().await?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        Command::Episodes {
            source,
            content_id,
            season,
        } => {
            let episodes = registry.get(&source)?.episodes(&content_id, season).await?;
            println!("{}", serde_json::to_string_pretty(&episodes)?);
        }
        Command::Ping { source } => {
            let alive = registry.get(&source)?.ping().await;
            println!("{}", serde_json::json!({ "source": source, "alive": alive }));
        }
        Command::Sources => {
            println!("{}", serde_json::to_string_pretty(&registry.source_ids())?);
        }
    }

    Ok(())
}
