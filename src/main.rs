mod cli;
mod config;
mod db;
mod error;
mod navigation;
mod server;
mod spatial;
mod tools;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pokenav", version, about = "Spatial memory and navigation MCP server for game-playing agents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the MCP server (stdio transport unless --http or server.transport = "http")
    Serve {
        /// Serve over streamable HTTP at server.host:server.port
        #[arg(long)]
        http: bool,
    },
    /// Show coordinate, healing and bookmark statistics
    Stats,
    /// Check database health
    Doctor,
    /// Delete coordinates older than the retention window
    Cleanup {
        /// Only report what would be deleted
        #[arg(long)]
        dry_run: bool,
        /// Retention in days (defaults to maintenance.retention_days)
        #[arg(long)]
        days: Option<u64>,
    },
    /// Export all spatial memory as JSON to stdout
    Export,
    /// List bookmarks and map connections
    Bookmarks {
        /// Delete the named bookmark before listing
        #[arg(long)]
        remove: Option<String>,
    },
    /// Find the fewest-hop route between two maps, given as bank-id labels
    Route {
        from: String,
        to: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::PokenavConfig::load()?;

    // Log to stderr so stdout stays clean for MCP JSON-RPC and CLI output.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve { http } => {
            if http || config.server.transport == "http" {
                server::serve_http(config).await?;
            } else {
                server::serve_stdio(config).await?;
            }
        }
        Command::Stats => cli::stats::stats(&config)?,
        Command::Doctor => cli::doctor::doctor(&config)?,
        Command::Cleanup { dry_run, days } => cli::maintenance::cleanup(&config, days, dry_run)?,
        Command::Export => cli::export::export(&config)?,
        Command::Bookmarks { remove } => cli::bookmarks::bookmarks(&config, remove.as_deref())?,
        Command::Route { from, to } => cli::route::route(&config, &from, &to)?,
    }

    Ok(())
}
