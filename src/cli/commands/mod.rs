//! CLI commands implementation.

mod db;
mod login;
mod scrape;
mod sync;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Settings;

#[derive(Parser)]
#[command(name = "skua")]
#[command(about = "Catalog data acquisition from anti-bot storefronts")]
#[command(version)]
pub struct Cli {
    /// Config file path (defaults to ./skuacquire.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Verify the storefront session is logged in, prompting if not
    Login,
    /// Scrape pending items and store the extracted records
    Scrape(scrape::ScrapeArgs),
    /// Cross-check catalog data through the signed vendor API
    Sync(sync::SyncArgs),
    /// Database utilities
    Db(db::DbArgs),
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Login => login::run(&settings).await,
        Commands::Scrape(args) => scrape::run(&settings, args).await,
        Commands::Sync(args) => sync::run(&settings, args).await,
        Commands::Db(args) => db::run(&settings, args),
    }
}
