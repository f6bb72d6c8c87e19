//! `skua db` - database utilities.

use clap::{Args, Subcommand};
use console::style;

use crate::config::Settings;
use crate::models::LaunchType;
use crate::repository::ListingStore;

#[derive(Args)]
pub struct DbArgs {
    #[command(subcommand)]
    action: DbAction,
}

#[derive(Subcommand)]
enum DbAction {
    /// Create the schema if it does not exist
    Init,
    /// Show pending queue counts
    Status,
}

pub fn run(settings: &Settings, args: DbArgs) -> anyhow::Result<()> {
    match args.action {
        DbAction::Init => {
            ListingStore::open(&settings.database.path)?;
            println!(
                "{} initialized {}",
                style("✓").green(),
                settings.database.path.display()
            );
        }
        DbAction::Status => {
            let store = ListingStore::open(&settings.database.path)?;
            let new_products = store.pending_items(LaunchType::NewProduct)?.len();
            let variations = store.pending_items(LaunchType::NewVariation)?.len();
            println!("pending new products: {new_products}");
            println!("pending variations:   {variations}");
        }
    }
    Ok(())
}
