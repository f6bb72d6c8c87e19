//! `skua scrape` - the product processing loop.
//!
//! One parameterized pipeline serves both intake lanes; they differ only in
//! which gateway path receives the record.

use clap::{Args, Subcommand};
use console::style;
use tracing::{info, warn};

use crate::config::Settings;
use crate::error::ScrapeError;
use crate::extract::Extractor;
use crate::models::{LaunchType, PendingItem, ProductRecord};
use crate::navigation::Navigator;
use crate::pacing::PacingScheduler;
use crate::repository::ListingStore;
use crate::session::SessionManager;

#[derive(Args)]
pub struct ScrapeArgs {
    #[command(subcommand)]
    mode: ScrapeMode,

    /// Cap on items processed this run
    #[arg(long)]
    limit: Option<usize>,
}

#[derive(Subcommand)]
enum ScrapeMode {
    /// New product listings (product-keyed upsert)
    New,
    /// Existing listings (one row per (product, source URL))
    Variations,
}

pub async fn run(settings: &Settings, args: ScrapeArgs) -> anyhow::Result<()> {
    let launch = match args.mode {
        ScrapeMode::New => LaunchType::NewProduct,
        ScrapeMode::Variations => LaunchType::NewVariation,
    };

    let mut store = ListingStore::open(&settings.database.path)?;
    let mut items = store.pending_items(launch)?;
    if let Some(limit) = args.limit {
        items.truncate(limit);
    }
    if items.is_empty() {
        println!("Nothing to scrape.");
        return Ok(());
    }

    let pacing = PacingScheduler::new(settings.pacing.clone());
    let mut session = SessionManager::new(settings.browser.clone(), pacing.clone());
    session.create().await?;

    let navigator = Navigator::new(
        settings.navigation.clone(),
        settings.detection.clone(),
        pacing.clone(),
    );
    let extractor = Extractor::new(settings.extraction.clone(), pacing.clone());

    if !navigator.check_login(&mut session).await? {
        session.quit().await;
        return Err(ScrapeError::LoginRequired.into());
    }

    let total = items.len();
    let mut succeeded = 0usize;
    let mut failed = 0usize;

    for (idx, item) in items.into_iter().enumerate() {
        info!("[{}/{}] processing: {}", idx + 1, total, item.name);

        match process_item(
            &navigator,
            &extractor,
            &mut session,
            &mut store,
            &item,
            launch,
        )
        .await
        {
            Ok(true) => succeeded += 1,
            Ok(false) => {
                warn!("no result for: {}", item.name);
                failed += 1;
            }
            Err(e) => {
                // A persistent login wall or a dead launch ends the run;
                // anything else fails this product and the loop advances.
                if run_is_over(&e) {
                    session.quit().await;
                    return Err(e);
                }
                warn!("failed: {} ({e})", item.name);
                failed += 1;
            }
        }

        pacing.delay_in(pacing.settings().step_delay).await;
        if let Ok(page) = session.page() {
            pacing.idle(&page).await;
        }
        pacing.batch_pause(idx + 1).await;
    }

    session.quit().await;

    println!();
    println!("{}", style("Summary").bold());
    println!("  total:     {total}");
    println!("  succeeded: {}", style(succeeded).green());
    println!("  failed:    {}", style(failed).red());
    Ok(())
}

fn run_is_over(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<ScrapeError>(),
        Some(ScrapeError::LoginRequired) | Some(ScrapeError::Launch(_))
    )
}

async fn process_item(
    navigator: &Navigator,
    extractor: &Extractor,
    session: &mut SessionManager,
    store: &mut ListingStore,
    item: &PendingItem,
    launch: LaunchType,
) -> anyhow::Result<bool> {
    // Cheap mid-run logout check before spending a navigation on this item.
    if navigator.check_session_expired(session).await {
        warn!("session expired mid-run");
        if !navigator.check_login(session).await? {
            return Err(ScrapeError::LoginRequired.into());
        }
    }

    if !navigator.navigate_to_product(session, &item.target()).await? {
        return Ok(false);
    }

    // Gallery first: variation interaction mutates the preview it reads from.
    let gallery_images = extractor.collect_gallery(session).await?;
    let variation_images = extractor
        .collect_variation_images(session, &item.variation_names)
        .await?;
    let description = extractor.collect_description(session).await?;

    // The landing URL is the source of record; fall back to the intake URL.
    let source_url = match session.page()?.url().await {
        Ok(Some(url)) => Some(url),
        _ => item.reference_url.clone(),
    };

    let record = ProductRecord {
        product_id: item.product_id,
        name: item.name.clone(),
        source_url,
        gallery_images,
        variation_names: item.variation_names.clone(),
        variation_images,
        description,
        item_date: item.item_date,
    };

    match launch {
        LaunchType::NewProduct => store.upsert_product(&record)?,
        LaunchType::NewVariation => store.upsert_source_listing(&record)?,
    };
    Ok(true)
}
