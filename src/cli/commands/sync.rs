//! `skua sync` - catalog cross-check through the signed vendor API.

use anyhow::bail;
use clap::Args;
use console::style;

use crate::api::{PartnerClient, ShopCredentials};
use crate::config::Settings;
use crate::models::LaunchType;
use crate::repository::ListingStore;

#[derive(Args)]
pub struct SyncArgs {
    /// Shop id holding the items
    #[arg(long)]
    shop_id: i64,

    /// Access token for the shop
    #[arg(long, env = "SHOPEE_ACCESS_TOKEN", hide_env_values = true)]
    access_token: String,

    /// Explicit item ids; defaults to the pending variation queue
    #[arg(long, value_delimiter = ',')]
    item_ids: Vec<i64>,
}

pub async fn run(settings: &Settings, args: SyncArgs) -> anyhow::Result<()> {
    let client = PartnerClient::new(settings.partner_api.clone())?;
    let shop = ShopCredentials {
        shop_id: args.shop_id,
        access_token: args.access_token,
    };

    let item_ids = if args.item_ids.is_empty() {
        let store = ListingStore::open(&settings.database.path)?;
        let mut ids: Vec<i64> = store
            .pending_items(LaunchType::NewVariation)?
            .iter()
            .map(|item| item.product_id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    } else {
        args.item_ids
    };
    if item_ids.is_empty() {
        bail!("no item ids to sync; pass --item-ids or queue variation items");
    }

    let items = client.item_base_info(&shop, &item_ids).await?;
    println!(
        "fetched {} of {} item(s)",
        style(items.len()).bold(),
        item_ids.len()
    );

    for item in &items {
        let models = client.model_list(&shop, item.item_id).await?;
        println!();
        println!("{} {}", style(item.item_id).cyan(), style(&item.item_name).bold());
        match item.description_text() {
            Some(text) => println!("  description: {} chars", text.chars().count()),
            None => println!("  description: {}", style("none").dim()),
        }
        for tier in &models.tier_variation {
            println!("  tier: {}", tier.name);
            for option in &tier.option_list {
                let has_image = option
                    .image
                    .as_ref()
                    .and_then(|i| i.image_url.as_deref())
                    .is_some();
                let marker = if has_image {
                    style("image").green()
                } else {
                    style("no image").dim()
                };
                println!("    - {} ({marker})", option.option);
            }
        }
    }
    Ok(())
}
