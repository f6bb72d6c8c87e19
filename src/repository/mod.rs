//! SQLite persistence gateway.
//!
//! Accepts fully-formed product records with upsert semantics: repeated
//! writes for the same product key overwrite prior values, and the
//! multi-source path keys one row per (product_id, source_url). Also serves
//! the operator-loaded intake queue the scrape loop reads.

use std::path::Path;

use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{LaunchType, PendingItem, ProductRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    product_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    variation_names TEXT,
    reference_url TEXT,
    launch_type TEXT NOT NULL,
    item_date TEXT
);

CREATE TABLE IF NOT EXISTS listing_products (
    product_id INTEGER PRIMARY KEY,
    product_name TEXT NOT NULL,
    source_url TEXT,
    hero_image TEXT,
    supporting_images TEXT,
    description_text TEXT,
    description_images TEXT,
    item_date TEXT,
    status TEXT NOT NULL DEFAULT 'bot',
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS listing_variations (
    product_id INTEGER NOT NULL,
    sort_order INTEGER NOT NULL,
    name TEXT NOT NULL,
    image TEXT,
    PRIMARY KEY (product_id, sort_order)
);

CREATE TABLE IF NOT EXISTS source_listings (
    product_id INTEGER NOT NULL,
    source_url TEXT NOT NULL,
    product_name TEXT,
    variation_names TEXT,
    variation_images TEXT,
    description_images TEXT,
    item_date TEXT,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (product_id, source_url)
);
"#;

/// SQLite-backed listing store.
pub struct ListingStore {
    conn: Connection,
}

impl ListingStore {
    /// Open (and initialize) the store at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        debug!("listing store open at {}", path.display());
        Ok(Self { conn })
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Queue an intake row. Operator tooling and tests use this; the scrape
    /// loop only reads.
    pub fn queue_item(&self, item: &PendingItem) -> Result<(), StoreError> {
        let variations = serde_json::to_string(&item.variation_names)?;
        self.conn.execute(
            "INSERT INTO items (product_id, name, variation_names, reference_url, launch_type, item_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                item.product_id,
                item.name,
                variations,
                item.reference_url,
                item.launch_type.as_str(),
                item.item_date.map(|d| d.to_string()),
            ],
        )?;
        Ok(())
    }

    /// Intake rows for a launch lane that still need scraping. New products
    /// are excluded once a listing row exists; variation rows stay eligible
    /// because the composite-key upsert makes re-runs idempotent.
    pub fn pending_items(&self, launch: LaunchType) -> Result<Vec<PendingItem>, StoreError> {
        let sql = match launch {
            LaunchType::NewProduct => {
                "SELECT product_id, name, variation_names, reference_url, item_date
                 FROM items
                 WHERE launch_type = ?1
                   AND name != ''
                   AND product_id NOT IN (SELECT product_id FROM listing_products)
                 ORDER BY id"
            }
            LaunchType::NewVariation => {
                "SELECT product_id, name, variation_names, reference_url, item_date
                 FROM items
                 WHERE launch_type = ?1 AND name != ''
                 ORDER BY id"
            }
        };

        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params![launch.as_str()], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?,
            ))
        })?;

        let mut items = Vec::new();
        for row in rows {
            let (product_id, name, variations, reference_url, item_date) = row?;
            let variation_names: Vec<String> = variations
                .as_deref()
                .and_then(|v| serde_json::from_str(v).ok())
                .unwrap_or_default();
            items.push(PendingItem {
                product_id,
                name,
                variation_names,
                reference_url,
                launch_type: launch,
                item_date: item_date.and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
            });
        }
        info!("found {} pending {} item(s)", items.len(), launch.as_str());
        Ok(items)
    }

    /// Upsert a product row plus its positional variation rows. Repeated
    /// calls for the same product id overwrite prior values; the variation
    /// rows are rewritten wholesale so stale positions cannot linger.
    pub fn upsert_product(&mut self, record: &ProductRecord) -> Result<usize, StoreError> {
        let supporting = serde_json::to_string(record.supporting_images())?;
        let description_images = serde_json::to_string(&record.description.images())?;
        let now = Utc::now().to_rfc3339();

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO listing_products
                (product_id, product_name, source_url, hero_image, supporting_images,
                 description_text, description_images, item_date, status, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 'bot', ?9)
             ON CONFLICT(product_id) DO UPDATE SET
                product_name = excluded.product_name,
                source_url = excluded.source_url,
                hero_image = excluded.hero_image,
                supporting_images = excluded.supporting_images,
                description_text = excluded.description_text,
                description_images = excluded.description_images,
                item_date = excluded.item_date,
                updated_at = excluded.updated_at",
            params![
                record.product_id,
                record.name,
                record.source_url,
                record.hero_image(),
                supporting,
                record.description.joined_text(),
                description_images,
                record.item_date.map(|d| d.to_string()),
                now,
            ],
        )?;

        tx.execute(
            "DELETE FROM listing_variations WHERE product_id = ?1",
            params![record.product_id],
        )?;
        let mut inserted = 0;
        for (i, name) in record.variation_names.iter().enumerate() {
            let image = record.variation_images.get(i).cloned().flatten();
            tx.execute(
                "INSERT INTO listing_variations (product_id, sort_order, name, image)
                 VALUES (?1, ?2, ?3, ?4)",
                params![record.product_id, i as i64, name, image],
            )?;
            inserted += 1;
        }
        tx.commit()?;

        info!(
            "stored product {} with {} variation row(s)",
            record.product_id, inserted
        );
        Ok(inserted)
    }

    /// Upsert the multi-source row keyed by (product_id, source_url); one
    /// row per distinct source URL.
    pub fn upsert_source_listing(&mut self, record: &ProductRecord) -> Result<usize, StoreError> {
        let variation_names = serde_json::to_string(&record.variation_names)?;
        let variation_images = serde_json::to_string(&record.variation_images)?;
        let description_images = serde_json::to_string(&record.description.images())?;
        let now = Utc::now().to_rfc3339();

        let affected = self.conn.execute(
            "INSERT INTO source_listings
                (product_id, source_url, product_name, variation_names,
                 variation_images, description_images, item_date, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(product_id, source_url) DO UPDATE SET
                product_name = excluded.product_name,
                variation_names = excluded.variation_names,
                variation_images = excluded.variation_images,
                description_images = excluded.description_images,
                item_date = excluded.item_date,
                updated_at = excluded.updated_at",
            params![
                record.product_id,
                record.source_url,
                record.name,
                variation_names,
                variation_images,
                description_images,
                record.item_date.map(|d| d.to_string()),
                now,
            ],
        )?;
        info!(
            "stored source listing for product {} ({})",
            record.product_id,
            record.source_url.as_deref().unwrap_or("?")
        );
        Ok(affected)
    }

    /// Count of distinct source rows for a product (multi-source path).
    pub fn source_listing_count(&self, product_id: i64) -> Result<i64, StoreError> {
        let count = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM source_listings WHERE product_id = ?1",
                params![product_id],
                |row| row.get(0),
            )
            .optional()?
            .unwrap_or(0);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DescriptionBlock, DescriptionContent};

    fn record(product_id: i64, source_url: Option<&str>, hero: &str) -> ProductRecord {
        ProductRecord {
            product_id,
            name: "测试产品".into(),
            source_url: source_url.map(str::to_string),
            gallery_images: vec![hero.to_string(), "https://img/2.jpg".to_string()],
            variation_names: vec!["Red - S".into(), "Blue".into()],
            variation_images: vec![Some("https://img/red.jpg".into()), None],
            description: DescriptionContent {
                blocks: vec![
                    DescriptionBlock::Text("intro".into()),
                    DescriptionBlock::Image("https://img/d1.jpg".into()),
                ],
            },
            item_date: NaiveDate::from_ymd_opt(2025, 11, 3),
        }
    }

    #[test]
    fn upsert_product_overwrites_on_second_write() {
        let mut store = ListingStore::open_in_memory().unwrap();
        store
            .upsert_product(&record(7, None, "https://img/old.jpg"))
            .unwrap();
        store
            .upsert_product(&record(7, None, "https://img/new.jpg"))
            .unwrap();

        let hero: String = store
            .conn
            .query_row(
                "SELECT hero_image FROM listing_products WHERE product_id = 7",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(hero, "https://img/new.jpg");

        let count: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM listing_products", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn variation_rows_are_positional_and_rewritten() {
        let mut store = ListingStore::open_in_memory().unwrap();
        store
            .upsert_product(&record(7, None, "https://img/h.jpg"))
            .unwrap();

        let rows: Vec<(i64, String, Option<String>)> = store
            .conn
            .prepare(
                "SELECT sort_order, name, image FROM listing_variations
                 WHERE product_id = 7 ORDER BY sort_order",
            )
            .unwrap()
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            (0, "Red - S".into(), Some("https://img/red.jpg".into()))
        );
        assert_eq!(rows[1], (1, "Blue".into(), None));
    }

    #[test]
    fn source_listings_key_one_row_per_source_url() {
        let mut store = ListingStore::open_in_memory().unwrap();
        store
            .upsert_source_listing(&record(9, Some("https://d.1688.com/offer/1.html"), "h"))
            .unwrap();
        store
            .upsert_source_listing(&record(9, Some("https://d.1688.com/offer/2.html"), "h"))
            .unwrap();
        // Same source again overwrites instead of duplicating.
        store
            .upsert_source_listing(&record(9, Some("https://d.1688.com/offer/2.html"), "h"))
            .unwrap();

        assert_eq!(store.source_listing_count(9).unwrap(), 2);
    }

    #[test]
    fn pending_new_products_exclude_already_scraped() {
        let mut store = ListingStore::open_in_memory().unwrap();
        let scraped = PendingItem {
            product_id: 1,
            name: "done".into(),
            variation_names: vec![],
            reference_url: None,
            launch_type: LaunchType::NewProduct,
            item_date: None,
        };
        let fresh = PendingItem {
            product_id: 2,
            name: "todo".into(),
            variation_names: vec!["Red".into()],
            reference_url: Some("https://d.1688.com/offer/2.html".into()),
            launch_type: LaunchType::NewProduct,
            item_date: None,
        };
        store.queue_item(&scraped).unwrap();
        store.queue_item(&fresh).unwrap();
        store
            .upsert_product(&record(1, None, "https://img/h.jpg"))
            .unwrap();

        let pending = store.pending_items(LaunchType::NewProduct).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].product_id, 2);
        assert_eq!(pending[0].variation_names, vec!["Red".to_string()]);
        assert_eq!(
            pending[0].reference_url.as_deref(),
            Some("https://d.1688.com/offer/2.html")
        );
    }

    #[test]
    fn item_dates_round_trip() {
        let mut store = ListingStore::open_in_memory().unwrap();
        let item = PendingItem {
            product_id: 3,
            name: "dated".into(),
            variation_names: vec![],
            reference_url: None,
            launch_type: LaunchType::NewVariation,
            item_date: NaiveDate::from_ymd_opt(2025, 11, 3),
        };
        store.queue_item(&item).unwrap();
        let pending = store.pending_items(LaunchType::NewVariation).unwrap();
        assert_eq!(pending[0].item_date, NaiveDate::from_ymd_opt(2025, 11, 3));
    }
}
