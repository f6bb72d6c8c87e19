//! skuacquire - catalog data acquisition from anti-bot storefronts.
//!
//! Drives a single profile-backed Chromium session over CDP to extract
//! product catalog data (gallery images, variation preview images,
//! description content) from a dynamic, shadow-DOM-heavy storefront, and
//! forwards normalized records to a SQLite gateway. The session layer
//! tolerates silent logouts, browser crashes, lazy rendering, and markup
//! drift between product variants.

pub mod api;
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod extract;
pub mod js;
pub mod models;
pub mod navigation;
pub mod pacing;
pub mod repository;
pub mod session;
