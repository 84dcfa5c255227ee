//! Catalog retrieval. Never fails: every error degrades to an empty catalog.

use std::sync::Arc;

use tracing::{error, info};

use crate::domain::CatalogEntry;
use crate::infrastructure::steam_api::{AppDataSource, parse_app_list};

pub struct CatalogFetcher {
    source: Arc<dyn AppDataSource>,
}

impl CatalogFetcher {
    pub fn new(source: Arc<dyn AppDataSource>) -> Self {
        Self { source }
    }

    pub async fn fetch(&self) -> Vec<CatalogEntry> {
        let body = match self.source.fetch_catalog().await {
            Ok(body) => body,
            Err(e) => {
                error!("❌ Failed to fetch the app catalog: {}", e);
                return Vec::new();
            }
        };

        match parse_app_list(&body) {
            Ok(entries) => {
                info!("📋 Catalog lists {} apps", entries.len());
                entries
            }
            Err(e) => {
                error!("❌ Could not decode the app catalog: {}", e);
                Vec::new()
            }
        }
    }
}
