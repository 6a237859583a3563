//! Proxy inventory loading
//!
//! Client for a Webshare-style listing service. The loader only produces
//! inventory entries; the pool decides what enters the store.

use futures::future::try_join_all;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::config::InventoryConfig;
use crate::error::{PalisadeError, Result};
use crate::models::ProxyId;

/// Page size the listing service serves
const PAGE_SIZE: usize = 250;

/// One proxy as advertised by the inventory service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryEntry {
    pub username: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub valid: bool,
}

impl InventoryEntry {
    /// Build the canonical identifier for this entry.
    pub fn canonical_id(&self) -> Result<ProxyId> {
        ProxyId::from_parts(&self.username, &self.password, &self.host, self.port)
    }
}

// Wire format of the listing endpoint.

#[derive(Debug, Deserialize)]
struct ListingPage {
    results: Vec<ListingEntry>,
}

#[derive(Debug, Deserialize)]
struct ListingEntry {
    username: String,
    password: String,
    proxy_address: String,
    ports: ListingPorts,
    valid: bool,
}

#[derive(Debug, Deserialize)]
struct ListingPorts {
    http: u16,
}

impl From<ListingEntry> for InventoryEntry {
    fn from(entry: ListingEntry) -> Self {
        InventoryEntry {
            username: entry.username,
            password: entry.password,
            host: entry.proxy_address,
            port: entry.ports.http,
            valid: entry.valid,
        }
    }
}

/// Inventory listing client
#[derive(Debug)]
pub struct InventoryLoader {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
    amount: usize,
}

impl InventoryLoader {
    /// Create a loader for the configured listing service.
    pub fn new(config: &InventoryConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(PalisadeError::InvalidConfig(
                "inventory API key is not set".into(),
            ));
        }

        let base_url = Url::parse(&config.base_url).map_err(|e| {
            PalisadeError::InvalidConfig(format!("inventory URL is invalid: {}", e))
        })?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(InventoryLoader {
            client,
            base_url,
            api_key: config.api_key.clone(),
            amount: config.amount,
        })
    }

    /// Fetch the configured amount of inventory, all pages concurrently.
    ///
    /// Returns entries as advertised, including invalid ones; filtering is
    /// the consumer's decision.
    pub async fn fetch_all(&self) -> Result<Vec<InventoryEntry>> {
        let pages = self.amount.div_ceil(PAGE_SIZE).max(1);

        let fetched = try_join_all((1..=pages).map(|page| self.fetch_page(page))).await?;
        let entries: Vec<InventoryEntry> = fetched.into_iter().flatten().collect();

        info!(count = entries.len(), pages, "Fetched proxy inventory");
        Ok(entries)
    }

    async fn fetch_page(&self, page: usize) -> Result<Vec<InventoryEntry>> {
        let url = Url::parse_with_params(
            self.base_url.as_str(),
            &[
                ("page_size", PAGE_SIZE.to_string()),
                ("page", page.to_string()),
            ],
        )
        .map_err(|e| PalisadeError::InvalidConfig(format!("inventory URL is invalid: {}", e)))?;

        debug!(page, "Fetching inventory page");

        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, self.api_key.as_str())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PalisadeError::InventoryFetch(format!(
                "listing request for page {} returned {}",
                page,
                response.status()
            )));
        }

        let listing: ListingPage = response.json().await?;

        Ok(listing.results.into_iter().map(InventoryEntry::from).collect())
    }
}
