use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::BotError;
use crate::store::KvStore;

/// The whole catalog lives under one cache key.
const CACHE_KEY: &str = "catalog:v1";

/// One quote in the catalog. `link` is a path relative to the site base URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteEntry {
    pub id: String,
    pub quote: String,
    pub title: String,
    pub link: String,
}

pub type Catalog = Vec<QuoteEntry>;

/// Where quotes come from.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn catalog(&self) -> Result<Catalog, BotError>;
}

/// Read-through cached feed: the catalog is fetched from the content API and
/// kept in the durable store until its TTL passes.
pub struct CachedQuoteFeed {
    client: reqwest::Client,
    store: KvStore,
    feed_url: String,
    cache_ttl: Duration,
}

impl CachedQuoteFeed {
    pub fn new(store: KvStore, feed_url: String, cache_ttl: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            store,
            feed_url,
            cache_ttl,
        }
    }

    async fn fetch(&self) -> Result<Catalog, BotError> {
        debug!("Fetching quote catalog from: {}", self.feed_url);

        let response = self
            .client
            .get(&self.feed_url)
            .send()
            .await
            .map_err(|e| BotError::Fetch(format!("request to {} failed: {}", self.feed_url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(BotError::Fetch(format!(
                "feed returned {}: {}",
                status, error_body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| BotError::Fetch(format!("feed payload did not parse: {e}")))
    }
}

#[async_trait]
impl QuoteSource for CachedQuoteFeed {
    async fn catalog(&self) -> Result<Catalog, BotError> {
        if let Some(bytes) = self.store.get(CACHE_KEY).await? {
            let catalog: Catalog = serde_json::from_slice(&bytes)
                .map_err(|e| BotError::Storage(format!("cached catalog is unreadable: {e}")))?;
            debug!("Catalog served from cache ({} entries)", catalog.len());
            return Ok(catalog);
        }

        let catalog = self.fetch().await?;

        let bytes = serde_json::to_vec(&catalog)
            .map_err(|e| BotError::Storage(format!("failed to encode catalog: {e}")))?;
        self.store.put(CACHE_KEY, &bytes, Some(self.cache_ttl)).await?;

        info!("Catalog fetched and cached ({} entries)", catalog.len());
        Ok(catalog)
    }
}
