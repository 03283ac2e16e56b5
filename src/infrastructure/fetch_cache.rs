//! Response cache in front of an [`HttpFetch`]
//!
//! Successful bodies are kept for a little less than the update interval, so
//! a failed cycle can be retried without hammering upstream while the next
//! scheduled cycle still sees fresh data.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::cache::Cache;
use super::simple_http_client::{FetchError, HttpFetch, HttpResponse};

/// Cache key for a URL
pub fn fetch_cache_key(url: &str) -> String {
    format!("fetch:{}", blake3::hash(url.as_bytes()).to_hex())
}

pub struct CachedFetcher {
    inner: Arc<dyn HttpFetch>,
    cache: Arc<dyn Cache>,
    ttl: Duration,
}

impl CachedFetcher {
    pub fn new(inner: Arc<dyn HttpFetch>, cache: Arc<dyn Cache>, ttl: Duration) -> Self {
        Self { inner, cache, ttl }
    }
}

#[async_trait]
impl HttpFetch for CachedFetcher {
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        let key = fetch_cache_key(url);
        match self.cache.get(&key).await {
            Ok(Some(body)) if !body.is_empty() => {
                debug!("Cache hit for {}", url);
                return Ok(HttpResponse::ok(body));
            }
            Ok(_) => {}
            Err(e) => warn!("Failed to read cached response for {}: {}", url, e),
        }

        let response = self.inner.get(url).await?;
        if response.is_success() && !response.body.is_empty() {
            if let Err(e) = self.cache.set(&key, &response.body, Some(self.ttl)).await {
                warn!("Failed to cache response for {}: {}", url, e);
            }
        }
        Ok(response)
    }
}
