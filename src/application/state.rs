//! Shared application state
//!
//! Wires the configured storage, cache backend and HTTP client into the
//! pipeline services. The CLI builds one per invocation; the API server
//! builds one at startup and shares it across workers.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use super::chart_crawler::ChartCrawler;
use super::price_enricher::PriceEnricher;
use super::update_scheduler::UpdateScheduler;
use super::update_service::UpdateService;
use crate::infrastructure::cache::{Cache, MemoryCache, SqliteCache};
use crate::infrastructure::config::{AppConfig, CacheBackend};
use crate::infrastructure::cooler_repository::CoolerRepository;
use crate::infrastructure::database_connection::DatabaseConnection;
use crate::infrastructure::fetch_cache::CachedFetcher;
use crate::infrastructure::simple_http_client::{HttpClient, HttpClientConfig, HttpFetch};

pub struct AppState {
    pub config: AppConfig,
    pub database: DatabaseConnection,
    pub cache: Arc<dyn Cache>,
    update_service: Arc<UpdateService>,
}

impl AppState {
    /// Connect to the configured database, create missing tables and build
    /// the services around a real HTTP client
    pub async fn initialize(config: AppConfig) -> Result<Self> {
        let database = DatabaseConnection::new(&config.database_url)
            .await
            .with_context(|| format!("Failed to open database {}", config.database_url))?;
        database.migrate().await.context("Failed to create tables")?;

        let client = HttpClient::with_config(HttpClientConfig::from_crawler_config(&config.crawler))?;
        Self::with_fetcher(config, database, Arc::new(client))
    }

    /// Build the services on an existing database with any upstream fetcher
    pub fn with_fetcher(
        config: AppConfig,
        database: DatabaseConnection,
        upstream: Arc<dyn HttpFetch>,
    ) -> Result<Self> {
        let cache: Arc<dyn Cache> = match config.cache.backend {
            CacheBackend::Sqlite => Arc::new(SqliteCache::new(
                database.pool().clone(),
                config.cache.key_prefix.clone(),
            )),
            CacheBackend::Memory => Arc::new(MemoryCache::new(config.cache.key_prefix.clone())),
        };

        let fetcher: Arc<dyn HttpFetch> = Arc::new(CachedFetcher::new(
            upstream,
            cache.clone(),
            config.update.fetch_cache_ttl(),
        ));
        let crawler = ChartCrawler::new(fetcher.clone(), config.crawler.chart_url.clone())
            .context("Failed to build the chart parser")?;
        let enricher = PriceEnricher::new(database.pool().clone(), fetcher, config.danawa.clone());
        let scheduler = UpdateScheduler::new(cache.clone(), &config.update);
        let update_service = Arc::new(UpdateService::new(
            database.pool().clone(),
            crawler,
            enricher,
            scheduler,
        ));

        info!("Application state initialized ({:?} cache)", config.cache.backend);
        Ok(Self {
            config,
            database,
            cache,
            update_service,
        })
    }

    pub fn repository(&self) -> CoolerRepository {
        CoolerRepository::new(self.database.pool().clone())
    }

    pub fn scheduler(&self) -> &UpdateScheduler {
        self.update_service.scheduler()
    }

    pub fn update_service(&self) -> Arc<UpdateService> {
        self.update_service.clone()
    }
}
