//! One update cycle: repair, crawl, filter, reconcile, price, record

use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::chart_crawler::ChartCrawler;
use super::consistency::{ensure_consistency, fix_existing_data, RepairReport};
use super::price_enricher::{PriceEnricher, PriceReport};
use super::reconciler::{ReconcileReport, Reconciler};
use super::update_scheduler::{ScheduleOutcome, UpdateScheduler};
use crate::infrastructure::cache::CacheError;
use crate::infrastructure::parsing::WarningLog;

#[derive(Error, Debug)]
pub enum UpdateError {
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("There was an error during updating data.")]
    NoData,
}

/// What a completed cycle did
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateSummary {
    pub fetched: usize,
    pub kept: usize,
    pub repair: RepairReport,
    pub reconcile: ReconcileReport,
    pub prices: PriceReport,
    pub warnings: usize,
}

#[derive(Debug, Clone)]
pub enum UpdateOutcome {
    UpToDate,
    AlreadyRunning,
    Completed(UpdateSummary),
    /// The cycle ran and failed; storage holds the last committed phase
    Failed(String),
}

pub struct UpdateService {
    pool: SqlitePool,
    crawler: ChartCrawler,
    enricher: PriceEnricher,
    scheduler: UpdateScheduler,
}

impl UpdateService {
    pub fn new(
        pool: SqlitePool,
        crawler: ChartCrawler,
        enricher: PriceEnricher,
        scheduler: UpdateScheduler,
    ) -> Self {
        Self {
            pool,
            crawler,
            enricher,
            scheduler,
        }
    }

    pub fn scheduler(&self) -> &UpdateScheduler {
        &self.scheduler
    }

    pub fn enricher(&self) -> &PriceEnricher {
        &self.enricher
    }

    /// Run an update cycle if one is due (or `force` is set) and none is running.
    ///
    /// Only a failure to read or write the scheduler state is returned as an
    /// error; a failed cycle is reported as [`UpdateOutcome::Failed`].
    pub async fn update_data(&self, force: bool) -> Result<UpdateOutcome, UpdateError> {
        let outcome = self.scheduler.run_exclusive(force, || self.run_cycle()).await?;
        Ok(match outcome {
            ScheduleOutcome::UpToDate => UpdateOutcome::UpToDate,
            ScheduleOutcome::AlreadyRunning => UpdateOutcome::AlreadyRunning,
            ScheduleOutcome::Ran(Ok(summary)) => UpdateOutcome::Completed(summary),
            ScheduleOutcome::Ran(Err(e)) => {
                error!("Update failed: {}", e);
                UpdateOutcome::Failed(e.to_string())
            }
        })
    }

    async fn run_cycle(&self) -> Result<UpdateSummary, UpdateError> {
        match self.scheduler.purge_expired().await {
            Ok(0) => {}
            Ok(purged) => debug!("Purged {} expired cache entries", purged),
            Err(e) => warn!("Failed to purge expired cache entries: {}", e),
        }

        let mut summary = UpdateSummary {
            repair: fix_existing_data(&self.pool).await?,
            ..UpdateSummary::default()
        };

        let mut warnings = WarningLog::new();
        let records = self.crawler.fetch_measurement_data(&mut warnings).await;
        summary.fetched = records.len();

        // Reconciling an empty batch would delete every stored row
        let records = ensure_consistency(records, &mut warnings);
        if records.is_empty() {
            warn!("There was an error during updating data.");
            return Err(UpdateError::NoData);
        }
        summary.kept = records.len();
        summary.warnings = warnings.len();

        summary.reconcile = Reconciler::new(self.pool.clone()).reconcile(&records).await?;

        // Prices are best effort; measurement data is already committed
        match self.enricher.update_prices().await {
            Ok(report) => summary.prices = report,
            Err(e) => error!("An error occurred while updating price data: {}", e),
        }

        self.scheduler.mark_updated().await?;
        info!("Successfully updated data from remote sources");
        Ok(summary)
    }
}
