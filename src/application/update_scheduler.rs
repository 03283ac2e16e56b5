//! Decides whether an update cycle should run and keeps cycles from overlapping
//!
//! Both pieces of state live in the cache: `last_updated` holds the time of
//! the last successful cycle and expires after the update interval, and
//! `update_running` is set while a cycle runs. The running flag is taken
//! with an atomic `add`, so with a shared cache backend at most one cycle
//! runs across all processes.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::Serialize;
use tracing::{info, warn};

use crate::infrastructure::cache::{Cache, CacheResult};
use crate::infrastructure::config::UpdateConfig;

pub const LAST_UPDATED_KEY: &str = "last_updated";
pub const UPDATE_RUNNING_KEY: &str = "update_running";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateState {
    Idle,
    Needed,
    Running,
}

impl UpdateState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Needed => "needed",
            Self::Running => "running",
        }
    }
}

/// Result of [`UpdateScheduler::run_exclusive`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleOutcome<T> {
    /// Updated recently; the job did not run
    UpToDate,
    /// Another caller holds the running flag; the job did not run
    AlreadyRunning,
    Ran(T),
}

#[derive(Clone)]
pub struct UpdateScheduler {
    cache: Arc<dyn Cache>,
    interval: Duration,
    lock_timeout: Duration,
}

impl UpdateScheduler {
    pub fn new(cache: Arc<dyn Cache>, config: &UpdateConfig) -> Self {
        Self {
            cache,
            interval: config.interval(),
            lock_timeout: config.lock_timeout(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Time of the last successful cycle, if it has not expired yet
    pub async fn last_updated(&self) -> CacheResult<Option<DateTime<Utc>>> {
        let Some(value) = self.cache.get(LAST_UPDATED_KEY).await? else {
            return Ok(None);
        };
        match DateTime::parse_from_rfc3339(&value) {
            Ok(at) => Ok(Some(at.with_timezone(&Utc))),
            Err(e) => {
                warn!("Ignoring malformed {} value {:?}: {}", LAST_UPDATED_KEY, value, e);
                Ok(None)
            }
        }
    }

    pub async fn needs_update(&self) -> CacheResult<bool> {
        let Some(last_updated) = self.last_updated().await? else {
            return Ok(true);
        };
        let elapsed = Utc::now().signed_duration_since(last_updated);
        Ok(elapsed.to_std().is_ok_and(|elapsed| elapsed > self.interval))
    }

    pub async fn is_update_running(&self) -> CacheResult<bool> {
        Ok(self.cache.get(UPDATE_RUNNING_KEY).await?.is_some())
    }

    pub async fn state(&self) -> CacheResult<UpdateState> {
        if self.is_update_running().await? {
            Ok(UpdateState::Running)
        } else if self.needs_update().await? {
            Ok(UpdateState::Needed)
        } else {
            Ok(UpdateState::Idle)
        }
    }

    /// Drop expired entries from the shared cache, fetched pages included
    pub async fn purge_expired(&self) -> CacheResult<u64> {
        self.cache.purge_expired().await
    }

    /// Set the running flag unless it is already set. The flag expires after
    /// the lock timeout in case the holder never releases it.
    pub async fn try_acquire(&self) -> CacheResult<bool> {
        self.cache
            .add(UPDATE_RUNNING_KEY, &Utc::now().to_rfc3339(), Some(self.lock_timeout))
            .await
    }

    pub async fn release(&self) -> CacheResult<()> {
        self.cache.delete(UPDATE_RUNNING_KEY).await?;
        Ok(())
    }

    /// Record a successful cycle
    pub async fn mark_updated(&self) -> CacheResult<()> {
        self.cache
            .set(LAST_UPDATED_KEY, &Utc::now().to_rfc3339(), Some(self.interval))
            .await
    }

    /// Run `job` if an update is due (or `force` is set) and no other cycle
    /// is running.
    ///
    /// The running flag is released however the job ends, including by
    /// panicking; the panic is then resumed.
    pub async fn run_exclusive<T, F, Fut>(&self, force: bool, job: F) -> CacheResult<ScheduleOutcome<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if !force && !self.needs_update().await? {
            info!("Recently updated; nothing to do");
            return Ok(ScheduleOutcome::UpToDate);
        }
        if !self.try_acquire().await? {
            info!("Update is in progress in another process");
            return Ok(ScheduleOutcome::AlreadyRunning);
        }

        let result = AssertUnwindSafe(job()).catch_unwind().await;
        if let Err(e) = self.release().await {
            warn!("Failed to clear the update running flag: {}", e);
        }
        match result {
            Ok(value) => Ok(ScheduleOutcome::Ran(value)),
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::cache::MemoryCache;

    fn scheduler() -> UpdateScheduler {
        UpdateScheduler::new(Arc::new(MemoryCache::new("test:")), &UpdateConfig::default())
    }

    #[tokio::test]
    async fn test_state_transitions() {
        let scheduler = scheduler();
        assert_eq!(scheduler.state().await.unwrap(), UpdateState::Needed);

        assert!(scheduler.try_acquire().await.unwrap());
        assert_eq!(scheduler.state().await.unwrap(), UpdateState::Running);
        assert!(!scheduler.try_acquire().await.unwrap());

        scheduler.mark_updated().await.unwrap();
        scheduler.release().await.unwrap();
        assert_eq!(scheduler.state().await.unwrap(), UpdateState::Idle);
        assert_eq!(UpdateState::Idle.as_str(), "idle");
        assert!(scheduler.last_updated().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_run_exclusive_respects_interval_and_force() {
        let scheduler = scheduler();
        let outcome = scheduler
            .run_exclusive(false, || async { scheduler.mark_updated().await.unwrap() })
            .await
            .unwrap();
        assert_eq!(outcome, ScheduleOutcome::Ran(()));
        assert!(!scheduler.is_update_running().await.unwrap());

        let outcome = scheduler.run_exclusive(false, || async { 1 }).await.unwrap();
        assert_eq!(outcome, ScheduleOutcome::UpToDate);

        let outcome = scheduler.run_exclusive(true, || async { 2 }).await.unwrap();
        assert_eq!(outcome, ScheduleOutcome::Ran(2));
    }

    #[tokio::test]
    async fn test_concurrent_trigger_reports_already_running() {
        let scheduler = scheduler();
        assert!(scheduler.try_acquire().await.unwrap());

        let outcome = scheduler.run_exclusive(true, || async { "ran" }).await.unwrap();
        assert_eq!(outcome, ScheduleOutcome::AlreadyRunning);
        // The flag still belongs to the first holder
        assert!(scheduler.is_update_running().await.unwrap());
    }

    #[tokio::test]
    async fn test_flag_is_released_when_job_panics() {
        let scheduler = scheduler();
        let result = AssertUnwindSafe(scheduler.run_exclusive(true, || async {
            panic!("boom");
        }))
        .catch_unwind()
        .await;
        assert!(result.is_err());
        assert!(!scheduler.is_update_running().await.unwrap());
    }
}
