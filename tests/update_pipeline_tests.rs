//! Full update cycle against a fake chart site and an in-memory database

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cpu_cooler_chart::application::{AppState, UpdateOutcome};
use cpu_cooler_chart::infrastructure::config::{AppConfig, CacheBackend};
use cpu_cooler_chart::infrastructure::{
    DatabaseConnection, EntityKind, FetchError, HttpFetch, HttpResponse,
};
use tokio_test::assert_ok;

/// Serves the same table rows on every chart page. `None` simulates an outage.
struct FakeChartSite {
    rows: Mutex<Option<Vec<(&'static str, &'static str)>>>,
    fan: Mutex<&'static str>,
}

impl FakeChartSite {
    fn new(rows: Vec<(&'static str, &'static str)>) -> Arc<Self> {
        Arc::new(Self {
            rows: Mutex::new(Some(rows)),
            fan: Mutex::new("120/25T"),
        })
    }

    fn set_rows(&self, rows: Option<Vec<(&'static str, &'static str)>>) {
        *self.rows.lock().unwrap() = rows;
    }

    fn set_fan(&self, fan: &'static str) {
        *self.fan.lock().unwrap() = fan;
    }
}

#[async_trait]
impl HttpFetch for FakeChartSite {
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        let Some(rows) = self.rows.lock().unwrap().clone() else {
            return Err(FetchError::Transport {
                url: url.to_string(),
                message: "connection refused".to_string(),
            });
        };
        let fan = *self.fan.lock().unwrap();
        let noise_cell = if url.contains("dd=1&") { "<td>40.5</td>" } else { "" };
        let body: String = rows
            .iter()
            .map(|(maker, model)| {
                format!(
                    r#"<tr class="tdm">
                         <td>{maker}<br>{model}</td>
                         <td>125 x 75 x 150<br>Tower / 620g</td>
                         <td>{fan}<br>1200 rpm</td>
                         {noise_cell}
                         <td><font>40.0</font><font>30.0</font></td>
                       </tr>"#
                )
            })
            .collect();
        Ok(HttpResponse::ok(format!(
            r#"<table width="680" bordercolorlight="black">{body}</table>"#
        )))
    }
}

async fn app_state(site: Arc<FakeChartSite>) -> AppState {
    let mut config = AppConfig::default();
    config.cache.backend = CacheBackend::Memory;
    config.crawler.chart_url = "http://chart.test/?dd={noise}&test={power}".to_string();

    let database = DatabaseConnection::in_memory().await.unwrap();
    database.migrate().await.unwrap();
    AppState::with_fetcher(config, database, site).unwrap()
}

async fn counts(state: &AppState) -> [i64; 4] {
    let repository = state.repository();
    let mut counts = [0; 4];
    for (slot, kind) in counts.iter_mut().zip(EntityKind::ALL) {
        *slot = repository.count(kind).await.unwrap();
    }
    counts
}

#[tokio::test]
async fn test_first_update_populates_storage() {
    let site = FakeChartSite::new(vec![("Zalman", "CNPS10X"), ("Deepcool", "Gammaxx 400")]);
    let state = app_state(site).await;

    let summary = match assert_ok!(state.update_service().update_data(false).await) {
        UpdateOutcome::Completed(summary) => summary,
        other => panic!("expected a completed update, got {other:?}"),
    };
    assert_eq!(summary.fetched, 28);
    assert_eq!(summary.kept, 28);
    assert_eq!(summary.reconcile.created.total(), 2 + 2 + 2 + 28);
    assert_eq!(counts(&state).await, [2, 2, 2, 28]);
    assert!(state.scheduler().last_updated().await.unwrap().is_some());
}

#[tokio::test]
async fn test_second_update_waits_for_interval_unless_forced() {
    let site = FakeChartSite::new(vec![("Zalman", "CNPS10X")]);
    let state = app_state(site).await;
    let service = state.update_service();

    assert!(matches!(
        service.update_data(false).await.unwrap(),
        UpdateOutcome::Completed(_)
    ));
    assert!(matches!(
        service.update_data(false).await.unwrap(),
        UpdateOutcome::UpToDate
    ));

    let UpdateOutcome::Completed(summary) = service.update_data(true).await.unwrap() else {
        panic!("forced update should run");
    };
    assert_eq!(summary.reconcile.created.total(), 0);
    assert_eq!(summary.reconcile.deleted.total(), 0);
    assert_eq!(counts(&state).await, [1, 1, 1, 14]);
}

#[tokio::test]
async fn test_failed_fetch_keeps_previous_data() {
    let site = FakeChartSite::new(vec![("Zalman", "CNPS10X")]);
    let state = app_state(site.clone()).await;
    let service = state.update_service();
    service.update_data(false).await.unwrap();

    state.cache.clear().await.unwrap();
    site.set_rows(None);

    let message = match assert_ok!(service.update_data(true).await) {
        UpdateOutcome::Failed(message) => message,
        other => panic!("expected a failed update, got {other:?}"),
    };
    assert_eq!(message, "There was an error during updating data.");
    assert_eq!(counts(&state).await, [1, 1, 1, 14]);
    assert!(!state.scheduler().is_update_running().await.unwrap());
    assert!(state.scheduler().needs_update().await.unwrap());
}

#[tokio::test]
async fn test_unparseable_fan_cells_keep_previous_data() {
    let site = FakeChartSite::new(vec![("Zalman", "CNPS10X")]);
    let state = app_state(site.clone()).await;
    let service = state.update_service();
    service.update_data(false).await.unwrap();
    assert_eq!(counts(&state).await, [1, 1, 1, 14]);

    state.cache.clear().await.unwrap();
    site.set_fan("120mm fan");

    let message = match assert_ok!(service.update_data(true).await) {
        UpdateOutcome::Failed(message) => message,
        other => panic!("expected a failed update, got {other:?}"),
    };
    assert_eq!(message, "There was an error during updating data.");
    assert_eq!(counts(&state).await, [1, 1, 1, 14]);
    assert!(!state.scheduler().is_update_running().await.unwrap());
}

#[tokio::test]
async fn test_concurrent_updates_run_one_cycle() {
    let site = FakeChartSite::new(vec![("Zalman", "CNPS10X")]);
    let state = app_state(site).await;
    let service = state.update_service();

    let (first, second) = tokio::join!(service.update_data(true), service.update_data(true));
    let outcomes = [assert_ok!(first), assert_ok!(second)];
    let completed = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, UpdateOutcome::Completed(_)))
        .count();
    let running = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, UpdateOutcome::AlreadyRunning))
        .count();
    assert_eq!((completed, running), (1, 1));
    assert_eq!(counts(&state).await, [1, 1, 1, 14]);
    assert!(!state.scheduler().is_update_running().await.unwrap());
}

#[tokio::test]
async fn test_models_missing_upstream_are_removed() {
    let site = FakeChartSite::new(vec![("Zalman", "CNPS10X"), ("Deepcool", "Gammaxx 400")]);
    let state = app_state(site.clone()).await;
    let service = state.update_service();
    service.update_data(false).await.unwrap();

    state.cache.clear().await.unwrap();
    site.set_rows(Some(vec![("Zalman", "CNPS10X")]));

    let UpdateOutcome::Completed(summary) = service.update_data(true).await.unwrap() else {
        panic!("forced update should run");
    };
    assert_eq!(summary.reconcile.deleted.makers, 1);
    assert_eq!(summary.reconcile.deleted.heatsinks, 1);
    assert_eq!(counts(&state).await, [1, 1, 1, 14]);

    let makers = state.repository().list_makers().await.unwrap();
    assert_eq!(makers.len(), 1);
    assert_eq!(makers[0].name, "Zalman");
}
