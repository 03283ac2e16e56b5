// API server implementation using actix-web

use crate::api::routes;
use crate::application::AppState;
use crate::infrastructure::config::ServerConfig;
use actix_web::http::header;
use actix_web::middleware::{Compress, DefaultHeaders, Logger};
use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};

pub struct ApiServer {
    pub host: String,
    pub port: u16,
    pub allow_origin: Option<String>,
}

impl ApiServer {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            allow_origin: config.access_control_allow_origin.clone(),
        }
    }

    /// Start the HTTP server
    pub async fn run(self, state: AppState) -> Result<()> {
        let bind_addr = format!("{}:{}", self.host, self.port);

        tracing::info!(
            host = %self.host,
            port = %self.port,
            remote_update = state.config.server.allow_remote_update,
            "Starting cpucoolerchart API server"
        );

        let state = web::Data::new(state);
        let allow_origin = self.allow_origin.clone();

        HttpServer::new(move || {
            App::new()
                .app_data(state.clone())
                .wrap(Logger::default())
                .wrap(Compress::default())
                .wrap(cors_headers(allow_origin.as_deref()))
                .configure(routes::configure_routes)
        })
        .bind(&bind_addr)
        .with_context(|| format!("Failed to bind to {}", bind_addr))?
        .run()
        .await
        .context("HTTP server error")?;

        Ok(())
    }
}

/// `Access-Control-Allow-Origin` on every response when an origin is configured
pub fn cors_headers(allow_origin: Option<&str>) -> DefaultHeaders {
    match allow_origin {
        Some(origin) => {
            DefaultHeaders::new().add((header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.to_string()))
        }
        None => DefaultHeaders::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::{
        MSG_ALREADY_RUNNING, MSG_NOT_CONFIGURED, MSG_STARTED, MSG_UP_TO_DATE,
    };
    use crate::application::Reconciler;
    use crate::domain::cooler_record::fixtures::record;
    use crate::infrastructure::config::{AppConfig, CacheBackend};
    use crate::infrastructure::database_connection::DatabaseConnection;
    use crate::infrastructure::simple_http_client::{FetchError, HttpFetch, HttpResponse};
    use actix_web::test;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::Arc;

    struct OfflineFetcher;

    #[async_trait]
    impl HttpFetch for OfflineFetcher {
        async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
            Err(FetchError::Transport {
                url: url.to_string(),
                message: "offline".to_string(),
            })
        }
    }

    async fn state_with(configure: impl FnOnce(&mut AppConfig)) -> web::Data<AppState> {
        let mut config = AppConfig::default();
        config.cache.backend = CacheBackend::Memory;
        configure(&mut config);

        let database = DatabaseConnection::in_memory().await.unwrap();
        database.migrate().await.unwrap();
        let state = AppState::with_fetcher(config, database, Arc::new(OfflineFetcher)).unwrap();
        web::Data::new(state)
    }

    macro_rules! app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data($state.clone())
                    .wrap(cors_headers($state.config.server.access_control_allow_origin.as_deref()))
                    .configure(routes::configure_routes),
            )
            .await
        };
    }

    async fn post_update(state: &web::Data<AppState>) -> Value {
        let app = app!(state);
        let req = test::TestRequest::post().uri("/update").to_request();
        test::call_and_read_body_json(&app, req).await
    }

    #[actix_web::test]
    async fn test_listings_carry_count_and_cors_header() {
        let state = state_with(|_| {}).await;
        Reconciler::new(state.database.pool().clone())
            .reconcile(&[
                record("Zalman", "cnps10x", 100, 150),
                record("Deepcool", "Assassin", 100, 150),
            ])
            .await
            .unwrap();

        let app = app!(state);
        let req = test::TestRequest::get().uri("/heatsinks").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        assert_eq!(
            resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["count"], 2);
        assert_eq!(body["items"][0]["name"], "Assassin");
        assert_eq!(body["items"][1]["name"], "cnps10x");

        let req = test::TestRequest::get().uri("/measurements").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["count"], 2);
    }

    #[actix_web::test]
    async fn test_all_returns_csv_attachment() {
        let state = state_with(|_| {}).await;
        Reconciler::new(state.database.pool().clone())
            .reconcile(&[record("Zalman", "CNPS10X", 100, 150)])
            .await
            .unwrap();

        let app = app!(state);
        let req = test::TestRequest::get().uri("/all").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        assert_eq!(
            resp.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            "filename=\"cooler.csv\""
        );

        let body = test::read_body(resp).await;
        let text = std::str::from_utf8(&body).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("maker,model,width"));
        assert!(lines.next().unwrap().starts_with("Zalman,CNPS10X,125.0"));
    }

    #[actix_web::test]
    async fn test_update_not_configured() {
        let state = state_with(|config| config.server.allow_remote_update = false).await;
        assert_eq!(post_update(&state).await["msg"], MSG_NOT_CONFIGURED);
    }

    #[actix_web::test]
    async fn test_update_reports_scheduler_state() {
        let state = state_with(|_| {}).await;

        state.scheduler().try_acquire().await.unwrap();
        assert_eq!(post_update(&state).await["msg"], MSG_ALREADY_RUNNING);
        state.scheduler().release().await.unwrap();

        state.scheduler().mark_updated().await.unwrap();
        assert_eq!(post_update(&state).await["msg"], MSG_UP_TO_DATE);
    }

    #[actix_web::test]
    async fn test_update_starts_when_due() {
        let state = state_with(|_| {}).await;
        assert_eq!(post_update(&state).await["msg"], MSG_STARTED);
    }

    #[actix_web::test]
    async fn test_no_cors_header_without_origin() {
        let state = state_with(|config| config.server.access_control_allow_origin = None).await;
        let app = app!(state);
        let req = test::TestRequest::get().uri("/makers").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }
}
