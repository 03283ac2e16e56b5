//! HTTP client for upstream requests
//!
//! [`HttpFetch`] is the seam between the pipeline and the network: the
//! crawler and price enricher only ever see the trait, so tests and the
//! response cache can stand in for the real client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

use crate::infrastructure::config::CrawlerConfig;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("Request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Request to {url} returned an empty body")]
    EmptyBody { url: String },
}

/// Status and body of a completed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait HttpFetch: Send + Sync {
    /// Perform a GET request. Non-2xx responses are returned, not errors.
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError>;

    /// GET `url` and return the body of a successful, non-empty response
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self.get(url).await?;
        if !response.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status,
            });
        }
        if response.body.is_empty() {
            return Err(FetchError::EmptyBody {
                url: url.to_string(),
            });
        }
        Ok(response.body)
    }
}

/// Configuration for HTTP client behavior
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout_seconds: u64,
    pub user_agent: String,
    /// Minimum delay between the start of two requests
    pub request_delay: Duration,
}

impl HttpClientConfig {
    pub fn from_crawler_config(config: &CrawlerConfig) -> Self {
        Self {
            timeout_seconds: config.request_timeout_seconds,
            user_agent: config.user_agent.clone(),
            request_delay: Duration::from_millis(config.request_delay_ms),
        }
    }
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self::from_crawler_config(&CrawlerConfig::default())
    }
}

/// reqwest-backed client that spaces requests by the configured delay
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
    next_request_at: Arc<Mutex<Option<Instant>>>,
}

impl HttpClient {
    pub fn with_config(config: HttpClientConfig) -> anyhow::Result<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(&config.user_agent)
            .cookie_store(true)
            .gzip(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            client,
            config,
            next_request_at: Arc::new(Mutex::new(None)),
        })
    }

    async fn wait_for_turn(&self) {
        let mut next = self.next_request_at.lock().await;
        if let Some(at) = *next {
            sleep_until(at).await;
        }
        *next = Some(Instant::now() + self.config.request_delay);
    }
}

#[async_trait]
impl HttpFetch for HttpClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        self.wait_for_turn().await;
        debug!("GET {}", url);

        let transport = |e: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        };
        let response = self.client.get(url).send().await.map_err(transport)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport)?;
        if !(200..300).contains(&status) {
            warn!("GET {} returned HTTP {}", url, status);
        }
        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticFetcher(HttpResponse);

    #[async_trait]
    impl HttpFetch for StaticFetcher {
        async fn get(&self, _url: &str) -> Result<HttpResponse, FetchError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_fetch_text_rejects_error_status_and_empty_body() {
        let not_found = StaticFetcher(HttpResponse {
            status: 404,
            body: "missing".to_string(),
        });
        assert!(matches!(
            not_found.fetch_text("http://x").await,
            Err(FetchError::Status { status: 404, .. })
        ));

        let empty = StaticFetcher(HttpResponse::ok(""));
        assert!(matches!(
            empty.fetch_text("http://x").await,
            Err(FetchError::EmptyBody { .. })
        ));

        let ok = StaticFetcher(HttpResponse::ok("<html/>"));
        assert_eq!(ok.fetch_text("http://x").await.unwrap(), "<html/>");
    }

    #[test]
    fn test_client_builds_from_defaults() {
        let client = HttpClient::with_config(HttpClientConfig::default()).unwrap();
        assert_eq!(client.config.timeout_seconds, 30);
    }
}
