//! Infrastructure layer: configuration, logging, storage, caching, HTTP and HTML parsing

pub mod cache;
pub mod config;
pub mod cooler_repository;
pub mod database_connection;
pub mod fetch_cache;
pub mod logging;
pub mod parsing;
pub mod parsing_error;
pub mod simple_http_client;

pub use cache::{Cache, CacheError, MemoryCache, SqliteCache};
pub use config::{AppConfig, CacheBackend};
pub use cooler_repository::{CoolerRepository, EntityKind, ExportRow};
pub use database_connection::DatabaseConnection;
pub use fetch_cache::CachedFetcher;
pub use logging::{init_logging, init_logging_with_config};
pub use parsing::{ChartTableParser, ParsingError, ParsingResult, WarningLog};
pub use simple_http_client::{FetchError, HttpClient, HttpFetch, HttpResponse};
