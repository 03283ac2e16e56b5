//! Application layer: the update pipeline and the services around it

pub mod chart_crawler;
pub mod consistency;
pub mod export;
pub mod price_enricher;
pub mod reconciler;
pub mod state;
pub mod update_scheduler;
pub mod update_service;

pub use chart_crawler::{ChartCrawler, CrawlError};
pub use consistency::{ensure_consistency, fix_existing_data, RepairReport};
pub use export::{export_data, render_delimited, ExportError};
pub use price_enricher::{PriceEnricher, PriceReport, ProductCandidates};
pub use reconciler::{EntityCounts, ReconcileReport, Reconciler};
pub use state::AppState;
pub use update_scheduler::{ScheduleOutcome, UpdateScheduler, UpdateState};
pub use update_service::{UpdateError, UpdateOutcome, UpdateService, UpdateSummary};
