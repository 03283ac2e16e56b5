//! CPU cooler chart - heatsink measurement crawler and API
//!
//! Fetches the published cooler measurement charts, normalizes the rows,
//! reconciles them into SQLite, enriches heatsinks with Danawa prices and
//! serves the result as JSON and CSV.

// Module declarations
pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod api;
pub mod commands;
