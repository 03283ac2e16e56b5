//! Parsing infrastructure for the chart page and Danawa responses
//!
//! Field parsers are pure functions; anything odd but recoverable goes to a
//! [`WarningLog`] so it is reported once per update cycle.

pub mod error;
pub mod warnings;
pub mod field_parsers;
pub mod context;
pub mod config;
pub mod chart_parser;
pub mod danawa_parser;

// Re-export public types
pub use error::{ParsingError, ParsingResult};
pub use warnings::WarningLog;
pub use context::ChartPageContext;
pub use config::ChartSelectors;
pub use chart_parser::ChartTableParser;
pub use danawa_parser::{
    parse_product_info, parse_search_results, DanawaResponse, ProductInfo, ProductSearchHit,
    ProductSearchResults,
};
