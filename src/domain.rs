//! Domain module - heatsink entities, crawled records and curated correction tables
//!
//! This module contains the four stored entities, the flat record produced by
//! the chart crawler, the measurement grid and the static data tables used to
//! normalize and enrich upstream data.

pub mod entities;
pub mod cooler_record;
pub mod measurement_grid;
pub mod corrections;

// Re-export commonly used items for convenience
pub use entities::{
    diff_and_apply, FanConfig, FanGeometry, Heatsink, HeatsinkSpec, HeatsinkWithMaker, Maker,
    Measurement, MeasurementValues, PriceFields, Snapshot,
};
pub use cooler_record::{sort_records, CoolerRecord};
pub use measurement_grid::{grid_cells, GridCell, CPU_POWER, NOISE_LEVELS, NOISE_MAX};
