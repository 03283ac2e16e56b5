//! Stored entities: Maker → Heatsink → FanConfig → Measurement
//!
//! Every entity is a plain data record. The mutable part of each entity is
//! exposed as a snapshot type so that the reconciler can decide whether a
//! write is needed without touching the database.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Maker {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Heatsink {
    pub id: i64,
    pub name: String,
    pub maker_id: i64,
    pub width: Option<f64>,
    pub depth: Option<f64>,
    pub height: Option<f64>,
    pub heatsink_type: String,
    pub weight: Option<f64>,
    pub danawa_id: Option<i64>,
    pub price: Option<i64>,
    pub shop_count: Option<i64>,
    pub first_seen: Option<NaiveDateTime>,
    pub image_url: Option<String>,
}

/// Heatsink row joined with its maker's name
#[derive(Debug, Clone, FromRow)]
pub struct HeatsinkWithMaker {
    #[sqlx(flatten)]
    pub heatsink: Heatsink,
    pub maker_name: String,
}

impl HeatsinkWithMaker {
    /// Lowercased `"maker model"` key used by the curated lookup tables
    pub fn lookup_key(&self) -> String {
        format!("{} {}", self.maker_name, self.heatsink.name).to_lowercase()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct FanConfig {
    pub id: i64,
    pub heatsink_id: i64,
    pub fan_size: i64,
    pub fan_thickness: i64,
    pub fan_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Measurement {
    pub id: i64,
    pub fan_config_id: i64,
    pub noise: i64,
    pub power: i64,
    pub noise_actual_min: Option<f64>,
    pub noise_actual_max: Option<f64>,
    pub rpm_min: Option<i64>,
    pub rpm_max: Option<i64>,
    pub cpu_temp_delta: f64,
    pub power_temp_delta: Option<f64>,
}

/// Physical attributes of a heatsink, determined by `(maker, model)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatsinkSpec {
    pub width: Option<f64>,
    pub depth: Option<f64>,
    pub height: Option<f64>,
    pub heatsink_type: String,
    pub weight: Option<f64>,
}

/// Fan geometry; the natural key of a fan configuration within a heatsink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FanGeometry {
    pub fan_size: i64,
    pub fan_thickness: i64,
    pub fan_count: i64,
}

/// Measured values of one `(fan config, noise, power)` cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementValues {
    pub noise_actual_min: Option<f64>,
    pub noise_actual_max: Option<f64>,
    pub rpm_min: Option<i64>,
    pub rpm_max: Option<i64>,
    pub cpu_temp_delta: f64,
    pub power_temp_delta: Option<f64>,
}

/// Price-related heatsink columns; the only ones the price enricher may write
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PriceFields {
    pub danawa_id: Option<i64>,
    pub price: Option<i64>,
    pub shop_count: Option<i64>,
    pub first_seen: Option<NaiveDateTime>,
    pub image_url: Option<String>,
}

/// An entity with a mutable snapshot that can be compared and replaced
pub trait Snapshot: Clone {
    type Fields: PartialEq + Clone;

    fn snapshot(&self) -> Self::Fields;
    fn apply(&mut self, fields: Self::Fields);
}

impl Snapshot for Heatsink {
    type Fields = HeatsinkSpec;

    fn snapshot(&self) -> HeatsinkSpec {
        HeatsinkSpec {
            width: self.width,
            depth: self.depth,
            height: self.height,
            heatsink_type: self.heatsink_type.clone(),
            weight: self.weight,
        }
    }

    fn apply(&mut self, spec: HeatsinkSpec) {
        self.width = spec.width;
        self.depth = spec.depth;
        self.height = spec.height;
        self.heatsink_type = spec.heatsink_type;
        self.weight = spec.weight;
    }
}

impl Heatsink {
    pub fn price_fields(&self) -> PriceFields {
        PriceFields {
            danawa_id: self.danawa_id,
            price: self.price,
            shop_count: self.shop_count,
            first_seen: self.first_seen,
            image_url: self.image_url.clone(),
        }
    }
}

impl Snapshot for Measurement {
    type Fields = MeasurementValues;

    fn snapshot(&self) -> MeasurementValues {
        MeasurementValues {
            noise_actual_min: self.noise_actual_min,
            noise_actual_max: self.noise_actual_max,
            rpm_min: self.rpm_min,
            rpm_max: self.rpm_max,
            cpu_temp_delta: self.cpu_temp_delta,
            power_temp_delta: self.power_temp_delta,
        }
    }

    fn apply(&mut self, values: MeasurementValues) {
        self.noise_actual_min = values.noise_actual_min;
        self.noise_actual_max = values.noise_actual_max;
        self.rpm_min = values.rpm_min;
        self.rpm_max = values.rpm_max;
        self.cpu_temp_delta = values.cpu_temp_delta;
        self.power_temp_delta = values.power_temp_delta;
    }
}

impl FanConfig {
    pub fn geometry(&self) -> FanGeometry {
        FanGeometry {
            fan_size: self.fan_size,
            fan_thickness: self.fan_thickness,
            fan_count: self.fan_count,
        }
    }
}

/// Replace the snapshot of `existing` with `incoming` and report whether anything changed.
///
/// An unchanged entity is returned as-is so callers can skip the write entirely.
pub fn diff_and_apply<E: Snapshot>(existing: &E, incoming: &E::Fields) -> (E, bool) {
    let mut updated = existing.clone();
    if existing.snapshot() == *incoming {
        return (updated, false);
    }
    updated.apply(incoming.clone());
    (updated, true)
}
