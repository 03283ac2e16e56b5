//! Flat record produced by the chart crawler, one per table row per grid cell

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::entities::{FanGeometry, HeatsinkSpec, MeasurementValues};

/// One measurement row as published on the chart, after field parsing.
///
/// Optional fields are `None` when the chart leaves them blank or the text
/// could not be interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoolerRecord {
    pub maker: String,
    pub model: String,
    pub width: Option<f64>,
    pub depth: Option<f64>,
    pub height: Option<f64>,
    pub heatsink_type: String,
    pub weight: Option<f64>,
    pub fan_size: Option<i64>,
    pub fan_thickness: Option<i64>,
    pub fan_count: Option<i64>,
    pub rpm_min: Option<i64>,
    pub rpm_max: Option<i64>,
    pub noise: i64,
    pub power: i64,
    pub noise_actual_min: Option<f64>,
    pub noise_actual_max: Option<f64>,
    pub cpu_temp_delta: f64,
    pub power_temp_delta: Option<f64>,
}

impl CoolerRecord {
    /// Lowercased `"maker model"` key used by the curated lookup tables
    pub fn lookup_key(&self) -> String {
        format!("{} {}", self.maker, self.model).to_lowercase()
    }

    pub fn heatsink_spec(&self) -> HeatsinkSpec {
        HeatsinkSpec {
            width: self.width,
            depth: self.depth,
            height: self.height,
            heatsink_type: self.heatsink_type.clone(),
            weight: self.weight,
        }
    }

    /// Fan geometry, or `None` when any of its three parts is missing
    pub fn fan_geometry(&self) -> Option<FanGeometry> {
        Some(FanGeometry {
            fan_size: self.fan_size?,
            fan_thickness: self.fan_thickness?,
            fan_count: self.fan_count?,
        })
    }

    pub fn measurement_values(&self) -> MeasurementValues {
        MeasurementValues {
            noise_actual_min: self.noise_actual_min,
            noise_actual_max: self.noise_actual_max,
            rpm_min: self.rpm_min,
            rpm_max: self.rpm_max,
            cpu_temp_delta: self.cpu_temp_delta,
            power_temp_delta: self.power_temp_delta,
        }
    }

    /// Canonical ordering: maker, model, fan size, fan thickness, fan count,
    /// noise, power, measured noise. Missing values sort first.
    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        self.maker
            .cmp(&other.maker)
            .then_with(|| self.model.cmp(&other.model))
            .then_with(|| self.fan_size.cmp(&other.fan_size))
            .then_with(|| self.fan_thickness.cmp(&other.fan_thickness))
            .then_with(|| self.fan_count.cmp(&other.fan_count))
            .then_with(|| self.noise.cmp(&other.noise))
            .then_with(|| self.power.cmp(&other.power))
            .then_with(|| cmp_optional_f64(self.noise_actual_min, other.noise_actual_min))
    }
}

fn cmp_optional_f64(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable sort into canonical order; records with equal keys keep their crawl order
pub fn sort_records(records: &mut [CoolerRecord]) {
    records.sort_by(CoolerRecord::canonical_cmp);
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::CoolerRecord;

    /// A fully populated record for tests to tweak
    pub fn record(maker: &str, model: &str, noise: i64, power: i64) -> CoolerRecord {
        CoolerRecord {
            maker: maker.to_string(),
            model: model.to_string(),
            width: Some(125.0),
            depth: Some(75.0),
            height: Some(150.0),
            heatsink_type: "tower".to_string(),
            weight: Some(620.0),
            fan_size: Some(120),
            fan_thickness: Some(25),
            fan_count: Some(1),
            rpm_min: Some(1200),
            rpm_max: Some(1250),
            noise,
            power,
            noise_actual_min: None,
            noise_actual_max: None,
            cpu_temp_delta: 40.5,
            power_temp_delta: Some(30.0),
        }
    }
}
