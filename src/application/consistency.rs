//! Repairs known upstream mistakes and enforces the functional dependencies
//! of a crawled batch

use std::collections::HashMap;

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::domain::corrections::{canonical_maker, canonical_model, dimension_fix};
use crate::domain::{CoolerRecord, FanGeometry, HeatsinkSpec, MeasurementValues, Snapshot};
use crate::infrastructure::cooler_repository as repo;
use crate::infrastructure::parsing::WarningLog;

/// What [`fix_existing_data`] changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    pub makers_renamed: usize,
    pub heatsinks_renamed: usize,
    pub dimensions_fixed: usize,
    pub renames_skipped: usize,
}

/// Rename stored makers and heatsinks with known misspellings and apply the
/// curated dimension fixes, in one transaction.
///
/// A rename whose canonical name is already taken is skipped; the misspelled
/// row disappears with the next reconciliation.
pub async fn fix_existing_data(pool: &SqlitePool) -> Result<RepairReport, sqlx::Error> {
    let mut report = RepairReport::default();
    let mut tx = pool.begin().await?;

    for maker in repo::all_makers(&mut tx).await? {
        let Some(canonical) = canonical_maker(&maker.name) else {
            continue;
        };
        if canonical == maker.name {
            continue;
        }
        if repo::find_maker(&mut tx, canonical).await?.is_some() {
            warn!("Cannot rename maker {:?} to {:?}: name is taken", maker.name, canonical);
            report.renames_skipped += 1;
            continue;
        }
        repo::rename_maker(&mut tx, maker.id, canonical).await?;
        report.makers_renamed += 1;
    }

    for joined in repo::heatsinks_with_maker_names(&mut tx).await? {
        let heatsink = joined.heatsink;
        let Some(canonical) = canonical_model(&heatsink.name) else {
            continue;
        };
        if canonical == heatsink.name {
            continue;
        }
        if repo::find_heatsink(&mut tx, heatsink.maker_id, canonical).await?.is_some() {
            warn!(
                "Cannot rename heatsink {:?} to {:?}: name is taken",
                heatsink.name, canonical
            );
            report.renames_skipped += 1;
            continue;
        }
        repo::rename_heatsink(&mut tx, heatsink.id, canonical).await?;
        report.heatsinks_renamed += 1;
    }

    for joined in repo::heatsinks_with_maker_names(&mut tx).await? {
        let Some(fix) = dimension_fix(&joined.lookup_key()) else {
            continue;
        };
        let current = joined.heatsink.snapshot();
        let mut fixed = current.clone();
        fix.apply(&mut fixed.width, &mut fixed.depth, &mut fixed.height);
        if fixed != current {
            repo::update_heatsink_spec(&mut tx, joined.heatsink.id, &fixed).await?;
            report.dimensions_fixed += 1;
        }
    }

    tx.commit().await?;
    info!(?report, "Repaired existing data");
    Ok(report)
}

type HeatsinkKey = (String, String);
type MeasurementKey = (String, String, FanGeometry, i64, i64);

/// Drop records that cannot be stored or that contradict an earlier record.
///
/// Records are expected in canonical order. Two rules apply:
/// `(maker, model)` determines the heatsink attributes, and
/// `(maker, model, fan geometry, noise, power)` determines the measured
/// values. The first record for a key wins; each violation is warned about
/// once. Records without complete fan information are dropped.
pub fn ensure_consistency(records: Vec<CoolerRecord>, warnings: &mut WarningLog) -> Vec<CoolerRecord> {
    let mut heatsinks: HashMap<HeatsinkKey, HeatsinkSpec> = HashMap::new();
    let mut measurements: HashMap<MeasurementKey, MeasurementValues> = HashMap::new();
    let total = records.len();

    let mut kept = Vec::with_capacity(total);
    for record in records {
        let Some(geometry) = record.fan_geometry() else {
            warnings.warn(format!(
                "no fan information for {} {}; the record will be removed",
                record.maker, record.model
            ));
            continue;
        };

        let mut remove = false;

        let key = (record.maker.clone(), record.model.clone());
        let spec = record.heatsink_spec();
        match heatsinks.get(&key) {
            None => {
                heatsinks.insert(key, spec);
            }
            Some(first) if *first != spec => {
                warnings.warn(format!(
                    "dependency (maker, model) -> (width, depth, height, heatsink_type, weight) \
                     violated: {key:?}: {first:?} != {spec:?}; the latter will be removed"
                ));
                remove = true;
            }
            Some(_) => {}
        }

        let key = (
            record.maker.clone(),
            record.model.clone(),
            geometry,
            record.noise,
            record.power,
        );
        let values = record.measurement_values();
        match measurements.get(&key) {
            None => {
                measurements.insert(key, values);
            }
            Some(first) if *first != values => {
                warnings.warn(format!(
                    "dependency (maker, model, fan_size, fan_thickness, fan_count, noise, power) -> \
                     (noise_actual_min, noise_actual_max, rpm_min, rpm_max, cpu_temp_delta, \
                     power_temp_delta) violated: {key:?}: {first:?} != {values:?}; the latter will be removed"
                ));
                remove = true;
            }
            Some(_) => {}
        }

        if !remove {
            kept.push(record);
        }
    }

    if kept.len() < total {
        info!("Removed {} inconsistent records", total - kept.len());
    }
    kept
}
