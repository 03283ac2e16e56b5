//! Writes a crawled batch into the four entity tables
//!
//! The batch is the complete picture of the upstream chart: rows it
//! confirms are created or updated in place, and every stored row it does
//! not mention is deleted. Everything happens in one transaction.

use std::collections::HashSet;

use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::domain::{diff_and_apply, sort_records, CoolerRecord, Maker};
use crate::infrastructure::cooler_repository::{self as repo, EntityKind};

/// Per-table row counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EntityCounts {
    pub makers: usize,
    pub heatsinks: usize,
    pub fan_configs: usize,
    pub measurements: usize,
}

impl EntityCounts {
    fn bump(&mut self, kind: EntityKind) {
        match kind {
            EntityKind::Maker => self.makers += 1,
            EntityKind::Heatsink => self.heatsinks += 1,
            EntityKind::FanConfig => self.fan_configs += 1,
            EntityKind::Measurement => self.measurements += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.makers + self.heatsinks + self.fan_configs + self.measurements
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub created: EntityCounts,
    pub updated: EntityCounts,
    pub deleted: EntityCounts,
}

/// Ids confirmed by the current batch
#[derive(Default)]
struct Touched {
    makers: HashSet<i64>,
    heatsinks: HashSet<i64>,
    fan_configs: HashSet<i64>,
    measurements: HashSet<i64>,
}

impl Touched {
    fn ids(&self, kind: EntityKind) -> &HashSet<i64> {
        match kind {
            EntityKind::Maker => &self.makers,
            EntityKind::Heatsink => &self.heatsinks,
            EntityKind::FanConfig => &self.fan_configs,
            EntityKind::Measurement => &self.measurements,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Reconciler {
    pool: SqlitePool,
}

impl Reconciler {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Make storage mirror `records`.
    ///
    /// Records are grouped maker → model → fan geometry after sorting a copy
    /// into canonical order. On error nothing is written.
    pub async fn reconcile(&self, records: &[CoolerRecord]) -> Result<ReconcileReport, sqlx::Error> {
        let mut records = records.to_vec();
        sort_records(&mut records);

        let mut report = ReconcileReport::default();
        let mut touched = Touched::default();
        let mut tx = self.pool.begin().await?;

        for maker_records in records.chunk_by(|a, b| a.maker == b.maker) {
            let maker = find_or_create_maker(&mut tx, &maker_records[0].maker, &mut report).await?;
            touched.makers.insert(maker.id);

            for heatsink_records in maker_records.chunk_by(|a, b| a.model == b.model) {
                reconcile_heatsink(&mut tx, &maker, heatsink_records, &mut report, &mut touched)
                    .await?;
            }
        }

        // Children first so the explicit cascades find nothing left to delete
        for kind in EntityKind::ALL.into_iter().rev() {
            for id in repo::entity_ids(&mut tx, kind).await? {
                if touched.ids(kind).contains(&id) {
                    continue;
                }
                let deleted = match kind {
                    EntityKind::Measurement => repo::delete_measurement(&mut tx, id).await?,
                    EntityKind::FanConfig => repo::delete_fan_config_cascade(&mut tx, id).await?,
                    EntityKind::Heatsink => repo::delete_heatsink_cascade(&mut tx, id).await?,
                    EntityKind::Maker => repo::delete_maker_cascade(&mut tx, id).await?,
                };
                if deleted > 0 {
                    report.deleted.bump(kind);
                }
            }
        }

        tx.commit().await?;
        info!(
            created = report.created.total(),
            updated = report.updated.total(),
            deleted = report.deleted.total(),
            "Reconciled {} records",
            records.len()
        );
        Ok(report)
    }
}

async fn find_or_create_maker(
    conn: &mut SqliteConnection,
    name: &str,
    report: &mut ReconcileReport,
) -> Result<Maker, sqlx::Error> {
    if let Some(maker) = repo::find_maker(&mut *conn, name).await? {
        return Ok(maker);
    }
    let maker = repo::insert_maker(conn, name).await?;
    report.created.bump(EntityKind::Maker);
    debug!("Created maker {:?}", maker.name);
    Ok(maker)
}

/// Records of one `(maker, model)` group
async fn reconcile_heatsink(
    conn: &mut SqliteConnection,
    maker: &Maker,
    records: &[CoolerRecord],
    report: &mut ReconcileReport,
    touched: &mut Touched,
) -> Result<(), sqlx::Error> {
    let first = &records[0];
    let spec = first.heatsink_spec();
    if records.iter().any(|r| r.heatsink_spec() != spec) {
        warn!(
            "Records for {} {} disagree on heatsink attributes; using {:?}",
            first.maker, first.model, spec
        );
    }

    let heatsink = match repo::find_heatsink(&mut *conn, maker.id, &first.model).await? {
        Some(existing) => {
            let (updated, changed) = diff_and_apply(&existing, &spec);
            if changed {
                repo::update_heatsink_spec(&mut *conn, updated.id, &spec).await?;
                report.updated.bump(EntityKind::Heatsink);
            }
            updated
        }
        None => {
            let created = repo::insert_heatsink(&mut *conn, maker.id, &first.model, &spec).await?;
            report.created.bump(EntityKind::Heatsink);
            created
        }
    };
    touched.heatsinks.insert(heatsink.id);

    for fan_records in records.chunk_by(|a, b| a.fan_geometry() == b.fan_geometry()) {
        let Some(geometry) = fan_records[0].fan_geometry() else {
            warn!(
                "Skipping {} records of {} {} without fan information",
                fan_records.len(),
                first.maker,
                first.model
            );
            continue;
        };

        let fan_config = match repo::find_fan_config(&mut *conn, heatsink.id, geometry).await? {
            Some(existing) => existing,
            None => {
                let created = repo::insert_fan_config(&mut *conn, heatsink.id, geometry).await?;
                report.created.bump(EntityKind::FanConfig);
                created
            }
        };
        touched.fan_configs.insert(fan_config.id);

        for record in fan_records {
            let values = record.measurement_values();
            let existing =
                repo::find_measurement(&mut *conn, fan_config.id, record.noise, record.power).await?;
            let measurement = match existing {
                Some(existing) => {
                    let (updated, changed) = diff_and_apply(&existing, &values);
                    if changed {
                        repo::update_measurement(&mut *conn, updated.id, &values).await?;
                        report.updated.bump(EntityKind::Measurement);
                    }
                    updated
                }
                None => {
                    let created = repo::insert_measurement(
                        &mut *conn,
                        fan_config.id,
                        record.noise,
                        record.power,
                        &values,
                    )
                    .await?;
                    report.created.bump(EntityKind::Measurement);
                    created
                }
            };
            touched.measurements.insert(measurement.id);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cooler_record::fixtures::record;
    use crate::infrastructure::cooler_repository::CoolerRepository;
    use crate::infrastructure::database_connection::DatabaseConnection;

    async fn setup() -> (DatabaseConnection, Reconciler, CoolerRepository) {
        let db = DatabaseConnection::in_memory().await.unwrap();
        db.migrate().await.unwrap();
        let reconciler = Reconciler::new(db.pool().clone());
        let repository = CoolerRepository::new(db.pool().clone());
        (db, reconciler, repository)
    }

    async fn counts(repository: &CoolerRepository) -> [i64; 4] {
        let mut counts = [0; 4];
        for (slot, kind) in counts.iter_mut().zip(EntityKind::ALL) {
            *slot = repository.count(kind).await.unwrap();
        }
        counts
    }

    #[tokio::test]
    async fn test_reconcile_twice_is_idempotent() {
        let (_db, reconciler, repository) = setup().await;
        let batch = vec![
            record("Zalman", "CNPS10X", 35, 62),
            record("Zalman", "CNPS10X", 35, 92),
            record("Scythe", "Mugen 5", 40, 150),
        ];

        let first = reconciler.reconcile(&batch).await.unwrap();
        assert_eq!(first.created.total(), 2 + 2 + 2 + 3);
        let rows = repository.export_rows().await.unwrap();

        let second = reconciler.reconcile(&batch).await.unwrap();
        assert_eq!(second, ReconcileReport::default());
        assert_eq!(repository.export_rows().await.unwrap(), rows);
    }

    #[tokio::test]
    async fn test_changed_values_are_updated_in_place() {
        let (_db, reconciler, repository) = setup().await;
        let original = record("Zalman", "CNPS10X", 35, 62);
        reconciler.reconcile(&[original.clone()]).await.unwrap();

        let mut changed = original;
        changed.cpu_temp_delta = 39.0;
        changed.weight = None;
        let report = reconciler.reconcile(&[changed]).await.unwrap();
        assert_eq!(report.updated.heatsinks, 1);
        assert_eq!(report.updated.measurements, 1);
        assert_eq!(report.created.total(), 0);

        let measurements = repository.list_measurements().await.unwrap();
        assert_eq!(measurements.len(), 1);
        assert_eq!(measurements[0].id, 1);
        assert_eq!(measurements[0].cpu_temp_delta, 39.0);
        assert_eq!(repository.list_heatsinks().await.unwrap()[0].weight, None);
    }

    #[tokio::test]
    async fn test_absent_rows_are_tombstoned() {
        let (_db, reconciler, repository) = setup().await;
        let mut two_fans = record("Zalman", "CNPS10X", 35, 62);
        two_fans.fan_count = Some(2);
        reconciler
            .reconcile(&[
                record("Zalman", "CNPS10X", 35, 62),
                two_fans,
                record("Scythe", "Mugen 5", 35, 62),
            ])
            .await
            .unwrap();
        assert_eq!(counts(&repository).await, [2, 2, 3, 3]);

        let report = reconciler
            .reconcile(&[record("Zalman", "CNPS10X", 35, 62)])
            .await
            .unwrap();
        assert_eq!(
            report.deleted,
            EntityCounts {
                makers: 1,
                heatsinks: 1,
                fan_configs: 2,
                measurements: 2,
            }
        );
        assert_eq!(counts(&repository).await, [1, 1, 1, 1]);
        assert_eq!(repository.list_makers().await.unwrap()[0].name, "Zalman");
    }

    #[tokio::test]
    async fn test_empty_batch_clears_storage() {
        let (_db, reconciler, repository) = setup().await;
        reconciler.reconcile(&[record("Zalman", "CNPS10X", 35, 62)]).await.unwrap();
        reconciler.reconcile(&[]).await.unwrap();
        assert_eq!(counts(&repository).await, [0, 0, 0, 0]);
    }
}
