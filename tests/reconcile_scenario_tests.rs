//! Reconciliation and normalization scenarios through the public API

use cpu_cooler_chart::application::Reconciler;
use cpu_cooler_chart::domain::corrections::correct_record;
use cpu_cooler_chart::domain::CoolerRecord;
use cpu_cooler_chart::infrastructure::parsing::field_parsers::{parse_maker, parse_model};
use cpu_cooler_chart::infrastructure::{CoolerRepository, DatabaseConnection};

fn stock_cooler(power: i64) -> CoolerRecord {
    CoolerRecord {
        maker: "Intel".to_string(),
        model: "Stock".to_string(),
        width: None,
        depth: None,
        height: None,
        heatsink_type: "tower".to_string(),
        weight: None,
        fan_size: Some(92),
        fan_thickness: Some(20),
        fan_count: Some(1),
        rpm_min: None,
        rpm_max: None,
        noise: 35,
        power,
        noise_actual_min: None,
        noise_actual_max: None,
        cpu_temp_delta: 50.0,
        power_temp_delta: None,
    }
}

async fn setup() -> (DatabaseConnection, Reconciler, CoolerRepository) {
    let db = DatabaseConnection::in_memory().await.unwrap();
    db.migrate().await.unwrap();
    let reconciler = Reconciler::new(db.pool().clone());
    let repository = CoolerRepository::new(db.pool().clone());
    (db, reconciler, repository)
}

#[tokio::test]
async fn test_single_record_creates_one_row_per_table() {
    let (_db, reconciler, repository) = setup().await;

    reconciler.reconcile(&[stock_cooler(62)]).await.unwrap();

    let makers = repository.list_makers().await.unwrap();
    let heatsinks = repository.list_heatsinks().await.unwrap();
    let fan_configs = repository.list_fan_configs().await.unwrap();
    let measurements = repository.list_measurements().await.unwrap();
    assert_eq!((makers.len(), heatsinks.len()), (1, 1));
    assert_eq!((fan_configs.len(), measurements.len()), (1, 1));
    assert_eq!(makers[0].id, 1);
    assert_eq!(heatsinks[0].id, 1);
    assert_eq!(fan_configs[0].id, 1);
    assert_eq!(measurements[0].id, 1);
    assert_eq!(measurements[0].cpu_temp_delta, 50.0);
}

#[tokio::test]
async fn test_new_power_bucket_adds_only_a_measurement() {
    let (_db, reconciler, repository) = setup().await;
    reconciler.reconcile(&[stock_cooler(62)]).await.unwrap();

    let report = reconciler
        .reconcile(&[stock_cooler(62), stock_cooler(92)])
        .await
        .unwrap();
    assert_eq!(report.created.makers, 0);
    assert_eq!(report.created.heatsinks, 0);
    assert_eq!(report.created.fan_configs, 0);
    assert_eq!(report.created.measurements, 1);

    let measurements = repository.list_measurements().await.unwrap();
    assert_eq!(measurements.len(), 2);
    assert!(measurements.iter().all(|m| m.fan_config_id == 1));
    assert_eq!(repository.list_fan_configs().await.unwrap().len(), 1);
}

#[test]
fn test_maker_and_model_normalization() {
    assert_eq!(parse_maker("thermalrightm"), "Thermalright");
    assert_eq!(parse_maker("  Cooler   Master "), "Cooler Master");

    let mut record = stock_cooler(62);
    record.maker = parse_maker("3Rsystem");
    record.model = parse_model("iceage 120");
    assert_eq!(record.model, "iCEAGE 120");

    correct_record(&mut record);
    assert_eq!(
        (record.width, record.depth, record.height),
        (Some(125.0), Some(100.0), Some(154.0))
    );
}
