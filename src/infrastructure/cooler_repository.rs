//! Typed queries over the maker → heatsink → fan_config → measurement tables
//!
//! Read-only listings run against the pool through [`CoolerRepository`].
//! Everything that writes takes a `&mut SqliteConnection`, so the pipeline
//! services can run a whole phase inside one transaction.

use sqlx::{FromRow, SqliteConnection, SqlitePool};

use crate::domain::{
    FanConfig, FanGeometry, Heatsink, HeatsinkSpec, HeatsinkWithMaker, Maker, Measurement,
    MeasurementValues, PriceFields,
};

/// One of the four stored entity tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Maker,
    Heatsink,
    FanConfig,
    Measurement,
}

impl EntityKind {
    /// Owners first
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Maker,
        EntityKind::Heatsink,
        EntityKind::FanConfig,
        EntityKind::Measurement,
    ];

    pub fn table(self) -> &'static str {
        match self {
            EntityKind::Maker => "maker",
            EntityKind::Heatsink => "heatsink",
            EntityKind::FanConfig => "fan_config",
            EntityKind::Measurement => "measurement",
        }
    }
}

/// One joined row of the export dataset
#[derive(Debug, Clone, PartialEq, FromRow, serde::Serialize)]
pub struct ExportRow {
    pub maker: String,
    pub model: String,
    pub width: Option<f64>,
    pub depth: Option<f64>,
    pub height: Option<f64>,
    pub heatsink_type: String,
    pub weight: Option<f64>,
    pub price: Option<i64>,
    pub shop_count: Option<i64>,
    pub first_seen: Option<chrono::NaiveDateTime>,
    pub fan_size: i64,
    pub fan_thickness: i64,
    pub fan_count: i64,
    pub noise: i64,
    pub noise_actual_min: Option<f64>,
    pub noise_actual_max: Option<f64>,
    pub rpm_min: Option<i64>,
    pub rpm_max: Option<i64>,
    pub power: i64,
    pub cpu_temp_delta: f64,
    pub power_temp_delta: Option<f64>,
}

const HEATSINK_COLUMNS: &str = "heatsink.id, heatsink.name, heatsink.maker_id, heatsink.width, \
     heatsink.depth, heatsink.height, heatsink.heatsink_type, heatsink.weight, \
     heatsink.danawa_id, heatsink.price, heatsink.shop_count, heatsink.first_seen, \
     heatsink.image_url";

const MEASUREMENT_COLUMNS: &str = "id, fan_config_id, noise, power, noise_actual_min, \
     noise_actual_max, rpm_min, rpm_max, cpu_temp_delta, power_temp_delta";

/// Read access to the reconciled dataset
#[derive(Debug, Clone)]
pub struct CoolerRepository {
    pool: SqlitePool,
}

impl CoolerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ===============================
    // LISTINGS
    // ===============================

    pub async fn list_makers(&self) -> Result<Vec<Maker>, sqlx::Error> {
        sqlx::query_as::<_, Maker>("SELECT id, name FROM maker ORDER BY id")
            .fetch_all(&self.pool)
            .await
    }

    /// Heatsinks ordered by case-insensitive name
    pub async fn list_heatsinks(&self) -> Result<Vec<Heatsink>, sqlx::Error> {
        let sql = format!("SELECT {HEATSINK_COLUMNS} FROM heatsink ORDER BY lower(heatsink.name), heatsink.id");
        sqlx::query_as::<_, Heatsink>(&sql).fetch_all(&self.pool).await
    }

    pub async fn list_fan_configs(&self) -> Result<Vec<FanConfig>, sqlx::Error> {
        sqlx::query_as::<_, FanConfig>(
            "SELECT id, heatsink_id, fan_size, fan_thickness, fan_count FROM fan_config ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
    }

    pub async fn list_measurements(&self) -> Result<Vec<Measurement>, sqlx::Error> {
        let sql = format!("SELECT {MEASUREMENT_COLUMNS} FROM measurement ORDER BY id");
        sqlx::query_as::<_, Measurement>(&sql).fetch_all(&self.pool).await
    }

    /// Every heatsink with its maker's name, in id order
    pub async fn heatsinks_with_maker_names(&self) -> Result<Vec<HeatsinkWithMaker>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        heatsinks_with_maker_names(&mut conn).await
    }

    pub async fn count(&self, kind: EntityKind) -> Result<i64, sqlx::Error> {
        let sql = format!("SELECT COUNT(*) FROM {}", kind.table());
        sqlx::query_scalar(&sql).fetch_one(&self.pool).await
    }

    /// The fully joined dataset in canonical order
    pub async fn export_rows(&self) -> Result<Vec<ExportRow>, sqlx::Error> {
        sqlx::query_as::<_, ExportRow>(
            r#"
            SELECT maker.name AS maker, heatsink.name AS model,
                   heatsink.width, heatsink.depth, heatsink.height,
                   heatsink.heatsink_type, heatsink.weight,
                   heatsink.price, heatsink.shop_count, heatsink.first_seen,
                   fan_config.fan_size, fan_config.fan_thickness, fan_config.fan_count,
                   measurement.noise, measurement.noise_actual_min, measurement.noise_actual_max,
                   measurement.rpm_min, measurement.rpm_max, measurement.power,
                   measurement.cpu_temp_delta, measurement.power_temp_delta
            FROM measurement
            JOIN fan_config ON fan_config.id = measurement.fan_config_id
            JOIN heatsink ON heatsink.id = fan_config.heatsink_id
            JOIN maker ON maker.id = heatsink.maker_id
            ORDER BY maker.name, heatsink.name, fan_config.fan_size, fan_config.fan_thickness,
                     fan_config.fan_count, measurement.noise, measurement.power,
                     measurement.noise_actual_min
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }
}

// ===============================
// MAKER
// ===============================

pub async fn find_maker(conn: &mut SqliteConnection, name: &str) -> Result<Option<Maker>, sqlx::Error> {
    sqlx::query_as::<_, Maker>("SELECT id, name FROM maker WHERE name = ?")
        .bind(name)
        .fetch_optional(conn)
        .await
}

pub async fn insert_maker(conn: &mut SqliteConnection, name: &str) -> Result<Maker, sqlx::Error> {
    let result = sqlx::query("INSERT INTO maker (name) VALUES (?)")
        .bind(name)
        .execute(conn)
        .await?;
    Ok(Maker {
        id: result.last_insert_rowid(),
        name: name.to_string(),
    })
}

pub async fn all_makers(conn: &mut SqliteConnection) -> Result<Vec<Maker>, sqlx::Error> {
    sqlx::query_as::<_, Maker>("SELECT id, name FROM maker ORDER BY id")
        .fetch_all(conn)
        .await
}

pub async fn rename_maker(conn: &mut SqliteConnection, id: i64, name: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE maker SET name = ? WHERE id = ?")
        .bind(name)
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}

// ===============================
// HEATSINK
// ===============================

pub async fn find_heatsink(
    conn: &mut SqliteConnection,
    maker_id: i64,
    name: &str,
) -> Result<Option<Heatsink>, sqlx::Error> {
    let sql = format!("SELECT {HEATSINK_COLUMNS} FROM heatsink WHERE maker_id = ? AND name = ?");
    sqlx::query_as::<_, Heatsink>(&sql)
        .bind(maker_id)
        .bind(name)
        .fetch_optional(conn)
        .await
}

pub async fn insert_heatsink(
    conn: &mut SqliteConnection,
    maker_id: i64,
    name: &str,
    spec: &HeatsinkSpec,
) -> Result<Heatsink, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO heatsink (name, maker_id, width, depth, height, heatsink_type, weight)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(name)
    .bind(maker_id)
    .bind(spec.width)
    .bind(spec.depth)
    .bind(spec.height)
    .bind(&spec.heatsink_type)
    .bind(spec.weight)
    .execute(conn)
    .await?;

    Ok(Heatsink {
        id: result.last_insert_rowid(),
        name: name.to_string(),
        maker_id,
        width: spec.width,
        depth: spec.depth,
        height: spec.height,
        heatsink_type: spec.heatsink_type.clone(),
        weight: spec.weight,
        danawa_id: None,
        price: None,
        shop_count: None,
        first_seen: None,
        image_url: None,
    })
}

pub async fn update_heatsink_spec(
    conn: &mut SqliteConnection,
    id: i64,
    spec: &HeatsinkSpec,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE heatsink
        SET width = ?, depth = ?, height = ?, heatsink_type = ?, weight = ?
        WHERE id = ?
        "#,
    )
    .bind(spec.width)
    .bind(spec.depth)
    .bind(spec.height)
    .bind(&spec.heatsink_type)
    .bind(spec.weight)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn update_heatsink_price(
    conn: &mut SqliteConnection,
    id: i64,
    fields: &PriceFields,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE heatsink
        SET danawa_id = ?, price = ?, shop_count = ?, first_seen = ?, image_url = ?
        WHERE id = ?
        "#,
    )
    .bind(fields.danawa_id)
    .bind(fields.price)
    .bind(fields.shop_count)
    .bind(fields.first_seen)
    .bind(&fields.image_url)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn rename_heatsink(conn: &mut SqliteConnection, id: i64, name: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE heatsink SET name = ? WHERE id = ?")
        .bind(name)
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn heatsinks_with_maker_names(
    conn: &mut SqliteConnection,
) -> Result<Vec<HeatsinkWithMaker>, sqlx::Error> {
    let sql = format!(
        "SELECT {HEATSINK_COLUMNS}, maker.name AS maker_name \
         FROM heatsink JOIN maker ON maker.id = heatsink.maker_id ORDER BY heatsink.id"
    );
    sqlx::query_as::<_, HeatsinkWithMaker>(&sql).fetch_all(conn).await
}

// ===============================
// FAN CONFIG
// ===============================

pub async fn find_fan_config(
    conn: &mut SqliteConnection,
    heatsink_id: i64,
    geometry: FanGeometry,
) -> Result<Option<FanConfig>, sqlx::Error> {
    sqlx::query_as::<_, FanConfig>(
        r#"
        SELECT id, heatsink_id, fan_size, fan_thickness, fan_count
        FROM fan_config
        WHERE heatsink_id = ? AND fan_size = ? AND fan_thickness = ? AND fan_count = ?
        "#,
    )
    .bind(heatsink_id)
    .bind(geometry.fan_size)
    .bind(geometry.fan_thickness)
    .bind(geometry.fan_count)
    .fetch_optional(conn)
    .await
}

pub async fn insert_fan_config(
    conn: &mut SqliteConnection,
    heatsink_id: i64,
    geometry: FanGeometry,
) -> Result<FanConfig, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO fan_config (heatsink_id, fan_size, fan_thickness, fan_count) VALUES (?, ?, ?, ?)",
    )
    .bind(heatsink_id)
    .bind(geometry.fan_size)
    .bind(geometry.fan_thickness)
    .bind(geometry.fan_count)
    .execute(conn)
    .await?;

    Ok(FanConfig {
        id: result.last_insert_rowid(),
        heatsink_id,
        fan_size: geometry.fan_size,
        fan_thickness: geometry.fan_thickness,
        fan_count: geometry.fan_count,
    })
}

// ===============================
// MEASUREMENT
// ===============================

pub async fn find_measurement(
    conn: &mut SqliteConnection,
    fan_config_id: i64,
    noise: i64,
    power: i64,
) -> Result<Option<Measurement>, sqlx::Error> {
    let sql = format!(
        "SELECT {MEASUREMENT_COLUMNS} FROM measurement \
         WHERE fan_config_id = ? AND noise = ? AND power = ?"
    );
    sqlx::query_as::<_, Measurement>(&sql)
        .bind(fan_config_id)
        .bind(noise)
        .bind(power)
        .fetch_optional(conn)
        .await
}

pub async fn insert_measurement(
    conn: &mut SqliteConnection,
    fan_config_id: i64,
    noise: i64,
    power: i64,
    values: &MeasurementValues,
) -> Result<Measurement, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO measurement
        (fan_config_id, noise, power, noise_actual_min, noise_actual_max,
         rpm_min, rpm_max, cpu_temp_delta, power_temp_delta)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(fan_config_id)
    .bind(noise)
    .bind(power)
    .bind(values.noise_actual_min)
    .bind(values.noise_actual_max)
    .bind(values.rpm_min)
    .bind(values.rpm_max)
    .bind(values.cpu_temp_delta)
    .bind(values.power_temp_delta)
    .execute(conn)
    .await?;

    Ok(Measurement {
        id: result.last_insert_rowid(),
        fan_config_id,
        noise,
        power,
        noise_actual_min: values.noise_actual_min,
        noise_actual_max: values.noise_actual_max,
        rpm_min: values.rpm_min,
        rpm_max: values.rpm_max,
        cpu_temp_delta: values.cpu_temp_delta,
        power_temp_delta: values.power_temp_delta,
    })
}

pub async fn update_measurement(
    conn: &mut SqliteConnection,
    id: i64,
    values: &MeasurementValues,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE measurement
        SET noise_actual_min = ?, noise_actual_max = ?, rpm_min = ?, rpm_max = ?,
            cpu_temp_delta = ?, power_temp_delta = ?
        WHERE id = ?
        "#,
    )
    .bind(values.noise_actual_min)
    .bind(values.noise_actual_max)
    .bind(values.rpm_min)
    .bind(values.rpm_max)
    .bind(values.cpu_temp_delta)
    .bind(values.power_temp_delta)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(())
}

// ===============================
// SCOPED DELETES
// ===============================

/// All ids currently stored in one table
pub async fn entity_ids(conn: &mut SqliteConnection, kind: EntityKind) -> Result<Vec<i64>, sqlx::Error> {
    let sql = format!("SELECT id FROM {} ORDER BY id", kind.table());
    sqlx::query_scalar(&sql).fetch_all(conn).await
}

pub async fn delete_measurement(conn: &mut SqliteConnection, id: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM measurement WHERE id = ?")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

/// Delete a fan config and its measurements
pub async fn delete_fan_config_cascade(conn: &mut SqliteConnection, id: i64) -> Result<u64, sqlx::Error> {
    sqlx::query("DELETE FROM measurement WHERE fan_config_id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    let result = sqlx::query("DELETE FROM fan_config WHERE id = ?")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

/// Delete a heatsink, its fan configs and their measurements
pub async fn delete_heatsink_cascade(conn: &mut SqliteConnection, id: i64) -> Result<u64, sqlx::Error> {
    sqlx::query(
        "DELETE FROM measurement WHERE fan_config_id IN (SELECT id FROM fan_config WHERE heatsink_id = ?)",
    )
    .bind(id)
    .execute(&mut *conn)
    .await?;
    sqlx::query("DELETE FROM fan_config WHERE heatsink_id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    let result = sqlx::query("DELETE FROM heatsink WHERE id = ?")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

/// Delete a maker and everything it owns
pub async fn delete_maker_cascade(conn: &mut SqliteConnection, id: i64) -> Result<u64, sqlx::Error> {
    let heatsink_ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM heatsink WHERE maker_id = ?")
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;
    for heatsink_id in heatsink_ids {
        delete_heatsink_cascade(&mut *conn, heatsink_id).await?;
    }
    let result = sqlx::query("DELETE FROM maker WHERE id = ?")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database_connection::DatabaseConnection;

    fn spec() -> HeatsinkSpec {
        HeatsinkSpec {
            width: Some(125.0),
            depth: Some(75.0),
            height: Some(150.0),
            heatsink_type: "tower".to_string(),
            weight: Some(620.0),
        }
    }

    fn values() -> MeasurementValues {
        MeasurementValues {
            noise_actual_min: None,
            noise_actual_max: None,
            rpm_min: Some(1200),
            rpm_max: Some(1250),
            cpu_temp_delta: 40.5,
            power_temp_delta: Some(30.0),
        }
    }

    const GEOMETRY: FanGeometry = FanGeometry {
        fan_size: 120,
        fan_thickness: 25,
        fan_count: 1,
    };

    async fn setup() -> DatabaseConnection {
        let db = DatabaseConnection::in_memory().await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_insert_and_find_each_level() {
        let db = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let maker = insert_maker(&mut conn, "Zalman").await.unwrap();
        assert_eq!(find_maker(&mut conn, "Zalman").await.unwrap(), Some(maker.clone()));
        assert_eq!(find_maker(&mut conn, "zalman").await.unwrap(), None);

        let heatsink = insert_heatsink(&mut conn, maker.id, "CNPS10X", &spec()).await.unwrap();
        assert_eq!(
            find_heatsink(&mut conn, maker.id, "CNPS10X").await.unwrap(),
            Some(heatsink.clone())
        );

        let fan_config = insert_fan_config(&mut conn, heatsink.id, GEOMETRY).await.unwrap();
        assert_eq!(
            find_fan_config(&mut conn, heatsink.id, GEOMETRY).await.unwrap(),
            Some(fan_config.clone())
        );

        let measurement = insert_measurement(&mut conn, fan_config.id, 35, 62, &values()).await.unwrap();
        assert_eq!(
            find_measurement(&mut conn, fan_config.id, 35, 62).await.unwrap(),
            Some(measurement)
        );
        assert_eq!(find_measurement(&mut conn, fan_config.id, 35, 92).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_updates_touch_only_their_columns() {
        let db = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let maker = insert_maker(&mut conn, "Scythe").await.unwrap();
        let heatsink = insert_heatsink(&mut conn, maker.id, "Mugen 5", &spec()).await.unwrap();

        let prices = PriceFields {
            danawa_id: Some(4_000_000),
            price: Some(55_000),
            shop_count: Some(12),
            first_seen: None,
            image_url: Some("http://img/large.jpg".to_string()),
        };
        update_heatsink_price(&mut conn, heatsink.id, &prices).await.unwrap();

        let mut new_spec = spec();
        new_spec.height = Some(154.0);
        update_heatsink_spec(&mut conn, heatsink.id, &new_spec).await.unwrap();

        let stored = find_heatsink(&mut conn, maker.id, "Mugen 5").await.unwrap().unwrap();
        assert_eq!(stored.height, Some(154.0));
        assert_eq!(stored.price_fields(), prices);
    }

    #[tokio::test]
    async fn test_cascading_deletes_remove_owned_rows() {
        let db = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let maker = insert_maker(&mut conn, "Noctua").await.unwrap();
        let heatsink = insert_heatsink(&mut conn, maker.id, "NH-D15", &spec()).await.unwrap();
        let fan_config = insert_fan_config(&mut conn, heatsink.id, GEOMETRY).await.unwrap();
        insert_measurement(&mut conn, fan_config.id, 35, 62, &values()).await.unwrap();
        insert_measurement(&mut conn, fan_config.id, 35, 92, &values()).await.unwrap();
        drop(conn);

        let repository = CoolerRepository::new(db.pool().clone());
        assert_eq!(repository.export_rows().await.unwrap().len(), 2);

        let mut conn = db.pool().acquire().await.unwrap();
        assert_eq!(delete_maker_cascade(&mut conn, maker.id).await.unwrap(), 1);
        drop(conn);

        for kind in EntityKind::ALL {
            assert_eq!(repository.count(kind).await.unwrap(), 0, "{kind:?}");
        }
    }

    #[tokio::test]
    async fn test_heatsinks_listed_by_case_insensitive_name() {
        let db = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let maker = insert_maker(&mut conn, "3Rsystem").await.unwrap();
        insert_heatsink(&mut conn, maker.id, "iCEAGE 120", &spec()).await.unwrap();
        insert_heatsink(&mut conn, maker.id, "HAVANA", &spec()).await.unwrap();
        insert_heatsink(&mut conn, maker.id, "Arctic", &spec()).await.unwrap();
        drop(conn);

        let repository = CoolerRepository::new(db.pool().clone());
        let names: Vec<String> = repository
            .list_heatsinks()
            .await
            .unwrap()
            .into_iter()
            .map(|h| h.name)
            .collect();
        assert_eq!(names, vec!["Arctic", "HAVANA", "iCEAGE 120"]);

        let joined = repository.heatsinks_with_maker_names().await.unwrap();
        assert_eq!(joined[0].lookup_key(), "3rsystem iceage 120");
    }
}
