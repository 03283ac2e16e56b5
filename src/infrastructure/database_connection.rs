// Database connection and pool management
// This module handles SQLite database connections using sqlx

use std::str::FromStr;

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{debug, info};

const IN_MEMORY_URL: &str = "sqlite::memory:";

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS maker (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS heatsink (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        maker_id INTEGER NOT NULL REFERENCES maker (id) ON DELETE CASCADE,
        width REAL,
        depth REAL,
        height REAL,
        heatsink_type TEXT NOT NULL,
        weight REAL,
        danawa_id INTEGER,
        price INTEGER,
        shop_count INTEGER,
        first_seen DATETIME,
        image_url TEXT,
        UNIQUE (name, maker_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_heatsink_maker_id ON heatsink (maker_id)",
    r#"
    CREATE TABLE IF NOT EXISTS fan_config (
        id INTEGER PRIMARY KEY,
        heatsink_id INTEGER NOT NULL REFERENCES heatsink (id) ON DELETE CASCADE,
        fan_size INTEGER NOT NULL,
        fan_thickness INTEGER NOT NULL,
        fan_count INTEGER NOT NULL,
        UNIQUE (heatsink_id, fan_size, fan_thickness, fan_count)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_fan_config_heatsink_id ON fan_config (heatsink_id)",
    r#"
    CREATE TABLE IF NOT EXISTS measurement (
        id INTEGER PRIMARY KEY,
        fan_config_id INTEGER NOT NULL REFERENCES fan_config (id) ON DELETE CASCADE,
        noise INTEGER NOT NULL,
        power INTEGER NOT NULL,
        noise_actual_min REAL,
        noise_actual_max REAL,
        rpm_min INTEGER,
        rpm_max INTEGER,
        cpu_temp_delta REAL NOT NULL,
        power_temp_delta REAL,
        UNIQUE (fan_config_id, noise, power)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_measurement_fan_config_id ON measurement (fan_config_id)",
    "CREATE INDEX IF NOT EXISTS idx_measurement_noise_power ON measurement (noise, power)",
    r#"
    CREATE TABLE IF NOT EXISTS cache_entries (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        expires_at INTEGER
    )
    "#,
];

const DROP_SCHEMA: &[&str] = &[
    "DROP TABLE IF EXISTS measurement",
    "DROP TABLE IF EXISTS fan_config",
    "DROP TABLE IF EXISTS heatsink",
    "DROP TABLE IF EXISTS maker",
    "DROP TABLE IF EXISTS cache_entries",
];

#[derive(Debug, Clone)]
pub struct DatabaseConnection {
    pool: SqlitePool,
}

impl DatabaseConnection {
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal);

        if let Some(parent) = options.get_filename().parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await?;

        info!("Connected to database {}", database_url);
        Ok(Self { pool })
    }

    /// A private in-memory database. The pool holds a single connection that
    /// is never recycled, since every connection would see its own database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str(IN_MEMORY_URL)?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create all tables that do not exist yet
    pub async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        debug!("Database schema is up to date");
        Ok(())
    }

    /// Drop every table, data and cache included
    pub async fn drop_all(&self) -> Result<()> {
        for statement in DROP_SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("Dropped all tables");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
