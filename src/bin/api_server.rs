// HTTP API server binary for cpucoolerchart

use anyhow::{Context, Result};
use cpu_cooler_chart::api::ApiServer;
use cpu_cooler_chart::application::AppState;
use cpu_cooler_chart::infrastructure::{init_logging_with_config, AppConfig};

#[actix_web::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    init_logging_with_config(&config.logging)?;

    tracing::info!("Initializing cpucoolerchart API server");

    let server = ApiServer::from_config(&config.server);
    let state = AppState::initialize(config).await?;

    tracing::info!("Database connected successfully");

    server.run(state).await
}
