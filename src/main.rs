use anyhow::Result;
use clap::Parser;
use cpu_cooler_chart::commands::{self, Cli};
use cpu_cooler_chart::infrastructure::init_logging_with_config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = commands::load_config(&cli)?;
    init_logging_with_config(&config.logging)?;

    commands::run(cli, config).await
}
