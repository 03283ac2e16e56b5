//! Operator command line
//!
//! Each subcommand builds what it needs from [`AppConfig`], runs once and
//! prints its result to stdout. Diagnostics go through `tracing`.

use std::io::Write;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::application::{export_data, AppState, UpdateOutcome};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::database_connection::DatabaseConnection;

#[derive(Parser, Debug)]
#[command(name = "cpucoolerchart", version, about = "CPU cooler chart data manager")]
pub struct Cli {
    /// Config file to load instead of the default location
    #[arg(long, global = true, env = "CPUCOOLERCHART_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "lowercase")]
pub enum Commands {
    /// Fetch the charts and reconcile them into the database
    Update {
        /// Run even if the data is not stale yet
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Print the whole dataset as delimited text
    Export {
        /// Field delimiter; `\t` selects a tab
        #[arg(long, default_value = ",", value_parser = parse_delimiter)]
        delim: u8,
    },
    /// Search Danawa product ids for heatsinks that have none
    Danawa,
    /// Create missing tables
    Createdb,
    /// Drop every table
    Dropdb {
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
    /// Drop and recreate every table
    Resetdb {
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
    /// Remove every cache entry, scheduler state included
    Clearcache,
    /// Show whether an update is due or running and when data was last updated
    Status,
}

/// Accept a single-byte delimiter, or the two-character escape `\t`
pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "\\t" | "\t" => Ok(b'\t'),
        _ => match value.as_bytes() {
            [byte] if byte.is_ascii() => Ok(*byte),
            _ => Err(format!("delimiter must be a single ASCII character, got {value:?}")),
        },
    }
}

pub fn load_config(cli: &Cli) -> Result<AppConfig> {
    let config = match &cli.config {
        Some(path) => AppConfig::from_source(path, true),
        None => AppConfig::load(),
    };
    config.context("Failed to load configuration")
}

pub async fn run(cli: Cli, config: AppConfig) -> Result<()> {
    match cli.command {
        Commands::Update { force } => update(config, force).await,
        Commands::Export { delim } => {
            let state = AppState::initialize(config).await?;
            let text = export_data(&state.repository(), delim).await?;
            std::io::stdout()
                .write_all(text.as_bytes())
                .context("Failed to write export")
        }
        Commands::Danawa => danawa(config).await,
        Commands::Createdb => {
            let database = DatabaseConnection::new(&config.database_url).await?;
            database.migrate().await?;
            info!("Created tables in {}", config.database_url);
            Ok(())
        }
        Commands::Dropdb { yes } => {
            confirm(yes, "dropdb")?;
            let database = DatabaseConnection::new(&config.database_url).await?;
            database.drop_all().await
        }
        Commands::Resetdb { yes } => {
            confirm(yes, "resetdb")?;
            let database = DatabaseConnection::new(&config.database_url).await?;
            database.drop_all().await?;
            database.migrate().await
        }
        Commands::Clearcache => {
            let state = AppState::initialize(config).await?;
            state.cache.clear().await?;
            println!("Cache cleared");
            Ok(())
        }
        Commands::Status => status(config).await,
    }
}

fn confirm(yes: bool, command: &str) -> Result<()> {
    if !yes {
        bail!("{command} deletes all data; pass --yes to confirm");
    }
    Ok(())
}

async fn update(config: AppConfig, force: bool) -> Result<()> {
    let state = AppState::initialize(config).await?;
    match state.update_service().update_data(force).await? {
        UpdateOutcome::UpToDate => println!("Data is already up to date"),
        UpdateOutcome::AlreadyRunning => println!("An update is already running"),
        UpdateOutcome::Completed(summary) => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        UpdateOutcome::Failed(message) => bail!(message),
    }
    Ok(())
}

async fn danawa(config: AppConfig) -> Result<()> {
    let state = AppState::initialize(config).await?;
    let candidates = state.update_service().enricher().search_product_ids().await?;

    let mut out = std::io::stdout().lock();
    for candidate in candidates {
        writeln!(
            out,
            "{} {} ({} results)",
            candidate.maker, candidate.model, candidate.results.total_count
        )?;
        for hit in &candidate.results.products {
            writeln!(
                out,
                "    {:>10}  {} {}  {}",
                hit.prod_id, hit.maker, hit.prod_name, hit.min_price
            )?;
        }
    }
    Ok(())
}

async fn status(config: AppConfig) -> Result<()> {
    let state = AppState::initialize(config).await?;
    let scheduler = state.scheduler();
    let last_updated = scheduler
        .last_updated()
        .await?
        .map(|at| at.to_rfc3339())
        .unwrap_or_else(|| "never".to_string());

    println!("state:        {}", scheduler.state().await?.as_str());
    println!("last updated: {last_updated}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(",", b',')]
    #[case("\\t", b'\t')]
    #[case("\t", b'\t')]
    #[case("|", b'|')]
    fn test_parse_delimiter(#[case] input: &str, #[case] expected: u8) {
        assert_eq!(parse_delimiter(input), Ok(expected));
    }

    #[rstest]
    #[case("")]
    #[case(",,")]
    #[case("é")]
    fn test_parse_delimiter_rejects(#[case] input: &str) {
        assert!(parse_delimiter(input).is_err());
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["cpucoolerchart", "export", "--delim", "\\t"]).unwrap();
        assert!(matches!(cli.command, Commands::Export { delim: b'\t' }));

        let cli = Cli::try_parse_from(["cpucoolerchart", "update", "--force"]).unwrap();
        assert!(matches!(cli.command, Commands::Update { force: true }));

        let cli = Cli::try_parse_from(["cpucoolerchart", "resetdb"]).unwrap();
        assert!(matches!(cli.command, Commands::Resetdb { yes: false }));
    }

    #[test]
    fn test_destructive_commands_need_confirmation() {
        assert!(confirm(false, "dropdb").is_err());
        assert!(confirm(true, "dropdb").is_ok());
    }
}
