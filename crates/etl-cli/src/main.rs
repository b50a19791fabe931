//! Reference host binary: wires configuration, the mapping catalog, the
//! warehouse repository, and the orchestrator together for one
//! `process_source` invocation, then prints the resulting status as JSON.
//! Intentionally thin — no HTTP serving, no auth, no scheduling; those are
//! host responsibilities outside this crate (§1, §4.10).

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};

use etl_adapters::object_store::S3ObjectStore;
use etl_adapters::AmplitudeSource;
use etl_core::load_catalog;
use etl_orchestrator::{EtlConfig, Orchestrator};
use etl_persistence::{build_pool, BatchLimits, DbConfig, WarehouseRepository};

#[derive(Parser)]
#[command(name = "etl-cli", version, about = "Runs the user-properties ETL pipeline against one source")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to the mapping-catalog YAML document (§6 "Mapping catalog").
    #[arg(long, env = "ETL_CATALOG_PATH", default_value = "catalog.yaml", global = true)]
    catalog: PathBuf,

    /// Which Amplitude project this invocation's archive objects came from.
    #[arg(long, value_enum, default_value_t = AmplitudeSourceArg::Web, global = true)]
    amplitude_source: AmplitudeSourceArg,
}

#[derive(Subcommand)]
enum Command {
    /// Process a single archive object already materialized in object storage.
    Archive {
        #[arg(long)]
        bucket: String,
        #[arg(long)]
        prefix: String,
        #[arg(long, default_value_t = 0)]
        start_after: i64,
    },
    /// Walk `tmp_user_properties` forward from a start date, one day at a time.
    Staging {
        #[arg(long, value_parser = parse_date)]
        start_date: NaiveDate,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AmplitudeSourceArg {
    Web,
    Mobile,
}

impl From<AmplitudeSourceArg> for AmplitudeSource {
    fn from(value: AmplitudeSourceArg) -> Self {
        match value {
            AmplitudeSourceArg::Web => AmplitudeSource::Web,
            AmplitudeSourceArg::Mobile => AmplitudeSource::Mobile,
        }
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let catalog_yaml = std::fs::read_to_string(&cli.catalog)
        .with_context(|| format!("reading catalog from {}", cli.catalog.display()))?;
    let catalog = Arc::new(load_catalog(&catalog_yaml).context("loading mapping catalog")?);

    let db_config = DbConfig::from_env();
    let limits = BatchLimits::from(&db_config);
    let pool = build_pool(&db_config).await.context("building warehouse pool")?;
    let repository = WarehouseRepository::new(pool, limits);

    let etl_config = EtlConfig::from_env();
    let mut orchestrator = Orchestrator::new(repository, catalog, etl_config).await.context("preloading caches")?;

    let amplitude_source: AmplitudeSource = cli.amplitude_source.into();
    log::info!("processing with amplitude source {amplitude_source:?}");

    let outcome = match cli.command {
        Command::Archive { bucket, prefix, start_after } => {
            let object_store = S3ObjectStore::from_env().await;
            orchestrator
                .process_archive(&object_store, &bucket, &prefix, start_after)
                .await
                .context("processing archive source")?
        }
        Command::Staging { start_date } => {
            orchestrator.process_staging(start_date).await.context("processing staging source")?
        }
    };

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
