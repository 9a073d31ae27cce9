//! # Oracle to S3 Table Exporter
//!
//! A single-shot job that copies a fixed set of Oracle tables to S3. Each table
//! is read in full, written to scratch storage as a comma-delimited file, and
//! uploaded once every table has been extracted.
//!
//! The application follows the **Hexagonal Architecture** (Ports and Adapters):
//! the pipeline only sees the `DatabasePort` and `StoragePort` traits, and the
//! Oracle and S3 adapters are wired in here.
//!
//! The process prints the invocation response (`{"statusCode": .., "body": ..}`)
//! on stdout and exits non-zero when the run failed.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ports;

use crate::application::orchestrator::PipelineOrchestrator;
use crate::config::{AppConfig, CliArgs};
use crate::domain::entities::RunStatus;
use crate::domain::errors::Result;
use crate::infrastructure::object_storage::object_store_adapter::ObjectStoreAdapter;
use crate::infrastructure::oracle::oracle_database_adapter::OracleDatabaseAdapter;
use clap::Parser;
use log::{error, info};
use std::process;
use std::sync::Arc;

fn main() {
    // 1. Initialize Logging
    env_logger::init();

    // 2. Parse Arguments
    let args = CliArgs::parse();

    // 3. Load, merge and check the configuration, then run
    let status = match load_config(&args).and_then(|config| run(&config)) {
        Ok(status) => status,
        Err(e) => {
            error!("Export could not start: {}", e);
            RunStatus::failure(&e)
        }
    };

    match serde_json::to_string(&status) {
        Ok(json) => println!("{}", json),
        Err(e) => error!("Failed to encode run status: {}", e),
    }

    if !status.is_success() {
        process::exit(1);
    }
}

fn load_config(args: &CliArgs) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::from_env()?,
    };
    config.merge_cli(args);
    config.validate()?;
    Ok(config)
}

fn run(config: &AppConfig) -> Result<RunStatus> {
    let prefetch = config.database.prefetch_rows.unwrap_or(5000);
    let database = Arc::new(OracleDatabaseAdapter::new(prefetch));
    let storage = Arc::new(ObjectStoreAdapter::s3(&config.storage)?);

    info!(
        "Exporting to bucket {} via scratch dir {}",
        config.storage.bucket,
        config.export.scratch_dir().display()
    );

    let orchestrator = PipelineOrchestrator::new(database, storage, config)?;
    Ok(orchestrator.run())
}
