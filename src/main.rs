//! # Stats Server - Entry Point
//! src/main.rs
//!
//! Carga configuración y dataset, arranca el pool de workers y deja el
//! servidor escuchando en el thread principal.

use anyhow::Context;
use stats_server::analytics::{Analytics, Dataset};
use stats_server::config::Config;
use stats_server::jobs::{JobManager, JobManagerConfig};
use stats_server::logging::init_logging;
use stats_server::server::Server;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

fn main() -> anyhow::Result<()> {
    let config = Config::new();
    config.validate().context("invalid configuration")?;

    // El guard mantiene vivo el writer del archivo de log
    let _logging = init_logging(&config.log_dir, &config.log_file, config.log_max_files)
        .with_context(|| format!("cannot initialize logging in {}", config.log_dir))?;

    info!("=================================");
    info!("  Stats Server HTTP/1.0");
    info!("=================================");
    config.log_summary();

    let dataset = Dataset::load(Path::new(&config.dataset))?;
    info!(rows = dataset.len(), path = %config.dataset, "dataset loaded");

    let manager = JobManager::start(
        &JobManagerConfig::from_config(&config),
        Arc::new(Analytics::new(dataset)),
    )?;

    let server = Server::bind(&config, Arc::new(manager))?;
    server.run().context("server stopped unexpectedly")?;

    Ok(())
}
