//! Data ingestion orchestrator - runs the fetch, parse, merge, enrich, write stages

use anyhow::Result;
use car_market_backend::config::Config;
use car_market_backend::ingestion::{Pipeline, Stage};
use std::env;
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .init();

    info!("Starting data ingestion pipeline");

    // Load configuration from environment
    let config = Config::from_env()?;
    info!(
        "Configuration loaded: data dir {:?}, sources {:?}",
        config.data_dir, config.source_order
    );

    let pipeline = Pipeline::new(&config);

    // Determine which stages to run (from command line args or run all)
    let args: Vec<String> = env::args().skip(1).collect();
    let stages: Vec<Stage> = if args.is_empty() {
        Stage::ALL.to_vec()
    } else {
        args.iter()
            .filter_map(|name| {
                let stage = Stage::from_name(name);
                if stage.is_none() {
                    warn!("Unknown stage: {}", name);
                }
                stage
            })
            .collect()
    };

    let failures = pipeline.run_stages(&stages);

    info!("Data ingestion pipeline complete ({} failed)", failures);

    if failures > 0 {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
