//! Readiness probe mirroring the compose healthcheck
//!
//! The container runtime runs `pg_isready` inside the container; from the
//! host we do the equivalent through the published port, with the
//! manifest's interval, timeout and retry budget.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use vectl_core::{ComposeFile, ReadinessProbe};
use vectl_embed::{wait_until_ready, Settings};

use crate::ui;

#[derive(Parser, Debug)]
pub struct HealthArgs {
    /// Compose manifest to read probe parameters from (default from config)
    #[arg(long, value_name = "PATH")]
    pub compose: Option<PathBuf>,

    /// Override the number of consecutive failures tolerated
    #[arg(long)]
    pub retries: Option<u32>,

    /// Only probe postgres
    #[arg(long)]
    pub skip_elastic: bool,
}

pub async fn run_health(args: HealthArgs, settings: &Settings) -> Result<()> {
    let path = args
        .compose
        .clone()
        .unwrap_or_else(|| settings.config.database.compose_file.clone());

    let mut probe = if path.exists() {
        ComposeFile::from_path(&path)?.readiness()?
    } else {
        warn!("{} not found, using runtime default probe", path.display());
        ReadinessProbe::default()
    };
    if let Some(retries) = args.retries {
        probe.retries = retries;
    }

    let database_url = settings.database_url()?;
    info!(
        interval = ?probe.interval,
        timeout = ?probe.timeout,
        retries = probe.retries,
        "probing database"
    );

    let attempts = ui::with_spinner_async(
        "waiting for postgres",
        "postgres is ready",
        wait_until_ready(database_url, &probe),
    )
    .await?;
    println!("postgres: ready ({attempts} attempt(s))");

    if !args.skip_elastic {
        let info = ui::with_spinner_async(
            "checking elasticsearch",
            "elasticsearch is up",
            settings.elastic().ping(),
        )
        .await?;
        let version = info["version"]["number"].as_str().unwrap_or("unknown");
        println!("elasticsearch: up (version {version})");
    }

    Ok(())
}
