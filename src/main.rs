//! Mirror availability checker (v1)
//!
//! Reads the mirror service manifest and every mirror descriptor, then
//! checks that each mirror serves the repository index of every required
//! (version, repo) pair.
//!
//! # Architecture Overview
//!
//! ```text
//!   settings.toml ──▶ config ──────────────┐
//!                                          ▼
//!   config.yml ─────▶ manifest::loader ──▶ runner ──▶ probe::prober ──▶ mirrors
//!   mirrors.d/*.yml ─▶ (schema, subnets)    │          (bounded fan-out)
//!                                          ▼
//!                                 name: available|unavailable
//!
//!   Cross-cutting: observability (tracing, optional Prometheus exporter)
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Parser;

use mirror_check::config::validation::validate_settings;
use mirror_check::config::{load_settings, CheckerConfig, ConfigError};
use mirror_check::observability::{logging, metrics};
use mirror_check::runner;

#[derive(Parser)]
#[command(name = "mirror-check")]
#[command(about = "Check which mirrors serve every required repository", long_about = None)]
struct Cli {
    /// Checker settings (TOML)
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Global manifest; defaults to $CONFIG_ROOT/mirrors/updates/config.yml
    #[arg(short, long)]
    manifest: Option<PathBuf>,

    /// Directory of mirror descriptors, overriding the manifest's
    #[arg(long)]
    mirrors_dir: Option<PathBuf>,

    /// Maximum number of mirrors probed at once
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn into_config(self) -> Result<(CheckerConfig, bool), ConfigError> {
        let mut config = match &self.settings {
            Some(path) => load_settings(path)?,
            None => CheckerConfig::default(),
        };

        if self.manifest.is_some() {
            config.manifest_path = self.manifest;
        }
        if self.mirrors_dir.is_some() {
            config.mirrors_dir = self.mirrors_dir;
        }
        if let Some(concurrency) = self.concurrency {
            config.probe.concurrency = concurrency;
        }

        validate_settings(&config).map_err(ConfigError::Settings)?;
        Ok((config, self.json))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (config, json) = Cli::parse().into_config()?;

    logging::init_tracing(&config.observability.log_level);
    tracing::info!("mirror-check v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        // Address was checked by validate_settings.
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        }
    }

    let results = runner::run(&config).await?;
    let verdicts: BTreeMap<String, bool> = results
        .into_iter()
        .map(|result| (result.name, result.available))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&verdicts)?);
    } else {
        for (name, available) in &verdicts {
            let state = if *available { "available" } else { "unavailable" };
            println!("{}: {}", name, state);
        }
    }

    Ok(())
}
