//! Command line entry point
//!
//! Exit codes: 0 for any completed run (including partial or empty results), 2 when an
//! output file could not be written, 1 for configuration or setup errors.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use steam_indie_sampler::infrastructure::{AppConfig, init_logging_with_config};
use steam_indie_sampler::Pipeline;

#[derive(Parser, Debug)]
#[command(name = "steam-indie-sampler", version, about)]
struct Cli {
    /// Config file (TOML, JSON or YAML)
    #[arg(short, long, env = "SAMPLER_CONFIG")]
    config: Option<PathBuf>,

    /// Seed for sampling and balancing
    #[arg(long)]
    seed: Option<u64>,

    /// Directory for the CSV outputs
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Minimum number of qualifying records to collect
    #[arg(long)]
    min_records: Option<usize>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(dir) = &self.output_dir {
            config.output.dir.clone_from(dir);
        }
        if let Some(min_records) = self.min_records {
            config.collection.min_records = min_records;
        }
        if self.verbose {
            config.logging.level = "debug".to_string();
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    init_logging_with_config(&config.logging).context("Failed to initialize logging")?;
    info!("🎮 steam-indie-sampler v{}", env!("CARGO_PKG_VERSION"));

    let pipeline = Pipeline::from_config(config).context("Failed to build HTTP client")?;
    let report = pipeline.run().await;

    info!(
        "📊 catalog {} | attempted {} | collected {} | skipped {} | forbidden {} | failed {} | throttled {}",
        report.catalog_size,
        report.stats.attempted,
        report.stats.succeeded,
        report.stats.skipped,
        report.stats.forbidden,
        report.stats.failed,
        report.stats.throttled_responses
    );

    if report.outputs_written() {
        info!(
            "Data saved to {} and {}",
            report.balanced.path.display(),
            report.all.path.display()
        );
        Ok(ExitCode::SUCCESS)
    } else {
        for output in [&report.all, &report.balanced] {
            if let Some(e) = &output.error {
                error!("Output {} was not written: {}", output.path.display(), e);
            }
        }
        Ok(ExitCode::from(2))
    }
}
