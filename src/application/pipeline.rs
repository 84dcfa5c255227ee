//! Collection pipeline
//!
//! catalog -> candidate sample -> detail collection -> stratified balance -> CSV outputs.
//! A run never fails as a whole: every stage degrades, and the two outputs are persisted
//! independently so one failed write leaves the other intact.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use fastrand::Rng;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::crawling::{
    CatalogFetcher, CollectionOutcome, CollectionStats, DetailCollector, Termination,
};
use crate::domain::{BalanceMode, NormalizedRecord, balance, sample_ids};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::csv_writer::{CsvWriter, PersistError};
use crate::infrastructure::http_client::{HttpClient, HttpError};
use crate::infrastructure::steam_api::{AppDataSource, SteamClient};

/// Outcome of persisting one output file
#[derive(Debug)]
pub struct OutputReport {
    pub path: PathBuf,
    pub rows: usize,
    pub error: Option<PersistError>,
}

impl OutputReport {
    pub const fn is_written(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub catalog_size: usize,
    pub stats: CollectionStats,
    pub termination: Termination,
    pub balance_mode: BalanceMode,
    /// Balanced rows per bucket: low, moderate, high
    pub bucket_counts: [usize; 3],
    pub all: OutputReport,
    pub balanced: OutputReport,
}

impl PipelineReport {
    pub const fn outputs_written(&self) -> bool {
        self.all.is_written() && self.balanced.is_written()
    }
}

pub struct Pipeline {
    config: AppConfig,
    source: Arc<dyn AppDataSource>,
    writer: CsvWriter,
}

impl Pipeline {
    pub fn new(config: AppConfig, source: Arc<dyn AppDataSource>) -> Self {
        Self {
            config,
            source,
            writer: CsvWriter,
        }
    }

    /// Builds the pipeline against the live store API
    pub fn from_config(config: AppConfig) -> Result<Self, HttpError> {
        let http = HttpClient::new(&config.http, &config.api)?;
        let client = SteamClient::new(http, &config.api)?;
        Ok(Self::new(config, Arc::new(client)))
    }

    pub async fn run(&self) -> PipelineReport {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", %run_id);
        self.run_inner(run_id).instrument(span).await
    }

    async fn run_inner(&self, run_id: Uuid) -> PipelineReport {
        let started_at = Utc::now();
        let clock = Instant::now();
        let mut rng = self.config.seed.map_or_else(Rng::new, Rng::with_seed);
        match self.config.seed {
            Some(seed) => info!("🎲 Seeded run (seed {})", seed),
            None => info!("🎲 Unseeded run; sampling is not reproducible"),
        }

        let catalog = CatalogFetcher::new(Arc::clone(&self.source)).fetch().await;
        let collection = if catalog.is_empty() {
            warn!("📭 Catalog is empty, nothing to sample");
            CollectionOutcome {
                records: Vec::new(),
                stats: CollectionStats::default(),
                termination: Termination::EmptyCatalog,
            }
        } else {
            let collector = DetailCollector::new(
                Arc::clone(&self.source),
                self.config.eligibility.clone(),
                self.config.collection.clone(),
            );
            let candidates =
                sample_ids(&catalog, self.config.collection.candidate_pool_size, &mut rng);
            collector.collect(&catalog, candidates, &mut rng).await
        };

        let balanced = balance(
            &collection.records,
            self.config.balance.per_bucket_cap,
            self.config.collection.min_records,
            &mut rng,
        );
        if balanced.mode == BalanceMode::Degraded {
            warn!(
                "⚖️ Stratified sample below target ({}), using the first {} records unbalanced",
                self.config.collection.min_records,
                balanced.records.len()
            );
        }
        info!(
            "⚖️ Balanced sample: {} low, {} moderate, {} high",
            balanced.bucket_counts[0], balanced.bucket_counts[1], balanced.bucket_counts[2]
        );

        let all = self.persist(&self.config.output.all_path(), &collection.records);
        let balanced_output = self.persist(&self.config.output.balanced_path(), &balanced.records);

        let report = PipelineReport {
            run_id,
            started_at,
            elapsed: clock.elapsed(),
            catalog_size: catalog.len(),
            stats: collection.stats,
            termination: collection.termination,
            balance_mode: balanced.mode,
            bucket_counts: balanced.bucket_counts,
            all,
            balanced: balanced_output,
        };
        info!(
            "🏁 Run finished in {:?}: {} qualifying, {} balanced ({})",
            report.elapsed, report.all.rows, report.balanced.rows, report.termination
        );
        report
    }

    fn persist(&self, path: &Path, records: &[NormalizedRecord]) -> OutputReport {
        let error = match self.writer.write(path, records) {
            Ok(_) => None,
            Err(e) => {
                error!("❌ {}", e);
                Some(e)
            }
        };
        OutputReport {
            path: path.to_path_buf(),
            rows: records.len(),
            error,
        }
    }
}
