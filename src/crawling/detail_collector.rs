//! # Detail Collector
//!
//! Fetches, classifies and accumulates detail records for candidate ids.
//!
//! Candidates are processed in batches. Inside a batch a fixed pool of worker tasks drains
//! a shared queue; each worker runs the per-item state machine and sends its report over a
//! channel to the aggregation loop, which orders reports by candidate position before they
//! touch the run state. The target, pause and deadline checks run between batches, so the
//! collected set depends only on candidate order and the responses received.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use fastrand::Rng;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::crawling::state::{
    CollectionStats, FailureReason, ItemReport, ItemState, RunState, Termination, ThrottleBackoff,
};
use crate::domain::{CatalogEntry, EligibilityPolicy, NormalizedRecord, sample_ids};
use crate::infrastructure::config::CollectionConfig;
use crate::infrastructure::http_client::HttpError;
use crate::infrastructure::steam_api::{AppDataSource, parse_app_details};

/// Result of a collection run
#[derive(Debug, Clone)]
pub struct CollectionOutcome {
    /// Qualifying records in collection order
    pub records: Vec<NormalizedRecord>,
    pub stats: CollectionStats,
    pub termination: Termination,
}

#[derive(Clone)]
pub struct DetailCollector {
    source: Arc<dyn AppDataSource>,
    policy: Arc<EligibilityPolicy>,
    config: CollectionConfig,
    backoff: Arc<ThrottleBackoff>,
}

impl DetailCollector {
    pub fn new(
        source: Arc<dyn AppDataSource>,
        policy: EligibilityPolicy,
        config: CollectionConfig,
    ) -> Self {
        let backoff = Arc::new(ThrottleBackoff::new(
            Duration::from_millis(config.throttle_initial_backoff_ms),
            Duration::from_millis(config.throttle_max_backoff_ms),
        ));
        Self {
            source,
            policy: Arc::new(policy),
            config,
            backoff,
        }
    }

    /// Collects until the target is met, candidates run out after the allowed re-samples,
    /// or the run budget is spent.
    ///
    /// Re-samples always draw from the full `catalog`. Ids already attempted in this run
    /// are never fetched twice.
    pub async fn collect(
        &self,
        catalog: &[CatalogEntry],
        candidates: Vec<u32>,
        rng: &mut Rng,
    ) -> CollectionOutcome {
        let mut state = RunState::new(self.config.min_records);
        let mut queue: VecDeque<u32> = candidates.into();
        let budget = self.config.run_budget();

        info!(
            "🚀 Collecting details: {} candidates, target {} records, {} workers",
            queue.len(),
            self.config.min_records,
            self.config.concurrency
        );

        let termination = loop {
            if state.target_reached() {
                break Termination::TargetReached;
            }
            if state.elapsed() >= budget {
                warn!("⏰ Run time budget of {:?} spent", budget);
                break Termination::DeadlineExceeded;
            }

            let batch = next_batch(&mut queue, &mut state, self.config.batch_size);
            if batch.is_empty() {
                if state.stats.resample_rounds >= self.config.max_resample_rounds {
                    break Termination::CandidatesExhausted;
                }
                state.stats.resample_rounds += 1;
                queue = sample_ids(catalog, self.config.candidate_pool_size, rng)
                    .into_iter()
                    .filter(|id| !state.attempted.contains(id))
                    .collect();
                info!(
                    "🔁 Insufficient data ({}/{}), re-sample round {} drew {} new candidates",
                    state.records.len(),
                    state.target,
                    state.stats.resample_rounds,
                    queue.len()
                );
                if queue.is_empty() {
                    break Termination::CandidatesExhausted;
                }
                continue;
            }

            for report in self.run_batch(batch).await {
                state.absorb(report);
            }
            debug!(
                "📦 Batch done: {} records, {} attempted",
                state.records.len(),
                state.stats.attempted
            );

            if !state.target_reached() && state.pause_due(self.config.pause_every) {
                let pause = self.backoff.current();
                info!(
                    "⏸️ Collected {} records, pausing all workers for {:?}",
                    state.records.len(),
                    pause
                );
                tokio::time::sleep(pause).await;
            }
        };

        info!(
            "🏁 Collection finished ({}): {} records from {} attempted ids",
            termination,
            state.records.len(),
            state.stats.attempted
        );

        CollectionOutcome {
            records: state.records,
            stats: state.stats,
            termination,
        }
    }

    /// Runs one batch on the worker pool and returns reports in batch order
    async fn run_batch(&self, batch: Vec<u32>) -> Vec<ItemReport> {
        let size = batch.len();
        let workers = self.config.concurrency.clamp(1, size.max(1));
        let queue = Arc::new(Mutex::new(
            batch.into_iter().enumerate().collect::<VecDeque<_>>(),
        ));
        let (tx, mut rx) = mpsc::channel::<(usize, ItemReport)>(workers);

        let mut pool = JoinSet::new();
        for _ in 0..workers {
            let queue = Arc::clone(&queue);
            let tx = tx.clone();
            let collector = self.clone();
            pool.spawn(async move {
                loop {
                    let next = queue.lock().await.pop_front();
                    let Some((index, app_id)) = next else { break };
                    let report = collector.process_item(app_id).await;
                    if tx.send((index, report)).await.is_err() {
                        break;
                    }
                }
            });
        }
        drop(tx);

        let mut reports = Vec::with_capacity(size);
        while let Some(entry) = rx.recv().await {
            reports.push(entry);
        }
        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                error!("💥 Detail worker stopped abnormally: {}", e);
            }
        }

        reports.sort_by_key(|(index, _)| *index);
        reports.into_iter().map(|(_, report)| report).collect()
    }

    /// Drives one id through `Pending -> Requesting -> {terminal}`.
    ///
    /// A 429 moves the item to `Throttled`: it sleeps for the shared backoff while holding
    /// its worker slot, then either retries or, after `throttle_max_attempts` throttled
    /// responses, gives up.
    pub async fn process_item(&self, app_id: u32) -> ItemReport {
        let mut report = ItemReport::new(app_id);
        let mut throttled = 0;

        let mut state = ItemState::Pending;
        while !state.is_terminal() {
            state = match state {
                ItemState::Pending => ItemState::Requesting,
                ItemState::Requesting => {
                    report.requests += 1;
                    match self.source.fetch_details(app_id).await {
                        Ok(body) => self.classify_body(app_id, &body),
                        Err(HttpError::Throttled { retry_after, .. }) => {
                            throttled += 1;
                            debug!(app_id, ?retry_after, "throttled ({throttled})");
                            ItemState::Throttled
                        }
                        Err(e) => outcome_for_error(&e),
                    }
                }
                ItemState::Throttled => {
                    let delay = self.backoff.escalate();
                    warn!(
                        "🐢 Rate limit hit for AppID {}, sleeping {:?}",
                        app_id, delay
                    );
                    report.throttle_backoffs.push(delay);
                    tokio::time::sleep(delay).await;
                    if throttled >= self.config.throttle_max_attempts {
                        ItemState::Failed(FailureReason::ThrottleExhausted)
                    } else {
                        ItemState::Requesting
                    }
                }
                terminal => terminal,
            };
        }

        match &state {
            ItemState::Success(record) => {
                info!("✅ Collected AppID {} ({})", app_id, record.name);
            }
            ItemState::Skipped(reason) => debug!("⏭️ Skipped AppID {}: {}", app_id, reason),
            ItemState::Forbidden => warn!("🚫 Access forbidden for AppID {}, skipping", app_id),
            ItemState::Failed(reason) => warn!("❌ AppID {} failed: {}", app_id, reason),
            ItemState::Pending | ItemState::Requesting | ItemState::Throttled => {}
        }
        debug!(
            app_id,
            state = state.label(),
            requests = report.requests,
            "item finished"
        );

        report.state = state;
        report
    }

    fn classify_body(&self, app_id: u32, body: &str) -> ItemState {
        match parse_app_details(app_id, body) {
            Err(e) => ItemState::Failed(FailureReason::Decode(e.to_string())),
            Ok(None) => ItemState::Failed(FailureReason::NotListed),
            Ok(Some(detail)) => match self.policy.classify(&detail) {
                Ok(record) => ItemState::Success(record),
                Err(rejection) => ItemState::Skipped(rejection),
            },
        }
    }
}

fn outcome_for_error(error: &HttpError) -> ItemState {
    match error {
        HttpError::Status { status: 403, .. } => ItemState::Forbidden,
        HttpError::Status { status, .. } => ItemState::Failed(FailureReason::Http(*status)),
        HttpError::Throttled { .. } => ItemState::Throttled,
        HttpError::Timeout { .. } => ItemState::Failed(FailureReason::Timeout),
        HttpError::Transport { message, .. } => {
            ItemState::Failed(FailureReason::Transport(message.clone()))
        }
        HttpError::InvalidUrl(url) => ItemState::Failed(FailureReason::InvalidRequest(url.clone())),
    }
}

/// Pops up to `size` ids that have not been attempted yet, claiming them
fn next_batch(queue: &mut VecDeque<u32>, state: &mut RunState, size: usize) -> Vec<u32> {
    let mut batch = Vec::with_capacity(size.min(queue.len()));
    while batch.len() < size {
        let Some(app_id) = queue.pop_front() else { break };
        if state.claim(app_id) {
            batch.push(app_id);
        }
    }
    batch
}
