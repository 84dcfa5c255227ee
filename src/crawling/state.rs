//! # Run State
//!
//! Per-item outcome types, the shared throttle backoff and the run-scoped accumulator.
//! `RunState` has a single owner (the collector's aggregation loop); workers only ever
//! hand it finished [`ItemReport`]s.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::domain::{NormalizedRecord, Rejection};

/// Exponential backoff shared by every worker for HTTP 429 responses.
///
/// Each escalation hands out the current duration and doubles the stored value for the
/// next caller, capped at the maximum. The value is never reset during a run.
#[derive(Debug)]
pub struct ThrottleBackoff {
    current_ms: AtomicU64,
    max_ms: u64,
}

impl ThrottleBackoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        let max_ms = max.as_millis() as u64;
        Self {
            current_ms: AtomicU64::new((initial.as_millis() as u64).min(max_ms)),
            max_ms,
        }
    }

    pub fn current(&self) -> Duration {
        Duration::from_millis(self.current_ms.load(Ordering::SeqCst))
    }

    /// Returns the duration to sleep now and doubles the stored value
    pub fn escalate(&self) -> Duration {
        let max_ms = self.max_ms;
        let previous = self
            .current_ms
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |ms| {
                Some(ms.saturating_mul(2).max(1).min(max_ms))
            })
            .unwrap_or_else(|ms| ms);
        Duration::from_millis(previous)
    }
}

/// Why an identifier was abandoned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    Http(u16),
    Decode(String),
    /// The store answered without a successful entry for the id
    NotListed,
    Timeout,
    Transport(String),
    InvalidRequest(String),
    ThrottleExhausted,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(status) => write!(f, "HTTP {status}"),
            Self::Decode(message) => write!(f, "undecodable body: {message}"),
            Self::NotListed => f.write_str("not listed"),
            Self::Timeout => f.write_str("timed out"),
            Self::Transport(message) => write!(f, "transport error: {message}"),
            Self::InvalidRequest(message) => write!(f, "invalid request: {message}"),
            Self::ThrottleExhausted => f.write_str("still throttled after backoff"),
        }
    }
}

/// Per-identifier fetch-and-classify state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemState {
    Pending,
    Requesting,
    Throttled,
    Success(NormalizedRecord),
    Skipped(Rejection),
    Forbidden,
    Failed(FailureReason),
}

impl ItemState {
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Success(_) | Self::Skipped(_) | Self::Forbidden | Self::Failed(_)
        )
    }

    pub const fn label(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Requesting => "requesting",
            Self::Throttled => "throttled",
            Self::Success(_) => "success",
            Self::Skipped(_) => "skipped",
            Self::Forbidden => "forbidden",
            Self::Failed(_) => "failed",
        }
    }
}

/// Final outcome of one identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReport {
    pub app_id: u32,
    pub state: ItemState,
    pub requests: u32,
    /// Sleeps taken after 429 responses, in order
    pub throttle_backoffs: Vec<Duration>,
}

impl ItemReport {
    pub const fn new(app_id: u32) -> Self {
        Self {
            app_id,
            state: ItemState::Pending,
            requests: 0,
            throttle_backoffs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectionStats {
    pub attempted: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub forbidden: usize,
    pub failed: usize,
    pub throttled_responses: usize,
    pub requests: usize,
    pub resample_rounds: u32,
    pub pauses: usize,
}

/// How the collection loop ended. All of these are normal outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    TargetReached,
    CandidatesExhausted,
    DeadlineExceeded,
    EmptyCatalog,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::TargetReached => "target reached",
            Self::CandidatesExhausted => "candidates exhausted",
            Self::DeadlineExceeded => "run time budget spent",
            Self::EmptyCatalog => "empty catalog",
        })
    }
}

/// Run-scoped accumulator
#[derive(Debug)]
pub struct RunState {
    pub records: Vec<NormalizedRecord>,
    pub attempted: HashSet<u32>,
    pub target: usize,
    pub stats: CollectionStats,
    started: Instant,
    pauses_taken: usize,
}

impl RunState {
    pub fn new(target: usize) -> Self {
        Self {
            records: Vec::new(),
            attempted: HashSet::new(),
            target,
            stats: CollectionStats::default(),
            started: Instant::now(),
            pauses_taken: 0,
        }
    }

    pub fn target_reached(&self) -> bool {
        self.records.len() >= self.target
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Marks `app_id` as attempted; false if it already was
    pub fn claim(&mut self, app_id: u32) -> bool {
        self.attempted.insert(app_id)
    }

    pub fn absorb(&mut self, report: ItemReport) {
        self.stats.attempted += 1;
        self.stats.requests += report.requests as usize;
        self.stats.throttled_responses += report.throttle_backoffs.len();
        match report.state {
            ItemState::Success(record) => {
                self.stats.succeeded += 1;
                self.records.push(record);
            }
            ItemState::Skipped(_) => self.stats.skipped += 1,
            ItemState::Forbidden => self.stats.forbidden += 1,
            ItemState::Failed(_) | ItemState::Pending | ItemState::Requesting | ItemState::Throttled => {
                self.stats.failed += 1;
            }
        }
    }

    /// True once per `pause_every` collected records
    pub fn pause_due(&mut self, pause_every: usize) -> bool {
        if pause_every == 0 {
            return false;
        }
        let milestones = self.records.len() / pause_every;
        if milestones > self.pauses_taken {
            self.pauses_taken = milestones;
            self.stats.pauses += 1;
            true
        } else {
            false
        }
    }
}
