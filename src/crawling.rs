//! # Crawling
//!
//! Catalog retrieval and the concurrent detail collector.
//! - `state`: per-item outcomes, shared throttle backoff, run accumulator
//! - `catalog_fetcher`: one catalog GET, degrading to empty on any failure
//! - `detail_collector`: batched worker pool driving the per-item state machine

pub mod catalog_fetcher;
pub mod detail_collector;
pub mod state;

pub use catalog_fetcher::CatalogFetcher;
pub use detail_collector::{CollectionOutcome, DetailCollector};
pub use state::{
    CollectionStats, FailureReason, ItemReport, ItemState, RunState, Termination, ThrottleBackoff,
};
