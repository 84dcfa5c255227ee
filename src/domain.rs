//! Domain layer
//!
//! Pure types and services of the sampler: catalog entries, per-app detail records,
//! the normalized CSV record, and the sampling / eligibility / balancing services.
//! Nothing in here performs I/O.

pub mod app_detail;
pub mod catalog;
pub mod constants;
pub mod record;
pub mod services;

pub use app_detail::{AppKind, DetailRecord};
pub use catalog::CatalogEntry;
pub use record::{Bucket, MetacriticScore, NormalizedRecord, Price};
pub use services::{
    BalanceMode, BalancedSample, EligibilityPolicy, Rejection, balance, sample_ids,
};
