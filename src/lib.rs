//! Steam Indie Sampler
//!
//! Rate-governed collector that samples apps from the Steam store catalog, keeps the
//! released indie games that pass the eligibility policy, and writes both the full
//! qualifying set and a recommendation-stratified subset as CSV.

pub mod application;
pub mod crawling;
pub mod domain;
pub mod infrastructure;

#[cfg(test)]
pub(crate) mod test_utils;

pub use application::{Pipeline, PipelineReport};
pub use infrastructure::{AppConfig, ConfigError};
