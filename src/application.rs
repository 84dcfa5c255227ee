//! Application layer: wires the catalog, collector, balancer and writer into one run

pub mod pipeline;

pub use pipeline::{OutputReport, Pipeline, PipelineReport};
