//! Stratified balancer
//!
//! Splits the qualifying records into recommendation buckets and draws a capped random
//! sample from each, so no single engagement tier dominates the balanced output.

use fastrand::Rng;

use crate::domain::record::{Bucket, NormalizedRecord};
use crate::domain::services::sampler::sample_without_replacement;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceMode {
    /// Per-bucket capped draw, concatenated low, moderate, high
    Stratified,
    /// The stratified draw fell short of the target; the first `target` records are used
    Degraded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalancedSample {
    pub records: Vec<NormalizedRecord>,
    pub mode: BalanceMode,
    /// Output rows per bucket, indexed by [`Bucket::index`]
    pub bucket_counts: [usize; 3],
}

impl BalancedSample {
    pub fn count(&self, bucket: Bucket) -> usize {
        self.bucket_counts[bucket.index()]
    }
}

pub fn balance(
    records: &[NormalizedRecord],
    per_bucket_cap: usize,
    target: usize,
    rng: &mut Rng,
) -> BalancedSample {
    let mut partitions: [Vec<NormalizedRecord>; 3] = Default::default();
    for record in records {
        partitions[record.bucket().index()].push(record.clone());
    }

    let mut balanced = Vec::with_capacity(per_bucket_cap.saturating_mul(3).min(records.len()));
    for bucket in Bucket::ALL {
        balanced.extend(sample_without_replacement(
            &partitions[bucket.index()],
            per_bucket_cap,
            rng,
        ));
    }

    if balanced.len() < target {
        let fallback: Vec<NormalizedRecord> = records.iter().take(target).cloned().collect();
        return BalancedSample {
            bucket_counts: count_buckets(&fallback),
            records: fallback,
            mode: BalanceMode::Degraded,
        };
    }

    BalancedSample {
        bucket_counts: count_buckets(&balanced),
        records: balanced,
        mode: BalanceMode::Stratified,
    }
}

fn count_buckets(records: &[NormalizedRecord]) -> [usize; 3] {
    let mut counts = [0; 3];
    for record in records {
        counts[record.bucket().index()] += 1;
    }
    counts
}
