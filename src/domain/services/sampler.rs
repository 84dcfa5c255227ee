//! Uniform sampling without replacement

use fastrand::Rng;

use crate::domain::catalog::CatalogEntry;

/// Draws `min(k, items.len())` elements uniformly at random without replacement.
///
/// Uses a partial Fisher-Yates shuffle over positions, so the cost is `O(n)` for the
/// index vector plus `O(k)` swaps. The result order is the draw order.
pub fn sample_without_replacement<T: Clone>(items: &[T], k: usize, rng: &mut Rng) -> Vec<T> {
    let n = items.len();
    let k = k.min(n);
    let mut positions: Vec<usize> = (0..n).collect();

    for i in 0..k {
        let j = rng.usize(i..n);
        positions.swap(i, j);
    }

    positions[..k].iter().map(|&p| items[p].clone()).collect()
}

/// Draws candidate ids from the full catalog.
///
/// Duplicate catalog entries are sampled as separate positions; the collector skips ids
/// it has already attempted.
pub fn sample_ids(catalog: &[CatalogEntry], k: usize, rng: &mut Rng) -> Vec<u32> {
    let ids: Vec<u32> = catalog.iter().map(|entry| entry.id).collect();
    sample_without_replacement(&ids, k, rng)
}
