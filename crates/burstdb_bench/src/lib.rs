//! Benchmark utilities.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use burstdb_core::{BurstRange, StoreRepository};
use burstdb_storage::BlobStore;
use burstdb_testkit::{history_registry, write_history_layout, History};
use std::sync::Arc;

/// Splits `1..=total` into bursts of `per_burst` ids, each overlapping the
/// previous one by `overlap` ids.
pub fn overlapping_ranges(total: u64, per_burst: u64, overlap: u64) -> Vec<BurstRange> {
    let per_burst = per_burst.max(1);
    let overlap = overlap.min(per_burst - 1);
    let mut ranges = Vec::new();
    let mut first = 1;
    while first <= total {
        let last = (first + per_burst - 1).min(total);
        ranges.push(BurstRange::new(first, last));
        if last == total {
            break;
        }
        first = last + 1 - overlap;
    }
    ranges
}

/// Builds an in-memory repository holding `ranges` of `Append` transactions.
pub fn history_repository(ranges: &[BurstRange]) -> StoreRepository<History> {
    let repository = StoreRepository::in_memory(history_registry());
    write_history_layout(&repository, ranges).expect("Failed to write bursts");
    repository
}

/// Returns the store behind a repository built by [`history_repository`].
pub fn history_store(ranges: &[BurstRange]) -> Arc<dyn BlobStore> {
    history_repository(ranges).store().clone()
}
