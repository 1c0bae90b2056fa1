//! Property-based test generators using proptest.
//!
//! Provides strategies for generating burst layouts that cover a history
//! `1..=last` with overlaps, duplicates and arbitrary listing order.

use burstdb_core::BurstRange;
use proptest::prelude::*;

/// A set of bursts to write, in the order they should be listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BurstLayout {
    /// Last id of the covered history.
    pub last: u64,
    /// Burst ranges. Every burst holds each id of its range.
    pub ranges: Vec<BurstRange>,
}

impl BurstLayout {
    /// Returns true if the ranges chain from 1 to `last` without a gap.
    #[must_use]
    pub fn covers(&self) -> bool {
        let mut sorted = self.ranges.clone();
        sorted.sort_by_key(|r| (r.first, r.last));
        let mut reach = 0;
        for range in sorted {
            if range.first.as_u64() > reach + 1 {
                return false;
            }
            reach = reach.max(range.last.as_u64());
        }
        reach == self.last
    }
}

/// Strategy for splitting `1..=last` into contiguous ranges.
pub fn partition_strategy(last: u64) -> impl Strategy<Value = Vec<BurstRange>> {
    let cuts = if last > 1 {
        prop::collection::vec(1..last, 0..(last as usize).min(8)).boxed()
    } else {
        Just(Vec::new()).boxed()
    };
    cuts.prop_map(move |mut cuts| {
        cuts.sort_unstable();
        cuts.dedup();
        let mut ranges = Vec::with_capacity(cuts.len() + 1);
        let mut first = 1;
        for cut in cuts {
            ranges.push(BurstRange::new(first, cut));
            first = cut + 1;
        }
        ranges.push(BurstRange::new(first, last));
        ranges
    })
}

/// Strategy for an arbitrary sub-range of `1..=last`.
pub fn sub_range_strategy(last: u64) -> impl Strategy<Value = BurstRange> {
    (1..=last, 1..=last).prop_map(|(a, b)| BurstRange::new(a.min(b), a.max(b)))
}

/// Strategy for a covering layout of up to `max_last` ids.
///
/// The layout is a partition of the history plus up to `max_extra`
/// redundant bursts, shuffled.
pub fn covering_layout_strategy(max_last: u64, max_extra: usize) -> impl Strategy<Value = BurstLayout> {
    (1..=max_last)
        .prop_flat_map(move |last| {
            (
                Just(last),
                partition_strategy(last),
                prop::collection::vec(sub_range_strategy(last), 0..=max_extra),
            )
        })
        .prop_flat_map(|(last, mut ranges, extra)| {
            ranges.extend(extra);
            (Just(last), Just(ranges).prop_shuffle())
        })
        .prop_map(|(last, ranges)| BurstLayout { last, ranges })
}

/// Strategy for a layout with exactly one missing id.
///
/// Returns the layout and the missing id. Bursts never span the gap.
pub fn gapped_layout_strategy(max_last: u64) -> impl Strategy<Value = (BurstLayout, u64)> {
    (3..=max_last.max(3))
        .prop_flat_map(|last| (Just(last), 2..last))
        .prop_flat_map(|(last, missing)| {
            let before = partition_strategy(missing - 1);
            let after = partition_strategy(last - missing).prop_map(move |ranges| {
                ranges
                    .into_iter()
                    .map(|r| BurstRange::new(r.first.as_u64() + missing, r.last.as_u64() + missing))
                    .collect::<Vec<_>>()
            });
            (Just(last), Just(missing), before, after)
        })
        .prop_flat_map(|(last, missing, mut ranges, after)| {
            ranges.extend(after);
            (Just(last), Just(missing), Just(ranges).prop_shuffle())
        })
        .prop_map(|(last, missing, ranges)| (BurstLayout { last, ranges }, missing))
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
