//! Ordering of bursts and snapshots.

use crate::burst::BurstRef;
use crate::snapshot::SnapshotRef;
use crate::types::BurstRange;
use std::cmp::Ordering;

/// Burst order: ascending `first`, ties broken by descending `last`.
///
/// Among bursts starting at the same id the widest comes first, so replay
/// opens it before any narrower duplicate.
#[must_use]
pub fn burst_order(a: BurstRange, b: BurstRange) -> Ordering {
    a.first.cmp(&b.first).then_with(|| b.last.cmp(&a.last))
}

/// Sorts bursts into [`burst_order`]. The sort is stable.
pub fn sort_bursts<R>(bursts: &mut [BurstRef<R>]) {
    bursts.sort_by(|a, b| burst_order(a.range(), b.range()));
}

/// Sorts snapshots by descending id. The sort is stable.
pub fn sort_snapshots<R>(snapshots: &mut [SnapshotRef<R>]) {
    snapshots.sort_by(|a, b| b.id().cmp(&a.id()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreResult;
    use crate::snapshot::{SnapshotHandle, SnapshotReader};
    use crate::test_support::{event_log, Counter, ScriptedBurst};
    use crate::types::OperationId;
    use std::sync::Arc;

    struct Tagged(u64);

    impl SnapshotHandle<Counter> for Tagged {
        fn id(&self) -> OperationId {
            OperationId::new(self.0)
        }

        fn open(&self) -> CoreResult<Box<dyn SnapshotReader<Counter>>> {
            unreachable!("ordering never opens snapshots")
        }
    }

    fn ranges(bursts: &[BurstRef<Counter>]) -> Vec<(u64, u64)> {
        bursts
            .iter()
            .map(|b| (b.first().as_u64(), b.last().as_u64()))
            .collect()
    }

    #[test]
    fn burst_order_ties_on_first_put_widest_first() {
        let log = event_log();
        let mut bursts = vec![
            ScriptedBurst::new("a", &[1, 2], &log),
            ScriptedBurst::new("b", &[1, 2, 3], &log),
            ScriptedBurst::new("c", &[2, 3], &log),
            ScriptedBurst::new("d", &[2, 3, 4], &log),
        ];
        sort_bursts(&mut bursts);
        assert_eq!(ranges(&bursts), vec![(1, 3), (1, 2), (2, 4), (2, 3)]);
    }

    #[test]
    fn burst_sort_is_stable() {
        let log = event_log();
        let mut bursts = vec![
            ScriptedBurst::new("x", &[1, 2], &log),
            ScriptedBurst::new("y", &[1, 2], &log),
        ];
        sort_bursts(&mut bursts);
        for burst in &bursts {
            burst.open().unwrap();
        }
        assert_eq!(*log.lock(), vec!["open x", "open y"]);
    }

    #[test]
    fn burst_order_compares_ranges() {
        assert_eq!(
            burst_order(BurstRange::new(1, 3), BurstRange::new(1, 2)),
            Ordering::Less
        );
        assert_eq!(
            burst_order(BurstRange::new(1, 9), BurstRange::new(2, 3)),
            Ordering::Less
        );
        assert_eq!(
            burst_order(BurstRange::new(4, 4), BurstRange::new(4, 4)),
            Ordering::Equal
        );
    }

    #[test]
    fn snapshots_sort_descending() {
        let mut snapshots: Vec<SnapshotRef<Counter>> = vec![
            Arc::new(Tagged(3)),
            Arc::new(Tagged(9)),
            Arc::new(Tagged(3)),
            Arc::new(Tagged(1)),
        ];
        sort_snapshots(&mut snapshots);
        let ids: Vec<u64> = snapshots.iter().map(|s| s.id().as_u64()).collect();
        assert_eq!(ids, vec![9, 3, 3, 1]);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn range() -> impl Strategy<Value = BurstRange> {
            (1u64..50, 0u64..10).prop_map(|(first, len)| BurstRange::new(first, first + len))
        }

        proptest! {
            #[test]
            fn burst_order_is_antisymmetric(a in range(), b in range()) {
                prop_assert_eq!(burst_order(a, b), burst_order(b, a).reverse());
            }

            #[test]
            fn sorted_ranges_start_ascending(mut ranges in prop::collection::vec(range(), 0..20)) {
                ranges.sort_by(|a, b| burst_order(*a, *b));
                for pair in ranges.windows(2) {
                    prop_assert!(pair[0].first <= pair[1].first);
                    if pair[0].first == pair[1].first {
                        prop_assert!(pair[0].last >= pair[1].last);
                    }
                }
            }
        }
    }
}
