//! Replay properties over generated burst layouts.

use burstdb_core::{
    apply_bursts, BurstRepository, OperationId, SnapshotRepository, StoreRepository,
    WriteSnapshotRepository,
};
use burstdb_testkit::prelude::*;
use proptest::prelude::*;

fn repository_with(layout: &BurstLayout) -> StoreRepository<History> {
    let repository = StoreRepository::in_memory(history_registry());
    write_history_layout(&repository, &layout.ranges).unwrap();
    repository
}

proptest! {
    #![proptest_config(PropTestConfig::default().to_proptest_config())]

    #[test]
    fn covering_layout_replays_full_history(layout in covering_layout_strategy(60, 8)) {
        let repository = repository_with(&layout);

        let mut root = History::default();
        let outcome = apply_bursts(&mut root, OperationId::ZERO, repository.bursts().unwrap());

        prop_assert!(outcome.is_ok());
        prop_assert_eq!(outcome.last, OperationId::new(layout.last));
        prop_assert_eq!(outcome.applied, layout.last);
        prop_assert_eq!(root.entries, (1..=layout.last).collect::<Vec<_>>());
    }

    #[test]
    fn replay_is_idempotent(layout in covering_layout_strategy(40, 6)) {
        let repository = repository_with(&layout);

        let mut root = History::default();
        let first = apply_bursts(&mut root, OperationId::ZERO, repository.bursts().unwrap());
        let last = first.into_result().unwrap();

        let again = apply_bursts(&mut root, last, repository.bursts().unwrap());
        prop_assert!(again.is_ok());
        prop_assert_eq!(again.last, last);
        prop_assert_eq!(again.applied, 0);
        prop_assert_eq!(again.opened, 0);
        prop_assert_eq!(root.entries.len() as u64, layout.last);
    }

    #[test]
    fn replay_resumes_from_any_prefix(
        layout in covering_layout_strategy(40, 6),
        split in 0u64..40,
    ) {
        let split = split.min(layout.last);
        let repository = repository_with(&layout);

        let mut root = History { entries: (1..=split).collect() };
        let outcome = apply_bursts(&mut root, OperationId::new(split), repository.bursts().unwrap());

        prop_assert_eq!(outcome.into_result().unwrap(), OperationId::new(layout.last));
        prop_assert_eq!(root.entries, (1..=layout.last).collect::<Vec<_>>());
    }

    #[test]
    fn replay_stops_before_a_gap((layout, missing) in gapped_layout_strategy(40)) {
        let repository = repository_with(&layout);

        let mut root = History::default();
        let outcome = apply_bursts(&mut root, OperationId::ZERO, repository.bursts().unwrap());

        prop_assert!(outcome.is_ok());
        prop_assert_eq!(outcome.last, OperationId::new(missing - 1));
        prop_assert_eq!(root.entries, (1..missing).collect::<Vec<_>>());
    }

    #[test]
    fn snapshot_plus_bursts_equals_full_replay(
        layout in covering_layout_strategy(40, 4),
        at in 0u64..40,
    ) {
        let at = at.min(layout.last);
        let repository = repository_with(&layout);

        let mut writer = repository.create_snapshot(OperationId::new(at)).unwrap();
        for id in 1..=at {
            writer.write(&Append(id)).unwrap();
        }
        writer.close().unwrap();

        let mut root = History::default();
        let report = burstdb_core::recover(&mut root, &repository, &repository).unwrap();
        prop_assert_eq!(report.snapshot, Some(OperationId::new(at)));
        prop_assert_eq!(report.last, OperationId::new(layout.last));
        prop_assert_eq!(report.applied, layout.last - at);
        prop_assert_eq!(root.entries, (1..=layout.last).collect::<Vec<_>>());
        prop_assert_eq!(repository.snapshots().unwrap().len(), 1);
    }
}
