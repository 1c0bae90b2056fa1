//! Snapshot replay and recovery.

use crate::burst::BurstRepository;
use crate::error::CoreResult;
use crate::order::sort_snapshots;
use crate::replay::apply_bursts;
use crate::snapshot::{SnapshotHandle, SnapshotReader, SnapshotRef, SnapshotRepository};
use crate::types::OperationId;
use tracing::debug;

/// Applies every operation of a snapshot to `root`, in stored order.
///
/// Returns the snapshot's id. The reader is closed whether or not applying
/// succeeds.
///
/// # Errors
///
/// Returns the first read, decode or apply error; an absent entry is
/// `NilOperation`. On error the root may be partially updated.
pub fn apply_snapshot<R>(root: &mut R, snapshot: &dyn SnapshotHandle<R>) -> CoreResult<OperationId> {
    let mut reader = snapshot.open()?;
    let applied = apply_all(root, reader.as_mut());
    let closed = reader.close();
    let count = applied?;
    closed?;
    debug!(snapshot = %snapshot.id(), operations = count, "applied snapshot");
    Ok(snapshot.id())
}

fn apply_all<R>(root: &mut R, reader: &mut dyn SnapshotReader<R>) -> CoreResult<u64> {
    let mut count = 0;
    while let Some(op) = reader.next()? {
        op.apply(root)?;
        count += 1;
    }
    Ok(count)
}

/// Returns the snapshot with the highest id, if any.
#[must_use]
pub fn select_snapshot<R>(mut snapshots: Vec<SnapshotRef<R>>) -> Option<SnapshotRef<R>> {
    sort_snapshots(&mut snapshots);
    snapshots.into_iter().next()
}

/// Applies the best snapshot of a repository to `root`.
///
/// Returns its id, or [`OperationId::ZERO`] if the repository holds no
/// snapshot.
///
/// # Errors
///
/// Returns an error if listing or applying fails.
pub fn apply_best_snapshot<R>(
    root: &mut R,
    repository: &dyn SnapshotRepository<R>,
) -> CoreResult<OperationId> {
    match select_snapshot(repository.snapshots()?) {
        Some(snapshot) => apply_snapshot(root, snapshot.as_ref()),
        None => Ok(OperationId::ZERO),
    }
}

/// Summary of a [`recover`] run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Id of the snapshot recovery started from, if any.
    pub snapshot: Option<OperationId>,
    /// Highest id reflected in the root.
    pub last: OperationId,
    /// Number of burst transactions applied after the snapshot.
    pub applied: u64,
}

/// Rebuilds `root` from the best snapshot followed by burst replay.
///
/// `root` must be in its empty initial state. A gap in the bursts is not an
/// error: `last` is the highest id reachable without one.
///
/// # Errors
///
/// Returns the first snapshot or replay error.
pub fn recover<R>(
    root: &mut R,
    snapshots: &dyn SnapshotRepository<R>,
    bursts: &dyn BurstRepository<R>,
) -> CoreResult<RecoveryReport> {
    let snapshot = match select_snapshot(snapshots.snapshots()?) {
        Some(snapshot) => Some(apply_snapshot(root, snapshot.as_ref())?),
        None => None,
    };
    let from = snapshot.unwrap_or(OperationId::ZERO);

    let outcome = apply_bursts(root, from, bursts.bursts()?);
    let applied = outcome.applied;
    let last = outcome.into_result()?;

    Ok(RecoveryReport {
        snapshot,
        last,
        applied,
    })
}
