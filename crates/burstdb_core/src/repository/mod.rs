//! Repositories backed by a [`BlobStore`].
//!
//! [`StoreRepository`] implements all four repository contracts on top of any
//! blob store: one blob per burst, one blob per snapshot, each a sequence of
//! checksummed frames. Writers stage their bytes in the store and publish
//! them under their final name only on close, so listing never observes a
//! partial burst or snapshot.

mod burst;
pub mod naming;
mod snapshot;

use crate::burst::{BurstRef, BurstRepository, BurstWriter, WriteBurstRepository};
use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::order::burst_order;
use crate::registry::OperationRegistry;
use crate::snapshot::{SnapshotRef, SnapshotRepository, SnapshotWriter, WriteSnapshotRepository};
use crate::types::{BurstRange, OperationId};
use burst::{StoreBurst, StoreBurstWriter};
use burstdb_codec::{write_frame, FrameReader, TransactionEnvelope};
use burstdb_storage::{
    BlobStore, DirStore, DirStoreOptions, InMemoryStore, StagedBlob, StorageError,
};
use naming::{burst_name, parse_name, sort_key, stranded_name, BlobName, TMP_BURST_PREFIX};
use snapshot::{StoreSnapshot, StoreSnapshotWriter};
use std::fmt;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub(crate) struct RepoInner<R> {
    pub(crate) store: Arc<dyn BlobStore>,
    pub(crate) registry: OperationRegistry<R>,
}

/// Burst and snapshot repository over a blob store.
///
/// Cloning is cheap and yields another handle to the same repository. Burst
/// and snapshot handles only hold a weak reference; opening one after every
/// repository handle (and every open reader or writer) is gone fails with
/// `RepositoryClosed`.
///
/// # Example
///
/// ```
/// use burstdb_core::{BurstRepository, OperationRegistry, StoreRepository};
///
/// let repository = StoreRepository::<i64>::in_memory(OperationRegistry::new());
/// assert!(repository.bursts().unwrap().is_empty());
/// ```
pub struct StoreRepository<R> {
    inner: Arc<RepoInner<R>>,
}

impl<R> StoreRepository<R> {
    /// Creates a repository over `store`, decoding operations with `registry`.
    pub fn new(store: Arc<dyn BlobStore>, registry: OperationRegistry<R>) -> Self {
        Self {
            inner: Arc::new(RepoInner { store, registry }),
        }
    }

    /// Creates a repository over a fresh in-memory store.
    pub fn in_memory(registry: OperationRegistry<R>) -> Self {
        Self::new(Arc::new(InMemoryStore::new()), registry)
    }

    /// Opens a repository over a directory.
    ///
    /// The directory is created when `config.create_if_missing` is set, and
    /// files are fsynced before publishing when `config.sync_on_close` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory is missing (and may not be created)
    /// or cannot be created.
    pub fn open_dir(
        path: &Path,
        registry: OperationRegistry<R>,
        config: &Config,
    ) -> CoreResult<Self> {
        let options = DirStoreOptions {
            sync: config.sync_on_close,
        };
        let store = if config.create_if_missing {
            DirStore::open_with_create_dirs(path, options)?
        } else {
            DirStore::open_with_options(path, options)?
        };
        Ok(Self::new(Arc::new(store), registry))
    }

    /// Returns the underlying blob store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn BlobStore> {
        &self.inner.store
    }

    /// Returns the operation registry.
    #[must_use]
    pub fn registry(&self) -> &OperationRegistry<R> {
        &self.inner.registry
    }

    /// Lists published bursts and snapshots by name, without opening them.
    ///
    /// Bursts come in burst order and snapshots by descending id. Names that
    /// are neither (staged blobs included) are reported as ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be listed.
    pub fn catalog(&self) -> CoreResult<Catalog> {
        let mut names = self.inner.store.list()?;
        names.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));

        let mut catalog = Catalog::default();
        for name in names {
            match parse_name(&name) {
                Some(BlobName::Burst(range)) => catalog.bursts.push(BurstEntry { name, range }),
                Some(BlobName::Snapshot(id)) => {
                    catalog.snapshots.push(SnapshotEntry { name, id });
                }
                None => {
                    debug!(%name, "ignoring unrecognized blob");
                    catalog.ignored.push(name);
                }
            }
        }
        catalog.bursts.sort_by(|a, b| burst_order(a.range, b.range));
        catalog.snapshots.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(catalog)
    }

    /// Moves every burst reaching past `last` out of the replayable history.
    ///
    /// Recovery stops at the first gap, so bursts listed past it hold
    /// operations the recovered root never saw. New writes reuse those ids,
    /// and the old bursts would otherwise shadow them on the next replay. A
    /// burst starting after `last` is kept under a
    /// [`STRANDED_PREFIX`](naming::STRANDED_PREFIX) name that listing
    /// ignores. A burst straddling `last` is first republished cut back to
    /// the ids up to `last`.
    ///
    /// Returns the names that were set aside.
    ///
    /// # Errors
    ///
    /// Returns an error if a burst cannot be read, copied or removed.
    pub fn set_aside_beyond(&self, last: OperationId) -> CoreResult<Vec<String>> {
        let catalog = self.catalog()?;
        let mut moved = Vec::new();
        for entry in catalog.bursts.into_iter().filter(|b| b.range.last > last) {
            if entry.range.first <= last {
                self.republish_prefix(&entry, last)?;
            }
            self.move_aside(&entry.name)?;
            warn!(name = %entry.name, %last, "set aside burst past the recovered history");
            moved.push(entry.name);
        }
        Ok(moved)
    }

    fn republish_prefix(&self, entry: &BurstEntry, last: OperationId) -> CoreResult<()> {
        let mut frames = FrameReader::new(self.inner.store.open_read(&entry.name)?);
        let mut staged: Option<Box<dyn StagedBlob>> = None;
        let mut kept: Option<BurstRange> = None;
        while let Some(frame) = frames.next_frame()? {
            let id = OperationId::new(TransactionEnvelope::decode(&frame.payload)?.id);
            if id > last {
                break;
            }
            if staged.is_none() {
                staged = Some(self.inner.store.create(TMP_BURST_PREFIX)?);
            }
            if let Some(blob) = staged.as_mut() {
                write_frame(blob, frame.kind, &frame.payload)?;
            }
            kept = Some(BurstRange {
                first: kept.map_or(id, |range| range.first),
                last: id,
            });
        }

        if let (Some(mut staged), Some(range)) = (staged, kept) {
            let name = publish(staged.as_mut(), |n| burst_name(range, n))?;
            debug!(%name, from = %entry.name, "republished burst prefix");
        }
        Ok(())
    }

    fn move_aside(&self, name: &str) -> CoreResult<()> {
        let mut staged = self.inner.store.create(TMP_BURST_PREFIX)?;
        {
            let mut reader = self.inner.store.open_read(name)?;
            io::copy(&mut reader, &mut staged)?;
        }
        let kept_as = publish(staged.as_mut(), |n| stranded_name(name, n))?;
        self.inner.store.remove(name)?;
        debug!(%name, %kept_as, "moved burst aside");
        Ok(())
    }

    /// Computes what [`prune`](Self::prune) would remove, without removing
    /// anything.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be listed.
    pub fn plan_prune(&self, through: OperationId) -> CoreResult<PruneReport> {
        let catalog = self.catalog()?;
        let Some(keep) = catalog.snapshots.iter().find(|s| s.id <= through) else {
            return Ok(PruneReport::default());
        };
        Ok(PruneReport {
            kept_snapshot: Some(keep.id),
            bursts: catalog
                .bursts
                .iter()
                .filter(|b| b.range.last <= keep.id)
                .map(|b| b.name.clone())
                .collect(),
            snapshots: catalog
                .snapshots
                .iter()
                .filter(|s| s.id < keep.id)
                .map(|s| s.name.clone())
                .collect(),
        })
    }

    /// Deletes history made redundant by a snapshot.
    ///
    /// The newest snapshot with id `<= through` is kept. Every burst whose
    /// last id it covers and every older snapshot is removed. Without such a
    /// snapshot nothing is removed.
    ///
    /// # Errors
    ///
    /// Returns an error if listing or removing fails. Blobs already gone are
    /// skipped.
    pub fn prune(&self, through: OperationId) -> CoreResult<PruneReport> {
        let report = self.plan_prune(through)?;
        for name in report.bursts.iter().chain(&report.snapshots) {
            match self.inner.store.remove(name) {
                Ok(()) => debug!(%name, "pruned blob"),
                Err(StorageError::NotFound(_)) => debug!(%name, "blob already removed"),
                Err(e) => return Err(e.into()),
            }
        }
        info!(
            kept = ?report.kept_snapshot,
            bursts = report.bursts.len(),
            snapshots = report.snapshots.len(),
            "pruned repository"
        );
        Ok(report)
    }
}

impl<R> Clone for StoreRepository<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R> fmt::Debug for StoreRepository<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreRepository")
            .field("store", &self.inner.store)
            .field("registry", &self.inner.registry)
            .finish()
    }
}

impl<R: 'static> BurstRepository<R> for StoreRepository<R> {
    fn bursts(&self) -> CoreResult<Vec<BurstRef<R>>> {
        Ok(self
            .catalog()?
            .bursts
            .into_iter()
            .map(|entry| {
                Arc::new(StoreBurst::new(
                    Arc::downgrade(&self.inner),
                    entry.name,
                    entry.range,
                )) as BurstRef<R>
            })
            .collect())
    }
}

impl<R: 'static> WriteBurstRepository<R> for StoreRepository<R> {
    fn create_burst(&self) -> CoreResult<Box<dyn BurstWriter<R>>> {
        Ok(Box::new(StoreBurstWriter::new(Arc::clone(&self.inner))))
    }
}

impl<R: 'static> SnapshotRepository<R> for StoreRepository<R> {
    fn snapshots(&self) -> CoreResult<Vec<SnapshotRef<R>>> {
        Ok(self
            .catalog()?
            .snapshots
            .into_iter()
            .map(|entry| {
                Arc::new(StoreSnapshot::new(
                    Arc::downgrade(&self.inner),
                    entry.name,
                    entry.id,
                )) as SnapshotRef<R>
            })
            .collect())
    }
}

impl<R: 'static> WriteSnapshotRepository<R> for StoreRepository<R> {
    fn create_snapshot(&self, id: OperationId) -> CoreResult<Box<dyn SnapshotWriter<R>>> {
        Ok(Box::new(StoreSnapshotWriter::new(&self.inner, id)?))
    }
}

/// Commits a staged blob under the first free name produced by `name_for`.
fn publish(staged: &mut dyn StagedBlob, name_for: impl Fn(u32) -> String) -> CoreResult<String> {
    let mut discriminator = 0u32;
    loop {
        let name = name_for(discriminator);
        match staged.commit(&name) {
            Ok(()) => return Ok(name),
            Err(StorageError::AlreadyExists(_)) => {
                discriminator = discriminator
                    .checked_add(1)
                    .ok_or_else(|| CoreError::invalid_operation("no free blob name"))?;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// A published burst, by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BurstEntry {
    /// Blob name.
    pub name: String,
    /// Range parsed from the name.
    pub range: BurstRange,
}

/// A published snapshot, by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    /// Blob name.
    pub name: String,
    /// Id parsed from the name.
    pub id: OperationId,
}

/// Name-level listing of a repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    /// Bursts in burst order.
    pub bursts: Vec<BurstEntry>,
    /// Snapshots by descending id.
    pub snapshots: Vec<SnapshotEntry>,
    /// Blobs that are neither bursts nor snapshots.
    pub ignored: Vec<String>,
}

impl Catalog {
    /// Returns the highest id reachable from `start` by chaining burst
    /// ranges without a gap.
    ///
    /// Only names are consulted, so gaps inside a burst are not detected.
    #[must_use]
    pub fn reachable_from(&self, start: OperationId) -> OperationId {
        let mut reach = start;
        for burst in &self.bursts {
            if burst.range.first <= reach.next() && burst.range.last > reach {
                reach = burst.range.last;
            }
        }
        reach
    }
}

/// What [`StoreRepository::prune`] removed (or would remove).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    /// Id of the snapshot pruning was anchored on.
    pub kept_snapshot: Option<OperationId>,
    /// Removed burst names.
    pub bursts: Vec<String>,
    /// Removed snapshot names.
    pub snapshots: Vec<String>,
}

impl PruneReport {
    /// Returns true if nothing was (or would be) removed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bursts.is_empty() && self.snapshots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::Transaction;
    use crate::test_support::{counter_registry, Add, Counter};
    use tempfile::tempdir;

    fn write_burst(repository: &StoreRepository<Counter>, ids: &[u64]) {
        let mut writer = repository.create_burst().unwrap();
        for id in ids {
            writer
                .write(&Transaction::from_writer(OperationId::new(*id), Add(1)))
                .unwrap();
        }
        writer.close().unwrap();
    }

    fn write_snapshot(repository: &StoreRepository<Counter>, id: u64) {
        let mut writer = repository.create_snapshot(OperationId::new(id)).unwrap();
        writer.write(&Add(id as i64)).unwrap();
        writer.close().unwrap();
    }

    fn names(report: &PruneReport) -> (Vec<&str>, Vec<&str>) {
        (
            report.bursts.iter().map(String::as_str).collect(),
            report.snapshots.iter().map(String::as_str).collect(),
        )
    }

    #[test]
    fn catalog_orders_and_ignores() {
        let store = InMemoryStore::with_blobs([
            ("burst-2-3.bdb", Vec::new()),
            ("burst-1-2.bdb", Vec::new()),
            ("burst-1-3.bdb", Vec::new()),
            ("snapshot-1.bdb", Vec::new()),
            ("snapshot-5.bdb", Vec::new()),
            ("tmp-burst-x1y2", Vec::new()),
            ("README", Vec::new()),
        ]);
        let repository = StoreRepository::<Counter>::new(Arc::new(store), counter_registry());
        let catalog = repository.catalog().unwrap();

        let ranges: Vec<_> = catalog.bursts.iter().map(|b| b.range).collect();
        assert_eq!(
            ranges,
            vec![
                BurstRange::new(1, 3),
                BurstRange::new(1, 2),
                BurstRange::new(2, 3)
            ]
        );
        let ids: Vec<_> = catalog.snapshots.iter().map(|s| s.id.as_u64()).collect();
        assert_eq!(ids, vec![5, 1]);
        assert_eq!(catalog.ignored, vec!["README", "tmp-burst-x1y2"]);
    }

    #[test]
    fn reachable_from_stops_at_gap() {
        let store = InMemoryStore::with_blobs([
            ("burst-1-3.bdb", Vec::new()),
            ("burst-2-6.bdb", Vec::new()),
            ("burst-9-12.bdb", Vec::new()),
        ]);
        let repository = StoreRepository::<Counter>::new(Arc::new(store), counter_registry());
        let catalog = repository.catalog().unwrap();
        assert_eq!(catalog.reachable_from(OperationId::ZERO), OperationId::new(6));
        assert_eq!(catalog.reachable_from(OperationId::new(8)), OperationId::new(12));
    }

    #[test]
    fn prune_keeps_newest_covered_snapshot() {
        let repository = StoreRepository::in_memory(counter_registry());
        write_burst(&repository, &[1, 2]);
        write_burst(&repository, &[3, 4]);
        write_burst(&repository, &[5, 6]);
        write_snapshot(&repository, 2);
        write_snapshot(&repository, 4);
        write_snapshot(&repository, 6);

        let plan = repository.plan_prune(OperationId::new(5)).unwrap();
        assert_eq!(plan.kept_snapshot, Some(OperationId::new(4)));
        assert_eq!(
            names(&plan),
            (
                vec!["burst-1-2.bdb", "burst-3-4.bdb"],
                vec!["snapshot-2.bdb"]
            )
        );
        assert_eq!(repository.bursts().unwrap().len(), 3);

        let report = repository.prune(OperationId::new(5)).unwrap();
        assert_eq!(report, plan);
        let remaining: Vec<_> = repository
            .catalog()
            .unwrap()
            .bursts
            .into_iter()
            .map(|b| b.name)
            .collect();
        assert_eq!(remaining, vec!["burst-5-6.bdb"]);
        assert_eq!(repository.snapshots().unwrap().len(), 2);
    }

    #[test]
    fn prune_without_snapshot_removes_nothing() {
        let repository = StoreRepository::in_memory(counter_registry());
        write_burst(&repository, &[1, 2]);
        let report = repository.prune(OperationId::new(10)).unwrap();
        assert!(report.is_empty());
        assert_eq!(report.kept_snapshot, None);
        assert_eq!(repository.bursts().unwrap().len(), 1);
    }

    #[test]
    fn catalog_orders_discriminators_numerically() {
        let store = InMemoryStore::with_blobs([
            ("burst-3-3.10.bdb", Vec::new()),
            ("burst-3-3.2.bdb", Vec::new()),
            ("burst-3-3.bdb", Vec::new()),
        ]);
        let repository = StoreRepository::<Counter>::new(Arc::new(store), counter_registry());
        let names: Vec<_> = repository
            .catalog()
            .unwrap()
            .bursts
            .into_iter()
            .map(|b| b.name)
            .collect();
        assert_eq!(names, vec!["burst-3-3.bdb", "burst-3-3.2.bdb", "burst-3-3.10.bdb"]);
    }

    #[test]
    fn set_aside_moves_bursts_past_the_history() {
        let repository = StoreRepository::in_memory(counter_registry());
        write_burst(&repository, &[1, 2, 4, 5]);
        write_burst(&repository, &[6, 7]);
        write_burst(&repository, &[1]);

        let moved = repository.set_aside_beyond(OperationId::new(2)).unwrap();
        assert_eq!(moved, vec!["burst-1-5.bdb", "burst-6-7.bdb"]);

        let catalog = repository.catalog().unwrap();
        let bursts: Vec<_> = catalog.bursts.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(bursts, vec!["burst-1-2.bdb", "burst-1-1.bdb"]);
        assert_eq!(
            catalog.ignored,
            vec!["stranded-burst-1-5.bdb", "stranded-burst-6-7.bdb"]
        );

        let mut root = Counter::default();
        let report = crate::recovery::recover(&mut root, &repository, &repository).unwrap();
        assert_eq!(report.last, OperationId::new(2));
        assert_eq!(root.value, 2);

        assert!(repository.set_aside_beyond(OperationId::new(2)).unwrap().is_empty());
    }

    #[test]
    fn set_aside_keeps_earlier_copies() {
        let repository = StoreRepository::in_memory(counter_registry());
        write_burst(&repository, &[3, 4]);
        repository.set_aside_beyond(OperationId::new(1)).unwrap();
        write_burst(&repository, &[3, 4]);
        repository.set_aside_beyond(OperationId::new(1)).unwrap();

        let catalog = repository.catalog().unwrap();
        assert!(catalog.bursts.is_empty());
        assert_eq!(
            catalog.ignored,
            vec!["stranded-1-burst-3-4.bdb", "stranded-burst-3-4.bdb"]
        );
    }

    #[test]
    fn open_dir_respects_create_if_missing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db");

        let config = Config::default().create_if_missing(false);
        assert!(StoreRepository::open_dir(&path, counter_registry(), &config).is_err());

        let config = Config::default().sync_on_close(false);
        let repository = StoreRepository::open_dir(&path, counter_registry(), &config).unwrap();
        write_burst(&repository, &[1]);
        assert!(path.join("burst-1-1.bdb").is_file());
    }

    #[test]
    fn dir_repository_survives_reopen() {
        let dir = tempdir().unwrap();
        let config = Config::default();
        {
            let repository =
                StoreRepository::open_dir(dir.path(), counter_registry(), &config).unwrap();
            write_burst(&repository, &[1, 2, 3]);
            write_snapshot(&repository, 3);
        }

        let repository = StoreRepository::open_dir(dir.path(), counter_registry(), &config).unwrap();
        let mut root = Counter::default();
        let report = crate::recovery::recover(&mut root, &repository, &repository).unwrap();
        assert_eq!(report.snapshot, Some(OperationId::new(3)));
        assert_eq!(report.last, OperationId::new(3));
        assert_eq!(root.value, 3);
    }
}
