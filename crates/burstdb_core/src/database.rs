//! Database facade and recovery.

use crate::config::Config;
use crate::dispatch::{dispatcher_for, BurstDispatcher};
use crate::error::{CoreError, CoreResult};
use crate::operation::{Reader, Transaction, Writer};
use crate::recovery::{recover, RecoveryReport};
use crate::registry::OperationRegistry;
use crate::repository::StoreRepository;
use crate::burst::BurstRepository;
use crate::snapshot::{SnapshotRepository, SnapshotSink, WriteSnapshotRepository};
use crate::types::OperationId;
use burstdb_storage::{BlobStore, InMemoryStore};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of [`Database::write`].
///
/// The mutation result and the append result are independent: when `append`
/// failed, the root already reflects the operation but the operation is not
/// durable.
#[derive(Debug)]
#[must_use]
pub struct WriteOutcome<T> {
    /// Value returned by the operation.
    pub output: T,
    /// Id assigned to the operation, or `None` without a dispatcher.
    pub id: Option<OperationId>,
    /// Result of forwarding the transaction to the dispatcher.
    pub append: CoreResult<()>,
}

impl<T> WriteOutcome<T> {
    /// Returns true if the operation was handed to a dispatcher successfully.
    #[must_use]
    pub fn is_durable(&self) -> bool {
        self.id.is_some() && self.append.is_ok()
    }

    /// Returns the output, or `AppendFailed` if the append failed.
    ///
    /// # Errors
    ///
    /// Returns `AppendFailed` wrapping the dispatcher's error.
    pub fn into_result(self) -> CoreResult<T> {
        match self.append {
            Ok(()) => Ok(self.output),
            Err(source) => Err(CoreError::AppendFailed {
                id: self.id.unwrap_or(OperationId::ZERO),
                source: Box::new(source),
            }),
        }
    }
}

/// Owns the dispatcher and closes it when dropped.
struct Journal<R> {
    dispatcher: Option<Box<dyn BurstDispatcher<R>>>,
    closed: bool,
}

impl<R> Journal<R> {
    fn close(&mut self) -> CoreResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        match self.dispatcher.as_mut() {
            Some(dispatcher) => dispatcher.close(),
            None => Ok(()),
        }
    }
}

impl<R> Drop for Journal<R> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "failed to close dispatcher on drop");
        }
    }
}

/// The main database handle.
///
/// `Database` owns the root, the id of the last operation applied to it, and
/// an optional dispatcher that persists every write into bursts. Without a
/// dispatcher the database is purely in memory and ids are not advanced.
///
/// The facade has no internal locking: callers serialize `write`,
/// `take_snapshot`, `rotate` and `close`. `read` takes `&self`.
///
/// # Opening a Database
///
/// ```
/// use burstdb_core::{Config, CoreResult, Database, OperationRegistry, Writer};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Add(i64);
///
/// impl Writer<i64> for Add {
///     const KIND: &'static str = "add";
///     type Output = i64;
///     fn write(&self, root: &mut i64) -> CoreResult<i64> {
///         *root += self.0;
///         Ok(*root)
///     }
/// }
///
/// let registry = OperationRegistry::new().with::<Add>().unwrap();
/// let mut db = Database::open_in_memory(0i64, registry, Config::default()).unwrap();
///
/// let outcome = db.write(Add(3)).unwrap();
/// assert_eq!(outcome.output, 3);
/// assert!(outcome.is_durable());
/// assert_eq!(db.read(&|root: &i64| *root), 3);
///
/// db.close().unwrap();
/// ```
pub struct Database<R> {
    root: R,
    last: OperationId,
    journal: Journal<R>,
    repository: Option<StoreRepository<R>>,
    recovery: Option<RecoveryReport>,
}

impl<R> Database<R> {
    /// Creates a database around `root`, which already reflects every
    /// operation up to `last`.
    pub fn new(root: R, last: OperationId, dispatcher: Option<Box<dyn BurstDispatcher<R>>>) -> Self {
        Self {
            root,
            last,
            journal: Journal {
                dispatcher,
                closed: false,
            },
            repository: None,
            recovery: None,
        }
    }

    /// Creates a purely in-memory database with no dispatcher.
    pub fn in_memory(root: R) -> Self {
        Self::new(root, OperationId::ZERO, None)
    }

    /// Rebuilds `root` from the best snapshot and the bursts that follow it,
    /// then wraps it in a database writing through `dispatcher`.
    ///
    /// `root` must be in its empty initial state.
    ///
    /// # Errors
    ///
    /// Returns the first snapshot or replay error. With a dispatcher, returns
    /// `StrandedBursts` when listed bursts reach past the recovered id: new
    /// writes would reuse their ids and be shadowed by them on the next
    /// replay. [`open`](Self::open) and its siblings set such bursts aside
    /// instead.
    pub fn recover(
        mut root: R,
        snapshots: &dyn SnapshotRepository<R>,
        bursts: &dyn BurstRepository<R>,
        dispatcher: Option<Box<dyn BurstDispatcher<R>>>,
    ) -> CoreResult<Self> {
        let report = recover(&mut root, snapshots, bursts)?;
        if dispatcher.is_some() {
            let count = bursts
                .bursts()?
                .iter()
                .filter(|burst| burst.last() > report.last)
                .count();
            if count > 0 {
                return Err(CoreError::StrandedBursts {
                    last: report.last,
                    count,
                });
            }
        }
        let mut db = Self::new(root, report.last, dispatcher);
        db.recovery = Some(report);
        Ok(db)
    }

    /// Runs a read-only query against the root.
    pub fn read<Q: Reader<R>>(&self, query: &Q) -> Q::Output {
        query.read(&self.root)
    }

    /// Applies a mutation to the root and forwards it to the dispatcher.
    ///
    /// The root is mutated first. If the mutation fails, its error is
    /// returned and nothing else happens. Otherwise the next id is assigned
    /// and the transaction handed to the dispatcher; the append result is
    /// reported in [`WriteOutcome::append`]. A failed append still consumes
    /// the id.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseClosed` after [`close`](Self::close), or the
    /// mutation's own error.
    pub fn write<W: Writer<R>>(&mut self, operation: W) -> CoreResult<WriteOutcome<W::Output>> {
        if self.journal.closed {
            return Err(CoreError::DatabaseClosed);
        }
        let output = operation.write(&mut self.root)?;

        let Some(dispatcher) = self.journal.dispatcher.as_mut() else {
            return Ok(WriteOutcome {
                output,
                id: None,
                append: Ok(()),
            });
        };

        self.last = self.last.next();
        let transaction = Transaction::from_writer(self.last, operation);
        let append = dispatcher.write(&transaction);
        if let Err(e) = &append {
            warn!(id = %self.last, error = %e, "operation applied but not appended");
        }
        Ok(WriteOutcome {
            output,
            id: Some(self.last),
            append,
        })
    }

    /// Writes a snapshot of the current root, tagged with the last id.
    ///
    /// `snapshooter` receives the root and a sink, and must push operations
    /// that rebuild the root from its empty state. The snapshot is published
    /// if the snapshooter succeeds and discarded otherwise.
    ///
    /// # Errors
    ///
    /// Returns the snapshooter's error, or an error creating or publishing
    /// the snapshot.
    pub fn take_snapshot<F>(
        &self,
        snapshooter: F,
        repository: &dyn WriteSnapshotRepository<R>,
    ) -> CoreResult<OperationId>
    where
        F: FnOnce(&R, &mut SnapshotSink<'_, R>) -> CoreResult<()>,
    {
        let mut writer = repository.create_snapshot(self.last)?;
        let result = {
            let mut sink = SnapshotSink::new(writer.as_mut());
            snapshooter(&self.root, &mut sink).map(|()| sink.written())
        };

        match result {
            Ok(written) => {
                writer.close()?;
                debug!(id = %self.last, operations = written, "took snapshot");
                Ok(self.last)
            }
            Err(e) => {
                if let Err(discard) = writer.discard() {
                    warn!(error = %discard, "failed to discard snapshot");
                }
                Err(e)
            }
        }
    }

    /// Like [`take_snapshot`](Self::take_snapshot), using the repository the
    /// database was opened with.
    ///
    /// # Errors
    ///
    /// Returns `NoSnapshotRepository` if the database was not opened through
    /// [`open`](Self::open) or a sibling, or any `take_snapshot` error.
    pub fn snapshot<F>(&self, snapshooter: F) -> CoreResult<OperationId>
    where
        F: FnOnce(&R, &mut SnapshotSink<'_, R>) -> CoreResult<()>,
        R: 'static,
    {
        let repository = self
            .repository
            .as_ref()
            .ok_or(CoreError::NoSnapshotRepository)?;
        self.take_snapshot(snapshooter, repository)
    }

    /// Finalizes the current burst so the next write starts a new one.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseClosed` after close, or the dispatcher's error.
    pub fn rotate(&mut self) -> CoreResult<()> {
        if self.journal.closed {
            return Err(CoreError::DatabaseClosed);
        }
        match self.journal.dispatcher.as_mut() {
            Some(dispatcher) => dispatcher.rotate(),
            None => Ok(()),
        }
    }

    /// Closes the dispatcher, finalizing the current burst. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's close error.
    pub fn close(&mut self) -> CoreResult<()> {
        self.journal.close()
    }

    /// Returns true until [`close`](Self::close) is called.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.journal.closed
    }

    /// Id of the last operation reflected in the root.
    #[must_use]
    pub fn last_id(&self) -> OperationId {
        self.last
    }

    /// Returns the root.
    #[must_use]
    pub fn root(&self) -> &R {
        &self.root
    }

    /// Returns the recovery summary, for databases built by recovery.
    #[must_use]
    pub fn recovery(&self) -> Option<&RecoveryReport> {
        self.recovery.as_ref()
    }

    /// Returns the repository the database was opened with, if any.
    #[must_use]
    pub fn repository(&self) -> Option<&StoreRepository<R>> {
        self.repository.as_ref()
    }

    /// Closes the database and returns the root.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's close error; the root is lost in that case.
    pub fn into_root(mut self) -> CoreResult<R> {
        self.close()?;
        Ok(self.root)
    }
}

impl<R: 'static> Database<R> {
    /// Opens a database stored in a directory.
    ///
    /// The directory holds one file per burst and per snapshot. `root` must
    /// be in its empty initial state; it is rebuilt from the best snapshot
    /// and the bursts that follow. New writes go to bursts rotated according
    /// to `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be opened or recovery fails.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let registry = OperationRegistry::new().with::<Add>()?;
    /// let mut db = Database::open(Path::new("my_database"), 0i64, registry, Config::default())?;
    /// db.write(Add(3))?.into_result()?;
    /// db.close()?;
    /// ```
    pub fn open(
        path: &Path,
        root: R,
        registry: OperationRegistry<R>,
        config: Config,
    ) -> CoreResult<Self> {
        let repository = StoreRepository::open_dir(path, registry, &config)?;
        info!(path = %path.display(), "opening database");
        Self::open_repository(repository, root, &config)
    }

    /// Opens a fresh in-memory database with a full persistence pipeline.
    ///
    /// Bursts and snapshots are kept in an [`InMemoryStore`] and lost when
    /// the database is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if recovery fails.
    pub fn open_in_memory(
        root: R,
        registry: OperationRegistry<R>,
        config: Config,
    ) -> CoreResult<Self> {
        Self::open_store(Arc::new(InMemoryStore::new()), root, registry, config)
    }

    /// Opens a database over an arbitrary blob store.
    ///
    /// # Errors
    ///
    /// Returns an error if recovery fails.
    pub fn open_store(
        store: Arc<dyn BlobStore>,
        root: R,
        registry: OperationRegistry<R>,
        config: Config,
    ) -> CoreResult<Self> {
        Self::open_repository(StoreRepository::new(store, registry), root, &config)
    }

    fn open_repository(
        repository: StoreRepository<R>,
        mut root: R,
        config: &Config,
    ) -> CoreResult<Self> {
        let report = recover(&mut root, &repository, &repository)?;
        let set_aside = repository.set_aside_beyond(report.last)?;
        info!(
            snapshot = ?report.snapshot.map(|id| id.as_u64()),
            last = %report.last,
            applied = report.applied,
            set_aside = set_aside.len(),
            "recovered database"
        );

        let dispatcher = dispatcher_for(Arc::new(repository.clone()), config);
        let mut db = Self::new(root, report.last, Some(dispatcher));
        db.recovery = Some(report);
        db.repository = Some(repository);
        Ok(db)
    }
}

impl<R> fmt::Debug for Database<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("last", &self.last)
            .field("durable", &self.journal.dispatcher.is_some())
            .field("open", &!self.journal.closed)
            .finish_non_exhaustive()
    }
}
