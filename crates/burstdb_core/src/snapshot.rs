//! Snapshot contracts.
//!
//! A snapshot is tagged with the id of the last operation it reflects and
//! stores a sequence of operations that rebuild that state from an empty
//! root.

use crate::error::CoreResult;
use crate::operation::{Operation, Writer};
use crate::types::OperationId;
use std::sync::Arc;

/// Identity of a persisted snapshot.
pub trait SnapshotHandle<R>: Send + Sync {
    /// Id up to and including which the snapshot captures state.
    fn id(&self) -> OperationId;

    /// Opens a reader over the snapshot's operations.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be opened.
    fn open(&self) -> CoreResult<Box<dyn SnapshotReader<R>>>;
}

/// Shared handle to a snapshot identity.
pub type SnapshotRef<R> = Arc<dyn SnapshotHandle<R>>;

/// Sequential reader over the operations of one snapshot.
pub trait SnapshotReader<R>: Send {
    /// Returns the next operation, or `Ok(None)` at the end of the snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error for I/O or decoding failures, including
    /// `NilOperation` for an absent entry.
    fn next(&mut self) -> CoreResult<Option<Box<dyn Operation<R>>>>;

    /// Releases the reader's resources.
    ///
    /// # Errors
    ///
    /// Returns an error if releasing fails.
    fn close(&mut self) -> CoreResult<()>;
}

/// Lists persisted snapshots.
pub trait SnapshotRepository<R>: Send + Sync {
    /// Returns every snapshot currently visible.
    ///
    /// # Errors
    ///
    /// Returns an error if listing fails.
    fn snapshots(&self) -> CoreResult<Vec<SnapshotRef<R>>>;
}

/// Creates new snapshots.
pub trait WriteSnapshotRepository<R>: Send + Sync {
    /// Creates a writer for a snapshot tagged with `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer cannot be created.
    fn create_snapshot(&self, id: OperationId) -> CoreResult<Box<dyn SnapshotWriter<R>>>;
}

/// Writer for a single new snapshot.
///
/// Operations carry no ordering constraint. `close` always publishes, even
/// when nothing was written.
pub trait SnapshotWriter<R>: Send {
    /// Id the snapshot is tagged with.
    fn id(&self) -> OperationId;

    /// Appends an operation.
    ///
    /// # Errors
    ///
    /// Returns `WriterClosed` after close or discard, or an I/O error.
    fn write(&mut self, operation: &dyn Operation<R>) -> CoreResult<()>;

    /// Publishes the snapshot.
    ///
    /// # Errors
    ///
    /// Returns `WriterClosed` on the second call, or an I/O error.
    fn close(&mut self) -> CoreResult<()>;

    /// Drops the unfinished snapshot without publishing anything.
    ///
    /// # Errors
    ///
    /// Returns an error if staged data cannot be removed.
    fn discard(&mut self) -> CoreResult<()>;
}

/// Destination handed to a snapshooter.
///
/// The snapshooter pushes the operations that rebuild the current root from
/// an empty one.
pub struct SnapshotSink<'a, R> {
    writer: &'a mut dyn SnapshotWriter<R>,
    written: usize,
}

impl<'a, R> SnapshotSink<'a, R> {
    /// Wraps a snapshot writer.
    pub fn new(writer: &'a mut dyn SnapshotWriter<R>) -> Self {
        Self { writer, written: 0 }
    }

    /// Appends a type-erased operation.
    ///
    /// # Errors
    ///
    /// Returns the writer's error.
    pub fn push(&mut self, operation: &dyn Operation<R>) -> CoreResult<()> {
        self.writer.write(operation)?;
        self.written += 1;
        Ok(())
    }

    /// Appends a concrete writer.
    ///
    /// # Errors
    ///
    /// Returns the writer's error.
    pub fn push_writer<W: Writer<R>>(&mut self, writer: &W) -> CoreResult<()> {
        self.push(writer)
    }

    /// Number of operations pushed so far.
    #[must_use]
    pub fn written(&self) -> usize {
        self.written
    }
}
