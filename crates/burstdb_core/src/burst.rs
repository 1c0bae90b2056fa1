//! Burst contracts.
//!
//! A burst is an immutable, ordered stream of transactions persisted
//! together. Ids inside one burst are strictly ascending but may have gaps,
//! and bursts from different writers may overlap.

use crate::error::{CoreError, CoreResult};
use crate::operation::Transaction;
use crate::types::{BurstRange, OperationId};
use std::sync::Arc;

/// Identity of a persisted burst.
pub trait BurstHandle<R>: Send + Sync {
    /// Inclusive id range covered by the burst.
    fn range(&self) -> BurstRange;

    /// Opens a reader positioned before the first transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the burst cannot be opened.
    fn open(&self) -> CoreResult<Box<dyn BurstReader<R>>>;

    /// First id in the burst.
    fn first(&self) -> OperationId {
        self.range().first
    }

    /// Last id in the burst.
    fn last(&self) -> OperationId {
        self.range().last
    }
}

/// Shared handle to a burst identity.
pub type BurstRef<R> = Arc<dyn BurstHandle<R>>;

/// Sequential reader over the transactions of one burst.
pub trait BurstReader<R>: Send {
    /// Returns the next transaction, or `Ok(None)` at the end of the burst.
    ///
    /// # Errors
    ///
    /// Returns an error for I/O or decoding failures.
    fn next(&mut self) -> CoreResult<Option<Transaction<R>>>;

    /// Releases the reader's resources.
    ///
    /// # Errors
    ///
    /// Returns an error if releasing fails.
    fn close(&mut self) -> CoreResult<()>;
}

/// Lists persisted bursts.
pub trait BurstRepository<R>: Send + Sync {
    /// Returns every burst currently visible.
    ///
    /// # Errors
    ///
    /// Returns an error if listing fails.
    fn bursts(&self) -> CoreResult<Vec<BurstRef<R>>>;
}

/// Creates new bursts.
pub trait WriteBurstRepository<R>: Send + Sync {
    /// Creates a writer for a new burst.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer cannot be created.
    fn create_burst(&self) -> CoreResult<Box<dyn BurstWriter<R>>>;
}

/// Writer for a single new burst.
///
/// The burst becomes visible only once `close` succeeds. A writer closed
/// without any transaction is discarded.
pub trait BurstWriter<R>: Send {
    /// First id written, or [`OperationId::ZERO`] if nothing was written.
    fn first(&self) -> OperationId;

    /// Last id written, or [`OperationId::ZERO`] if nothing was written.
    fn last(&self) -> OperationId;

    /// Appends a transaction.
    ///
    /// # Errors
    ///
    /// Returns `WriterClosed` after close, `InvalidOperationId` if the id is
    /// not greater than [`last`](Self::last), or an I/O error.
    fn write(&mut self, transaction: &Transaction<R>) -> CoreResult<()>;

    /// Finalizes (or discards, if empty) the burst.
    ///
    /// # Errors
    ///
    /// Returns `WriterClosed` on the second call, or an I/O error.
    fn close(&mut self) -> CoreResult<()>;
}

/// Tracks the id bounds and closed state every burst writer enforces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterBounds {
    first: OperationId,
    last: OperationId,
    closed: bool,
}

impl WriterBounds {
    /// Creates bounds for an empty, open writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// First accepted id.
    #[must_use]
    pub fn first(&self) -> OperationId {
        self.first
    }

    /// Last accepted id.
    #[must_use]
    pub fn last(&self) -> OperationId {
        self.last
    }

    /// Returns true while no id has been accepted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.last.is_zero()
    }

    /// Returns the covered range, if any id was accepted.
    #[must_use]
    pub fn range(&self) -> Option<BurstRange> {
        (!self.is_empty()).then_some(BurstRange {
            first: self.first,
            last: self.last,
        })
    }

    /// Checks that `id` may be written next.
    ///
    /// # Errors
    ///
    /// Returns `WriterClosed` or `InvalidOperationId`.
    pub fn check(&self, id: OperationId) -> CoreResult<()> {
        if self.closed {
            return Err(CoreError::WriterClosed);
        }
        if id <= self.last {
            return Err(CoreError::invalid_operation_id(id, self.last));
        }
        Ok(())
    }

    /// Records a successfully written id. Call only after [`check`](Self::check).
    pub fn accept(&mut self, id: OperationId) {
        if self.first.is_zero() {
            self.first = id;
        }
        self.last = id;
    }

    /// Marks the writer closed.
    ///
    /// # Errors
    ///
    /// Returns `WriterClosed` if it was already closed.
    pub fn close(&mut self) -> CoreResult<()> {
        if self.closed {
            return Err(CoreError::WriterClosed);
        }
        self.closed = true;
        Ok(())
    }
}
