//! Dispatcher decorator rotating after a fixed number of transactions.

use super::BurstDispatcher;
use crate::error::CoreResult;
use crate::operation::Transaction;
use std::num::NonZeroUsize;

/// Forwards writes to an inner dispatcher and rotates after `max`
/// transactions since the last rotation.
///
/// The counter resets on every rotation, including rotations requested by
/// the caller. A failed inner write is not counted.
#[derive(Debug)]
pub struct CountingDispatcher<D> {
    inner: D,
    max: NonZeroUsize,
    count: usize,
}

impl<D> CountingDispatcher<D> {
    /// Wraps `inner`, rotating every `max` transactions.
    pub fn new(inner: D, max: NonZeroUsize) -> Self {
        Self {
            inner,
            max,
            count: 0,
        }
    }

    /// Transactions written since the last rotation.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Returns the wrapped dispatcher.
    pub fn into_inner(self) -> D {
        self.inner
    }
}

impl<R, D: BurstDispatcher<R>> BurstDispatcher<R> for CountingDispatcher<D> {
    fn write(&mut self, transaction: &Transaction<R>) -> CoreResult<()> {
        self.inner.write(transaction)?;
        self.count += 1;
        if self.count >= self.max.get() {
            self.rotate()?;
        }
        Ok(())
    }

    fn rotate(&mut self) -> CoreResult<()> {
        self.count = 0;
        self.inner.rotate()
    }

    fn close(&mut self) -> CoreResult<()> {
        self.count = 0;
        self.inner.close()
    }
}
