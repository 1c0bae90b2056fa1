//! Routing of committed transactions into bursts.
//!
//! A dispatcher owns at most one open burst writer. The state machine is:
//!
//! ```text
//! {no active burst} --write--> {active, n} --write*--> (rotate | close) --> {no active burst}
//! ```

mod counting;
mod default;

pub use counting::CountingDispatcher;
pub use default::DefaultDispatcher;

use crate::burst::WriteBurstRepository;
use crate::config::Config;
use crate::error::CoreResult;
use crate::operation::Transaction;
use std::sync::Arc;

/// Routes transactions into bursts and decides when to start a new one.
pub trait BurstDispatcher<R>: Send {
    /// Appends a transaction to the current burst, opening one if needed.
    ///
    /// # Errors
    ///
    /// Returns `DispatcherClosed` after close, or the burst writer's error.
    fn write(&mut self, transaction: &Transaction<R>) -> CoreResult<()>;

    /// Finalizes the current burst so the next write starts a new one.
    /// A no-op when no burst is active.
    ///
    /// # Errors
    ///
    /// Returns the burst writer's close error.
    fn rotate(&mut self) -> CoreResult<()>;

    /// Finalizes the current burst and releases the dispatcher.
    ///
    /// # Errors
    ///
    /// Returns the burst writer's close error.
    fn close(&mut self) -> CoreResult<()>;
}

impl<R, D: BurstDispatcher<R> + ?Sized> BurstDispatcher<R> for Box<D> {
    fn write(&mut self, transaction: &Transaction<R>) -> CoreResult<()> {
        (**self).write(transaction)
    }

    fn rotate(&mut self) -> CoreResult<()> {
        (**self).rotate()
    }

    fn close(&mut self) -> CoreResult<()> {
        (**self).close()
    }
}

/// Builds the dispatcher described by `config`: a [`DefaultDispatcher`],
/// wrapped in a [`CountingDispatcher`] when `rotate_after` is set.
pub fn dispatcher_for<R: 'static>(
    repository: Arc<dyn WriteBurstRepository<R>>,
    config: &Config,
) -> Box<dyn BurstDispatcher<R>> {
    let dispatcher = DefaultDispatcher::new(repository);
    match config.rotate_after {
        Some(max) => Box::new(CountingDispatcher::new(dispatcher, max)),
        None => Box::new(dispatcher),
    }
}
