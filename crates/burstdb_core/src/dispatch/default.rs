//! Write-through dispatcher.

use super::BurstDispatcher;
use crate::burst::{BurstWriter, WriteBurstRepository};
use crate::error::{CoreError, CoreResult};
use crate::operation::Transaction;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Writes every transaction to the current burst, opening one lazily on the
/// first write after construction or rotation.
pub struct DefaultDispatcher<R> {
    repository: Arc<dyn WriteBurstRepository<R>>,
    current: Option<Box<dyn BurstWriter<R>>>,
    closed: bool,
}

impl<R> DefaultDispatcher<R> {
    /// Creates a dispatcher writing to `repository`.
    pub fn new(repository: Arc<dyn WriteBurstRepository<R>>) -> Self {
        Self {
            repository,
            current: None,
            closed: false,
        }
    }

    /// Returns true while a burst is open.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    /// Returns true once the dispatcher was closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl<R> BurstDispatcher<R> for DefaultDispatcher<R> {
    fn write(&mut self, transaction: &Transaction<R>) -> CoreResult<()> {
        if self.closed {
            return Err(CoreError::DispatcherClosed);
        }
        if self.current.is_none() {
            self.current = Some(self.repository.create_burst()?);
            debug!(first = %transaction.id, "started burst");
        }
        match self.current.as_mut() {
            Some(writer) => writer.write(transaction),
            None => Err(CoreError::invalid_operation("no active burst")),
        }
    }

    fn rotate(&mut self) -> CoreResult<()> {
        if let Some(mut writer) = self.current.take() {
            let (first, last) = (writer.first(), writer.last());
            writer.close()?;
            debug!(%first, %last, "rotated burst");
        }
        Ok(())
    }

    fn close(&mut self) -> CoreResult<()> {
        if self.closed {
            return Ok(());
        }
        let result = self.rotate();
        self.closed = true;
        result
    }
}

impl<R> fmt::Debug for DefaultDispatcher<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultDispatcher")
            .field("active", &self.current.is_some())
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::StoreRepository;
    use crate::test_support::{counter_registry, Add, Counter};
    use crate::burst::BurstRepository;
    use crate::types::{BurstRange, OperationId};

    fn setup() -> (StoreRepository<Counter>, DefaultDispatcher<Counter>) {
        let repository = StoreRepository::in_memory(counter_registry());
        let dispatcher = DefaultDispatcher::new(Arc::new(repository.clone()));
        (repository, dispatcher)
    }

    fn tx(id: u64) -> Transaction<Counter> {
        Transaction::from_writer(OperationId::new(id), Add(1))
    }

    fn ranges(repository: &StoreRepository<Counter>) -> Vec<BurstRange> {
        let mut ranges: Vec<_> = repository
            .bursts()
            .unwrap()
            .iter()
            .map(|b| b.range())
            .collect();
        ranges.sort_by_key(|r| r.first);
        ranges
    }

    #[test]
    fn burst_is_published_on_rotate() {
        let (repository, mut dispatcher) = setup();
        assert!(!dispatcher.is_active());

        dispatcher.write(&tx(1)).unwrap();
        dispatcher.write(&tx(2)).unwrap();
        assert!(dispatcher.is_active());
        assert!(ranges(&repository).is_empty());

        dispatcher.rotate().unwrap();
        assert!(!dispatcher.is_active());
        assert_eq!(ranges(&repository), vec![BurstRange::new(1, 2)]);
    }

    #[test]
    fn rotate_without_burst_is_noop() {
        let (repository, mut dispatcher) = setup();
        dispatcher.rotate().unwrap();
        dispatcher.rotate().unwrap();
        assert!(ranges(&repository).is_empty());
    }

    #[test]
    fn close_finalizes_and_is_idempotent() {
        let (repository, mut dispatcher) = setup();
        dispatcher.write(&tx(1)).unwrap();
        dispatcher.rotate().unwrap();
        dispatcher.write(&tx(2)).unwrap();
        dispatcher.close().unwrap();
        dispatcher.close().unwrap();
        assert!(dispatcher.is_closed());
        assert_eq!(
            ranges(&repository),
            vec![BurstRange::new(1, 1), BurstRange::new(2, 2)]
        );
    }

    #[test]
    fn write_after_close_fails() {
        let (_, mut dispatcher) = setup();
        dispatcher.close().unwrap();
        assert!(matches!(
            dispatcher.write(&tx(1)),
            Err(CoreError::DispatcherClosed)
        ));
    }

    #[test]
    fn out_of_order_write_is_rejected_by_burst() {
        let (_, mut dispatcher) = setup();
        dispatcher.write(&tx(2)).unwrap();
        assert!(matches!(
            dispatcher.write(&tx(2)),
            Err(CoreError::InvalidOperationId { .. })
        ));
        dispatcher.write(&tx(3)).unwrap();
    }
}
