//! Store-backed burst handles, readers and writers.

use super::naming::{burst_name, TMP_BURST_PREFIX};
use super::{publish, RepoInner};
use crate::burst::{BurstHandle, BurstReader, BurstWriter, WriterBounds};
use crate::error::{CoreError, CoreResult};
use crate::operation::Transaction;
use crate::registry::OperationRegistry;
use crate::types::{BurstRange, OperationId};
use burstdb_codec::{write_frame, FrameKind, FrameReader, TransactionEnvelope};
use burstdb_storage::{BlobReader, StagedBlob};
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

/// A published burst in a [`StoreRepository`](super::StoreRepository).
pub(crate) struct StoreBurst<R> {
    repository: Weak<RepoInner<R>>,
    name: String,
    range: BurstRange,
}

impl<R> StoreBurst<R> {
    pub(crate) fn new(repository: Weak<RepoInner<R>>, name: String, range: BurstRange) -> Self {
        Self {
            repository,
            name,
            range,
        }
    }
}

impl<R: 'static> BurstHandle<R> for StoreBurst<R> {
    fn range(&self) -> BurstRange {
        self.range
    }

    fn open(&self) -> CoreResult<Box<dyn BurstReader<R>>> {
        let repository = self.repository.upgrade().ok_or(CoreError::RepositoryClosed)?;
        let blob = repository.store.open_read(&self.name)?;
        Ok(Box::new(StoreBurstReader {
            frames: Some(FrameReader::new(blob)),
            repository,
            name: self.name.clone(),
        }))
    }
}

struct StoreBurstReader<R> {
    frames: Option<FrameReader<BlobReader>>,
    repository: Arc<RepoInner<R>>,
    name: String,
}

impl<R> BurstReader<R> for StoreBurstReader<R> {
    fn next(&mut self) -> CoreResult<Option<Transaction<R>>> {
        let frames = self.frames.as_mut().ok_or(CoreError::ReaderClosed)?;
        let Some(frame) = frames.next_frame()? else {
            return Ok(None);
        };
        if frame.kind != FrameKind::Transaction {
            return Err(CoreError::invalid_format(format!(
                "{}: expected a transaction frame, found {:?}",
                self.name, frame.kind
            )));
        }
        decode_transaction(&self.repository.registry, &frame.payload).map(Some)
    }

    fn close(&mut self) -> CoreResult<()> {
        self.frames.take().map(drop).ok_or(CoreError::ReaderClosed)
    }
}

pub(crate) fn decode_transaction<R>(
    registry: &OperationRegistry<R>,
    payload: &[u8],
) -> CoreResult<Transaction<R>> {
    let envelope = TransactionEnvelope::decode(payload)?;
    let operation = registry.decode(&envelope.kind, &envelope.body)?;
    Ok(Transaction::new(OperationId::new(envelope.id), operation))
}

/// Stages transactions and publishes them as one burst on close.
///
/// After a failed frame write the writer rejects further writes. Closing it
/// cuts the staged blob back to the last complete frame and publishes the
/// transactions accepted before the failure.
pub(crate) struct StoreBurstWriter<R> {
    repository: Arc<RepoInner<R>>,
    staged: Option<Box<dyn StagedBlob>>,
    bounds: WriterBounds,
    /// Length of the complete frames staged so far.
    accepted_len: u64,
    poisoned: bool,
}

impl<R> StoreBurstWriter<R> {
    pub(crate) fn new(repository: Arc<RepoInner<R>>) -> Self {
        Self {
            repository,
            staged: None,
            bounds: WriterBounds::new(),
            accepted_len: 0,
            poisoned: false,
        }
    }
}

impl<R> BurstWriter<R> for StoreBurstWriter<R> {
    fn first(&self) -> OperationId {
        self.bounds.first()
    }

    fn last(&self) -> OperationId {
        self.bounds.last()
    }

    fn write(&mut self, transaction: &Transaction<R>) -> CoreResult<()> {
        self.bounds.check(transaction.id)?;
        if self.poisoned {
            return Err(CoreError::invalid_operation(
                "burst writer failed earlier and cannot accept writes",
            ));
        }

        let payload = TransactionEnvelope {
            id: transaction.id.as_u64(),
            kind: transaction.operation.kind().to_string(),
            body: transaction.operation.encode()?,
        }
        .encode()?;

        if self.staged.is_none() {
            self.staged = Some(self.repository.store.create(TMP_BURST_PREFIX)?);
        }
        if let Some(staged) = self.staged.as_mut() {
            match write_frame(staged, FrameKind::Transaction, &payload) {
                Ok(len) => self.accepted_len += len as u64,
                Err(e) => {
                    self.poisoned = true;
                    return Err(e.into());
                }
            }
        }
        self.bounds.accept(transaction.id);
        Ok(())
    }

    fn close(&mut self) -> CoreResult<()> {
        self.bounds.close()?;
        let Some(mut staged) = self.staged.take() else {
            debug!("discarding empty burst");
            return Ok(());
        };
        let Some(range) = self.bounds.range() else {
            debug!("discarding burst with no accepted transactions");
            return staged.discard().map_err(Into::into);
        };
        if self.poisoned {
            if let Err(e) = staged.truncate(self.accepted_len) {
                staged.discard()?;
                return Err(e.into());
            }
            warn!(%range, "publishing the transactions accepted before a failed write");
        }

        let name = publish(staged.as_mut(), |n| burst_name(range, n))?;
        debug!(%name, %range, "published burst");
        Ok(())
    }
}
