//! Store-backed snapshot handles, readers and writers.

use super::naming::{snapshot_name, TMP_SNAPSHOT_PREFIX};
use super::{publish, RepoInner};
use crate::error::{CoreError, CoreResult};
use crate::operation::Operation;
use crate::registry::OperationRegistry;
use crate::snapshot::{SnapshotHandle, SnapshotReader, SnapshotWriter};
use crate::types::OperationId;
use burstdb_codec::{write_frame, FrameKind, FrameReader, OperationEnvelope};
use burstdb_storage::{BlobReader, StagedBlob};
use std::sync::{Arc, Weak};
use tracing::debug;

/// A published snapshot in a [`StoreRepository`](super::StoreRepository).
pub(crate) struct StoreSnapshot<R> {
    repository: Weak<RepoInner<R>>,
    name: String,
    id: OperationId,
}

impl<R> StoreSnapshot<R> {
    pub(crate) fn new(repository: Weak<RepoInner<R>>, name: String, id: OperationId) -> Self {
        Self {
            repository,
            name,
            id,
        }
    }
}

impl<R: 'static> SnapshotHandle<R> for StoreSnapshot<R> {
    fn id(&self) -> OperationId {
        self.id
    }

    fn open(&self) -> CoreResult<Box<dyn SnapshotReader<R>>> {
        let repository = self.repository.upgrade().ok_or(CoreError::RepositoryClosed)?;
        let blob = repository.store.open_read(&self.name)?;
        Ok(Box::new(StoreSnapshotReader {
            frames: Some(FrameReader::new(blob)),
            repository,
            name: self.name.clone(),
        }))
    }
}

struct StoreSnapshotReader<R> {
    frames: Option<FrameReader<BlobReader>>,
    repository: Arc<RepoInner<R>>,
    name: String,
}

impl<R> SnapshotReader<R> for StoreSnapshotReader<R> {
    fn next(&mut self) -> CoreResult<Option<Box<dyn Operation<R>>>> {
        let frames = self.frames.as_mut().ok_or(CoreError::ReaderClosed)?;
        let Some(frame) = frames.next_frame()? else {
            return Ok(None);
        };
        if frame.kind != FrameKind::Operation {
            return Err(CoreError::invalid_format(format!(
                "{}: expected an operation frame, found {:?}",
                self.name, frame.kind
            )));
        }
        decode_operation(&self.repository.registry, &frame.payload).map(Some)
    }

    fn close(&mut self) -> CoreResult<()> {
        self.frames.take().map(drop).ok_or(CoreError::ReaderClosed)
    }
}

pub(crate) fn decode_operation<R>(
    registry: &OperationRegistry<R>,
    payload: &[u8],
) -> CoreResult<Box<dyn Operation<R>>> {
    let envelope = OperationEnvelope::decode(payload)?;
    if envelope.kind.is_empty() {
        return Err(CoreError::NilOperation);
    }
    registry.decode(&envelope.kind, &envelope.body)
}

/// Stages operations and publishes them as one snapshot on close.
///
/// A snapshot missing any operation would rebuild the wrong root, so after a
/// failed frame write the writer refuses to publish.
pub(crate) struct StoreSnapshotWriter {
    staged: Option<Box<dyn StagedBlob>>,
    id: OperationId,
    written: u64,
    closed: bool,
    poisoned: bool,
}

impl StoreSnapshotWriter {
    pub(crate) fn new<R>(repository: &RepoInner<R>, id: OperationId) -> CoreResult<Self> {
        Ok(Self {
            staged: Some(repository.store.create(TMP_SNAPSHOT_PREFIX)?),
            id,
            written: 0,
            closed: false,
            poisoned: false,
        })
    }

    fn staged(&mut self) -> CoreResult<&mut Box<dyn StagedBlob>> {
        match self.staged.as_mut() {
            Some(staged) if !self.closed => Ok(staged),
            _ => Err(CoreError::WriterClosed),
        }
    }
}

impl<R> SnapshotWriter<R> for StoreSnapshotWriter {
    fn id(&self) -> OperationId {
        self.id
    }

    fn write(&mut self, operation: &dyn Operation<R>) -> CoreResult<()> {
        let payload = OperationEnvelope {
            kind: operation.kind().to_string(),
            body: operation.encode()?,
        }
        .encode()?;
        if self.poisoned {
            return Err(CoreError::invalid_operation(
                "snapshot writer failed earlier and cannot accept writes",
            ));
        }
        if let Err(e) = write_frame(self.staged()?, FrameKind::Operation, &payload) {
            self.poisoned = true;
            return Err(e.into());
        }
        self.written += 1;
        Ok(())
    }

    fn close(&mut self) -> CoreResult<()> {
        if self.poisoned && !self.closed {
            <StoreSnapshotWriter as SnapshotWriter<R>>::discard(self)?;
            return Err(CoreError::invalid_operation(
                "snapshot writer failed earlier; snapshot discarded",
            ));
        }
        let id = self.id;
        let staged = self.staged()?;
        let name = publish(staged.as_mut(), |n| snapshot_name(id, n))?;
        self.closed = true;
        self.staged = None;
        debug!(%name, operations = self.written, "published snapshot");
        Ok(())
    }

    fn discard(&mut self) -> CoreResult<()> {
        self.closed = true;
        if let Some(mut staged) = self.staged.take() {
            staged.discard()?;
            debug!(id = %self.id, "discarded snapshot");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recovery::apply_snapshot;
    use crate::repository::StoreRepository;
    use crate::snapshot::{SnapshotRepository, WriteSnapshotRepository};
    use crate::test_support::{counter_registry, Add, Counter};
    use burstdb_codec::encode_frame;
    use burstdb_storage::{BlobStore, InMemoryStore};

    fn repository(store: &InMemoryStore) -> StoreRepository<Counter> {
        StoreRepository::new(Arc::new(store.clone()), counter_registry())
    }

    #[test]
    fn snapshot_roundtrip() {
        let store = InMemoryStore::new();
        let repository = repository(&store);

        let mut writer = repository.create_snapshot(OperationId::new(2)).unwrap();
        writer.write(&Add(15)).unwrap();
        writer.close().unwrap();
        assert!(matches!(writer.close(), Err(CoreError::WriterClosed)));

        let snapshots = repository.snapshots().unwrap();
        assert_eq!(snapshots.len(), 1);
        let mut root = Counter::default();
        assert_eq!(
            apply_snapshot(&mut root, snapshots[0].as_ref()).unwrap(),
            OperationId::new(2)
        );
        assert_eq!(root.value, 15);
    }

    #[test]
    fn empty_snapshot_is_published() {
        let store = InMemoryStore::new();
        let repository = repository(&store);
        let mut writer = repository.create_snapshot(OperationId::ZERO).unwrap();
        writer.close().unwrap();
        assert_eq!(store.list().unwrap(), vec!["snapshot-0.bdb".to_string()]);
    }

    #[test]
    fn discarded_snapshot_leaves_nothing() {
        let store = InMemoryStore::new();
        let repository = repository(&store);
        let mut writer = repository.create_snapshot(OperationId::new(3)).unwrap();
        writer.write(&Add(1)).unwrap();
        writer.discard().unwrap();
        assert!(store.is_empty());
        assert!(matches!(
            writer.write(&Add(1)),
            Err(CoreError::WriterClosed)
        ));
    }

    #[test]
    fn empty_kind_is_nil_operation() {
        let payload = OperationEnvelope {
            kind: String::new(),
            body: Vec::new(),
        }
        .encode()
        .unwrap();
        let blob = encode_frame(FrameKind::Operation, &payload).unwrap();
        let store = InMemoryStore::with_blobs([("snapshot-4.bdb", blob)]);
        let repository = repository(&store);

        let snapshots = repository.snapshots().unwrap();
        let mut root = Counter::default();
        assert!(matches!(
            apply_snapshot(&mut root, snapshots[0].as_ref()),
            Err(CoreError::NilOperation)
        ));
    }

    #[test]
    fn transaction_frame_in_snapshot_is_rejected() {
        let blob = encode_frame(FrameKind::Transaction, b"whatever").unwrap();
        let store = InMemoryStore::with_blobs([("snapshot-1.bdb", blob)]);
        let repository = repository(&store);

        let snapshots = repository.snapshots().unwrap();
        let mut reader = snapshots[0].open().unwrap();
        assert!(matches!(
            reader.next(),
            Err(CoreError::InvalidFormat { .. })
        ));
    }
}
