//! In-memory blob store for testing.

use crate::backend::{validate_name, BlobReader, BlobStore, StagedBlob};
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::io::{self, Cursor, Write};
use std::sync::Arc;

type BlobMap = Arc<RwLock<BTreeMap<String, Arc<[u8]>>>>;

/// An in-memory blob store.
///
/// This store keeps all blobs in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral databases that don't need persistence
///
/// # Thread Safety
///
/// This store is thread-safe. Cloning it yields another handle to the same
/// blobs, so a writer side and a reader side can share one store.
///
/// # Example
///
/// ```rust
/// use burstdb_storage::{BlobStore, InMemoryStore};
/// use std::io::Write;
///
/// let store = InMemoryStore::new();
/// let mut staged = store.create("tmp-").unwrap();
/// staged.write_all(b"test data").unwrap();
/// assert!(store.list().unwrap().is_empty());
///
/// staged.commit("blob").unwrap();
/// assert_eq!(store.list().unwrap(), vec!["blob".to_string()]);
/// ```
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    blobs: BlobMap,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with pre-existing blobs.
    ///
    /// Useful for testing recovery and corruption scenarios.
    #[must_use]
    pub fn with_blobs<I, N>(blobs: I) -> Self
    where
        I: IntoIterator<Item = (N, Vec<u8>)>,
        N: Into<String>,
    {
        let map = blobs
            .into_iter()
            .map(|(name, data)| (name.into(), Arc::from(data)))
            .collect();
        Self {
            blobs: Arc::new(RwLock::new(map)),
        }
    }

    /// Returns a copy of one blob's bytes.
    #[must_use]
    pub fn blob(&self, name: &str) -> Option<Vec<u8>> {
        self.blobs.read().get(name).map(|data| data.to_vec())
    }

    /// Returns the number of committed blobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    /// Returns whether the store holds no blobs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }
}

impl BlobStore for InMemoryStore {
    fn list(&self) -> StorageResult<Vec<String>> {
        Ok(self.blobs.read().keys().cloned().collect())
    }

    fn contains(&self, name: &str) -> StorageResult<bool> {
        Ok(self.blobs.read().contains_key(name))
    }

    fn open_read(&self, name: &str) -> StorageResult<BlobReader> {
        let blobs = self.blobs.read();
        let data = blobs
            .get(name)
            .ok_or_else(|| StorageError::NotFound(name.to_string()))?;
        Ok(Box::new(Cursor::new(Arc::clone(data))))
    }

    fn create(&self, _prefix: &str) -> StorageResult<Box<dyn StagedBlob>> {
        Ok(Box::new(MemoryStagedBlob {
            buffer: Vec::new(),
            blobs: Arc::clone(&self.blobs),
            finished: false,
        }))
    }

    fn remove(&self, name: &str) -> StorageResult<()> {
        self.blobs
            .write()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(name.to_string()))
    }
}

/// A staged blob buffered in memory until commit.
struct MemoryStagedBlob {
    buffer: Vec<u8>,
    blobs: BlobMap,
    finished: bool,
}

impl Write for MemoryStagedBlob {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.finished {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "write to a committed or discarded blob",
            ));
        }
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl StagedBlob for MemoryStagedBlob {
    fn commit(&mut self, name: &str) -> StorageResult<()> {
        validate_name(name)?;
        if self.finished {
            return Err(StorageError::Io(io::Error::new(
                io::ErrorKind::Other,
                "blob already committed or discarded",
            )));
        }

        match self.blobs.write().entry(name.to_string()) {
            Entry::Occupied(_) => Err(StorageError::AlreadyExists(name.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(Arc::from(std::mem::take(&mut self.buffer)));
                self.finished = true;
                Ok(())
            }
        }
    }

    fn discard(&mut self) -> StorageResult<()> {
        self.buffer = Vec::new();
        self.finished = true;
        Ok(())
    }

    fn truncate(&mut self, len: u64) -> StorageResult<()> {
        if self.finished {
            return Err(StorageError::Io(io::Error::other(
                "blob already committed or discarded",
            )));
        }
        match usize::try_from(len) {
            Ok(len) if len <= self.buffer.len() => {
                self.buffer.truncate(len);
                Ok(())
            }
            _ => Err(StorageError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("cannot truncate {} staged bytes to {len}", self.buffer.len()),
            ))),
        }
    }
}
