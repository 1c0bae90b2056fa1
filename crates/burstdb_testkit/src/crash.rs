//! Crash simulation for BurstDB.
//!
//! Provides a blob store wrapper that fails writes or publishes at a chosen
//! point, and helpers that leave the on-disk debris a killed process would.
//!
//! ## Test Strategy
//!
//! 1. **Crash during a burst write** - staged bytes never become visible
//! 2. **Crash before publish** - the whole burst is lost, earlier bursts survive
//! 3. **Failed write** - the frames written before it are still published
//! 4. **Killed process** - stray temporary files are ignored on recovery
//! 5. **Torn file** - a truncated published burst fails recovery loudly
//!
//! ## Usage
//!
//! ```rust
//! use burstdb_storage::{BlobStore, InMemoryStore};
//! use burstdb_testkit::crash::CrashingStore;
//! use std::io::Write;
//! use std::sync::Arc;
//!
//! let store = CrashingStore::new(Arc::new(InMemoryStore::new()));
//! store.crash_after(4);
//! let mut staged = store.create("tmp-").unwrap();
//! assert!(staged.write_all(b"too long").is_err());
//! assert!(store.has_crashed());
//! ```

use burstdb_storage::{BlobReader, BlobStore, StagedBlob, StorageError, StorageResult};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct CrashState {
    write_budget: AtomicUsize,
    fail_on_commit: AtomicBool,
    crashed: AtomicBool,
}

impl CrashState {
    fn crash(&self, what: &str) -> io::Error {
        self.crashed.store(true, Ordering::SeqCst);
        io::Error::other(format!("simulated crash during {what}"))
    }
}

/// A blob store wrapper that can simulate crashes.
///
/// Once crashed, every staged write and commit fails until
/// [`reset`](Self::reset). Listing and reading are passed through, so the
/// wrapped store shows what a restarted process would find.
#[derive(Debug, Clone)]
pub struct CrashingStore {
    inner: Arc<dyn BlobStore>,
    state: Arc<CrashState>,
}

impl CrashingStore {
    /// Creates a new crashing store wrapping an inner store.
    pub fn new(inner: Arc<dyn BlobStore>) -> Self {
        Self {
            inner,
            state: Arc::new(CrashState {
                write_budget: AtomicUsize::new(usize::MAX),
                fail_on_commit: AtomicBool::new(false),
                crashed: AtomicBool::new(false),
            }),
        }
    }

    /// Sets the store to crash after writing the specified number of staged
    /// bytes, counted across all staged blobs.
    pub fn crash_after(&self, bytes: usize) {
        self.state.write_budget.store(bytes, Ordering::SeqCst);
    }

    /// Sets whether the next commit should crash.
    pub fn set_fail_on_commit(&self, fail: bool) {
        self.state.fail_on_commit.store(fail, Ordering::SeqCst);
    }

    /// Resets the crash state.
    pub fn reset(&self) {
        self.state.write_budget.store(usize::MAX, Ordering::SeqCst);
        self.state.fail_on_commit.store(false, Ordering::SeqCst);
        self.state.crashed.store(false, Ordering::SeqCst);
    }

    /// Returns whether the store has crashed.
    pub fn has_crashed(&self) -> bool {
        self.state.crashed.load(Ordering::SeqCst)
    }

    /// Returns the wrapped store.
    pub fn inner(&self) -> &Arc<dyn BlobStore> {
        &self.inner
    }
}

impl BlobStore for CrashingStore {
    fn list(&self) -> StorageResult<Vec<String>> {
        self.inner.list()
    }

    fn contains(&self, name: &str) -> StorageResult<bool> {
        self.inner.contains(name)
    }

    fn open_read(&self, name: &str) -> StorageResult<BlobReader> {
        self.inner.open_read(name)
    }

    fn create(&self, prefix: &str) -> StorageResult<Box<dyn StagedBlob>> {
        if self.has_crashed() {
            return Err(self.state.crash("create").into());
        }
        Ok(Box::new(CrashingBlob {
            inner: self.inner.create(prefix)?,
            state: Arc::clone(&self.state),
        }))
    }

    fn remove(&self, name: &str) -> StorageResult<()> {
        self.inner.remove(name)
    }
}

struct CrashingBlob {
    inner: Box<dyn StagedBlob>,
    state: Arc<CrashState>,
}

impl Write for CrashingBlob {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.state.crashed.load(Ordering::SeqCst) {
            return Err(self.state.crash("write"));
        }

        let budget = self.state.write_budget.load(Ordering::SeqCst);
        if buf.len() > budget {
            // Write partial data up to crash point
            if budget > 0 {
                let _ = self.inner.write_all(&buf[..budget]);
            }
            self.state.write_budget.store(0, Ordering::SeqCst);
            return Err(self.state.crash("partial write"));
        }

        let written = self.inner.write(buf)?;
        if budget != usize::MAX {
            self.state.write_budget.fetch_sub(written, Ordering::SeqCst);
        }
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.state.crashed.load(Ordering::SeqCst) {
            return Err(self.state.crash("flush"));
        }
        self.inner.flush()
    }
}

impl StagedBlob for CrashingBlob {
    fn commit(&mut self, name: &str) -> StorageResult<()> {
        if self.state.crashed.load(Ordering::SeqCst)
            || self.state.fail_on_commit.swap(false, Ordering::SeqCst)
        {
            return Err(StorageError::Io(self.state.crash("commit")));
        }
        self.inner.commit(name)
    }

    fn discard(&mut self) -> StorageResult<()> {
        self.inner.discard()
    }

    fn truncate(&mut self, len: u64) -> StorageResult<()> {
        if self.state.crashed.load(Ordering::SeqCst) {
            return Err(StorageError::Io(self.state.crash("truncate")));
        }
        self.inner.truncate(len)
    }
}

/// Leaves a staged file behind, as a process killed mid-write would.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn leave_staged_file(dir: &Path, prefix: &str, bytes: &[u8]) -> io::Result<PathBuf> {
    let path = dir.join(format!("{prefix}killed"));
    fs::write(&path, bytes)?;
    Ok(path)
}

/// Cuts `bytes` off the end of a file, as a torn write would.
///
/// # Errors
///
/// Returns an error if the file cannot be read or rewritten.
pub fn tear_file(path: &Path, bytes: usize) -> io::Result<()> {
    let data = fs::read(path)?;
    let keep = data.len().saturating_sub(bytes);
    fs::write(path, &data[..keep])
}

#[cfg(test)]
mod tests {
    use super::*;
    use burstdb_storage::InMemoryStore;

    #[test]
    fn crash_after_budget() {
        let inner = InMemoryStore::new();
        let store = CrashingStore::new(Arc::new(inner.clone()));
        store.crash_after(10);

        let mut staged = store.create("tmp-").unwrap();
        staged.write_all(b"0123456789").unwrap();
        assert!(!store.has_crashed());
        assert!(staged.write_all(b"x").is_err());
        assert!(store.has_crashed());
        assert!(staged.commit("blob").is_err());
        assert!(inner.is_empty());
    }

    #[test]
    fn fail_on_commit_is_one_shot() {
        let store = CrashingStore::new(Arc::new(InMemoryStore::new()));
        store.set_fail_on_commit(true);

        let mut staged = store.create("tmp-").unwrap();
        staged.write_all(b"data").unwrap();
        assert!(staged.commit("blob").is_err());
        assert!(store.has_crashed());

        store.reset();
        let mut staged = store.create("tmp-").unwrap();
        staged.write_all(b"data").unwrap();
        staged.commit("blob").unwrap();
        assert_eq!(store.list().unwrap(), vec!["blob".to_string()]);
    }

    #[test]
    fn partial_write_can_be_cut_back() {
        let inner = InMemoryStore::new();
        let store = CrashingStore::new(Arc::new(inner.clone()));
        store.crash_after(6);

        let mut staged = store.create("tmp-").unwrap();
        staged.write_all(b"good").unwrap();
        assert!(staged.write_all(b"torn").is_err());
        assert!(staged.truncate(4).is_err());

        store.reset();
        staged.truncate(4).unwrap();
        staged.commit("blob").unwrap();
        assert_eq!(inner.blob("blob").unwrap(), b"good");
    }

    #[test]
    fn tear_file_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob");
        fs::write(&path, b"abcdef").unwrap();
        tear_file(&path, 2).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"abcd");
    }
}
