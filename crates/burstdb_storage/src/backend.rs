//! Blob store trait definition.

use crate::error::StorageResult;
use std::fmt::Debug;
use std::io::{Read, Write};

/// A boxed sequential reader over one committed blob.
pub type BlobReader = Box<dyn Read + Send>;

/// A blob that is being written and is not yet visible to readers.
///
/// Bytes are written through [`std::io::Write`]. Nothing becomes visible in
/// the owning store until [`StagedBlob::commit`] succeeds.
///
/// # Invariants
///
/// - `commit` never replaces an existing blob; it fails with
///   [`crate::StorageError::AlreadyExists`] and leaves the staged bytes intact
///   so the caller can retry under another name
/// - After a successful `commit` or a `discard`, writes fail
pub trait StagedBlob: Write + Send {
    /// Publishes the staged bytes under `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A blob named `name` already exists (the staged bytes are kept)
    /// - The blob was already committed or discarded
    /// - An I/O error occurs
    fn commit(&mut self, name: &str) -> StorageResult<()>;

    /// Drops the staged bytes without publishing them.
    ///
    /// Discarding an already committed or discarded blob is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if temporary resources cannot be released.
    fn discard(&mut self) -> StorageResult<()>;

    /// Cuts the staged bytes back to the first `len` bytes written.
    ///
    /// Used to drop a partially written tail after a failed write, so the
    /// complete prefix can still be committed.
    ///
    /// # Errors
    ///
    /// Returns an error if `len` exceeds the bytes written so far, the blob
    /// was already committed or discarded, or an I/O error occurs.
    fn truncate(&mut self, len: u64) -> StorageResult<()>;
}

/// A container of named, immutable blobs.
///
/// Stores are **opaque**. BurstDB owns naming conventions and the byte
/// format of every blob.
///
/// # Invariants
///
/// - `list` returns only committed blobs
/// - `open_read` returns exactly the bytes that were committed
/// - Stores must be `Send + Sync`: listing and opening readers or staged
///   blobs may happen concurrently from many threads
///
/// # Implementors
///
/// - [`super::InMemoryStore`] - For testing
/// - [`super::DirStore`] - For persistent storage
pub trait BlobStore: Send + Sync + Debug {
    /// Lists the names of all committed blobs, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying location cannot be listed.
    fn list(&self) -> StorageResult<Vec<String>>;

    /// Returns whether a committed blob with this name exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying location cannot be queried.
    fn contains(&self, name: &str) -> StorageResult<bool>;

    /// Opens a sequential reader over a committed blob.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::NotFound`] if no blob has that name.
    fn open_read(&self, name: &str) -> StorageResult<BlobReader>;

    /// Starts a new staged blob.
    ///
    /// `prefix` is a hint for naming temporary resources. Stores that keep
    /// temporaries next to committed blobs must make sure the prefix is
    /// preserved so readers can tell them apart.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary resource cannot be created.
    fn create(&self, prefix: &str) -> StorageResult<Box<dyn StagedBlob>>;

    /// Removes a committed blob.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::NotFound`] if no blob has that name.
    fn remove(&self, name: &str) -> StorageResult<()>;
}

/// Rejects names that could escape the store or collide with temporaries.
pub(crate) fn validate_name(name: &str) -> StorageResult<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');
    if invalid {
        return Err(crate::StorageError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_names_are_valid() {
        assert!(validate_name("burst-1-2.bdb").is_ok());
        assert!(validate_name("snapshot-7.bdb").is_ok());
    }

    #[test]
    fn path_like_names_are_rejected() {
        for name in ["", ".", "..", "a/b", "a\\b", "nul\0"] {
            assert!(validate_name(name).is_err(), "{name:?} should be rejected");
        }
    }
}
