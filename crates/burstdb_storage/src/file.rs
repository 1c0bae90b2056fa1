//! Directory-backed blob store for persistent storage.

use crate::backend::{validate_name, BlobReader, BlobStore, StagedBlob};
use crate::error::{StorageError, StorageResult};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Options for a [`DirStore`].
#[derive(Debug, Clone, Copy)]
pub struct DirStoreOptions {
    /// Whether to fsync blob files and the directory when publishing.
    pub sync: bool,
}

impl Default for DirStoreOptions {
    fn default() -> Self {
        Self { sync: true }
    }
}

/// A blob store that keeps one file per blob inside a directory.
///
/// Staged blobs are written to named temporary files in the same directory
/// (their names start with the prefix given to [`BlobStore::create`]) and
/// are published with a no-clobber rename. A reader therefore never observes
/// a partially written blob.
///
/// # Durability
///
/// With [`DirStoreOptions::sync`] set, `commit` calls `File::sync_all()` on
/// the blob before the rename and syncs the directory afterwards.
///
/// # Thread Safety
///
/// The store itself is stateless apart from its path and may be shared
/// across threads. Staged blobs and readers are used by one owner at a time.
///
/// # Example
///
/// ```no_run
/// use burstdb_storage::{BlobStore, DirStore};
/// use std::io::Write;
/// use std::path::Path;
///
/// let store = DirStore::open(Path::new("data")).unwrap();
/// let mut staged = store.create("tmp-").unwrap();
/// staged.write_all(b"persistent data").unwrap();
/// staged.commit("blob-1").unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct DirStore {
    dir: PathBuf,
    options: DirStoreOptions,
}

impl DirStore {
    /// Opens an existing directory as a store with default options.
    ///
    /// # Errors
    ///
    /// Returns an error if the path does not exist or is not a directory.
    pub fn open(dir: &Path) -> StorageResult<Self> {
        Self::open_with_options(dir, DirStoreOptions::default())
    }

    /// Opens an existing directory as a store.
    ///
    /// # Errors
    ///
    /// Returns an error if the path does not exist or is not a directory.
    pub fn open_with_options(dir: &Path, options: DirStoreOptions) -> StorageResult<Self> {
        if !dir.is_dir() {
            return Err(StorageError::Unavailable(format!(
                "not a directory: {}",
                dir.display()
            )));
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            options,
        })
    }

    /// Opens a store, creating the directory and its parents if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open_with_create_dirs(dir: &Path, options: DirStoreOptions) -> StorageResult<Self> {
        fs::create_dir_all(dir)?;
        Self::open_with_options(dir, options)
    }

    /// Returns the directory holding the blobs.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.dir
    }

    fn blob_path(&self, name: &str) -> StorageResult<PathBuf> {
        validate_name(name)?;
        Ok(self.dir.join(name))
    }
}

impl BlobStore for DirStore {
    fn list(&self) -> StorageResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => debug!(name = ?raw, "skipping non UTF-8 directory entry"),
            }
        }
        Ok(names)
    }

    fn contains(&self, name: &str) -> StorageResult<bool> {
        Ok(self.blob_path(name)?.is_file())
    }

    fn open_read(&self, name: &str) -> StorageResult<BlobReader> {
        let path = self.blob_path(name)?;
        match File::open(&path) {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn create(&self, prefix: &str) -> StorageResult<Box<dyn StagedBlob>> {
        let file = tempfile::Builder::new()
            .prefix(prefix)
            .tempfile_in(&self.dir)?;
        Ok(Box::new(DirStagedBlob {
            writer: Some(BufWriter::new(file)),
            dir: self.dir.clone(),
            sync: self.options.sync,
        }))
    }

    fn remove(&self, name: &str) -> StorageResult<()> {
        let path = self.blob_path(name)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// A staged blob backed by a named temporary file.
struct DirStagedBlob {
    writer: Option<BufWriter<NamedTempFile>>,
    dir: PathBuf,
    sync: bool,
}

impl DirStagedBlob {
    fn closed() -> io::Error {
        io::Error::new(
            io::ErrorKind::Other,
            "blob already committed or discarded",
        )
    }
}

impl Write for DirStagedBlob {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.as_mut().ok_or_else(Self::closed)?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.writer.as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }
}

impl StagedBlob for DirStagedBlob {
    fn commit(&mut self, name: &str) -> StorageResult<()> {
        validate_name(name)?;
        let writer = self.writer.take().ok_or_else(Self::closed)?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;

        if self.sync {
            file.as_file().sync_all()?;
        }

        let target = self.dir.join(name);
        match file.persist_noclobber(&target) {
            Ok(_) => {}
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                self.writer = Some(BufWriter::new(e.file));
                return Err(StorageError::AlreadyExists(name.to_string()));
            }
            Err(e) => return Err(StorageError::Io(e.error)),
        }

        if self.sync {
            sync_directory(&self.dir)?;
        }
        debug!(path = %target.display(), "published blob");
        Ok(())
    }

    fn discard(&mut self) -> StorageResult<()> {
        if let Some(writer) = self.writer.take() {
            // Unflushed bytes are irrelevant; the temporary file is deleted.
            let (file, _) = writer.into_parts();
            file.close()?;
        }
        Ok(())
    }

    fn truncate(&mut self, len: u64) -> StorageResult<()> {
        let writer = self.writer.take().ok_or_else(Self::closed)?;
        // Bytes still buffered follow the file position; a failed flush
        // leaves only the unwritten remainder in the buffer.
        let (mut file, buffered) = writer.into_parts();
        let buffered = buffered.unwrap_or_else(|panicked| panicked.into_inner());
        let result = cut_file(&mut file, &buffered, len);
        self.writer = Some(BufWriter::new(file));
        result
    }
}

fn cut_file(file: &mut NamedTempFile, buffered: &[u8], len: u64) -> StorageResult<()> {
    let flushed = file.stream_position()?;
    let total = flushed + buffered.len() as u64;
    if len > total {
        file.write_all(buffered)?;
        return Err(StorageError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("cannot truncate {total} staged bytes to {len}"),
        )));
    }
    if len > flushed {
        let keep = (len - flushed) as usize;
        file.write_all(&buffered[..keep])?;
    }
    file.as_file().set_len(len)?;
    file.seek(SeekFrom::Start(len))?;
    Ok(())
}

impl Drop for DirStagedBlob {
    fn drop(&mut self) {
        if let Err(e) = self.discard() {
            warn!(error = %e, "failed to remove temporary blob");
        }
    }
}

/// Fsyncs a directory so a rename inside it is durable.
#[cfg(unix)]
fn sync_directory(dir: &Path) -> StorageResult<()> {
    File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_directory(_dir: &Path) -> StorageResult<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::tempdir;

    fn read_all(store: &DirStore, name: &str) -> Vec<u8> {
        let mut data = Vec::new();
        store
            .open_read(name)
            .unwrap()
            .read_to_end(&mut data)
            .unwrap();
        data
    }

    #[test]
    fn dir_open_missing_fails() {
        let dir = tempdir().unwrap();
        let result = DirStore::open(&dir.path().join("missing"));
        assert!(matches!(result, Err(StorageError::Unavailable(_))));
    }

    #[test]
    fn dir_create_with_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("store");
        let store = DirStore::open_with_create_dirs(&path, DirStoreOptions::default()).unwrap();
        assert_eq!(store.path(), path);
        assert!(path.is_dir());
    }

    #[test]
    fn dir_commit_and_read() {
        let dir = tempdir().unwrap();
        let store = DirStore::open(dir.path()).unwrap();

        let mut staged = store.create("tmp-").unwrap();
        staged.write_all(b"hello world").unwrap();
        staged.commit("blob").unwrap();

        assert_eq!(store.list().unwrap(), vec!["blob".to_string()]);
        assert_eq!(read_all(&store, "blob"), b"hello world");
    }

    #[test]
    fn dir_staged_blob_uses_prefixed_temp_file() {
        let dir = tempdir().unwrap();
        let store = DirStore::open(dir.path()).unwrap();

        let mut staged = store.create("tmp-burst-").unwrap();
        staged.write_all(b"pending").unwrap();
        staged.flush().unwrap();

        let names = store.list().unwrap();
        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with("tmp-burst-"));

        staged.discard().unwrap();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn dir_drop_removes_temp_file() {
        let dir = tempdir().unwrap();
        let store = DirStore::open(dir.path()).unwrap();
        {
            let mut staged = store.create("tmp-").unwrap();
            staged.write_all(b"abandoned").unwrap();
        }
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn dir_commit_does_not_clobber() {
        let dir = tempdir().unwrap();
        let store = DirStore::open(dir.path()).unwrap();

        let mut first = store.create("tmp-").unwrap();
        first.write_all(b"one").unwrap();
        first.commit("a").unwrap();

        let mut second = store.create("tmp-").unwrap();
        second.write_all(b"two").unwrap();
        assert!(matches!(
            second.commit("a"),
            Err(StorageError::AlreadyExists(_))
        ));
        second.commit("b").unwrap();

        assert_eq!(read_all(&store, "a"), b"one");
        assert_eq!(read_all(&store, "b"), b"two");
    }

    #[test]
    fn dir_truncate_keeps_prefix() {
        let dir = tempdir().unwrap();
        let store = DirStore::open(dir.path()).unwrap();

        let mut staged = store.create("tmp-").unwrap();
        staged.write_all(b"flushed|").unwrap();
        staged.flush().unwrap();
        staged.write_all(b"buffered|torn").unwrap();
        staged.truncate(17).unwrap();
        assert!(staged.truncate(18).is_err());
        staged.write_all(b"!").unwrap();
        staged.commit("t").unwrap();
        assert_eq!(read_all(&store, "t"), b"flushed|buffered|!");

        let mut staged = store.create("tmp-").unwrap();
        staged.write_all(b"abcdef").unwrap();
        staged.flush().unwrap();
        staged.truncate(2).unwrap();
        staged.commit("u").unwrap();
        assert_eq!(read_all(&store, "u"), b"ab");
    }

    #[test]
    fn dir_persistence() {
        let dir = tempdir().unwrap();
        {
            let store = DirStore::open(dir.path()).unwrap();
            let mut staged = store.create("tmp-").unwrap();
            staged.write_all(b"persistent data").unwrap();
            staged.commit("p").unwrap();
        }

        let store = DirStore::open(dir.path()).unwrap();
        assert_eq!(read_all(&store, "p"), b"persistent data");
    }

    #[test]
    fn dir_list_skips_directories() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("file"), b"x").unwrap();
        let store = DirStore::open(dir.path()).unwrap();
        assert_eq!(store.list().unwrap(), vec!["file".to_string()]);
    }

    #[test]
    fn dir_remove_and_missing() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("file"), b"x").unwrap();
        let store = DirStore::open(dir.path()).unwrap();

        assert!(store.contains("file").unwrap());
        store.remove("file").unwrap();
        assert!(!store.contains("file").unwrap());
        assert!(matches!(
            store.remove("file"),
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            store.open_read("file"),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn dir_rejects_escaping_names() {
        let dir = tempdir().unwrap();
        let store = DirStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.open_read("../etc"),
            Err(StorageError::InvalidName(_))
        ));
    }
}
