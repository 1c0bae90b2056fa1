//! Test fixtures and database helpers.
//!
//! Provides two small roots with their operations, and convenience types for
//! setting up test databases and burst layouts.

use burstdb_core::{
    BurstRange, Config, CoreError, CoreResult, Database, OperationId, OperationRegistry,
    SnapshotSink, StoreRepository, Transaction, WriteBurstRepository, Writer,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tempfile::TempDir;

/// An integer counter.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Counter {
    /// Current value.
    pub value: i64,
}

/// Adds a signed amount to a [`Counter`] and returns the new value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Add(pub i64);

impl Writer<Counter> for Add {
    const KIND: &'static str = "add";
    type Output = i64;

    fn write(&self, root: &mut Counter) -> CoreResult<i64> {
        root.value = root
            .value
            .checked_add(self.0)
            .ok_or_else(|| CoreError::operation_failed("counter overflow"))?;
        Ok(root.value)
    }
}

/// Reads the value of a [`Counter`].
pub fn counter_value(root: &Counter) -> i64 {
    root.value
}

/// Registry decoding [`Add`].
pub fn counter_registry() -> OperationRegistry<Counter> {
    let mut registry = OperationRegistry::new();
    registry
        .register::<Add>()
        .expect("fresh registry accepts add");
    registry
}

/// Snapshots a counter as a single [`Add`] of its value.
///
/// # Errors
///
/// Returns an error if the snapshot writer fails.
pub fn counter_snapshooter(root: &Counter, sink: &mut SnapshotSink<'_, Counter>) -> CoreResult<()> {
    if root.value != 0 {
        sink.push_writer(&Add(root.value))?;
    }
    Ok(())
}

/// A record of appended values, in application order.
///
/// Replaying [`Append`] operations tagged with their own id makes the history
/// equal to the sequence of ids applied, which exposes duplicates, gaps and
/// reordering.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct History {
    /// Appended values.
    pub entries: Vec<u64>,
}

/// Appends a value to a [`History`] and returns the new length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Append(pub u64);

impl Writer<History> for Append {
    const KIND: &'static str = "append";
    type Output = usize;

    fn write(&self, root: &mut History) -> CoreResult<usize> {
        root.entries.push(self.0);
        Ok(root.entries.len())
    }
}

/// Registry decoding [`Append`].
pub fn history_registry() -> OperationRegistry<History> {
    let mut registry = OperationRegistry::new();
    registry
        .register::<Append>()
        .expect("fresh registry accepts append");
    registry
}

/// Snapshots a history as one [`Append`] per entry.
///
/// # Errors
///
/// Returns an error if the snapshot writer fails.
pub fn history_snapshooter(root: &History, sink: &mut SnapshotSink<'_, History>) -> CoreResult<()> {
    for &entry in &root.entries {
        sink.push_writer(&Append(entry))?;
    }
    Ok(())
}

/// Writes one burst holding `Append(id)` for every id in `ids`.
///
/// # Errors
///
/// Returns an error if the burst cannot be written.
pub fn write_history_burst(
    repository: &dyn WriteBurstRepository<History>,
    ids: &[u64],
) -> CoreResult<()> {
    let mut writer = repository.create_burst()?;
    for &id in ids {
        writer.write(&Transaction::from_writer(OperationId::new(id), Append(id)))?;
    }
    writer.close()
}

/// Writes one contiguous burst per range.
///
/// # Errors
///
/// Returns an error if a burst cannot be written.
pub fn write_history_layout(
    repository: &dyn WriteBurstRepository<History>,
    ranges: &[BurstRange],
) -> CoreResult<()> {
    for range in ranges {
        let ids: Vec<u64> = (range.first.as_u64()..=range.last.as_u64()).collect();
        write_history_burst(repository, &ids)?;
    }
    Ok(())
}

/// A test database with automatic cleanup.
pub struct TestDatabase {
    /// The database instance.
    pub db: Database<Counter>,
    config: Config,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: Option<TempDir>,
}

impl TestDatabase {
    /// Creates a new in-memory test database.
    pub fn memory() -> Self {
        Self::memory_with_config(Config::default())
    }

    /// Creates a new in-memory test database with a configuration.
    pub fn memory_with_config(config: Config) -> Self {
        Self {
            db: Database::open_in_memory(Counter::default(), counter_registry(), config.clone())
                .expect("Failed to open in-memory database"),
            config,
            temp_dir: None,
        }
    }

    /// Creates a new directory-backed test database.
    pub fn dir() -> Self {
        Self::dir_with_config(Config::default())
    }

    /// Creates a new directory-backed test database with a configuration.
    pub fn dir_with_config(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db = Database::open(
            temp_dir.path(),
            Counter::default(),
            counter_registry(),
            config.clone(),
        )
        .expect("Failed to open directory database");

        Self {
            db,
            config,
            temp_dir: Some(temp_dir),
        }
    }

    /// Returns the database directory if directory-backed, None if in-memory.
    pub fn path(&self) -> Option<&Path> {
        self.temp_dir.as_ref().map(TempDir::path)
    }

    /// Returns the repository the database writes to.
    pub fn repository(&self) -> &StoreRepository<Counter> {
        self.db
            .repository()
            .expect("test databases are opened with a repository")
    }

    /// Closes the database and recovers a fresh one from the same storage.
    pub fn reopen(mut self) -> Self {
        self.db.close().expect("Failed to close database");
        let db = match self.path() {
            Some(path) => Database::open(
                path,
                Counter::default(),
                counter_registry(),
                self.config.clone(),
            ),
            None => Database::open_store(
                self.repository().store().clone(),
                Counter::default(),
                counter_registry(),
                self.config.clone(),
            ),
        }
        .expect("Failed to reopen database");
        self.db = db;
        self
    }
}

impl std::ops::Deref for TestDatabase {
    type Target = Database<Counter>;

    fn deref(&self) -> &Self::Target {
        &self.db
    }
}

impl std::ops::DerefMut for TestDatabase {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.db
    }
}

/// Runs a test with a temporary in-memory database.
///
/// # Example
///
/// ```rust
/// use burstdb_testkit::{with_temp_db, Add};
///
/// let value = with_temp_db(|db| db.write(Add(3)).unwrap().output);
/// assert_eq!(value, 3);
/// ```
pub fn with_temp_db<F, T>(f: F) -> T
where
    F: FnOnce(&mut Database<Counter>) -> T,
{
    let mut test_db = TestDatabase::memory();
    f(&mut test_db.db)
}

/// Runs a test with a temporary directory-backed database.
pub fn with_dir_db<F, T>(f: F) -> T
where
    F: FnOnce(&mut Database<Counter>, &Path) -> T,
{
    let mut test_db = TestDatabase::dir();
    let path = test_db
        .temp_dir
        .as_ref()
        .map(|d| d.path().to_path_buf())
        .expect("Directory database should have a path");
    f(&mut test_db.db, &path)
}
