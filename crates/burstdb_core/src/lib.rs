//! # BurstDB Core
//!
//! Log-structured persistence for an in-memory root object.
//!
//! The root lives in memory. Every mutation is applied to it and then
//! appended, as a numbered transaction, to a *burst*: an immutable file of
//! consecutive transactions. A *snapshot* captures the whole root as a list
//! of operations that rebuild it. On open, the newest usable snapshot is
//! applied and the bursts that follow it are replayed.
//!
//! This crate provides:
//! - [`Writer`] and [`Reader`] operations over a caller-defined root
//! - [`OperationRegistry`] to decode persisted operations by kind
//! - Burst and snapshot contracts, and [`StoreRepository`] implementing them
//!   on any [`BlobStore`](burstdb_storage::BlobStore)
//! - [`apply_bursts`], the replay engine that merges overlapping bursts
//! - Rotation dispatchers deciding when a burst is finalized
//! - [`Database`], the facade tying it all together
//!
//! ## Quick Start
//!
//! ```
//! use burstdb_core::{Config, CoreResult, Database, OperationRegistry, Writer};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Default)]
//! struct Counter {
//!     value: i64,
//! }
//!
//! #[derive(Serialize, Deserialize)]
//! struct Add(i64);
//!
//! impl Writer<Counter> for Add {
//!     const KIND: &'static str = "add";
//!     type Output = i64;
//!
//!     fn write(&self, root: &mut Counter) -> CoreResult<i64> {
//!         root.value += self.0;
//!         Ok(root.value)
//!     }
//! }
//!
//! let registry = OperationRegistry::new().with::<Add>().unwrap();
//! let mut db = Database::open_in_memory(Counter::default(), registry, Config::default()).unwrap();
//! db.write(Add(3)).unwrap().into_result().unwrap();
//! db.write(Add(12)).unwrap().into_result().unwrap();
//!
//! assert_eq!(db.root().value, 15);
//! assert_eq!(db.last_id().as_u64(), 2);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod burst;
mod config;
mod database;
pub mod dispatch;
mod error;
mod operation;
mod order;
mod recovery;
mod registry;
mod replay;
pub mod repository;
mod snapshot;
mod types;

#[cfg(test)]
mod test_support;

pub use burst::{
    BurstHandle, BurstReader, BurstRef, BurstRepository, BurstWriter, WriteBurstRepository,
    WriterBounds,
};
pub use config::Config;
pub use database::{Database, WriteOutcome};
pub use dispatch::{dispatcher_for, BurstDispatcher, CountingDispatcher, DefaultDispatcher};
pub use error::{CoreError, CoreResult};
pub use operation::{Operation, Reader, Transaction, Writer};
pub use order::{burst_order, sort_bursts, sort_snapshots};
pub use recovery::{apply_best_snapshot, apply_snapshot, recover, select_snapshot, RecoveryReport};
pub use registry::OperationRegistry;
pub use replay::{apply_bursts, ReplayOutcome};
pub use repository::{BurstEntry, Catalog, PruneReport, SnapshotEntry, StoreRepository};
pub use snapshot::{
    SnapshotHandle, SnapshotReader, SnapshotRef, SnapshotRepository, SnapshotSink,
    SnapshotWriter, WriteSnapshotRepository,
};
pub use types::{BurstRange, OperationId};
