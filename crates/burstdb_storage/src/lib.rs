//! # BurstDB Storage
//!
//! Blob store trait and implementations for BurstDB.
//!
//! This crate provides the lowest-level storage abstraction for BurstDB.
//! Stores are **opaque named-blob containers** - they do not interpret
//! the bytes they hold.
//!
//! ## Design Principles
//!
//! - A blob is written once through a [`StagedBlob`] and becomes visible
//!   only when it is committed under a name
//! - Committed blobs are immutable and never overwritten
//! - No knowledge of bursts, snapshots, or frame formats
//! - Must be `Send + Sync` for concurrent listing and reading
//!
//! ## Available Stores
//!
//! - [`InMemoryStore`] - For testing and ephemeral databases
//! - [`DirStore`] - One file per blob inside a directory
//!
//! ## Example
//!
//! ```rust
//! use burstdb_storage::{BlobStore, InMemoryStore};
//! use std::io::{Read, Write};
//!
//! let store = InMemoryStore::new();
//! let mut staged = store.create("tmp-").unwrap();
//! staged.write_all(b"hello world").unwrap();
//! staged.commit("greeting").unwrap();
//!
//! let mut data = Vec::new();
//! store.open_read("greeting").unwrap().read_to_end(&mut data).unwrap();
//! assert_eq!(&data, b"hello world");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::{BlobReader, BlobStore, StagedBlob};
pub use error::{StorageError, StorageResult};
pub use file::{DirStore, DirStoreOptions};
pub use memory::InMemoryStore;
