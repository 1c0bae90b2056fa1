//! # BurstDB Testkit
//!
//! Test utilities for BurstDB.
//!
//! This crate provides:
//! - Test roots, operations, snapshooters and database helpers
//! - Property-based burst layout generators using proptest
//! - Crash simulation for blob stores
//!
//! ## Usage
//!
//! ```rust
//! use burstdb_testkit::prelude::*;
//!
//! let mut db = TestDatabase::memory();
//! db.write(Add(3)).unwrap().into_result().unwrap();
//! assert_eq!(db.read(&counter_value), 3);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod crash;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::crash::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
