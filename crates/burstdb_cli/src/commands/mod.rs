//! CLI command implementations.

pub mod dump;
pub mod inspect;
pub mod prune;
pub mod verify;

use burstdb_core::{Config, OperationRegistry, StoreRepository};
use std::path::Path;

/// Opens an existing directory repository without decoding any operation.
///
/// The commands only look at names, frames and envelopes, so the root is
/// `()` and the registry is empty.
pub fn open_repository(path: &Path) -> Result<StoreRepository<()>, Box<dyn std::error::Error>> {
    let config = Config::default().create_if_missing(false);
    Ok(StoreRepository::open_dir(
        path,
        OperationRegistry::new(),
        &config,
    )?)
}
