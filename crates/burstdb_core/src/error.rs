//! Error types for BurstDB core.

use crate::types::OperationId;
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in BurstDB core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Blob store error.
    #[error("storage error: {0}")]
    Storage(#[from] burstdb_storage::StorageError),

    /// Frame or payload codec error.
    #[error("codec error: {0}")]
    Codec(#[from] burstdb_codec::CodecError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A transaction id was not greater than the last id written.
    #[error("invalid operation id {id}: must be greater than {last}")]
    InvalidOperationId {
        /// The rejected id.
        id: OperationId,
        /// The last id accepted by the writer.
        last: OperationId,
    },

    /// Write or close on a writer that was already closed.
    #[error("writer is closed")]
    WriterClosed,

    /// Read or close on a reader that was already closed.
    #[error("reader is closed")]
    ReaderClosed,

    /// Write on a dispatcher that was already closed.
    #[error("dispatcher is closed")]
    DispatcherClosed,

    /// Write on a database that was already closed.
    #[error("database is closed")]
    DatabaseClosed,

    /// A burst or snapshot handle outlived its repository.
    #[error("repository is closed")]
    RepositoryClosed,

    /// The database has no snapshot repository attached.
    #[error("no snapshot repository attached")]
    NoSnapshotRepository,

    /// No decoder is registered for an operation kind.
    #[error("unknown operation kind: {kind:?}")]
    UnknownOperation {
        /// The unregistered kind tag.
        kind: String,
    },

    /// An operation kind was registered twice.
    #[error("operation kind registered twice: {kind:?}")]
    DuplicateOperationKind {
        /// The duplicated kind tag.
        kind: String,
    },

    /// Bursts reach past the recovered history, so new ids would collide
    /// with operations that replay cannot reach.
    #[error("{count} burst(s) reach past the recovered history at {last}")]
    StrandedBursts {
        /// Last id recovery reached.
        last: OperationId,
        /// Number of bursts listed past it.
        count: usize,
    },

    /// A stored snapshot entry decoded to no operation.
    #[error("snapshot contains an absent operation")]
    NilOperation,

    /// An operation rejected the root state.
    #[error("operation failed: {message}")]
    OperationFailed {
        /// Description of the failure.
        message: String,
    },

    /// The root was mutated but the transaction could not be appended.
    #[error("operation {id} applied but not persisted: {source}")]
    AppendFailed {
        /// Id assigned to the operation.
        id: OperationId,
        /// The dispatcher's error.
        source: Box<CoreError>,
    },

    /// Invalid or corrupted persisted data.
    #[error("invalid format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why operation is invalid.
        message: String,
    },
}

impl CoreError {
    /// Creates an operation failed error.
    pub fn operation_failed(message: impl Into<String>) -> Self {
        Self::OperationFailed {
            message: message.into(),
        }
    }

    /// Creates an unknown operation error.
    pub fn unknown_operation(kind: impl Into<String>) -> Self {
        Self::UnknownOperation { kind: kind.into() }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Creates an invalid operation id error.
    pub fn invalid_operation_id(id: OperationId, last: OperationId) -> Self {
        Self::InvalidOperationId { id, last }
    }
}
