//! Operations, queries and transactions.
//!
//! Application code defines mutations by implementing [`Writer`] on a
//! serde-serializable type. Every writer is usable as a type-erased
//! [`Operation`], which is what bursts and snapshots store and replay.

use crate::error::CoreResult;
use crate::types::OperationId;
use burstdb_codec::{to_cbor, CodecResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

/// A deterministic, serializable mutation of a root of type `R`.
///
/// `KIND` is the tag stored next to the encoded operation and must be unique
/// within an [`OperationRegistry`](crate::OperationRegistry).
///
/// # Example
///
/// ```
/// use burstdb_core::{CoreResult, Writer};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Add(i64);
///
/// impl Writer<i64> for Add {
///     const KIND: &'static str = "add";
///     type Output = i64;
///
///     fn write(&self, root: &mut i64) -> CoreResult<i64> {
///         *root += self.0;
///         Ok(*root)
///     }
/// }
/// ```
pub trait Writer<R>: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Kind tag identifying this operation type in persisted data.
    const KIND: &'static str;

    /// Result returned to the caller of the mutation.
    type Output;

    /// Applies the mutation to the root.
    ///
    /// # Errors
    ///
    /// Returns an error if the root is in a state the mutation rejects. The
    /// root must be left unchanged in that case.
    fn write(&self, root: &mut R) -> CoreResult<Self::Output>;
}

/// A type-erased operation as stored in bursts and snapshots.
///
/// Implemented for every [`Writer`].
pub trait Operation<R>: Send + Sync {
    /// Kind tag of the operation.
    fn kind(&self) -> &'static str;

    /// Encodes the operation body.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation cannot be serialized.
    fn encode(&self) -> CodecResult<Vec<u8>>;

    /// Applies the operation to the root, discarding its output.
    ///
    /// # Errors
    ///
    /// Returns the error reported by the underlying writer.
    fn apply(&self, root: &mut R) -> CoreResult<()>;
}

impl<R, W: Writer<R>> Operation<R> for W {
    fn kind(&self) -> &'static str {
        W::KIND
    }

    fn encode(&self) -> CodecResult<Vec<u8>> {
        to_cbor(self)
    }

    fn apply(&self, root: &mut R) -> CoreResult<()> {
        self.write(root).map(|_| ())
    }
}

/// A read-only query over a root of type `R`. Queries are never persisted.
///
/// Any `Fn(&R) -> T` is a reader.
pub trait Reader<R> {
    /// Result of the query.
    type Output;

    /// Runs the query.
    fn read(&self, root: &R) -> Self::Output;
}

impl<R, T, F: Fn(&R) -> T> Reader<R> for F {
    type Output = T;

    fn read(&self, root: &R) -> T {
        self(root)
    }
}

/// An operation together with its position in the history.
pub struct Transaction<R> {
    /// Position of the operation.
    pub id: OperationId,
    /// The operation.
    pub operation: Box<dyn Operation<R>>,
}

impl<R> Transaction<R> {
    /// Creates a transaction.
    pub fn new(id: OperationId, operation: Box<dyn Operation<R>>) -> Self {
        Self { id, operation }
    }

    /// Creates a transaction from a concrete writer.
    pub fn from_writer<W: Writer<R>>(id: OperationId, writer: W) -> Self {
        Self::new(id, Box::new(writer))
    }
}

impl<R> fmt::Debug for Transaction<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("kind", &self.operation.kind())
            .finish()
    }
}
