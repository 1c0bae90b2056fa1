//! Explicit operation registry.
//!
//! Persisted transactions carry a kind tag. A registry maps each tag to the
//! decoder of the [`Writer`] that produced it, so a repository can rebuild
//! type-erased operations without any process-wide registration.

use crate::error::{CoreError, CoreResult};
use crate::operation::{Operation, Writer};
use burstdb_codec::{from_cbor, CodecResult};
use std::collections::HashMap;
use std::fmt;

type DecodeFn<R> = fn(&[u8]) -> CodecResult<Box<dyn Operation<R>>>;

fn decode_writer<R, W: Writer<R>>(body: &[u8]) -> CodecResult<Box<dyn Operation<R>>> {
    let writer: W = from_cbor(body)?;
    Ok(Box::new(writer))
}

/// Maps operation kind tags to decoders.
///
/// # Example
///
/// ```
/// use burstdb_core::{CoreResult, OperationRegistry, Writer};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Add(i64);
///
/// impl Writer<i64> for Add {
///     const KIND: &'static str = "add";
///     type Output = ();
///     fn write(&self, root: &mut i64) -> CoreResult<()> {
///         *root += self.0;
///         Ok(())
///     }
/// }
///
/// let mut registry = OperationRegistry::<i64>::new();
/// registry.register::<Add>().unwrap();
/// assert!(registry.register::<Add>().is_err());
/// assert!(registry.contains("add"));
/// ```
pub struct OperationRegistry<R> {
    decoders: HashMap<&'static str, DecodeFn<R>>,
}

impl<R> OperationRegistry<R> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Registers a writer type under its kind tag.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateOperationKind` if the tag is already registered, or
    /// `InvalidOperation` if the tag is empty (an empty tag marks an absent
    /// operation in snapshots).
    pub fn register<W: Writer<R>>(&mut self) -> CoreResult<()> {
        if W::KIND.is_empty() {
            return Err(CoreError::invalid_operation(
                "operation kind must not be empty",
            ));
        }
        if self.decoders.contains_key(W::KIND) {
            return Err(CoreError::DuplicateOperationKind {
                kind: W::KIND.to_string(),
            });
        }
        self.decoders
            .insert(W::KIND, decode_writer::<R, W> as DecodeFn<R>);
        Ok(())
    }

    /// Registers a writer type, returning the registry for chaining.
    ///
    /// # Errors
    ///
    /// Same as [`register`](Self::register).
    pub fn with<W: Writer<R>>(mut self) -> CoreResult<Self> {
        self.register::<W>()?;
        Ok(self)
    }

    /// Returns true if a decoder is registered for `kind`.
    #[must_use]
    pub fn contains(&self, kind: &str) -> bool {
        self.decoders.contains_key(kind)
    }

    /// Returns the registered kind tags in sorted order.
    #[must_use]
    pub fn kinds(&self) -> Vec<&'static str> {
        let mut kinds: Vec<_> = self.decoders.keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }

    /// Decodes an operation body of the given kind.
    ///
    /// # Errors
    ///
    /// Returns `UnknownOperation` for an unregistered kind, or a codec error
    /// if the body does not decode.
    pub fn decode(&self, kind: &str, body: &[u8]) -> CoreResult<Box<dyn Operation<R>>> {
        let decode = self
            .decoders
            .get(kind)
            .ok_or_else(|| CoreError::unknown_operation(kind))?;
        Ok(decode(body)?)
    }
}

impl<R> Default for OperationRegistry<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> fmt::Debug for OperationRegistry<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
