//! # BurstDB Codec
//!
//! On-disk encoding for BurstDB bursts and snapshots.
//!
//! A blob is a sequence of checksummed frames. Each frame carries either a
//! transaction (burst blobs) or an operation (snapshot blobs):
//!
//! - [`frame`]: the `magic | version | kind | length | payload | crc32`
//!   envelope and a streaming [`FrameReader`]
//! - [`envelope`]: the id and kind-tag layout inside a frame payload
//! - [`to_cbor`] / [`from_cbor`]: serde-based CBOR for operation bodies
//!
//! ## Usage
//!
//! ```
//! use burstdb_codec::{
//!     from_cbor, to_cbor, write_frame, FrameKind, FrameReader, TransactionEnvelope,
//! };
//!
//! let envelope = TransactionEnvelope {
//!     id: 1,
//!     kind: "add".to_string(),
//!     body: to_cbor(&3i64).unwrap(),
//! };
//!
//! let mut blob = Vec::new();
//! write_frame(&mut blob, FrameKind::Transaction, &envelope.encode().unwrap()).unwrap();
//!
//! let mut reader = FrameReader::new(blob.as_slice());
//! let frame = reader.next_frame().unwrap().unwrap();
//! let decoded = TransactionEnvelope::decode(&frame.payload).unwrap();
//! assert_eq!(decoded.id, 1);
//! assert_eq!(from_cbor::<i64>(&decoded.body).unwrap(), 3);
//! assert!(reader.next_frame().unwrap().is_none());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cbor;
pub mod envelope;
mod error;
pub mod frame;

pub use cbor::{from_cbor, to_cbor};
pub use envelope::{OperationEnvelope, TransactionEnvelope};
pub use error::{CodecError, CodecResult};
pub use frame::{encode_frame, write_frame, Frame, FrameKind, FrameReader, FRAME_MAGIC, FRAME_VERSION};
