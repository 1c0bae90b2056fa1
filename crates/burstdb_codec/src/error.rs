//! Error types for the codec crate.

use std::io;
use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur during encoding or decoding.
#[derive(Error, Debug)]
pub enum CodecError {
    /// Failed to encode a value to CBOR.
    #[error("encoding failed: {message}")]
    EncodingFailed {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode CBOR bytes.
    #[error("decoding failed: {message}")]
    DecodingFailed {
        /// Description of the decoding error.
        message: String,
    },

    /// I/O error while reading or writing frames.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Input ended in the middle of a frame or envelope.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// A frame did not start with the expected magic bytes.
    #[error("invalid frame magic: {found:02x?}")]
    InvalidMagic {
        /// The bytes found instead.
        found: [u8; 4],
    },

    /// A frame was written by a newer format version.
    #[error("unsupported frame version {version}")]
    UnsupportedVersion {
        /// The version found in the frame header.
        version: u16,
    },

    /// A frame carried an unknown kind byte.
    #[error("unknown frame kind {kind}")]
    UnknownFrameKind {
        /// The kind byte found in the frame header.
        kind: u8,
    },

    /// A frame's checksum did not match its contents.
    #[error("checksum mismatch: expected {expected:#010x}, actual {actual:#010x}")]
    ChecksumMismatch {
        /// Checksum stored in the frame.
        expected: u32,
        /// Checksum computed over the frame.
        actual: u32,
    },

    /// A payload or field exceeded its length prefix.
    #[error("{what} too large: {len} bytes")]
    TooLarge {
        /// Which field overflowed.
        what: &'static str,
        /// The offending length.
        len: usize,
    },

    /// A kind string was not valid UTF-8.
    #[error("invalid UTF-8 string")]
    InvalidUtf8,
}

impl CodecError {
    /// Create an encoding failed error.
    pub fn encoding_failed(message: impl Into<String>) -> Self {
        Self::EncodingFailed {
            message: message.into(),
        }
    }

    /// Create a decoding failed error.
    pub fn decoding_failed(message: impl Into<String>) -> Self {
        Self::DecodingFailed {
            message: message.into(),
        }
    }

    /// Returns true if this error indicates damaged or truncated data
    /// rather than an I/O failure.
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        !matches!(self, Self::Io(_) | Self::EncodingFailed { .. })
    }
}
