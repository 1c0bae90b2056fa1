//! Checksummed frame envelope.
//!
//! Every record in a burst or snapshot blob is wrapped in a frame:
//!
//! ```text
//! | magic (4) | version (2) | kind (1) | length (4) | payload (length) | crc32 (4) |
//! ```
//!
//! All integers are little-endian. The CRC32 covers the header and payload.

use crate::error::{CodecError, CodecResult};
use std::io::{self, Read, Write};

/// Magic bytes identifying a frame.
pub const FRAME_MAGIC: [u8; 4] = *b"BRST";

/// Current frame format version.
pub const FRAME_VERSION: u16 = 1;

/// Header size: magic (4) + version (2) + kind (1) + length (4).
pub const HEADER_SIZE: usize = 11;

/// Trailing checksum size.
pub const CRC_SIZE: usize = 4;

/// Kind of record carried by a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameKind {
    /// A transaction inside a burst.
    Transaction = 1,
    /// An operation inside a snapshot.
    Operation = 2,
}

impl FrameKind {
    /// Converts a byte to a frame kind.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Transaction),
            2 => Some(Self::Operation),
            _ => None,
        }
    }

    /// Converts the frame kind to a byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

/// A decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Kind of record.
    pub kind: FrameKind,
    /// Raw payload bytes.
    pub payload: Vec<u8>,
}

/// Encodes a frame into a byte vector.
///
/// # Errors
///
/// Returns an error if the payload does not fit the 32-bit length field.
pub fn encode_frame(kind: FrameKind, payload: &[u8]) -> CodecResult<Vec<u8>> {
    let len = u32::try_from(payload.len()).map_err(|_| CodecError::TooLarge {
        what: "frame payload",
        len: payload.len(),
    })?;

    let mut data = Vec::with_capacity(HEADER_SIZE + payload.len() + CRC_SIZE);
    data.extend_from_slice(&FRAME_MAGIC);
    data.extend_from_slice(&FRAME_VERSION.to_le_bytes());
    data.push(kind.as_byte());
    data.extend_from_slice(&len.to_le_bytes());
    data.extend_from_slice(payload);

    let crc = crc32fast::hash(&data);
    data.extend_from_slice(&crc.to_le_bytes());
    Ok(data)
}

/// Writes one frame and returns the number of bytes written.
///
/// # Errors
///
/// Returns an error if encoding fails or the writer fails.
pub fn write_frame<W: Write + ?Sized>(
    writer: &mut W,
    kind: FrameKind,
    payload: &[u8],
) -> CodecResult<usize> {
    let data = encode_frame(kind, payload)?;
    writer.write_all(&data)?;
    Ok(data.len())
}

/// Streams frames out of a reader one at a time.
///
/// A clean end of input at a frame boundary ends the stream. Anything else
/// (a truncated frame, bad magic, an unknown kind, a newer version or a
/// checksum mismatch) is reported as an error.
#[derive(Debug)]
pub struct FrameReader<R> {
    inner: R,
    frames_read: u64,
}

impl<R: Read> FrameReader<R> {
    /// Wraps a reader.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            frames_read: 0,
        }
    }

    /// Returns the number of frames successfully read so far.
    #[must_use]
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Consumes the frame reader, returning the wrapped reader.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Reads the next frame.
    ///
    /// Returns `Ok(None)` at a clean end of input.
    ///
    /// # Errors
    ///
    /// Returns an error for I/O failures and damaged or truncated frames.
    pub fn next_frame(&mut self) -> CodecResult<Option<Frame>> {
        let mut header = [0u8; HEADER_SIZE];
        match read_full(&mut self.inner, &mut header)? {
            0 => return Ok(None),
            n if n < HEADER_SIZE => return Err(CodecError::UnexpectedEof),
            _ => {}
        }

        let mut magic = [0u8; 4];
        magic.copy_from_slice(&header[0..4]);
        if magic != FRAME_MAGIC {
            return Err(CodecError::InvalidMagic { found: magic });
        }

        let version = u16::from_le_bytes([header[4], header[5]]);
        if version > FRAME_VERSION {
            return Err(CodecError::UnsupportedVersion { version });
        }

        let kind =
            FrameKind::from_byte(header[6]).ok_or(CodecError::UnknownFrameKind { kind: header[6] })?;
        let len = u32::from_le_bytes([header[7], header[8], header[9], header[10]]) as usize;

        let mut payload = vec![0u8; len];
        if read_full(&mut self.inner, &mut payload)? < len {
            return Err(CodecError::UnexpectedEof);
        }
        let mut crc_bytes = [0u8; CRC_SIZE];
        if read_full(&mut self.inner, &mut crc_bytes)? < CRC_SIZE {
            return Err(CodecError::UnexpectedEof);
        }

        let expected = u32::from_le_bytes(crc_bytes);
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&header);
        hasher.update(&payload);
        let actual = hasher.finalize();
        if expected != actual {
            return Err(CodecError::ChecksumMismatch { expected, actual });
        }

        self.frames_read += 1;
        Ok(Some(Frame { kind, payload }))
    }
}

/// Fills `buf` as far as the input allows, returning the bytes read.
fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
