//! Payload layouts for transaction and operation frames.
//!
//! ```text
//! transaction: | id u64 | kind_len u16 | kind (utf-8) | body |
//! operation:   |           kind_len u16 | kind (utf-8) | body |
//! ```
//!
//! The body is the operation's own encoding (CBOR for operations defined
//! through serde) and runs to the end of the frame payload.

use crate::error::{CodecError, CodecResult};

/// A transaction as stored in a burst: its id, its operation kind tag and the
/// encoded operation body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionEnvelope {
    /// Operation id.
    pub id: u64,
    /// Registered kind tag of the operation.
    pub kind: String,
    /// Encoded operation.
    pub body: Vec<u8>,
}

impl TransactionEnvelope {
    /// Encodes the envelope into a frame payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the kind tag is longer than 65535 bytes.
    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        let mut out = Vec::with_capacity(8 + 2 + self.kind.len() + self.body.len());
        out.extend_from_slice(&self.id.to_le_bytes());
        put_kind(&mut out, &self.kind)?;
        out.extend_from_slice(&self.body);
        Ok(out)
    }

    /// Decodes an envelope from a frame payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is truncated or the kind is not UTF-8.
    pub fn decode(payload: &[u8]) -> CodecResult<Self> {
        let (id_bytes, rest) = split(payload, 8)?;
        let mut id = [0u8; 8];
        id.copy_from_slice(id_bytes);
        let (kind, body) = take_kind(rest)?;
        Ok(Self {
            id: u64::from_le_bytes(id),
            kind,
            body: body.to_vec(),
        })
    }
}

/// An operation as stored in a snapshot: its kind tag and encoded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationEnvelope {
    /// Registered kind tag of the operation. Empty for an absent operation.
    pub kind: String,
    /// Encoded operation.
    pub body: Vec<u8>,
}

impl OperationEnvelope {
    /// Encodes the envelope into a frame payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the kind tag is longer than 65535 bytes.
    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        let mut out = Vec::with_capacity(2 + self.kind.len() + self.body.len());
        put_kind(&mut out, &self.kind)?;
        out.extend_from_slice(&self.body);
        Ok(out)
    }

    /// Decodes an envelope from a frame payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is truncated or the kind is not UTF-8.
    pub fn decode(payload: &[u8]) -> CodecResult<Self> {
        let (kind, body) = take_kind(payload)?;
        Ok(Self {
            kind,
            body: body.to_vec(),
        })
    }
}

fn put_kind(out: &mut Vec<u8>, kind: &str) -> CodecResult<()> {
    let len = u16::try_from(kind.len()).map_err(|_| CodecError::TooLarge {
        what: "operation kind",
        len: kind.len(),
    })?;
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(kind.as_bytes());
    Ok(())
}

fn take_kind(data: &[u8]) -> CodecResult<(String, &[u8])> {
    let (len_bytes, rest) = split(data, 2)?;
    let len = u16::from_le_bytes([len_bytes[0], len_bytes[1]]) as usize;
    let (kind, body) = split(rest, len)?;
    let kind = std::str::from_utf8(kind).map_err(|_| CodecError::InvalidUtf8)?;
    Ok((kind.to_string(), body))
}

fn split(data: &[u8], at: usize) -> CodecResult<(&[u8], &[u8])> {
    if data.len() < at {
        return Err(CodecError::UnexpectedEof);
    }
    Ok(data.split_at(at))
}
