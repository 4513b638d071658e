//! BOLT 1 ping message.

use super::types::{read_u16_be, write_u16_be};
use super::BoltError;

/// BOLT 1 ping message (type 18).
///
/// Used for connection liveness checks and traffic obfuscation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ping {
    /// Number of bytes the peer should respond with in pong.
    pub num_pong_bytes: u16,
    /// Padding bytes (ignored by receiver).
    pub ignored: Vec<u8>,
}

impl Ping {
    /// Creates a ping requesting `num_pong_bytes` in the pong response.
    #[must_use]
    pub fn new(num_pong_bytes: u16) -> Self {
        Self {
            num_pong_bytes,
            ignored: Vec::new(),
        }
    }

    /// Creates a ping carrying `padding_len` zero bytes of padding.
    #[must_use]
    pub fn with_padding(num_pong_bytes: u16, padding_len: u16) -> Self {
        Self {
            num_pong_bytes,
            ignored: vec![0u8; usize::from(padding_len)],
        }
    }

    /// Encodes to wire format (without message type prefix).
    ///
    /// # Panics
    ///
    /// Panics if the padding exceeds the u16 length prefix.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let byteslen = u16::try_from(self.ignored.len()).expect("padding fits u16");

        let mut out = Vec::with_capacity(4 + self.ignored.len());
        write_u16_be(self.num_pong_bytes, &mut out);
        write_u16_be(byteslen, &mut out);
        out.extend_from_slice(&self.ignored);
        out
    }

    /// Decodes from wire format (without message type prefix).
    ///
    /// Bytes after the declared padding are ignored (a TLV extension may
    /// follow).
    ///
    /// # Errors
    ///
    /// Returns `Truncated` if the payload is too short.
    pub fn decode(payload: &[u8]) -> Result<Self, BoltError> {
        let mut cursor = payload;
        let num_pong_bytes = read_u16_be(&mut cursor)?;
        let byteslen = usize::from(read_u16_be(&mut cursor)?);

        if cursor.len() < byteslen {
            return Err(BoltError::Truncated {
                expected: byteslen,
                actual: cursor.len(),
            });
        }

        Ok(Self {
            num_pong_bytes,
            ignored: cursor[..byteslen].to_vec(),
        })
    }
}
