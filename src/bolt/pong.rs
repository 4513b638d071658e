//! BOLT 1 pong message.

use super::ping::Ping;
use super::types::{read_u16_be, write_u16_be};
use super::BoltError;

/// Largest pong payload that still fits a Lightning message alongside the
/// type and length prefixes.
const MAX_PONG_BYTES: u16 = 65531;

/// BOLT 1 pong message (type 19).
///
/// Response to a ping, carrying the requested number of zero bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pong {
    /// Padding bytes (ignored by receiver).
    pub ignored: Vec<u8>,
}

impl Pong {
    /// Creates a pong carrying `num_bytes` zero bytes.
    #[must_use]
    pub fn new(num_bytes: u16) -> Self {
        Self {
            ignored: vec![0u8; usize::from(num_bytes)],
        }
    }

    /// Builds the response a ping asks for, or `None` when the request is
    /// oversized and must be ignored per BOLT 1.
    #[must_use]
    pub fn respond_to(ping: &Ping) -> Option<Self> {
        if ping.num_pong_bytes > MAX_PONG_BYTES {
            return None;
        }
        Some(Self::new(ping.num_pong_bytes))
    }

    /// Encodes to wire format (without message type prefix).
    ///
    /// # Panics
    ///
    /// Panics if the padding exceeds the u16 length prefix.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let byteslen = u16::try_from(self.ignored.len()).expect("padding fits u16");

        let mut out = Vec::with_capacity(2 + self.ignored.len());
        write_u16_be(byteslen, &mut out);
        out.extend_from_slice(&self.ignored);
        out
    }

    /// Decodes from wire format (without message type prefix).
    ///
    /// # Errors
    ///
    /// Returns `Truncated` if the payload is too short.
    pub fn decode(payload: &[u8]) -> Result<Self, BoltError> {
        let mut cursor = payload;
        let byteslen = usize::from(read_u16_be(&mut cursor)?);

        if cursor.len() < byteslen {
            return Err(BoltError::Truncated {
                expected: byteslen,
                actual: cursor.len(),
            });
        }

        Ok(Self {
            ignored: cursor[..byteslen].to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_empty() {
        assert_eq!(Pong::new(0).encode(), [0x00, 0x00]);
    }

    #[test]
    fn roundtrip() {
        let original = Pong::new(8);
        let decoded = Pong::decode(&original.encode()).unwrap();
        assert_eq!(decoded, original);
        assert_eq!(decoded.ignored.len(), 8);
    }

    #[test]
    fn respond_to_matches_requested_length() {
        let ping = Ping::new(42);
        let pong = Pong::respond_to(&ping).expect("in range");
        assert_eq!(pong.ignored.len(), 42);
    }

    #[test]
    fn respond_to_oversized_request_is_ignored() {
        assert_eq!(Pong::respond_to(&Ping::new(MAX_PONG_BYTES)).map(|p| p.ignored.len()), Some(65531));
        assert!(Pong::respond_to(&Ping::new(MAX_PONG_BYTES + 1)).is_none());
    }

    #[test]
    fn decode_truncated_padding() {
        let payload = [0x00, 0x03, 0xaa];
        assert_eq!(
            Pong::decode(&payload),
            Err(BoltError::Truncated {
                expected: 3,
                actual: 1
            })
        );
    }
}
