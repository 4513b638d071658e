//! BOLT 1 error message.

use super::types::{read_u16_be, write_u16_be, ChannelId, MAX_MESSAGE_SIZE};
use super::BoltError;

/// BOLT 1 error message (type 17).
///
/// Indicates a protocol violation or fatal condition. The receiver should
/// fail the referenced channel, or all channels when `channel_id` is all
/// zeros.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    /// Channel this error applies to (all zeros = all channels).
    pub channel_id: ChannelId,
    /// Error description. BOLT 1 says this should be printable ASCII, but
    /// arbitrary bytes are accepted on decode.
    pub data: Vec<u8>,
}

impl Error {
    /// Creates an error that applies to all channels.
    ///
    /// # Panics
    ///
    /// Panics if `msg` exceeds `MAX_MESSAGE_SIZE` bytes.
    #[must_use]
    pub fn all_channels(msg: &str) -> Self {
        Self::for_channel(ChannelId::ALL, msg)
    }

    /// Creates an error for a specific channel.
    ///
    /// # Panics
    ///
    /// Panics if `msg` exceeds `MAX_MESSAGE_SIZE` bytes.
    #[must_use]
    pub fn for_channel(channel_id: ChannelId, msg: &str) -> Self {
        assert!(
            msg.len() <= MAX_MESSAGE_SIZE,
            "error message exceeds maximum size"
        );
        Self {
            channel_id,
            data: msg.as_bytes().to_vec(),
        }
    }

    /// Encodes to wire format (without message type prefix).
    ///
    /// # Panics
    ///
    /// Panics if the data exceeds the u16 length prefix.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let len = u16::try_from(self.data.len()).expect("error data fits u16");

        let mut out = Vec::with_capacity(34 + self.data.len());
        self.channel_id.encode(&mut out);
        write_u16_be(len, &mut out);
        out.extend_from_slice(&self.data);
        out
    }

    /// Decodes from wire format (without message type prefix).
    ///
    /// # Errors
    ///
    /// Returns `Truncated` if the payload is too short.
    pub fn decode(payload: &[u8]) -> Result<Self, BoltError> {
        let mut cursor = payload;
        let channel_id = ChannelId::decode(&mut cursor)?;
        let len = usize::from(read_u16_be(&mut cursor)?);

        if cursor.len() < len {
            return Err(BoltError::Truncated {
                expected: len,
                actual: cursor.len(),
            });
        }

        Ok(Self {
            channel_id,
            data: cursor[..len].to_vec(),
        })
    }
}
