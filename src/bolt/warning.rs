//! BOLT 1 warning message.

use super::types::{read_u16_be, write_u16_be, ChannelId, MAX_MESSAGE_SIZE};
use super::BoltError;

/// BOLT 1 warning message (type 1).
///
/// A non-fatal complaint about the referenced channel, or about no channel
/// in particular when `channel_id` is all zeros. Unlike an error, the
/// receiver may carry on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    /// Channel this warning applies to (all zeros = not channel-specific).
    pub channel_id: ChannelId,
    /// Warning description. BOLT 1 says this should be printable ASCII,
    /// but arbitrary bytes are accepted on decode.
    pub data: Vec<u8>,
}

impl Warning {
    /// Creates a warning not tied to any channel.
    ///
    /// # Panics
    ///
    /// Panics if `msg` exceeds `MAX_MESSAGE_SIZE` bytes.
    #[must_use]
    pub fn general(msg: &str) -> Self {
        Self::for_channel(ChannelId::ALL, msg)
    }

    /// Creates a warning for a specific channel.
    ///
    /// # Panics
    ///
    /// Panics if `msg` exceeds `MAX_MESSAGE_SIZE` bytes.
    #[must_use]
    pub fn for_channel(channel_id: ChannelId, msg: &str) -> Self {
        assert!(
            msg.len() <= MAX_MESSAGE_SIZE,
            "warning message exceeds maximum size"
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
        let len = u16::try_from(self.data.len()).expect("warning data fits u16");

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
