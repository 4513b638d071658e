//! Type-prefixed encoding of the BOLT 1 base messages.

use super::error_msg::Error;
use super::init::Init;
use super::ping::Ping;
use super::pong::Pong;
use super::types::{read_u16_be, write_u16_be};
use super::warning::Warning;
use super::BoltError;

/// Message type for warning.
pub const MSG_TYPE_WARNING: u16 = 1;
/// Message type for init.
pub const MSG_TYPE_INIT: u16 = 16;
/// Message type for error.
pub const MSG_TYPE_ERROR: u16 = 17;
/// Message type for ping.
pub const MSG_TYPE_PING: u16 = 18;
/// Message type for pong.
pub const MSG_TYPE_PONG: u16 = 19;

/// A decoded BOLT 1 base message: 2-byte big-endian type, then the
/// type-specific payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Init(Init),
    Error(Error),
    Warning(Warning),
    Ping(Ping),
    Pong(Pong),
    /// A message type this crate does not decode. Per BOLT 1 "it's OK to
    /// be odd", unknown odd types round-trip here; unknown even types are
    /// a decode error.
    Unknown { msg_type: u16, payload: Vec<u8> },
}

impl Message {
    /// The wire type of this message.
    #[must_use]
    pub fn msg_type(&self) -> u16 {
        match self {
            Self::Init(_) => MSG_TYPE_INIT,
            Self::Error(_) => MSG_TYPE_ERROR,
            Self::Warning(_) => MSG_TYPE_WARNING,
            Self::Ping(_) => MSG_TYPE_PING,
            Self::Pong(_) => MSG_TYPE_PONG,
            Self::Unknown { msg_type, .. } => *msg_type,
        }
    }

    /// Encodes the message with its type prefix.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let payload = match self {
            Self::Init(m) => m.encode(),
            Self::Error(m) => m.encode(),
            Self::Warning(m) => m.encode(),
            Self::Ping(m) => m.encode(),
            Self::Pong(m) => m.encode(),
            Self::Unknown { payload, .. } => payload.clone(),
        };

        let mut out = Vec::with_capacity(2 + payload.len());
        write_u16_be(self.msg_type(), &mut out);
        out.extend_from_slice(&payload);
        out
    }

    /// Decodes a type-prefixed message.
    ///
    /// # Errors
    ///
    /// Returns `Truncated` on a short payload and `UnknownEvenType` for an
    /// unrecognized even type, which BOLT 1 requires treating as fatal.
    pub fn decode(data: &[u8]) -> Result<Self, BoltError> {
        let mut cursor = data;
        let msg_type = read_u16_be(&mut cursor)?;

        match msg_type {
            MSG_TYPE_INIT => Ok(Self::Init(Init::decode(cursor)?)),
            MSG_TYPE_ERROR => Ok(Self::Error(Error::decode(cursor)?)),
            MSG_TYPE_WARNING => Ok(Self::Warning(Warning::decode(cursor)?)),
            MSG_TYPE_PING => Ok(Self::Ping(Ping::decode(cursor)?)),
            MSG_TYPE_PONG => Ok(Self::Pong(Pong::decode(cursor)?)),
            t if t % 2 == 0 => Err(BoltError::UnknownEvenType(t)),
            t => Ok(Self::Unknown {
                msg_type: t,
                payload: cursor.to_vec(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_wire_bytes() {
        let msg = Message::Ping(Ping::new(4));
        // type 18, num_pong_bytes=4, byteslen=0
        assert_eq!(msg.encode(), [0x00, 0x12, 0x00, 0x04, 0x00, 0x00]);
    }

    #[test]
    fn known_messages_roundtrip() {
        let messages = [
            Message::Init(Init::with_features(vec![0x08, 0x20])),
            Message::Error(Error::all_channels("boom")),
            Message::Warning(Warning::general("careful")),
            Message::Ping(Ping::with_padding(16, 2)),
            Message::Pong(Pong::new(16)),
        ];
        for msg in messages {
            assert_eq!(Message::decode(&msg.encode()).unwrap(), msg);
        }
    }

    #[test]
    fn unknown_odd_type_roundtrips() {
        let msg = Message::Unknown {
            msg_type: 32769,
            payload: vec![0xde, 0xad],
        };
        assert_eq!(Message::decode(&msg.encode()).unwrap(), msg);
    }

    #[test]
    fn unknown_even_type_is_fatal() {
        // Type 20 is even and unassigned here.
        assert_eq!(
            Message::decode(&[0x00, 0x14, 0x00]),
            Err(BoltError::UnknownEvenType(20))
        );
    }

    #[test]
    fn truncated_type_prefix() {
        assert_eq!(
            Message::decode(&[0x00]),
            Err(BoltError::Truncated {
                expected: 2,
                actual: 1
            })
        );
    }
}
