//! BOLT message encoding and decoding.
//!
//! Wire codecs for the BOLT 1 base messages every node exchanges over the
//! Noise transport. Dispatch and keepalive scheduling are the caller's
//! concern; TLV extension bytes after the known fields are carried
//! opaquely and round-trip unchanged.

mod error;
mod error_msg;
mod init;
mod msg;
mod ping;
mod pong;
mod types;
mod warning;

pub use error::BoltError;
pub use error_msg::Error;
pub use init::Init;
pub use msg::{
    Message, MSG_TYPE_ERROR, MSG_TYPE_INIT, MSG_TYPE_PING, MSG_TYPE_PONG, MSG_TYPE_WARNING,
};
pub use ping::Ping;
pub use pong::Pong;
pub use types::{
    bigsize_len, decode_bigsize, encode_bigsize, read_u16_be, write_u16_be, ChannelId,
    CHANNEL_ID_SIZE, MAX_MESSAGE_SIZE,
};
pub use warning::Warning;
