//! BOLT 8 Noise protocol implementation for Lightning Network transport.
//!
//! This module implements the `Noise_XK` handshake pattern used by
//! Lightning nodes to establish encrypted, authenticated connections, and
//! the length-framed AEAD transport that carries all wire messages
//! afterwards.
//!
//! Layering, leaf to root: an AEAD cipher state with an implicit nonce, a
//! symmetric state owning the chaining key and transcript hash, the XK
//! handshake state machine, the BOLT 8 act sequencing on top of it, and a
//! TCP connection driving the acts and running the read loop.

mod act;
mod cipher;
mod connection;
mod error;
mod handshake;
mod kdf;
mod symmetric;
mod transport;

pub use act::{NoiseHandshake, ACT_ONE_SIZE, ACT_THREE_SIZE, ACT_TWO_SIZE};
pub use cipher::MAC_SIZE;
pub use connection::{ConnectionConfig, ConnectionError, NoiseConnection, PeerEvent};
pub use error::NoiseError;
pub use transport::{Transport, ENCRYPTED_LENGTH_SIZE, MAX_MESSAGE_SIZE};
