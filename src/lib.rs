//! Encrypted transport for Lightning Network peer connections.
//!
//! This crate implements the two layers every Lightning node needs before it
//! can speak to a peer:
//!
//! - [`noise`]: the BOLT 8 `Noise_XK` handshake and the authenticated
//!   message framing that follows it.
//! - [`bolt`]: encoding and decoding of the BOLT 1 base messages (init,
//!   error, warning, ping, pong) carried over that transport.
//!
//! Channel logic, gossip, invoices, and message dispatch are the caller's
//! concern; this crate hands over a [`noise::NoiseConnection`] delivering
//! plaintext wire messages in arrival order.

pub mod bolt;
pub mod noise;
