//! Error types for the Noise protocol implementation.

/// Errors produced by the BOLT 8 handshake and the Noise ciphers.
///
/// Display strings are terse diagnostic codes; the act-level codes match
/// the strings lnd emits for the same failures, which makes cross-impl
/// debugging of interop problems a string comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoiseError {
    /// Handshake message carried an unexpected version byte.
    BadVersion { act: u8, version: u8 },
    /// A key field did not decode as a compressed secp256k1 point.
    BadPubkey { act: u8 },
    /// AEAD authentication of the encrypted static key failed.
    BadCiphertext { act: u8 },
    /// AEAD authentication of a handshake payload failed.
    BadTag { act: u8 },
    /// Handshake message length does not match the act's fixed size.
    BadActLength {
        act: u8,
        expected: usize,
        actual: usize,
    },
    /// `mix_key` input was neither empty nor a 32-byte DH output.
    BadKeyMaterial { len: usize },
    /// A handshake operation ran when it was the peer's turn.
    OutOfTurn,
    /// Both handshake steps already ran; no further acts exist.
    NoMoreSteps,
    /// Secure channel requested before the handshake finished.
    Incomplete,
    /// Handshake-phase cipher reached the nonce ceiling.
    NonceOverflow,
    /// Caller's buffer cannot hold the next handshake message.
    BufferTooSmall { needed: usize, available: usize },
    /// Message exceeds the 65535-byte protocol limit.
    MessageTooLarge { size: usize },
    /// Transport-phase AEAD authentication failed.
    DecryptionFailed,
}

impl std::fmt::Display for NoiseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadVersion { act, version } => {
                write!(f, "ACT{act}_BAD_VERSION {version}")
            }
            Self::BadPubkey { act } => write!(f, "ACT{act}_BAD_PUBKEY"),
            Self::BadCiphertext { act } => write!(f, "ACT{act}_BAD_CIPHERTEXT"),
            Self::BadTag { act } => write!(f, "ACT{act}_BAD_TAG"),
            Self::BadActLength {
                act,
                expected,
                actual,
            } => {
                write!(f, "ACT{act}_BAD_LENGTH expected {expected} got {actual}")
            }
            Self::BadKeyMaterial { len } => write!(f, "BAD_KEY_MATERIAL {len}"),
            Self::OutOfTurn => write!(f, "OUT_OF_TURN"),
            Self::NoMoreSteps => write!(f, "NO_MORE_STEPS"),
            Self::Incomplete => write!(f, "HANDSHAKE_INCOMPLETE"),
            Self::NonceOverflow => write!(f, "NONCE_OVERFLOW"),
            Self::BufferTooSmall { needed, available } => {
                write!(f, "BUFFER_TOO_SMALL need {needed} have {available}")
            }
            Self::MessageTooLarge { size } => write!(f, "MSG_TOO_LARGE {size}"),
            Self::DecryptionFailed => write!(f, "DECRYPTION_FAILED"),
        }
    }
}

impl std::error::Error for NoiseError {}
