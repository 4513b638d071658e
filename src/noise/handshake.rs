//! `Noise_XK` handshake state machine over secp256k1.
//!
//! Pattern pre-condition: the initiator already knows the responder's
//! static public key (the node ID it is dialing). The initiator's static
//! key travels encrypted inside the third message.

use secp256k1::ecdh::SharedSecret;
use secp256k1::{All, PublicKey, Secp256k1, SecretKey};

use super::cipher::MAC_SIZE;
use super::error::NoiseError;
use super::symmetric::SymmetricState;
use super::transport::{Transport, MAX_MESSAGE_SIZE};

/// Noise protocol identifier for BOLT 8.
const PROTOCOL_NAME: &[u8] = b"Noise_XK_secp256k1_ChaChaPoly_SHA256";

/// Prologue both parties mix into the transcript before any message.
const PROLOGUE: &[u8] = b"lightning";

/// Fixed handshake version byte; any other value is a protocol violation.
const HANDSHAKE_VERSION: u8 = 0x00;

/// Serialized compressed public key size.
const PUBKEY_SIZE: usize = 33;

/// Which side of the handshake this state drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Role {
    Initiator,
    Responder,
}

/// One token of a Noise message pattern.
#[derive(Debug, Clone, Copy)]
enum Token {
    /// Transmit an ephemeral public key in the clear.
    E,
    /// Transmit the static public key, encrypted under the transcript.
    S,
    /// DH(ephemeral, static) — initiator ephemeral, responder static.
    Es,
    /// DH(ephemeral, ephemeral).
    Ee,
    /// DH(static, ephemeral) — initiator static, responder ephemeral.
    Se,
}

/// The three XK message patterns: `-> e, es` / `<- e, ee` / `-> s, se`.
///
/// The table is immutable; a cursor tracks progress through it.
const XK_PATTERN: [&[Token]; 3] = [
    &[Token::E, Token::Es],
    &[Token::E, Token::Ee],
    &[Token::S, Token::Se],
];

/// Noise handshake state for one connection attempt.
///
/// Created per connection, destroyed (secrets wiped by the symmetric
/// state's drop) the moment [`Self::into_transport`] produces the secure
/// channel.
pub(crate) struct HandshakeState {
    role: Role,
    symmetric: SymmetricState,
    secp: Secp256k1<All>,
    local_static: SecretKey,
    local_static_pub: PublicKey,
    /// Materialized on the first local write.
    local_ephemeral: Option<(SecretKey, PublicKey)>,
    remote_static: Option<PublicKey>,
    remote_ephemeral: Option<PublicKey>,
    /// Index of the next message pattern to run; 3 means complete.
    cursor: usize,
}

impl HandshakeState {
    /// Creates the initiator side. `remote_static` is the node ID being
    /// dialed; it is mixed into the transcript, never transmitted.
    pub(crate) fn new_initiator(local_static: SecretKey, remote_static: PublicKey) -> Self {
        let secp = Secp256k1::new();
        let local_static_pub = PublicKey::from_secret_key(&secp, &local_static);

        let mut symmetric = SymmetricState::initialize(PROTOCOL_NAME);
        symmetric.mix_hash(PROLOGUE);
        symmetric.mix_hash(&remote_static.serialize());

        Self {
            role: Role::Initiator,
            symmetric,
            secp,
            local_static,
            local_static_pub,
            local_ephemeral: None,
            remote_static: Some(remote_static),
            remote_ephemeral: None,
            cursor: 0,
        }
    }

    /// Creates the responder side. The responder mixes its own static key
    /// as the pre-message; it learns the initiator's identity from the
    /// third message.
    pub(crate) fn new_responder(local_static: SecretKey) -> Self {
        let secp = Secp256k1::new();
        let local_static_pub = PublicKey::from_secret_key(&secp, &local_static);

        let mut symmetric = SymmetricState::initialize(PROTOCOL_NAME);
        symmetric.mix_hash(PROLOGUE);
        symmetric.mix_hash(&local_static_pub.serialize());

        Self {
            role: Role::Responder,
            symmetric,
            secp,
            local_static,
            local_static_pub,
            local_ephemeral: None,
            remote_static: None,
            remote_ephemeral: None,
            cursor: 0,
        }
    }

    /// Whether all three messages have been processed.
    pub(crate) fn is_complete(&self) -> bool {
        self.cursor >= XK_PATTERN.len()
    }

    /// The initiator's static public key, once known.
    pub(crate) fn remote_static(&self) -> Option<PublicKey> {
        self.remote_static
    }

    /// Whether this side writes the next message.
    fn writes_next(&self) -> bool {
        match self.cursor {
            0 | 2 => self.role == Role::Initiator,
            1 => self.role == Role::Responder,
            _ => false,
        }
    }

    /// Act number of the message at the cursor, for error reporting.
    #[allow(clippy::cast_possible_truncation)] // Cursor is at most 3
    fn act(&self) -> u8 {
        self.cursor as u8 + 1
    }

    /// Size of the next message: version byte, each key field, and the
    /// payload with its tag once the cipher is keyed.
    fn next_message_len(&self, payload_len: usize) -> usize {
        let mut keyed = self.symmetric.cipher_has_keys();
        let mut len = 1;
        for token in XK_PATTERN[self.cursor] {
            match token {
                Token::E => len += PUBKEY_SIZE,
                Token::S => len += PUBKEY_SIZE + if keyed { MAC_SIZE } else { 0 },
                Token::Es | Token::Ee | Token::Se => keyed = true,
            }
        }
        len + payload_len + if keyed { MAC_SIZE } else { 0 }
    }

    /// Returns the local ephemeral key pair, generating it on first use.
    fn ephemeral(&mut self) -> (SecretKey, PublicKey) {
        if let Some(pair) = self.local_ephemeral {
            return pair;
        }
        let pair = self.secp.generate_keypair(&mut rand::rng());
        self.local_ephemeral = Some(pair);
        pair
    }

    /// DH for one pattern token. The pattern places `e` before any token
    /// that needs it, so the required keys are always present.
    fn dh(&self, token: Token) -> [u8; 32] {
        let ephemeral = self.local_ephemeral.map(|(secret, _)| secret);
        let (secret, point) = match (token, self.role) {
            (Token::Es, Role::Initiator) => (ephemeral, self.remote_static),
            (Token::Es, Role::Responder) => (Some(self.local_static), self.remote_ephemeral),
            (Token::Ee, _) => (ephemeral, self.remote_ephemeral),
            (Token::Se, Role::Initiator) => (Some(self.local_static), self.remote_ephemeral),
            (Token::Se, Role::Responder) => (ephemeral, self.remote_static),
            (Token::E | Token::S, _) => unreachable!("not a DH token"),
        };
        let secret = secret.expect("pattern order provides the local key");
        let point = point.expect("pattern order provides the remote key");
        // SharedSecret is SHA-256 of the compressed shared point, which is
        // exactly the DH output BOLT 8 specifies.
        SharedSecret::new(&point, &secret).secret_bytes()
    }

    /// Produces the next handshake message into `out`, returning the
    /// number of bytes written.
    ///
    /// # Errors
    ///
    /// `OUT_OF_TURN` when it is the peer's turn, `NO_MORE_STEPS` after
    /// completion, `BUFFER_TOO_SMALL`/`MSG_TOO_LARGE` on size violations,
    /// `NONCE_OVERFLOW` if the handshake cipher is exhausted.
    pub(crate) fn write_message(
        &mut self,
        payload: &[u8],
        out: &mut [u8],
    ) -> Result<usize, NoiseError> {
        if self.is_complete() {
            return Err(NoiseError::NoMoreSteps);
        }
        if !self.writes_next() {
            return Err(NoiseError::OutOfTurn);
        }

        let needed = self.next_message_len(payload.len());
        if needed > MAX_MESSAGE_SIZE {
            return Err(NoiseError::MessageTooLarge { size: needed });
        }
        if out.len() < needed {
            return Err(NoiseError::BufferTooSmall {
                needed,
                available: out.len(),
            });
        }

        let mut pos = 0;
        out[pos] = HANDSHAKE_VERSION;
        pos += 1;

        for token in XK_PATTERN[self.cursor] {
            match token {
                Token::E => {
                    let (_, ephemeral_pub) = self.ephemeral();
                    let serialized = ephemeral_pub.serialize();
                    out[pos..pos + PUBKEY_SIZE].copy_from_slice(&serialized);
                    self.symmetric.mix_hash(&serialized);
                    pos += PUBKEY_SIZE;
                }
                Token::S => {
                    let serialized = self.local_static_pub.serialize();
                    let ciphertext = self.symmetric.encrypt_and_hash(&serialized)?;
                    out[pos..pos + ciphertext.len()].copy_from_slice(&ciphertext);
                    pos += ciphertext.len();
                }
                Token::Es | Token::Ee | Token::Se => {
                    let secret = self.dh(*token);
                    self.symmetric.mix_key(&secret)?;
                }
            }
        }

        let ciphertext = self.symmetric.encrypt_and_hash(payload)?;
        out[pos..pos + ciphertext.len()].copy_from_slice(&ciphertext);
        pos += ciphertext.len();

        self.cursor += 1;
        Ok(pos)
    }

    /// Consumes the next handshake message, writing any payload into
    /// `payload_out` and returning its length.
    ///
    /// Every validation failure is fatal for the connection: wrong version
    /// byte, undecodable public key, failed authentication, short message.
    ///
    /// # Errors
    ///
    /// `ACTn_BAD_VERSION`, `ACTn_BAD_PUBKEY`, `ACTn_BAD_CIPHERTEXT`,
    /// `ACTn_BAD_TAG`, `ACTn_BAD_LENGTH`, plus the turn-discipline errors
    /// of [`Self::write_message`].
    pub(crate) fn read_message(
        &mut self,
        message: &[u8],
        payload_out: &mut [u8],
    ) -> Result<usize, NoiseError> {
        if self.is_complete() {
            return Err(NoiseError::NoMoreSteps);
        }
        if self.writes_next() {
            return Err(NoiseError::OutOfTurn);
        }

        let act = self.act();
        let base_len = self.next_message_len(0);
        if message.len() < base_len {
            return Err(NoiseError::BadActLength {
                act,
                expected: base_len,
                actual: message.len(),
            });
        }

        let mut pos = 0;
        let version = message[pos];
        pos += 1;
        if version != HANDSHAKE_VERSION {
            return Err(NoiseError::BadVersion { act, version });
        }

        for token in XK_PATTERN[self.cursor] {
            match token {
                Token::E => {
                    let field = &message[pos..pos + PUBKEY_SIZE];
                    let remote_ephemeral = PublicKey::from_slice(field)
                        .map_err(|_| NoiseError::BadPubkey { act })?;
                    self.symmetric.mix_hash(field);
                    self.remote_ephemeral = Some(remote_ephemeral);
                    pos += PUBKEY_SIZE;
                }
                Token::S => {
                    let field_len = PUBKEY_SIZE
                        + if self.symmetric.cipher_has_keys() {
                            MAC_SIZE
                        } else {
                            0
                        };
                    let field = &message[pos..pos + field_len];
                    let serialized = self.symmetric.decrypt_and_hash(field).map_err(|e| {
                        match e {
                            NoiseError::DecryptionFailed => NoiseError::BadCiphertext { act },
                            other => other,
                        }
                    })?;
                    let remote_static = PublicKey::from_slice(&serialized)
                        .map_err(|_| NoiseError::BadPubkey { act })?;
                    self.remote_static = Some(remote_static);
                    pos += field_len;
                }
                Token::Es | Token::Ee | Token::Se => {
                    let secret = self.dh(*token);
                    self.symmetric.mix_key(&secret)?;
                }
            }
        }

        let payload = self
            .symmetric
            .decrypt_and_hash(&message[pos..])
            .map_err(|e| match e {
                NoiseError::DecryptionFailed => NoiseError::BadTag { act },
                other => other,
            })?;
        if payload.len() > payload_out.len() {
            return Err(NoiseError::BufferTooSmall {
                needed: payload.len(),
                available: payload_out.len(),
            });
        }
        payload_out[..payload.len()].copy_from_slice(&payload);

        self.cursor += 1;
        Ok(payload.len())
    }

    /// Splits the finished handshake into the secure channel and the final
    /// transcript hash, destroying the handshake state.
    ///
    /// # Errors
    ///
    /// Returns `HANDSHAKE_INCOMPLETE` if any message is still outstanding.
    pub(crate) fn into_transport(mut self) -> Result<(Transport, [u8; 32]), NoiseError> {
        if !self.is_complete() {
            return Err(NoiseError::Incomplete);
        }

        let hash = self.symmetric.handshake_hash();
        let (initiator_cipher, responder_cipher) = self.symmetric.split();
        let transport = match self.role {
            Role::Initiator => Transport::new(initiator_cipher, responder_cipher),
            Role::Responder => Transport::new(responder_cipher, initiator_cipher),
        };
        Ok((transport, hash))
    }

    #[cfg(test)]
    pub(crate) fn set_ephemeral(&mut self, secret: SecretKey) {
        let public = PublicKey::from_secret_key(&self.secp, &secret);
        self.local_ephemeral = Some((secret, public));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keypair() -> (SecretKey, PublicKey) {
        Secp256k1::new().generate_keypair(&mut rand::rng())
    }

    fn run_handshake() -> (HandshakeState, HandshakeState) {
        let (initiator_static, _) = keypair();
        let (responder_static, responder_pub) = keypair();

        let mut initiator = HandshakeState::new_initiator(initiator_static, responder_pub);
        let mut responder = HandshakeState::new_responder(responder_static);

        let mut buf = [0u8; 66];
        let mut payload = [0u8; 0];

        let n = initiator.write_message(&[], &mut buf).unwrap();
        assert_eq!(n, 50);
        responder.read_message(&buf[..n], &mut payload).unwrap();

        let n = responder.write_message(&[], &mut buf).unwrap();
        assert_eq!(n, 50);
        initiator.read_message(&buf[..n], &mut payload).unwrap();

        let n = initiator.write_message(&[], &mut buf).unwrap();
        assert_eq!(n, 66);
        responder.read_message(&buf[..n], &mut payload).unwrap();

        (initiator, responder)
    }

    #[test]
    fn both_sides_complete_with_matching_transcripts() {
        let (initiator, responder) = run_handshake();
        assert!(initiator.is_complete());
        assert!(responder.is_complete());

        let (_, initiator_hash) = initiator.into_transport().unwrap();
        let (_, responder_hash) = responder.into_transport().unwrap();
        assert_eq!(initiator_hash, responder_hash);
    }

    #[test]
    fn responder_learns_initiator_static() {
        let (initiator_static, initiator_pub) = keypair();
        let (responder_static, responder_pub) = keypair();

        let mut initiator = HandshakeState::new_initiator(initiator_static, responder_pub);
        let mut responder = HandshakeState::new_responder(responder_static);

        let mut buf = [0u8; 66];
        let mut payload = [0u8; 0];
        let n = initiator.write_message(&[], &mut buf).unwrap();
        responder.read_message(&buf[..n], &mut payload).unwrap();
        let n = responder.write_message(&[], &mut buf).unwrap();
        initiator.read_message(&buf[..n], &mut payload).unwrap();
        let n = initiator.write_message(&[], &mut buf).unwrap();

        assert_eq!(responder.remote_static(), None);
        responder.read_message(&buf[..n], &mut payload).unwrap();
        assert_eq!(responder.remote_static(), Some(initiator_pub));
    }

    #[test]
    fn writing_out_of_turn_fails() {
        let (initiator_static, _) = keypair();
        let (responder_static, responder_pub) = keypair();

        let mut initiator = HandshakeState::new_initiator(initiator_static, responder_pub);
        let mut responder = HandshakeState::new_responder(responder_static);

        let mut buf = [0u8; 66];
        assert_eq!(
            responder.write_message(&[], &mut buf),
            Err(NoiseError::OutOfTurn)
        );

        let mut payload = [0u8; 0];
        assert_eq!(
            initiator.read_message(&buf[..50], &mut payload),
            Err(NoiseError::OutOfTurn)
        );
    }

    #[test]
    fn operations_after_completion_fail() {
        let (mut initiator, _responder) = run_handshake();
        let mut buf = [0u8; 66];
        let mut payload = [0u8; 0];
        assert_eq!(
            initiator.write_message(&[], &mut buf),
            Err(NoiseError::NoMoreSteps)
        );
        assert_eq!(
            initiator.read_message(&buf[..50], &mut payload),
            Err(NoiseError::NoMoreSteps)
        );
    }

    #[test]
    fn into_transport_before_completion_fails() {
        let (initiator_static, _) = keypair();
        let (_, responder_pub) = keypair();
        let initiator = HandshakeState::new_initiator(initiator_static, responder_pub);
        assert_eq!(
            initiator.into_transport().map(|_| ()),
            Err(NoiseError::Incomplete)
        );
    }

    #[test]
    fn short_buffer_is_rejected_before_any_state_change() {
        let (initiator_static, _) = keypair();
        let (_, responder_pub) = keypair();
        let mut initiator = HandshakeState::new_initiator(initiator_static, responder_pub);

        let mut short = [0u8; 10];
        assert_eq!(
            initiator.write_message(&[], &mut short),
            Err(NoiseError::BufferTooSmall {
                needed: 50,
                available: 10
            })
        );

        // The rejected call must not have consumed the turn.
        let mut buf = [0u8; 66];
        assert_eq!(initiator.write_message(&[], &mut buf).unwrap(), 50);
    }

    #[test]
    fn truncated_message_is_a_length_violation() {
        let (initiator_static, _) = keypair();
        let (responder_static, responder_pub) = keypair();
        let mut initiator = HandshakeState::new_initiator(initiator_static, responder_pub);
        let mut responder = HandshakeState::new_responder(responder_static);

        let mut buf = [0u8; 66];
        let n = initiator.write_message(&[], &mut buf).unwrap();
        let mut payload = [0u8; 0];
        assert_eq!(
            responder.read_message(&buf[..n - 1], &mut payload),
            Err(NoiseError::BadActLength {
                act: 1,
                expected: 50,
                actual: 49
            })
        );
    }
}
