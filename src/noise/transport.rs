//! Post-handshake message framing over the split cipher pair.

use super::cipher::{CipherState, MAC_SIZE};
use super::error::NoiseError;

/// Maximum plaintext size of a single Lightning message.
pub const MAX_MESSAGE_SIZE: usize = 65535;

/// Size of the encrypted length prefix: 2-byte length plus its tag.
pub const ENCRYPTED_LENGTH_SIZE: usize = 2 + MAC_SIZE;

/// The secure channel produced by a completed handshake.
///
/// One cipher per direction, assigned by role so each side's send key is
/// the peer's receive key. The send cipher only ever advances on the write
/// path and the receive cipher on the read path; the two never share
/// state.
pub struct Transport {
    send: CipherState,
    recv: CipherState,
}

impl Transport {
    pub(crate) fn new(send: CipherState, recv: CipherState) -> Self {
        Self { send, recv }
    }

    /// Encrypts `msg` into a complete wire frame: an 18-byte header (the
    /// big-endian plaintext length, AEAD-protected) followed by the body
    /// ciphertext and its tag.
    ///
    /// # Errors
    ///
    /// Returns `MSG_TOO_LARGE` if `msg` exceeds [`MAX_MESSAGE_SIZE`].
    pub fn encrypt(&mut self, msg: &[u8]) -> Result<Vec<u8>, NoiseError> {
        if msg.len() > MAX_MESSAGE_SIZE {
            return Err(NoiseError::MessageTooLarge { size: msg.len() });
        }
        Ok(encrypt_frame(&mut self.send, msg))
    }

    /// Decrypts an 18-byte frame header into the body's plaintext length.
    ///
    /// # Errors
    ///
    /// Returns `DECRYPTION_FAILED` if the header does not authenticate.
    pub fn decrypt_length(
        &mut self,
        header: &[u8; ENCRYPTED_LENGTH_SIZE],
    ) -> Result<u16, NoiseError> {
        decrypt_frame_length(&mut self.recv, header)
    }

    /// Decrypts a frame body (`length + 16` bytes of ciphertext).
    ///
    /// # Errors
    ///
    /// Returns `DECRYPTION_FAILED` if the body does not authenticate.
    pub fn decrypt_message(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>, NoiseError> {
        decrypt_frame_body(&mut self.recv, ciphertext)
    }

    /// Splits the channel into its directional halves so the write path
    /// and the read loop can own their ciphers independently.
    pub(crate) fn into_directions(self) -> (CipherState, CipherState) {
        (self.send, self.recv)
    }

    #[cfg(test)]
    pub(crate) fn keys(&self) -> (Option<[u8; 32]>, Option<[u8; 32]>) {
        (self.send.key_bytes(), self.recv.key_bytes())
    }
}

/// Frames `msg` under `cipher`. The caller enforces [`MAX_MESSAGE_SIZE`],
/// which makes the length cast exact.
pub(crate) fn encrypt_frame(cipher: &mut CipherState, msg: &[u8]) -> Vec<u8> {
    #[allow(clippy::cast_possible_truncation)] // Caller enforces the message limit
    let len = (msg.len() as u16).to_be_bytes();

    let mut frame = Vec::with_capacity(ENCRYPTED_LENGTH_SIZE + msg.len() + MAC_SIZE);
    frame.extend_from_slice(&cipher.encrypt(&len));
    frame.extend_from_slice(&cipher.encrypt(msg));
    frame
}

/// Decrypts a frame header under `cipher`.
pub(crate) fn decrypt_frame_length(
    cipher: &mut CipherState,
    header: &[u8; ENCRYPTED_LENGTH_SIZE],
) -> Result<u16, NoiseError> {
    let plain = cipher.decrypt(header)?;
    // 18 bytes of input minus the tag leaves exactly the two length bytes.
    Ok(u16::from_be_bytes([plain[0], plain[1]]))
}

/// Decrypts a frame body under `cipher`.
pub(crate) fn decrypt_frame_body(
    cipher: &mut CipherState,
    ciphertext: &[u8],
) -> Result<Vec<u8>, NoiseError> {
    cipher.decrypt(ciphertext)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A matched pair of channels, as `split` would hand to two peers.
    fn channel_pair() -> (Transport, Transport) {
        let chaining_key = [0x11u8; 32];
        let key_a = [0x22u8; 32];
        let key_b = [0x33u8; 32];

        let cipher = |key: [u8; 32]| {
            let mut c = CipherState::new();
            c.initialize(key, chaining_key);
            c
        };
        (
            Transport::new(cipher(key_a), cipher(key_b)),
            Transport::new(cipher(key_b), cipher(key_a)),
        )
    }

    fn roundtrip(sender: &mut Transport, receiver: &mut Transport, msg: &[u8]) -> Vec<u8> {
        let frame = sender.encrypt(msg).unwrap();
        let header: [u8; ENCRYPTED_LENGTH_SIZE] =
            frame[..ENCRYPTED_LENGTH_SIZE].try_into().unwrap();
        let len = receiver.decrypt_length(&header).unwrap();
        assert_eq!(usize::from(len), msg.len());
        receiver
            .decrypt_message(&frame[ENCRYPTED_LENGTH_SIZE..])
            .unwrap()
    }

    #[test]
    fn frame_roundtrip() {
        let (mut a, mut b) = channel_pair();
        let msg = b"init message bytes";
        assert_eq!(roundtrip(&mut a, &mut b, msg), msg);

        // And the other direction, on independent cipher state.
        assert_eq!(roundtrip(&mut b, &mut a, b"reply"), b"reply");
    }

    #[test]
    fn frame_overhead_is_header_plus_tag() {
        let (mut a, _) = channel_pair();
        let frame = a.encrypt(b"hello").unwrap();
        assert_eq!(frame.len(), ENCRYPTED_LENGTH_SIZE + 5 + MAC_SIZE);
    }

    #[test]
    fn empty_message_frames_and_returns_empty() {
        let (mut a, mut b) = channel_pair();
        assert_eq!(roundtrip(&mut a, &mut b, b""), b"");
    }

    #[test]
    fn maximum_size_message_roundtrips() {
        let (mut a, mut b) = channel_pair();
        let msg = vec![0xa5u8; MAX_MESSAGE_SIZE];
        assert_eq!(roundtrip(&mut a, &mut b, &msg), msg);
    }

    #[test]
    fn oversized_message_is_rejected_without_touching_the_cipher() {
        let (mut a, mut b) = channel_pair();
        let msg = vec![0u8; MAX_MESSAGE_SIZE + 1];
        assert_eq!(
            a.encrypt(&msg).map(|_| ()),
            Err(NoiseError::MessageTooLarge {
                size: MAX_MESSAGE_SIZE + 1
            })
        );

        // Nonces stayed aligned: a normal message still roundtrips.
        assert_eq!(roundtrip(&mut a, &mut b, b"still fine"), b"still fine");
    }

    #[test]
    fn corrupted_header_fails_length_decryption() {
        let (mut a, mut b) = channel_pair();
        let frame = a.encrypt(b"hello").unwrap();
        let mut header: [u8; ENCRYPTED_LENGTH_SIZE] =
            frame[..ENCRYPTED_LENGTH_SIZE].try_into().unwrap();
        header[0] ^= 0xff;
        assert_eq!(
            b.decrypt_length(&header),
            Err(NoiseError::DecryptionFailed)
        );
    }

    #[test]
    fn corrupted_body_fails_message_decryption() {
        let (mut a, mut b) = channel_pair();
        let frame = a.encrypt(b"hello").unwrap();
        let header: [u8; ENCRYPTED_LENGTH_SIZE] =
            frame[..ENCRYPTED_LENGTH_SIZE].try_into().unwrap();
        b.decrypt_length(&header).unwrap();

        let mut body = frame[ENCRYPTED_LENGTH_SIZE..].to_vec();
        body[0] ^= 0xff;
        assert_eq!(
            b.decrypt_message(&body),
            Err(NoiseError::DecryptionFailed)
        );
    }
}
