//! Authenticated encryption with an implicit monotonic nonce.

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::error::NoiseError;
use super::kdf::hkdf_two;

/// Size of a Poly1305 authentication tag in bytes.
pub const MAC_SIZE: usize = 16;

/// AEAD operations performed under one key before it must be replaced.
///
/// Each framed transport message costs two operations (length, then body),
/// so transport keys rotate every 500 messages. Handshake messages are few
/// and fixed, so the handshake phase treats reaching this ceiling as fatal
/// instead of rotating.
pub(crate) const KEY_ROTATION_INTERVAL: u64 = 1000;

/// ChaCha20-Poly1305 state with an implicit nonce counter.
///
/// Starts unkeyed. `initialize` installs a key and chaining key together
/// and resets the nonce; the two are never set independently. The chaining
/// key is kept so the transport phase can rotate keys without a handshake.
#[derive(Zeroize, ZeroizeOnDrop)]
pub(crate) struct CipherState {
    key: Option<[u8; 32]>,
    chaining_key: Option<[u8; 32]>,
    nonce: u64,
}

impl CipherState {
    /// Creates an unkeyed cipher state.
    pub(crate) fn new() -> Self {
        Self {
            key: None,
            chaining_key: None,
            nonce: 0,
        }
    }

    /// Installs a key and chaining key atomically, resetting the nonce.
    pub(crate) fn initialize(&mut self, key: [u8; 32], chaining_key: [u8; 32]) {
        self.key.zeroize();
        self.chaining_key.zeroize();
        self.key = Some(key);
        self.chaining_key = Some(chaining_key);
        self.nonce = 0;
    }

    /// Returns whether a key has been installed.
    pub(crate) fn has_keys(&self) -> bool {
        self.key.is_some()
    }

    /// BOLT 8 nonce: 32 zero bits followed by the counter, little-endian.
    fn nonce_bytes(nonce: u64) -> Nonce {
        let mut bytes = [0u8; 12];
        bytes[4..].copy_from_slice(&nonce.to_le_bytes());
        Nonce::from(bytes)
    }

    /// Handshake-phase encryption under the current nonce and associated
    /// data.
    ///
    /// Unkeyed state passes the plaintext through unchanged without
    /// advancing the nonce (the unkeyed first step of a handshake).
    ///
    /// # Errors
    ///
    /// Returns `NonceOverflow` if the nonce reached the rotation ceiling;
    /// no legitimate handshake sends that many messages.
    pub(crate) fn encrypt_with_ad(
        &mut self,
        ad: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, NoiseError> {
        let Some(key) = &self.key else {
            return Ok(plaintext.to_vec());
        };
        if self.nonce >= KEY_ROTATION_INTERVAL {
            return Err(NoiseError::NonceOverflow);
        }

        let ciphertext = ChaCha20Poly1305::new(Key::from_slice(key))
            .encrypt(
                &Self::nonce_bytes(self.nonce),
                Payload {
                    msg: plaintext,
                    aad: ad,
                },
            )
            .expect("in-memory AEAD encryption cannot fail");
        self.nonce += 1;
        Ok(ciphertext)
    }

    /// Mirror of [`Self::encrypt_with_ad`].
    ///
    /// # Errors
    ///
    /// Returns `DecryptionFailed` on authentication failure; the nonce is
    /// not advanced in that case. Returns `NonceOverflow` at the ceiling.
    pub(crate) fn decrypt_with_ad(
        &mut self,
        ad: &[u8],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, NoiseError> {
        let Some(key) = &self.key else {
            return Ok(ciphertext.to_vec());
        };
        if self.nonce >= KEY_ROTATION_INTERVAL {
            return Err(NoiseError::NonceOverflow);
        }

        let plaintext = ChaCha20Poly1305::new(Key::from_slice(key))
            .decrypt(
                &Self::nonce_bytes(self.nonce),
                Payload {
                    msg: ciphertext,
                    aad: ad,
                },
            )
            .map_err(|_| NoiseError::DecryptionFailed)?;
        self.nonce += 1;
        Ok(plaintext)
    }

    /// Transport-phase encryption (no associated data).
    ///
    /// Reaching the nonce ceiling rotates the key silently instead of
    /// failing; transport traffic is unbounded and rekeying is the
    /// long-run strategy.
    pub(crate) fn encrypt(&mut self, plaintext: &[u8]) -> Vec<u8> {
        if self.nonce >= KEY_ROTATION_INTERVAL {
            self.rekey();
        }
        let key = self.key.as_ref().expect("transport cipher is always keyed");

        let ciphertext = ChaCha20Poly1305::new(Key::from_slice(key))
            .encrypt(&Self::nonce_bytes(self.nonce), plaintext)
            .expect("in-memory AEAD encryption cannot fail");
        self.nonce += 1;
        ciphertext
    }

    /// Mirror of [`Self::encrypt`].
    ///
    /// # Errors
    ///
    /// Returns `DecryptionFailed` on authentication failure.
    pub(crate) fn decrypt(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>, NoiseError> {
        if self.nonce >= KEY_ROTATION_INTERVAL {
            self.rekey();
        }
        let key = self.key.as_ref().expect("transport cipher is always keyed");

        let plaintext = ChaCha20Poly1305::new(Key::from_slice(key))
            .decrypt(&Self::nonce_bytes(self.nonce), ciphertext)
            .map_err(|_| NoiseError::DecryptionFailed)?;
        self.nonce += 1;
        Ok(plaintext)
    }

    /// Derives a fresh (chaining key, key) pair from the current one and
    /// resets the nonce. No-op on an unkeyed state.
    pub(crate) fn rekey(&mut self) {
        let (Some(chaining_key), Some(key)) = (&self.chaining_key, &self.key) else {
            return;
        };
        let (next_chaining_key, next_key) = hkdf_two(chaining_key, key);
        self.initialize(next_key, next_chaining_key);
    }

    #[cfg(test)]
    pub(crate) fn nonce(&self) -> u64 {
        self.nonce
    }

    #[cfg(test)]
    pub(crate) fn set_nonce(&mut self, nonce: u64) {
        self.nonce = nonce;
    }

    #[cfg(test)]
    pub(crate) fn key_bytes(&self) -> Option<[u8; 32]> {
        self.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyed() -> CipherState {
        let mut cipher = CipherState::new();
        cipher.initialize([0x42u8; 32], [0x24u8; 32]);
        cipher
    }

    #[test]
    fn unkeyed_passthrough_does_not_advance_nonce() {
        let mut cipher = CipherState::new();
        let out = cipher.encrypt_with_ad(b"ad", b"plaintext").unwrap();
        assert_eq!(out, b"plaintext");
        assert_eq!(cipher.nonce(), 0);

        let back = cipher.decrypt_with_ad(b"ad", &out).unwrap();
        assert_eq!(back, b"plaintext");
        assert_eq!(cipher.nonce(), 0);
    }

    #[test]
    fn roundtrip_with_ad() {
        let mut enc = keyed();
        let mut dec = keyed();

        let ciphertext = enc.encrypt_with_ad(b"transcript", b"hello").unwrap();
        assert_eq!(ciphertext.len(), 5 + MAC_SIZE);
        let plaintext = dec.decrypt_with_ad(b"transcript", &ciphertext).unwrap();
        assert_eq!(plaintext, b"hello");
    }

    #[test]
    fn wrong_ad_fails_authentication() {
        let mut enc = keyed();
        let mut dec = keyed();

        let ciphertext = enc.encrypt_with_ad(b"ad one", b"hello").unwrap();
        assert_eq!(
            dec.decrypt_with_ad(b"ad two", &ciphertext),
            Err(NoiseError::DecryptionFailed)
        );
    }

    #[test]
    fn failed_decrypt_does_not_advance_nonce() {
        let mut enc = keyed();
        let mut dec = keyed();

        let mut ciphertext = enc.encrypt_with_ad(b"ad", b"hello").unwrap();
        ciphertext[0] ^= 0x01;
        assert!(dec.decrypt_with_ad(b"ad", &ciphertext).is_err());
        assert_eq!(dec.nonce(), 0);

        // The untampered ciphertext still decrypts under the same nonce.
        ciphertext[0] ^= 0x01;
        assert_eq!(dec.decrypt_with_ad(b"ad", &ciphertext).unwrap(), b"hello");
        assert_eq!(dec.nonce(), 1);
    }

    #[test]
    fn handshake_cipher_aborts_at_rotation_interval() {
        // Paired with `transport_cipher_rekeys_at_rotation_interval`: the
        // two phases intentionally diverge at the same ceiling, and neither
        // side may change without this test noticing.
        let mut cipher = keyed();
        cipher.set_nonce(KEY_ROTATION_INTERVAL);
        assert_eq!(
            cipher.encrypt_with_ad(b"", b"hello"),
            Err(NoiseError::NonceOverflow)
        );
        assert_eq!(
            cipher.decrypt_with_ad(b"", &[0u8; 21]),
            Err(NoiseError::NonceOverflow)
        );
    }

    #[test]
    fn transport_cipher_rekeys_at_rotation_interval() {
        let mut enc = keyed();
        let mut dec = keyed();
        let key_before = enc.key_bytes();

        for _ in 0..KEY_ROTATION_INTERVAL {
            let ciphertext = enc.encrypt(b"hello");
            assert_eq!(dec.decrypt(&ciphertext).unwrap(), b"hello");
        }
        assert_eq!(enc.nonce(), KEY_ROTATION_INTERVAL);

        // The next operation crosses the ceiling: both sides rotate in
        // lockstep and the stream keeps decrypting.
        let ciphertext = enc.encrypt(b"hello");
        assert_eq!(dec.decrypt(&ciphertext).unwrap(), b"hello");
        assert_eq!(enc.nonce(), 1);
        assert_ne!(enc.key_bytes(), key_before);
        assert_eq!(enc.key_bytes(), dec.key_bytes());
    }

    #[test]
    fn rekey_resets_nonce_and_replaces_key() {
        let mut cipher = keyed();
        let _ = cipher.encrypt(b"advance the nonce");
        let key_before = cipher.key_bytes();

        cipher.rekey();
        assert_eq!(cipher.nonce(), 0);
        assert_ne!(cipher.key_bytes(), key_before);
    }

    #[test]
    fn nonce_is_little_endian_past_one_byte() {
        // Nonces 255 and 256 must produce unrelated ciphertexts; a
        // truncated counter would collide them.
        let mut a = keyed();
        let mut b = keyed();
        a.set_nonce(255);
        b.set_nonce(256);
        assert_ne!(a.encrypt(b"hello"), b.encrypt(b"hello"));
    }
}
