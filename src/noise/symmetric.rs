//! Chaining key and transcript hash state for the Noise handshake.

use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::cipher::CipherState;
use super::error::NoiseError;
use super::kdf::{hkdf_three, hkdf_two};

/// Length of a Diffie-Hellman output, the only key material size `mix_key`
/// accepts besides empty.
const DH_OUTPUT_SIZE: usize = 32;

/// The symmetric half of a Noise handshake: a running chaining key, a
/// running transcript hash, and the cipher they feed.
///
/// The transcript hash only ever grows by rehashing `hash ‖ data`; it is
/// never reset mid-handshake.
#[derive(Zeroize, ZeroizeOnDrop)]
pub(crate) struct SymmetricState {
    cipher: CipherState,
    chaining_key: [u8; 32],
    hash: [u8; 32],
}

impl SymmetricState {
    /// Initializes hash and chaining key from the protocol name.
    ///
    /// The BOLT 8 protocol name is longer than 32 bytes, so it is hashed.
    pub(crate) fn initialize(protocol_name: &[u8]) -> Self {
        let digest: [u8; 32] = Sha256::digest(protocol_name).into();
        Self {
            cipher: CipherState::new(),
            chaining_key: digest,
            hash: digest,
        }
    }

    /// Absorbs `data` into the transcript: `hash = SHA-256(hash ‖ data)`.
    pub(crate) fn mix_hash(&mut self, data: &[u8]) {
        let mut hasher = Sha256::new();
        hasher.update(self.hash);
        hasher.update(data);
        self.hash = hasher.finalize().into();
    }

    /// Derives a new chaining key and message key from `input_key_material`
    /// and installs them into the owned cipher.
    ///
    /// # Errors
    ///
    /// Returns `BadKeyMaterial` unless the input is empty or exactly one
    /// DH output (32 bytes).
    pub(crate) fn mix_key(&mut self, input_key_material: &[u8]) -> Result<(), NoiseError> {
        if !input_key_material.is_empty() && input_key_material.len() != DH_OUTPUT_SIZE {
            return Err(NoiseError::BadKeyMaterial {
                len: input_key_material.len(),
            });
        }

        let (chaining_key, temp_key) = hkdf_two(&self.chaining_key, input_key_material);
        self.chaining_key = chaining_key;
        self.cipher.initialize(temp_key, chaining_key);
        Ok(())
    }

    /// Three-output variant that also folds derived material into the
    /// transcript. Not used by `Noise_XK` itself, but part of the symmetric
    /// primitive set.
    ///
    /// # Errors
    ///
    /// Same input validation as [`Self::mix_key`].
    pub(crate) fn mix_key_and_hash(&mut self, input_key_material: &[u8]) -> Result<(), NoiseError> {
        if !input_key_material.is_empty() && input_key_material.len() != DH_OUTPUT_SIZE {
            return Err(NoiseError::BadKeyMaterial {
                len: input_key_material.len(),
            });
        }

        let (chaining_key, temp_hash, temp_key) = hkdf_three(&self.chaining_key, input_key_material);
        self.chaining_key = chaining_key;
        self.mix_hash(&temp_hash);
        self.cipher.initialize(temp_key, chaining_key);
        Ok(())
    }

    /// Encrypts with the current transcript hash as associated data, then
    /// absorbs the ciphertext, binding the message to everything seen so
    /// far.
    ///
    /// # Errors
    ///
    /// Propagates handshake-phase cipher errors.
    pub(crate) fn encrypt_and_hash(&mut self, plaintext: &[u8]) -> Result<Vec<u8>, NoiseError> {
        let transcript = self.hash;
        let ciphertext = self.cipher.encrypt_with_ad(&transcript, plaintext)?;
        self.mix_hash(&ciphertext);
        Ok(ciphertext)
    }

    /// Mirror of [`Self::encrypt_and_hash`]. The ciphertext is only
    /// absorbed after it authenticates.
    ///
    /// # Errors
    ///
    /// Propagates handshake-phase cipher errors.
    pub(crate) fn decrypt_and_hash(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>, NoiseError> {
        let transcript = self.hash;
        let plaintext = self.cipher.decrypt_with_ad(&transcript, ciphertext)?;
        self.mix_hash(ciphertext);
        Ok(plaintext)
    }

    /// Whether the owned cipher is keyed yet (fields encrypted before the
    /// first `mix_key` pass through in the clear).
    pub(crate) fn cipher_has_keys(&self) -> bool {
        self.cipher.has_keys()
    }

    /// Derives the two directional transport ciphers.
    ///
    /// Both receive the final chaining key so each direction can rotate
    /// its own key later. Call exactly once, at the end of a successful
    /// handshake; the state must be dropped afterwards, which wipes it.
    pub(crate) fn split(&mut self) -> (CipherState, CipherState) {
        let (initiator_key, responder_key) = hkdf_two(&self.chaining_key, &[]);

        let mut initiator_cipher = CipherState::new();
        initiator_cipher.initialize(initiator_key, self.chaining_key);
        let mut responder_cipher = CipherState::new();
        responder_cipher.initialize(responder_key, self.chaining_key);
        (initiator_cipher, responder_cipher)
    }

    /// The current transcript hash.
    pub(crate) fn handshake_hash(&self) -> [u8; 32] {
        self.hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAME: &[u8] = b"Noise_XK_secp256k1_ChaChaPoly_SHA256";

    #[test]
    fn initialize_hashes_long_protocol_names() {
        let state = SymmetricState::initialize(NAME);
        let expected: [u8; 32] = Sha256::digest(NAME).into();
        assert_eq!(state.handshake_hash(), expected);
        assert!(!state.cipher_has_keys());
    }

    #[test]
    fn mix_hash_is_order_sensitive() {
        let mut a = SymmetricState::initialize(NAME);
        let mut b = SymmetricState::initialize(NAME);

        a.mix_hash(b"one");
        a.mix_hash(b"two");
        b.mix_hash(b"two");
        b.mix_hash(b"one");
        assert_ne!(a.handshake_hash(), b.handshake_hash());
    }

    #[test]
    fn mix_key_rejects_bad_lengths() {
        let mut state = SymmetricState::initialize(NAME);
        assert_eq!(
            state.mix_key(&[0u8; 31]),
            Err(NoiseError::BadKeyMaterial { len: 31 })
        );
        assert_eq!(
            state.mix_key_and_hash(&[0u8; 33]),
            Err(NoiseError::BadKeyMaterial { len: 33 })
        );
        assert!(state.mix_key(&[0u8; 32]).is_ok());
        assert!(state.mix_key(&[]).is_ok());
    }

    #[test]
    fn mix_key_and_hash_changes_transcript() {
        let mut plain = SymmetricState::initialize(NAME);
        let mut mixed = SymmetricState::initialize(NAME);

        plain.mix_key(&[0x07u8; 32]).unwrap();
        mixed.mix_key_and_hash(&[0x07u8; 32]).unwrap();
        assert_ne!(plain.handshake_hash(), mixed.handshake_hash());
    }

    #[test]
    fn encrypt_and_hash_stays_in_sync_across_peers() {
        let mut sender = SymmetricState::initialize(NAME);
        let mut receiver = SymmetricState::initialize(NAME);
        sender.mix_key(&[0x09u8; 32]).unwrap();
        receiver.mix_key(&[0x09u8; 32]).unwrap();

        let ciphertext = sender.encrypt_and_hash(b"static key bytes").unwrap();
        let plaintext = receiver.decrypt_and_hash(&ciphertext).unwrap();

        assert_eq!(plaintext, b"static key bytes");
        assert_eq!(sender.handshake_hash(), receiver.handshake_hash());
    }

    #[test]
    fn tampered_ciphertext_leaves_transcript_untouched() {
        let mut sender = SymmetricState::initialize(NAME);
        let mut receiver = SymmetricState::initialize(NAME);
        sender.mix_key(&[0x0au8; 32]).unwrap();
        receiver.mix_key(&[0x0au8; 32]).unwrap();

        let mut ciphertext = sender.encrypt_and_hash(b"payload").unwrap();
        ciphertext[0] ^= 0x80;

        let before = receiver.handshake_hash();
        assert_eq!(
            receiver.decrypt_and_hash(&ciphertext),
            Err(NoiseError::DecryptionFailed)
        );
        assert_eq!(receiver.handshake_hash(), before);
    }

    #[test]
    fn split_gives_both_sides_matching_directional_keys() {
        let mut left = SymmetricState::initialize(NAME);
        let mut right = SymmetricState::initialize(NAME);
        left.mix_key(&[0x0cu8; 32]).unwrap();
        right.mix_key(&[0x0cu8; 32]).unwrap();

        // split returns (initiator-keyed, responder-keyed): the left side
        // sends under the first, the right side receives under it.
        let (mut left_send, _left_recv) = left.split();
        let (mut right_recv, _right_send) = right.split();

        // Same directional key on both sides: what one encrypts under the
        // initiator key, the other decrypts under it.
        let ciphertext = left_send.encrypt(b"frame");
        assert_eq!(right_recv.decrypt(&ciphertext).unwrap(), b"frame");
    }
}
