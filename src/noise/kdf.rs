//! HKDF-SHA256 helpers for Noise key derivation.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

/// Two-output HKDF with the chaining key as salt and an empty info string.
pub(crate) fn hkdf_two(chaining_key: &[u8; 32], ikm: &[u8]) -> ([u8; 32], [u8; 32]) {
    let hk = Hkdf::<Sha256>::new(Some(chaining_key), ikm);
    let mut okm = [0u8; 64];
    hk.expand(&[], &mut okm)
        .expect("64 bytes is within the HKDF-SHA256 output limit");

    let mut first = [0u8; 32];
    let mut second = [0u8; 32];
    first.copy_from_slice(&okm[..32]);
    second.copy_from_slice(&okm[32..]);
    okm.zeroize();
    (first, second)
}

/// Three-output HKDF, used by `mix_key_and_hash`.
pub(crate) fn hkdf_three(chaining_key: &[u8; 32], ikm: &[u8]) -> ([u8; 32], [u8; 32], [u8; 32]) {
    let hk = Hkdf::<Sha256>::new(Some(chaining_key), ikm);
    let mut okm = [0u8; 96];
    hk.expand(&[], &mut okm)
        .expect("96 bytes is within the HKDF-SHA256 output limit");

    let mut first = [0u8; 32];
    let mut second = [0u8; 32];
    let mut third = [0u8; 32];
    first.copy_from_slice(&okm[..32]);
    second.copy_from_slice(&okm[32..64]);
    third.copy_from_slice(&okm[64..]);
    okm.zeroize();
    (first, second, third)
}
