// SPDX-FileCopyrightText: 2026 Spike Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AES-256-GCM envelope primitives and KEK derivation.
//!
//! Every [`seal`] draws a fresh 96-bit nonce from the system CSPRNG. The KEK
//! id is bound as associated data so a wrapped key cannot be replayed under
//! a different version.

use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};
use ring::hkdf;
use ring::rand::{SecureRandom, SystemRandom};
use spike_core::{RootKey, SpikeError};
use zeroize::Zeroizing;

pub const KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 12;

/// GCM authentication tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;

const KEK_SALT: &[u8] = b"spike/kek/v1";
const KEK_INFO: &[&[u8]] = &[b"initial-kek"];

/// Encrypt `plaintext` under `key`, authenticating `aad`.
///
/// Returns `(ciphertext_with_tag, nonce)`.
pub fn seal(
    key: &[u8; KEY_LEN],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<(Vec<u8>, [u8; NONCE_LEN]), SpikeError> {
    let key = aead_key(key)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    SystemRandom::new()
        .fill(&mut nonce_bytes)
        .map_err(|_| SpikeError::Crypto("failed to generate random nonce".to_string()))?;

    let mut in_out = plaintext.to_vec();
    key.seal_in_place_append_tag(
        Nonce::assume_unique_for_key(nonce_bytes),
        Aad::from(aad),
        &mut in_out,
    )
    .map_err(|_| SpikeError::Crypto("AES-256-GCM encryption failed".to_string()))?;

    Ok((in_out, nonce_bytes))
}

/// Decrypt and authenticate. Fails on a wrong key, wrong `aad`, or any
/// tampering.
pub fn open(
    key: &[u8; KEY_LEN],
    aad: &[u8],
    nonce: &[u8; NONCE_LEN],
    ciphertext: &[u8],
) -> Result<Zeroizing<Vec<u8>>, SpikeError> {
    let key = aead_key(key)?;

    let mut in_out = Zeroizing::new(ciphertext.to_vec());
    let plaintext = key
        .open_in_place(
            Nonce::assume_unique_for_key(*nonce),
            Aad::from(aad),
            &mut in_out,
        )
        .map_err(|_| {
            SpikeError::Crypto("AES-256-GCM decryption failed: wrong key or corrupted data".into())
        })?;

    Ok(Zeroizing::new(plaintext.to_vec()))
}

/// Fresh random key for a rotated KEK.
pub fn generate_random_key() -> Result<Zeroizing<[u8; KEY_LEN]>, SpikeError> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    SystemRandom::new()
        .fill(&mut key[..])
        .map_err(|_| SpikeError::Crypto("failed to generate random key".to_string()))?;
    Ok(key)
}

/// Derive the first KEK of a keyring from the root key.
///
/// Deterministic, so a restored instance recovers the KEK that wrapped data
/// before the restart.
pub fn derive_initial_kek(root: &RootKey) -> Result<Zeroizing<[u8; KEY_LEN]>, SpikeError> {
    let prk = hkdf::Salt::new(hkdf::HKDF_SHA256, KEK_SALT).extract(root.expose());
    let okm = prk
        .expand(KEK_INFO, hkdf::HKDF_SHA256)
        .map_err(|_| SpikeError::Crypto("HKDF expand failed".to_string()))?;
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    okm.fill(&mut key[..])
        .map_err(|_| SpikeError::Crypto("HKDF fill failed".to_string()))?;
    Ok(key)
}

fn aead_key(key: &[u8; KEY_LEN]) -> Result<LessSafeKey, SpikeError> {
    let unbound = UnboundKey::new(&AES_256_GCM, key)
        .map_err(|_| SpikeError::Crypto("failed to create AES-256-GCM key".to_string()))?;
    Ok(LessSafeKey::new(unbound))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_open_roundtrip() {
        let key = generate_random_key().unwrap();
        let (ciphertext, nonce) = seal(&key, b"kek-1", b"data key bytes").unwrap();
        assert_eq!(ciphertext.len(), b"data key bytes".len() + TAG_LEN);

        let plaintext = open(&key, b"kek-1", &nonce, &ciphertext).unwrap();
        assert_eq!(plaintext.as_slice(), b"data key bytes");
    }

    #[test]
    fn nonces_are_fresh_per_seal() {
        let key = generate_random_key().unwrap();
        let (ct1, n1) = seal(&key, b"", b"same").unwrap();
        let (ct2, n2) = seal(&key, b"", b"same").unwrap();
        assert_ne!(n1, n2);
        assert_ne!(ct1, ct2);
    }

    #[test]
    fn mismatched_aad_is_rejected() {
        let key = generate_random_key().unwrap();
        let (ciphertext, nonce) = seal(&key, b"kek-1", b"secret").unwrap();
        let err = open(&key, b"kek-2", &nonce, &ciphertext).unwrap_err();
        assert!(matches!(err, SpikeError::Crypto(_)));
    }

    #[test]
    fn tampering_and_wrong_key_are_rejected() {
        let key = generate_random_key().unwrap();
        let other = generate_random_key().unwrap();
        let (mut ciphertext, nonce) = seal(&key, b"", b"secret").unwrap();

        assert!(open(&other, b"", &nonce, &ciphertext).is_err());
        ciphertext[0] ^= 0x01;
        assert!(open(&key, b"", &nonce, &ciphertext).is_err());
    }

    #[test]
    fn initial_kek_is_stable_per_root() {
        let mut a = [1u8; 32];
        let mut b = [1u8; 32];
        let mut c = [2u8; 32];
        let ka = derive_initial_kek(&RootKey::from_bytes(&mut a)).unwrap();
        let kb = derive_initial_kek(&RootKey::from_bytes(&mut b)).unwrap();
        let kc = derive_initial_kek(&RootKey::from_bytes(&mut c)).unwrap();
        assert_eq!(*ka, *kb);
        assert_ne!(*ka, *kc);
    }

    #[test]
    fn initial_kek_matches_hkdf_sha256_vector() {
        let mut root = [7u8; 32];
        let kek = derive_initial_kek(&RootKey::from_bytes(&mut root)).unwrap();
        let expected: [u8; KEY_LEN] = [
            0xff, 0xf0, 0xbe, 0xe4, 0x94, 0xe7, 0xc0, 0xb2,
            0x82, 0xf6, 0xbb, 0x82, 0xed, 0xd8, 0xd8, 0x21,
            0x6e, 0xed, 0xfd, 0x51, 0xa5, 0xcb, 0x74, 0x84,
            0x36, 0x86, 0x52, 0x7c, 0x42, 0xf2, 0x33, 0x6a,
        ];
        assert_eq!(*kek, expected);
    }
}
