//! AES-256-GCM with a 128-bit nonce and detached tag

use std::fmt;

use aes_gcm::{
    AesGcm,
    aead::{AeadInPlace, KeyInit, consts::U16, generic_array::GenericArray},
    aes::Aes256,
};
use rand::RngCore;
use rand::rngs::OsRng;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::{AuthTag, CryptoError, CryptoResult, KEY_SIZE, NONCE_SIZE, Nonce, SymmetricKey};

/// AES-256-GCM instantiated with a 16-byte IV (J0 derived via GHASH)
type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// No associated data is bound into the tag
const EMPTY_AAD: &[u8] = b"";

/// Authenticated encryption with one symmetric key
///
/// Only the key is held between calls. The expanded AES and GHASH state
/// lives for a single `seal` or `open` and is wiped when dropped. Nonce
/// uniqueness is the caller's job; the codec keeps no history.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct AeadCodec {
    key: SymmetricKey,
}

impl AeadCodec {
    pub fn new(key: &SymmetricKey) -> CryptoResult<Self> {
        // Reject a bad key up front rather than on first use
        cipher(key)?;
        Ok(Self { key: key.clone() })
    }

    /// Encrypt and authenticate. The ciphertext has the plaintext's length.
    pub fn seal(&self, nonce: &Nonce, plaintext: &[u8]) -> CryptoResult<(Vec<u8>, AuthTag)> {
        let mut buffer = plaintext.to_vec();
        let tag = cipher(&self.key)?
            .encrypt_in_place_detached(
                GenericArray::from_slice(nonce.as_bytes()),
                EMPTY_AAD,
                &mut buffer,
            )
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;

        Ok((buffer, AuthTag::from_bytes(tag.into())))
    }

    /// Verify and decrypt.
    ///
    /// Fails closed: on a tag mismatch the working buffer is wiped and only
    /// [`CryptoError::AuthenticationFailure`] is returned.
    pub fn open(&self, nonce: &Nonce, ciphertext: &[u8], tag: &AuthTag) -> CryptoResult<Vec<u8>> {
        let mut buffer = Zeroizing::new(ciphertext.to_vec());
        cipher(&self.key)?
            .decrypt_in_place_detached(
                GenericArray::from_slice(nonce.as_bytes()),
                EMPTY_AAD,
                buffer.as_mut_slice(),
                GenericArray::from_slice(tag.as_bytes()),
            )
            .map_err(|_| CryptoError::AuthenticationFailure)?;

        Ok(std::mem::take(&mut *buffer))
    }
}

impl fmt::Debug for AeadCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AeadCodec").field("key", &self.key).finish()
    }
}

fn cipher(key: &SymmetricKey) -> CryptoResult<Aes256Gcm16> {
    Aes256Gcm16::new_from_slice(key.as_bytes()).map_err(|_| CryptoError::InvalidKeyLength {
        expected: KEY_SIZE,
        actual: key.as_bytes().len(),
    })
}

/// Fresh random nonce from the OS RNG
pub fn generate_nonce() -> Nonce {
    let mut bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut bytes);
    Nonce::from_bytes(bytes)
}
