//! Shared secret to symmetric key derivation

use std::fmt;

use hkdf::Hkdf;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{CryptoError, CryptoResult, KEY_SIZE, KeyDerivation, SharedSecret};

/// HKDF info label binding derived keys to this payload format
const HKDF_INFO: &[u8] = b"crypto-session/aes-256-gcm/payload-key/v1";

/// AES-256 key, zeroed on drop
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; KEY_SIZE]);

impl SymmetricKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(CryptoError::InvalidKeyLength {
                expected: KEY_SIZE,
                actual: bytes.len(),
            });
        }
        let mut key = Self([0u8; KEY_SIZE]);
        key.0.copy_from_slice(bytes);
        Ok(key)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymmetricKey([REDACTED] {} bytes)", KEY_SIZE)
    }
}

impl KeyDerivation {
    /// Map a raw shared secret of any length to a 256-bit key
    pub fn derive(&self, secret: &SharedSecret) -> CryptoResult<SymmetricKey> {
        let mut key = SymmetricKey([0u8; KEY_SIZE]);

        match self {
            Self::Sha256 => {
                key.0.copy_from_slice(&Sha256::digest(secret.as_bytes()));
            }
            Self::HkdfSha256 => {
                Hkdf::<Sha256>::new(None, secret.as_bytes())
                    .expand(HKDF_INFO, &mut key.0)
                    .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
            }
        }

        Ok(key)
    }
}
