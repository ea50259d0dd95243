//! Crypto session error types

use thiserror::Error;
use wire_format::FramingError;

use crate::PeerPhase;

/// Cryptographic operation error
///
/// Display strings report the kind of failure only. They never carry key
/// material, nonces, tags or the position of a mismatch.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Invalid peer public key")]
    InvalidPeerKey,

    #[error("Authentication failed: payload rejected")]
    AuthenticationFailure,

    #[error("Framing error: {0}")]
    Framing(#[from] FramingError),

    #[error("Invalid peer state: expected {expected:?}, got {actual:?}")]
    InvalidState {
        expected: PeerPhase,
        actual: PeerPhase,
    },

    #[error("Decrypted message is not valid UTF-8")]
    InvalidUtf8,

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type CryptoResult<T> = Result<T, CryptoError>;
