//! Crypto Session - ECDH key agreement with sealed AES-256-GCM payloads
//!
//! Each [`Peer`] owns one elliptic-curve key pair, agrees on a shared
//! secret with a remote public key, hashes it into an AES-256 key, and
//! seals messages into self-contained payloads (see `wire-format`).

mod aead;
mod agreement;
mod config;
mod error;
mod kdf;
mod peer;

pub use aead::*;
pub use agreement::*;
pub use config::*;
pub use error::*;
pub use kdf::*;
pub use peer::*;

pub use wire_format::{AuthTag, NONCE_SIZE, Nonce, Payload, PeerPublicKey, TAG_SIZE};

/// Symmetric key size for AES-256-GCM (256 bits / 32 bytes)
pub const KEY_SIZE: usize = 32;

/// Uncompressed SEC1 public key size for the supported 256-bit curves
pub const PUBLIC_KEY_SIZE: usize = 65;
