//! Wire Format for sealed ECDH payloads
//!
//! This crate holds the byte layout both peers must agree on: a sealed
//! message travels as one base64 string wrapping
//! `nonce (16) || ciphertext (N) || tag (16)`, and public keys travel as
//! base64 of their SEC1 point encoding.

mod error;
mod payload;
mod public_key;

pub use error::*;
pub use payload::*;
pub use public_key::*;

/// Nonce (IV) size on the wire (128 bits / 16 bytes)
pub const NONCE_SIZE: usize = 16;

/// Authentication tag size (128 bits / 16 bytes)
pub const TAG_SIZE: usize = 16;

/// Smallest valid payload: nonce and tag around an empty ciphertext
pub const MIN_PAYLOAD_SIZE: usize = NONCE_SIZE + TAG_SIZE;
