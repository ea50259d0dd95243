//! Peer configuration

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{CryptoError, CryptoResult};

/// Elliptic curve used for key agreement
///
/// Both peers must be configured with the same curve. It is never
/// negotiated in-band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Curve {
    /// secp256k1 (SEC 2)
    #[serde(rename = "secp256k1")]
    Secp256k1,
    /// NIST P-256
    #[serde(rename = "prime256v1", alias = "P-256")]
    P256,
}

impl Curve {
    /// Conventional curve name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Secp256k1 => "secp256k1",
            Self::P256 => "prime256v1",
        }
    }
}

impl Default for Curve {
    fn default() -> Self {
        Self::Secp256k1
    }
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How the raw shared secret becomes the AES-256 key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyDerivation {
    /// SHA-256 of the raw secret
    Sha256,
    /// HKDF-SHA256, no salt, fixed info label
    HkdfSha256,
}

impl Default for KeyDerivation {
    fn default() -> Self {
        Self::Sha256
    }
}

/// Peer configuration, shared out-of-band by both sides
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerConfig {
    /// Curve for key agreement
    pub curve: Curve,
    /// Shared secret to symmetric key mapping
    pub kdf: KeyDerivation,
}

impl PeerConfig {
    pub fn new(curve: Curve, kdf: KeyDerivation) -> Self {
        Self { curve, kdf }
    }

    /// Parse from JSON; missing fields fall back to defaults
    pub fn from_json(json: &str) -> CryptoResult<Self> {
        serde_json::from_str(json).map_err(|e| CryptoError::Config(e.to_string()))
    }

    pub fn to_json(&self) -> CryptoResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| CryptoError::Config(e.to_string()))
    }
}
