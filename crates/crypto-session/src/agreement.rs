//! Elliptic-curve Diffie-Hellman key agreement

use std::fmt;

use k256::elliptic_curve::ecdh::diffie_hellman;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use tracing::debug;
use wire_format::PeerPublicKey;
use zeroize::Zeroizing;

use crate::{CryptoError, CryptoResult, Curve};

/// Private scalar for the configured curve (zeroed on drop by the curve crates)
enum SecretScalar {
    Secp256k1(k256::SecretKey),
    P256(p256::SecretKey),
}

/// One party's key pair
///
/// The private scalar has no accessor; it can only be used through
/// [`KeyPair::agree`].
pub struct KeyPair {
    curve: Curve,
    secret: SecretScalar,
    public: PeerPublicKey,
}

impl KeyPair {
    /// Generate a fresh key pair on `curve`
    pub fn generate(curve: Curve) -> Self {
        let secret = match curve {
            Curve::Secp256k1 => SecretScalar::Secp256k1(k256::SecretKey::random(&mut OsRng)),
            Curve::P256 => SecretScalar::P256(p256::SecretKey::random(&mut OsRng)),
        };
        Self::from_secret(curve, secret)
    }

    /// Rebuild a key pair from a known scalar (for fixed test vectors)
    #[cfg(test)]
    pub(crate) fn from_secret_bytes(curve: Curve, bytes: &[u8]) -> CryptoResult<Self> {
        let secret = match curve {
            Curve::Secp256k1 => k256::SecretKey::from_slice(bytes).map(SecretScalar::Secp256k1),
            Curve::P256 => p256::SecretKey::from_slice(bytes).map(SecretScalar::P256),
        }
        .map_err(|_| CryptoError::InvalidKeyLength {
            expected: crate::KEY_SIZE,
            actual: bytes.len(),
        })?;
        Ok(Self::from_secret(curve, secret))
    }

    fn from_secret(curve: Curve, secret: SecretScalar) -> Self {
        // Uncompressed SEC1: 0x04 || x || y
        let encoded = match &secret {
            SecretScalar::Secp256k1(sk) => {
                sk.public_key().to_encoded_point(false).as_bytes().to_vec()
            }
            SecretScalar::P256(sk) => sk.public_key().to_encoded_point(false).as_bytes().to_vec(),
        };

        Self {
            curve,
            secret,
            public: PeerPublicKey::from_sec1(encoded),
        }
    }

    pub fn curve(&self) -> Curve {
        self.curve
    }

    /// Public key to hand to the peer
    pub fn public_key(&self) -> &PeerPublicKey {
        &self.public
    }

    /// Compute the shared secret with the peer's public key.
    ///
    /// The peer key must be a SEC1 point on this key pair's curve; a
    /// malformed encoding, an off-curve point or the identity all fail
    /// with [`CryptoError::InvalidPeerKey`]. A key generated on a
    /// different curve is rejected the same way.
    pub fn agree(&self, peer_public: &PeerPublicKey) -> CryptoResult<SharedSecret> {
        let raw = match &self.secret {
            SecretScalar::Secp256k1(sk) => {
                let peer = k256::PublicKey::from_sec1_bytes(peer_public.as_bytes())
                    .map_err(|_| CryptoError::InvalidPeerKey)?;
                let shared = diffie_hellman(sk.to_nonzero_scalar(), peer.as_affine());
                shared.raw_secret_bytes().to_vec()
            }
            SecretScalar::P256(sk) => {
                let peer = p256::PublicKey::from_sec1_bytes(peer_public.as_bytes())
                    .map_err(|_| CryptoError::InvalidPeerKey)?;
                let shared = diffie_hellman(sk.to_nonzero_scalar(), peer.as_affine());
                shared.raw_secret_bytes().to_vec()
            }
        };

        debug!(curve = %self.curve, len = raw.len(), "Computed shared secret");
        Ok(SharedSecret(Zeroizing::new(raw)))
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("curve", &self.curve)
            .field("public", &self.public)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Raw ECDH output: the x-coordinate of the shared point
///
/// Lives only until the symmetric key is derived. Zeroed on drop.
pub struct SharedSecret(Zeroizing<Vec<u8>>);

impl SharedSecret {
    #[cfg(test)]
    pub(crate) fn from_bytes(bytes: &[u8]) -> Self {
        Self(Zeroizing::new(bytes.to_vec()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedSecret([REDACTED] {} bytes)", self.0.len())
    }
}
