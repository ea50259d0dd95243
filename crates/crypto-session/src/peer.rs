//! One participant's session: key pair, agreement, and sealed messages

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;
use wire_format::{Payload, PeerPublicKey};

use crate::{
    AeadCodec, CryptoError, CryptoResult, KeyPair, Nonce, PeerConfig, SharedSecret, generate_nonce,
};

/// Local identifier for a peer session (log correlation only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerId(pub Uuid);

impl PeerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PeerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeerPhase {
    /// No key pair yet
    Uninitialized,
    /// Key pair generated, public key can be shared
    KeysGenerated,
    /// Shared secret computed, symmetric key not yet derived
    SecretAgreed,
    /// Symmetric key in place, messages can be sealed and opened
    Ready,
}

#[derive(Default)]
enum PeerState {
    #[default]
    Uninitialized,
    KeysGenerated {
        keypair: KeyPair,
    },
    SecretAgreed {
        keypair: KeyPair,
        secret: SharedSecret,
    },
    Ready {
        keypair: KeyPair,
        codec: AeadCodec,
    },
}

impl PeerState {
    fn phase(&self) -> PeerPhase {
        match self {
            Self::Uninitialized => PeerPhase::Uninitialized,
            Self::KeysGenerated { .. } => PeerPhase::KeysGenerated,
            Self::SecretAgreed { .. } => PeerPhase::SecretAgreed,
            Self::Ready { .. } => PeerPhase::Ready,
        }
    }

    fn keypair(&self) -> Option<&KeyPair> {
        match self {
            Self::Uninitialized => None,
            Self::KeysGenerated { keypair }
            | Self::SecretAgreed { keypair, .. }
            | Self::Ready { keypair, .. } => Some(keypair),
        }
    }
}

/// One side of an ECDH + AES-256-GCM exchange
///
/// Phases advance `Uninitialized -> KeysGenerated -> SecretAgreed -> Ready`.
/// All key material is owned here and zeroed when the peer is dropped.
pub struct Peer {
    id: PeerId,
    config: PeerConfig,
    state: PeerState,
}

impl Peer {
    /// Create a peer with no keys yet
    pub fn new(config: PeerConfig) -> Self {
        Self {
            id: PeerId::new(),
            config,
            state: PeerState::Uninitialized,
        }
    }

    /// Create a peer and generate its key pair
    pub fn generate(config: PeerConfig) -> Self {
        let mut peer = Self::new(config);
        peer.state = PeerState::KeysGenerated {
            keypair: peer.new_keypair(),
        };
        peer
    }

    #[cfg(test)]
    pub(crate) fn with_keypair(config: PeerConfig, keypair: KeyPair) -> Self {
        Self {
            id: PeerId::new(),
            config,
            state: PeerState::KeysGenerated { keypair },
        }
    }

    pub fn id(&self) -> PeerId {
        self.id
    }

    pub fn config(&self) -> &PeerConfig {
        &self.config
    }

    pub fn phase(&self) -> PeerPhase {
        self.state.phase()
    }

    pub fn is_ready(&self) -> bool {
        self.phase() == PeerPhase::Ready
    }

    /// Generate the key pair and return the public key to share
    pub fn generate_keys(&mut self) -> CryptoResult<&PeerPublicKey> {
        self.expect_phase(PeerPhase::Uninitialized)?;
        self.state = PeerState::KeysGenerated {
            keypair: self.new_keypair(),
        };
        self.public_key()
    }

    /// Our public key, available once keys are generated
    pub fn public_key(&self) -> CryptoResult<&PeerPublicKey> {
        self.state
            .keypair()
            .map(KeyPair::public_key)
            .ok_or(CryptoError::InvalidState {
                expected: PeerPhase::KeysGenerated,
                actual: PeerPhase::Uninitialized,
            })
    }

    /// Our public key as the base64 text handed to the other peer
    pub fn public_key_base64(&self) -> CryptoResult<String> {
        Ok(self.public_key()?.to_base64())
    }

    /// Compute the shared secret from the peer's base64 public key.
    ///
    /// On failure the peer stays in `KeysGenerated` and may retry with a
    /// corrected key.
    pub fn agree(&mut self, peer_public: &str) -> CryptoResult<()> {
        let peer_public =
            PeerPublicKey::from_base64(peer_public).map_err(|_| CryptoError::InvalidPeerKey)?;
        self.agree_with(&peer_public)
    }

    /// Compute the shared secret from an already decoded public key
    pub fn agree_with(&mut self, peer_public: &PeerPublicKey) -> CryptoResult<()> {
        let keypair = match std::mem::take(&mut self.state) {
            PeerState::KeysGenerated { keypair } => keypair,
            other => return Err(self.restore(other, PeerPhase::KeysGenerated)),
        };

        match keypair.agree(peer_public) {
            Ok(secret) => {
                debug!(peer = %self.id, curve = %keypair.curve(), "Shared secret agreed");
                self.state = PeerState::SecretAgreed { keypair, secret };
                Ok(())
            }
            Err(e) => {
                warn!(peer = %self.id, curve = %keypair.curve(), "Rejected peer public key");
                self.state = PeerState::KeysGenerated { keypair };
                Err(e)
            }
        }
    }

    /// Derive the symmetric key and discard the raw shared secret
    pub fn derive_key(&mut self) -> CryptoResult<()> {
        let (keypair, secret) = match std::mem::take(&mut self.state) {
            PeerState::SecretAgreed { keypair, secret } => (keypair, secret),
            other => return Err(self.restore(other, PeerPhase::SecretAgreed)),
        };

        let codec = match self
            .config
            .kdf
            .derive(&secret)
            .and_then(|key| AeadCodec::new(&key))
        {
            Ok(codec) => codec,
            Err(e) => {
                self.state = PeerState::SecretAgreed { keypair, secret };
                return Err(e);
            }
        };

        info!(peer = %self.id, kdf = ?self.config.kdf, "Session ready");
        self.state = PeerState::Ready { keypair, codec };
        Ok(())
    }

    /// Agree on the secret and derive the key in one step
    pub fn establish(&mut self, peer_public: &str) -> CryptoResult<()> {
        self.agree(peer_public)?;
        self.derive_key()
    }

    /// Seal a UTF-8 message into the base64 wire payload
    pub fn encrypt_message(&self, plaintext: &str) -> CryptoResult<String> {
        Ok(self.seal_payload(plaintext.as_bytes())?.to_base64())
    }

    /// Open a base64 wire payload and return the UTF-8 message
    pub fn decrypt_message(&self, payload: &str) -> CryptoResult<String> {
        let codec = self.codec()?;
        let payload = Payload::from_base64(payload).inspect_err(|e| {
            warn!(peer = %self.id, error = %e, "Rejected malformed payload");
        })?;
        let plaintext = self.open_with(codec, &payload)?;
        String::from_utf8(plaintext).map_err(|_| CryptoError::InvalidUtf8)
    }

    /// Seal raw bytes under a fresh random nonce
    pub fn seal_payload(&self, plaintext: &[u8]) -> CryptoResult<Payload> {
        self.seal_with_nonce(generate_nonce(), plaintext)
    }

    /// Open a parsed payload
    pub fn open_payload(&self, payload: &Payload) -> CryptoResult<Vec<u8>> {
        let codec = self.codec()?;
        self.open_with(codec, payload)
    }

    pub(crate) fn seal_with_nonce(&self, nonce: Nonce, plaintext: &[u8]) -> CryptoResult<Payload> {
        let codec = self.codec()?;
        let (ciphertext, tag) = codec.seal(&nonce, plaintext)?;
        debug!(peer = %self.id, len = ciphertext.len(), "Sealed message");
        Ok(Payload::new(nonce, ciphertext, tag))
    }

    fn open_with(&self, codec: &AeadCodec, payload: &Payload) -> CryptoResult<Vec<u8>> {
        let plaintext = codec
            .open(&payload.nonce, &payload.ciphertext, &payload.tag)
            .inspect_err(|_| {
                warn!(peer = %self.id, "Payload failed authentication");
            })?;
        debug!(peer = %self.id, len = plaintext.len(), "Opened message");
        Ok(plaintext)
    }

    fn codec(&self) -> CryptoResult<&AeadCodec> {
        match &self.state {
            PeerState::Ready { codec, .. } => Ok(codec),
            other => Err(CryptoError::InvalidState {
                expected: PeerPhase::Ready,
                actual: other.phase(),
            }),
        }
    }

    fn new_keypair(&self) -> KeyPair {
        let keypair = KeyPair::generate(self.config.curve);
        info!(peer = %self.id, curve = %self.config.curve, "Generated key pair");
        keypair
    }

    fn expect_phase(&self, expected: PeerPhase) -> CryptoResult<()> {
        if self.phase() == expected {
            Ok(())
        } else {
            Err(self.invalid_state(expected))
        }
    }

    fn invalid_state(&self, expected: PeerPhase) -> CryptoError {
        CryptoError::InvalidState {
            expected,
            actual: self.phase(),
        }
    }

    /// Put back a state taken for a transition that did not apply
    fn restore(&mut self, state: PeerState, expected: PeerPhase) -> CryptoError {
        self.state = state;
        self.invalid_state(expected)
    }
}

impl fmt::Debug for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Peer")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("phase", &self.phase())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Curve, KeyDerivation};

    const MESSAGE: &str = "some random message...";

    fn established_pair(config: PeerConfig) -> (Peer, Peer) {
        let mut alice = Peer::new(config.clone());
        let mut bob = Peer::new(config);

        let alice_public = alice.generate_keys().unwrap().to_base64();
        let bob_public = bob.generate_keys().unwrap().to_base64();

        alice.establish(&bob_public).unwrap();
        bob.establish(&alice_public).unwrap();
        (alice, bob)
    }

    #[test]
    fn test_alice_to_bob_end_to_end() {
        let (alice, bob) = established_pair(PeerConfig::default());

        let payload = alice.encrypt_message(MESSAGE).unwrap();
        let decrypted = bob.decrypt_message(&payload).unwrap();
        assert_eq!(decrypted, MESSAGE);

        let reply = bob.encrypt_message("ack").unwrap();
        assert_eq!(alice.decrypt_message(&reply).unwrap(), "ack");
    }

    #[test]
    fn test_all_configurations_round_trip() {
        for curve in [Curve::Secp256k1, Curve::P256] {
            for kdf in [KeyDerivation::Sha256, KeyDerivation::HkdfSha256] {
                let (alice, bob) = established_pair(PeerConfig::new(curve, kdf));
                let payload = alice.encrypt_message("héllo wörld").unwrap();
                assert_eq!(bob.decrypt_message(&payload).unwrap(), "héllo wörld");
            }
        }
    }

    #[test]
    fn test_phases_advance_in_order() {
        let mut alice = Peer::new(PeerConfig::default());
        let bob = Peer::generate(PeerConfig::default());
        assert_eq!(alice.phase(), PeerPhase::Uninitialized);
        assert_eq!(bob.phase(), PeerPhase::KeysGenerated);

        alice.generate_keys().unwrap();
        assert_eq!(alice.phase(), PeerPhase::KeysGenerated);

        alice.agree(&bob.public_key_base64().unwrap()).unwrap();
        assert_eq!(alice.phase(), PeerPhase::SecretAgreed);

        alice.derive_key().unwrap();
        assert!(alice.is_ready());
        assert!(alice.public_key().is_ok());
    }

    #[test]
    fn test_operations_rejected_out_of_phase() {
        let mut peer = Peer::new(PeerConfig::default());

        assert!(matches!(
            peer.encrypt_message(MESSAGE),
            Err(CryptoError::InvalidState {
                expected: PeerPhase::Ready,
                actual: PeerPhase::Uninitialized
            })
        ));
        assert!(peer.public_key().is_err());
        assert!(matches!(peer.derive_key(), Err(CryptoError::InvalidState { .. })));

        peer.generate_keys().unwrap();
        assert!(matches!(
            peer.generate_keys(),
            Err(CryptoError::InvalidState {
                expected: PeerPhase::Uninitialized,
                actual: PeerPhase::KeysGenerated
            })
        ));
        assert!(matches!(
            peer.decrypt_message("AAAA"),
            Err(CryptoError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_wrong_key_payload_fails_authentication() {
        let (alice, _bob) = established_pair(PeerConfig::default());
        let (_carol, dave) = established_pair(PeerConfig::default());

        let payload = alice.encrypt_message(MESSAGE).unwrap();
        assert!(matches!(
            dave.decrypt_message(&payload),
            Err(CryptoError::AuthenticationFailure)
        ));
    }

    #[test]
    fn test_tampered_payload_fails_authentication() {
        let (alice, bob) = established_pair(PeerConfig::default());
        let payload = alice.seal_payload(MESSAGE.as_bytes()).unwrap();

        let mut bytes = payload.to_bytes().to_vec();
        let middle = bytes.len() / 2;
        bytes[middle] ^= 0x01;
        let tampered = Payload::from_bytes(&bytes).unwrap();

        assert!(matches!(
            bob.open_payload(&tampered),
            Err(CryptoError::AuthenticationFailure)
        ));
        assert_eq!(bob.open_payload(&payload).unwrap(), MESSAGE.as_bytes());
    }

    #[test]
    fn test_framing_errors_propagate() {
        let (_alice, bob) = established_pair(PeerConfig::default());

        assert!(matches!(
            bob.decrypt_message("AAAA"),
            Err(CryptoError::Framing(wire_format::FramingError::TooShort { .. }))
        ));
        assert!(matches!(
            bob.decrypt_message("%%%"),
            Err(CryptoError::Framing(wire_format::FramingError::Base64))
        ));
    }

    #[test]
    fn test_corrupted_payload_error_chain_hides_position() {
        let (alice, bob) = established_pair(PeerConfig::default());
        let mut payload = alice.encrypt_message(MESSAGE).unwrap();
        payload.replace_range(20..21, "%");

        let err = bob.decrypt_message(&payload).unwrap_err();
        assert_eq!(format!("{:?}", err), "Framing(Base64)");

        let mut chain = Vec::new();
        let mut current: Option<&dyn std::error::Error> = Some(&err);
        while let Some(e) = current {
            chain.push(e.to_string());
            current = e.source();
        }
        assert_eq!(
            chain,
            ["Framing error: Invalid base64 encoding", "Invalid base64 encoding"]
        );
    }

    #[test]
    fn test_fresh_nonce_per_message() {
        let (alice, _bob) = established_pair(PeerConfig::default());

        let first = alice.seal_payload(MESSAGE.as_bytes()).unwrap();
        let second = alice.seal_payload(MESSAGE.as_bytes()).unwrap();
        assert_ne!(first.nonce, second.nonce);
        assert_ne!(first.ciphertext, second.ciphertext);
    }

    #[test]
    fn test_cross_curve_agreement_rejected() {
        let mut alice = Peer::generate(PeerConfig::new(Curve::Secp256k1, KeyDerivation::Sha256));
        let bob = Peer::generate(PeerConfig::new(Curve::P256, KeyDerivation::Sha256));

        let result = alice.agree(&bob.public_key_base64().unwrap());
        assert!(matches!(result, Err(CryptoError::InvalidPeerKey)));
        assert_eq!(alice.phase(), PeerPhase::KeysGenerated);
    }

    #[test]
    fn test_invalid_peer_key_text_rejected() {
        let mut alice = Peer::generate(PeerConfig::default());

        assert!(matches!(alice.agree("not base64!"), Err(CryptoError::InvalidPeerKey)));
        assert!(matches!(alice.agree(""), Err(CryptoError::InvalidPeerKey)));

        // still usable afterwards
        let bob = Peer::generate(PeerConfig::default());
        alice.establish(&bob.public_key_base64().unwrap()).unwrap();
        assert!(alice.is_ready());
    }

    #[test]
    fn test_fixed_nonce_payload_layout() {
        let (alice, bob) = established_pair(PeerConfig::default());
        let nonce = Nonce::from_bytes([0x24; crate::NONCE_SIZE]);

        let payload = alice.seal_with_nonce(nonce, MESSAGE.as_bytes()).unwrap();
        let text = payload.to_base64();

        assert_eq!(payload.wire_len(), MESSAGE.len() + 32);
        assert_eq!(&Payload::from_base64(&text).unwrap().nonce, &nonce);
        assert_eq!(bob.decrypt_message(&text).unwrap(), MESSAGE);
    }

    #[test]
    fn test_payload_matches_node_crypto() {
        // Node crypto: secp256k1 scalars 0x11.. / 0x22.., key = SHA-256 of
        // the shared secret, IV = 0x24 repeated.
        const REFERENCE_PAYLOAD: &str =
            "JCQkJCQkJCQkJCQkJCQkJHioLpQHNThRCTrnyLva0IJBCi5JeKhgAl1JFtKAwOz7F/gbvEI8";

        let config = PeerConfig::default();
        let alice_keys = KeyPair::from_secret_bytes(Curve::Secp256k1, &[0x11; 32]).unwrap();
        let bob_keys = KeyPair::from_secret_bytes(Curve::Secp256k1, &[0x22; 32]).unwrap();
        let alice_public = alice_keys.public_key().to_base64();
        let bob_public = bob_keys.public_key().to_base64();

        let mut alice = Peer::with_keypair(config.clone(), alice_keys);
        let mut bob = Peer::with_keypair(config, bob_keys);
        alice.establish(&bob_public).unwrap();
        bob.establish(&alice_public).unwrap();

        let nonce = Nonce::from_bytes([0x24; crate::NONCE_SIZE]);
        let payload = alice.seal_with_nonce(nonce, MESSAGE.as_bytes()).unwrap();
        assert_eq!(payload.to_base64(), REFERENCE_PAYLOAD);
        assert_eq!(bob.decrypt_message(REFERENCE_PAYLOAD).unwrap(), MESSAGE);
    }

    #[test]
    fn test_invalid_utf8_reported() {
        let (alice, bob) = established_pair(PeerConfig::default());
        let payload = alice.seal_payload(&[0xff, 0xfe, 0xfd]).unwrap();

        assert!(matches!(
            bob.decrypt_message(&payload.to_base64()),
            Err(CryptoError::InvalidUtf8)
        ));
    }

    #[test]
    fn test_error_messages_do_not_leak_details() {
        let (alice, _bob) = established_pair(PeerConfig::default());
        let (_carol, dave) = established_pair(PeerConfig::default());

        let payload = alice.encrypt_message(MESSAGE).unwrap();
        let err = dave.decrypt_message(&payload).unwrap_err();
        assert_eq!(err.to_string(), "Authentication failed: payload rejected");
    }
}
