//! Sealed payload layout and its text encodings

use std::fmt;
use std::str::FromStr;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use bytes::{BufMut, Bytes, BytesMut};
use tracing::debug;

use crate::{FramingError, FramingResult, MIN_PAYLOAD_SIZE, NONCE_SIZE, TAG_SIZE};

/// Per-message nonce (IV)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Nonce([u8; NONCE_SIZE]);

impl Nonce {
    pub fn from_bytes(bytes: [u8; NONCE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Copy a nonce out of a slice that must be exactly `NONCE_SIZE` long
    pub fn from_slice(bytes: &[u8]) -> FramingResult<Self> {
        let Ok(array) = <[u8; NONCE_SIZE]>::try_from(bytes) else {
            return Err(FramingError::InvalidFieldLength {
                expected: NONCE_SIZE,
                actual: bytes.len(),
            });
        };
        Ok(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }
}

/// AEAD authentication tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AuthTag([u8; TAG_SIZE]);

impl AuthTag {
    pub fn from_bytes(bytes: [u8; TAG_SIZE]) -> Self {
        Self(bytes)
    }

    /// Copy a tag out of a slice that must be exactly `TAG_SIZE` long
    pub fn from_slice(bytes: &[u8]) -> FramingResult<Self> {
        let Ok(array) = <[u8; TAG_SIZE]>::try_from(bytes) else {
            return Err(FramingError::InvalidFieldLength {
                expected: TAG_SIZE,
                actual: bytes.len(),
            });
        };
        Ok(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; TAG_SIZE] {
        &self.0
    }
}

/// One sealed message as it crosses the wire
///
/// Layout: `[nonce: 16][ciphertext: N][tag: 16]`. There is no length
/// prefix; the ciphertext is whatever lies between the two fixed fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub nonce: Nonce,
    pub ciphertext: Bytes,
    pub tag: AuthTag,
}

impl Payload {
    pub fn new(nonce: Nonce, ciphertext: impl Into<Bytes>, tag: AuthTag) -> Self {
        Self {
            nonce,
            ciphertext: ciphertext.into(),
            tag,
        }
    }

    /// Total size of the canonical byte form
    pub fn wire_len(&self) -> usize {
        NONCE_SIZE + self.ciphertext.len() + TAG_SIZE
    }

    /// Serialize to the canonical wire bytes
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.wire_len());
        buf.put_slice(self.nonce.as_bytes());
        buf.put_slice(&self.ciphertext);
        buf.put_slice(self.tag.as_bytes());
        buf.freeze()
    }

    /// Split canonical wire bytes into their three fields
    pub fn from_bytes(data: &[u8]) -> FramingResult<Self> {
        if data.len() < MIN_PAYLOAD_SIZE {
            debug!(len = data.len(), "Rejecting short payload");
            return Err(FramingError::TooShort {
                len: data.len(),
                min: MIN_PAYLOAD_SIZE,
            });
        }

        let (nonce, rest) = data.split_at(NONCE_SIZE);
        let (ciphertext, tag) = rest.split_at(rest.len() - TAG_SIZE);

        Ok(Self {
            nonce: Nonce::from_slice(nonce)?,
            ciphertext: Bytes::copy_from_slice(ciphertext),
            tag: AuthTag::from_slice(tag)?,
        })
    }

    /// Transport text form (standard, padded base64)
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.to_bytes())
    }

    /// Parse the transport text form. Surrounding whitespace is ignored.
    pub fn from_base64(text: &str) -> FramingResult<Self> {
        let data = STANDARD
            .decode(text.trim())
            .map_err(|_| FramingError::Base64)?;
        Self::from_bytes(&data)
    }

    /// Lowercase hex of each field, concatenated in wire order
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(self.wire_len() * 2);
        out.push_str(&hex::encode(self.nonce.as_bytes()));
        out.push_str(&hex::encode(&self.ciphertext));
        out.push_str(&hex::encode(self.tag.as_bytes()));
        out
    }

    /// Parse the hex form produced by [`Payload::to_hex`]
    pub fn from_hex(text: &str) -> FramingResult<Self> {
        let data = hex::decode(text.trim()).map_err(|_| FramingError::Hex)?;
        Self::from_bytes(&data)
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl FromStr for Payload {
    type Err = FramingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_base64(s)
    }
}

/// Pack the three fields into the transport text form.
///
/// Hex-encoding each field, concatenating, hex-decoding and then
/// base64-encoding gives exactly the base64 of the plain concatenation.
pub fn pack(nonce: &Nonce, ciphertext: &[u8], tag: &AuthTag) -> String {
    Payload::new(*nonce, Bytes::copy_from_slice(ciphertext), *tag).to_base64()
}

/// Recover the three fields from the transport text form
pub fn unpack(text: &str) -> FramingResult<Payload> {
    Payload::from_base64(text)
}
