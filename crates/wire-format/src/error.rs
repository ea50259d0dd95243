//! Error types for payload framing

use thiserror::Error;

/// Framing error
///
/// Errors name the failing layer only. Decoder errors are dropped rather than
/// chained, so neither `Display` nor `source()` exposes the offending byte.
#[derive(Debug, Error)]
pub enum FramingError {
    #[error("Payload too short: {len} bytes (min: {min})")]
    TooShort { len: usize, min: usize },

    #[error("Invalid field length: expected {expected}, got {actual}")]
    InvalidFieldLength { expected: usize, actual: usize },

    #[error("Invalid base64 encoding")]
    Base64,

    #[error("Invalid hex encoding")]
    Hex,
}

/// Result type alias for framing operations
pub type FramingResult<T> = Result<T, FramingError>;
