//! Error types for station-packet.

use thiserror::Error;

/// Errors that can occur while encoding, decoding or deciphering station data.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PacketError {
    /// Malformed textual or hex input.
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    /// A cursor read would run past the end of the payload.
    #[error("payload too short: needed {needed} bytes, {remaining} remaining")]
    PayloadTooShort {
        /// Bytes the read required.
        needed: usize,
        /// Bytes left in the payload at the time of the read.
        remaining: usize,
    },

    /// A field held a value outside its defined set.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// Cipher key of the wrong size.
    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength {
        /// Required key length.
        expected: usize,
        /// Length supplied.
        actual: usize,
    },
}

impl PacketError {
    /// Create an invalid encoding error.
    pub fn invalid_encoding(message: impl Into<String>) -> Self {
        PacketError::InvalidEncoding(message.into())
    }

    /// Create an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        PacketError::InvalidFormat(message.into())
    }
}

impl From<hex::FromHexError> for PacketError {
    fn from(err: hex::FromHexError) -> Self {
        PacketError::InvalidEncoding(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PacketError::PayloadTooShort {
            needed: 4,
            remaining: 1,
        };
        assert!(err.to_string().contains("needed 4"));

        let err = PacketError::invalid_encoding("odd number of digits");
        assert!(err.to_string().contains("odd number of digits"));
    }
}
