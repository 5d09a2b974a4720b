//! Protocol error types.

use station_packet::PacketError;
use thiserror::Error;

use crate::setting::{Setting, ValueKind};
use crate::version::ProtocolVersion;

/// Errors that can occur when encoding commands or decoding results.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Packet is too short to hold its header.
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Header size.
        expected: usize,
        /// Bytes received.
        actual: usize,
    },

    /// Payload does not fit the 16-bit length field.
    #[error("frame too long: maximum {max} bytes, got {actual}")]
    FrameTooLong {
        /// Maximum payload size.
        max: usize,
        /// Payload size supplied.
        actual: usize,
    },

    /// Declared length disagrees with the bytes present.
    #[error("length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch {
        /// Length the header or value kind requires.
        expected: usize,
        /// Bytes actually present.
        actual: usize,
    },

    /// The negotiated version has no encoding for this command.
    #[error("{operation} is not supported by protocol version {version}")]
    UnsupportedOperation {
        /// Command name.
        operation: &'static str,
        /// Version the command was encoded for.
        version: ProtocolVersion,
    },

    /// Result code outside the known set.
    #[error("unrecognized result code: {0}")]
    UnrecognizedResult(u16),

    /// Result or state header for a different command or state than requested.
    #[error("unexpected type: expected {expected}, got {actual}")]
    UnexpectedType {
        /// Type that was requested.
        expected: u16,
        /// Type the packet carried.
        actual: u16,
    },

    /// Command or state type that no version defines.
    #[error("unknown type: {0}")]
    UnknownType(u16),

    /// Leading protocol byte of an envelope packet does not match the session.
    #[error("protocol mismatch: expected {expected}, got {actual}")]
    ProtocolMismatch {
        /// Session protocol byte.
        expected: u8,
        /// Byte found in the packet.
        actual: u8,
    },

    /// Value of the wrong kind for a setting.
    #[error("invalid value for {setting}: expected {expected}, got {actual}")]
    InvalidValue {
        /// Setting being written.
        setting: Setting,
        /// Kind the setting holds.
        expected: ValueKind,
        /// Kind supplied.
        actual: ValueKind,
    },

    /// Write to a setting the firmware only reports.
    #[error("setting {0} is read-only")]
    ReadOnlySetting(Setting),

    /// Invalid data in a packet.
    #[error("invalid packet data: {0}")]
    InvalidData(String),

    /// A version byte reported by the firmware that maps to no version.
    #[error("unknown protocol version: {0}")]
    UnknownProtocolVersion(u8),

    /// The session already runs a different version.
    #[error("protocol version already negotiated as {current}, refusing {requested}")]
    VersionAlreadyNegotiated {
        /// Version in effect.
        current: ProtocolVersion,
        /// Version that was offered.
        requested: ProtocolVersion,
    },

    /// An operation needed the version before negotiation.
    #[error("protocol version not negotiated")]
    VersionNotNegotiated,

    /// Field-level decoding error.
    #[error(transparent)]
    Packet(#[from] PacketError),
}
