//! Client error types.

use station_packet::PacketError;
use station_protocol::{ProtocolError, ResultCode};
use thiserror::Error;

/// Failures of the underlying link.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The device is not connected.
    #[error("disconnected")]
    Disconnected,

    /// No response within the per-step timeout.
    #[error("timed out waiting for response")]
    Timeout,

    /// Any other link failure.
    #[error("transport I/O error: {0}")]
    Io(String),
}

/// Errors returned by the client, reconciler and scanner.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Packet(#[from] PacketError),

    /// Well-formed result carrying a failure code.
    #[error("{command} rejected by station: {code}")]
    Rejected {
        /// Command name.
        command: &'static str,
        /// Code the station returned.
        code: ResultCode,
    },

    /// A reconciliation pass was abandoned.
    #[error("operation cancelled")]
    Cancelled,

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Whether the failure came from the link rather than the station or codec.
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }
}
