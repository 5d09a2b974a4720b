//! Link abstraction consumed by the client.
//!
//! A transport owns the actual wireless connection. It only moves bytes:
//! framing, versioning and result checking happen above it.

use async_trait::async_trait;
use station_protocol::WirePacket;

use crate::error::TransportError;

/// A connected station link.
///
/// Callers never have more than one `request` outstanding per transport;
/// [`StationClient`](crate::StationClient) serialises access.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Write a packet without waiting for a result.
    async fn write(&self, packet: &WirePacket) -> Result<(), TransportError>;

    /// Write a packet and wait for the station's result packet.
    async fn request(&self, packet: &WirePacket) -> Result<Vec<u8>, TransportError>;
}
