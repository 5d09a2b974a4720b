//! Encoded packets and the channel they travel on.

use std::fmt;

use serde::Serialize;

/// Characteristic a packet is written to.
///
/// Envelope versions put everything on [`Channel::Control`]; the flat
/// generations address settings through separate config and state channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Control,
    Config,
    State,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Channel::Control => "control",
            Channel::Config => "config",
            Channel::State => "state",
        };
        f.write_str(name)
    }
}

/// A fully encoded packet ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WirePacket {
    pub channel: Channel,
    #[serde(serialize_with = "serialize_hex")]
    pub bytes: Vec<u8>,
}

impl WirePacket {
    pub fn new(channel: Channel, bytes: Vec<u8>) -> Self {
        WirePacket { channel, bytes }
    }

    pub fn control(bytes: Vec<u8>) -> Self {
        Self::new(Channel::Control, bytes)
    }

    pub fn to_hex(&self) -> String {
        station_packet::bytes_to_hex(&self.bytes)
    }
}

fn serialize_hex<S: serde::Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&station_packet::bytes_to_hex(bytes))
}
