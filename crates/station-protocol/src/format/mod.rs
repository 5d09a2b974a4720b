//! Per-version packet formats.
//!
//! Each firmware generation frames commands differently. A [`PacketFormat`]
//! owns one framing; [`ProtocolVersion::format`] picks the right one:
//!
//! | Version                     | Format              |
//! |-----------------------------|---------------------|
//! | Unspecified, Legacy, V1, V2 | [`FlatFormat`]      |
//! | V3                          | [`ControlStateV3`]  |
//! | V5, V5Extended              | [`ControlStateV5`]  |
//!
//! Commands a format cannot express fail with
//! [`ProtocolError::UnsupportedOperation`]; nothing is silently downgraded.

mod envelope;
mod flat;

pub use envelope::{ControlStateV3, ControlStateV5};
pub use flat::FlatFormat;

use std::fmt;

use bytes::BufMut;
use station_packet::ByteReader;

use crate::commands::Command;
use crate::constants::MAX_PAYLOAD_SIZE;
use crate::error::ProtocolError;
use crate::packet::WirePacket;
use crate::result::CommandResult;
use crate::setting::{Setting, SettingValue};
use crate::version::ProtocolVersion;

/// One wire framing for commands and results.
pub trait PacketFormat: fmt::Debug + Send + Sync {
    /// Version this instance encodes for.
    fn version(&self) -> ProtocolVersion;

    /// Encode a command.
    fn encode(&self, command: &Command) -> Result<WirePacket, ProtocolError>;

    /// Decode a command packet. Inverse of [`PacketFormat::encode`].
    fn decode(&self, packet: &WirePacket) -> Result<Command, ProtocolError>;

    /// Decode a result packet.
    fn decode_result(&self, bytes: &[u8]) -> Result<CommandResult, ProtocolError>;

    /// Type a result answering `command` carries.
    fn result_type(&self, command: &Command) -> Result<u16, ProtocolError>;
}

/// Encode `command` for `version`.
pub fn encode_command(command: &Command, version: ProtocolVersion) -> Result<WirePacket, ProtocolError> {
    let packet = version.format().encode(command)?;
    log::trace!(
        "encoded {} for {} on {}: {}",
        command.name(),
        version,
        packet.channel,
        packet.to_hex()
    );
    Ok(packet)
}

/// Decode a command packet framed for `version`.
pub fn decode_command(packet: &WirePacket, version: ProtocolVersion) -> Result<Command, ProtocolError> {
    version.format().decode(packet)
}

fn unsupported(command: &Command, version: ProtocolVersion) -> ProtocolError {
    ProtocolError::UnsupportedOperation {
        operation: command.name(),
        version,
    }
}

/// Reject settings the version cannot address.
fn check_setting(command: &Command, setting: Setting, version: ProtocolVersion) -> Result<(), ProtocolError> {
    if setting.is_supported_by(version) {
        Ok(())
    } else {
        Err(unsupported(command, version))
    }
}

/// Reject writes to read-only settings and values of the wrong kind.
fn check_write(setting: Setting, value: &SettingValue) -> Result<(), ProtocolError> {
    if setting.is_read_only() {
        return Err(ProtocolError::ReadOnlySetting(setting));
    }
    if value.kind() != setting.value_kind() {
        return Err(ProtocolError::InvalidValue {
            setting,
            expected: setting.value_kind(),
            actual: value.kind(),
        });
    }
    Ok(())
}

/// Append a 16-bit length and the payload.
fn put_payload(buf: &mut Vec<u8>, payload: &[u8]) -> Result<(), ProtocolError> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(ProtocolError::FrameTooLong {
            max: MAX_PAYLOAD_SIZE,
            actual: payload.len(),
        });
    }
    buf.put_u16_le(payload.len() as u16);
    buf.put_slice(payload);
    Ok(())
}

fn check_header(bytes: &[u8], header_len: usize) -> Result<(), ProtocolError> {
    if bytes.len() < header_len {
        return Err(ProtocolError::FrameTooShort {
            expected: header_len,
            actual: bytes.len(),
        });
    }
    Ok(())
}

/// Read the 16-bit length field and return exactly that many remaining bytes.
fn read_declared<'a>(reader: &mut ByteReader<'a>) -> Result<&'a [u8], ProtocolError> {
    let declared = usize::from(reader.read_u16()?);
    if declared != reader.remaining() {
        return Err(ProtocolError::LengthMismatch {
            expected: declared,
            actual: reader.remaining(),
        });
    }
    Ok(reader.read_rest())
}

fn expect_len(payload: &[u8], len: usize) -> Result<(), ProtocolError> {
    if payload.len() != len {
        return Err(ProtocolError::LengthMismatch {
            expected: len,
            actual: payload.len(),
        });
    }
    Ok(())
}

fn read_u32_payload(payload: &[u8]) -> Result<u32, ProtocolError> {
    expect_len(payload, 4)?;
    Ok(u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]))
}

fn read_u8_payload(payload: &[u8]) -> Result<u8, ProtocolError> {
    expect_len(payload, 1)?;
    Ok(payload[0])
}

fn check_factory_reset_magic(payload: &[u8]) -> Result<(), ProtocolError> {
    if payload != crate::constants::FACTORY_RESET_MAGIC {
        return Err(ProtocolError::InvalidData(format!(
            "bad factory reset magic {}",
            station_packet::bytes_to_hex(payload)
        )));
    }
    Ok(())
}
