//! Flat packets of the pre-envelope generations.
//!
//! ```text
//! control:       type u8 | 0 u8       | length u16 | payload
//! config/state:  id u8   | opcode u8  | length u16 | value
//! result:        type u8 | result u8  | length u16 | payload
//! ```
//!
//! Settings have no scope or instance id on these generations.

use bytes::BufMut;
use station_packet::ByteReader;

use super::{
    check_factory_reset_magic, check_header, check_setting, check_write, expect_len, put_payload,
    read_declared, read_u32_payload, read_u8_payload, unsupported, PacketFormat,
};
use crate::commands::{switch_level, switch_value, Command};
use crate::constants::*;
use crate::error::ProtocolError;
use crate::packet::{Channel, WirePacket};
use crate::result::{CommandResult, ResultCode};
use crate::setting::{FlatIdentity, PersistenceScope, Setting, SettingValue};
use crate::version::ProtocolVersion;

const HEADER_SIZE: usize = 4;

/// Framing for Unspecified, Legacy, V1 and V2 firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatFormat {
    version: ProtocolVersion,
}

impl FlatFormat {
    pub const fn new(version: ProtocolVersion) -> Self {
        FlatFormat { version }
    }

    fn control_type(&self, command: &Command) -> Result<u8, ProtocolError> {
        match command {
            Command::Switch { .. } => Ok(FLAT_SWITCH),
            Command::FactoryReset => Ok(FLAT_FACTORY_RESET),
            Command::Reset => Ok(FLAT_RESET),
            Command::Disconnect => Ok(FLAT_DISCONNECT),
            Command::SetTime { .. } => Ok(FLAT_SET_TIME),
            Command::ResetErrors { .. } => Ok(FLAT_RESET_ERRORS),
            Command::RemoveScheduleEntry { .. } => Ok(FLAT_SCHEDULE_REMOVE),
            _ => Err(unsupported(command, self.version)),
        }
    }

    fn identity(&self, command: &Command, setting: Setting) -> Result<FlatIdentity, ProtocolError> {
        check_setting(command, setting, self.version)?;
        setting
            .flat_identity()
            .ok_or_else(|| unsupported(command, self.version))
    }

    fn control_payload(command: &Command) -> Vec<u8> {
        match command {
            Command::Switch { level } => vec![switch_value(*level)],
            Command::FactoryReset => FACTORY_RESET_MAGIC.to_vec(),
            Command::SetTime { timestamp } => timestamp.to_le_bytes().to_vec(),
            Command::ResetErrors { mask } => mask.to_le_bytes().to_vec(),
            Command::RemoveScheduleEntry { index } => vec![*index],
            _ => Vec::new(),
        }
    }

    fn decode_control(&self, kind: u8, payload: &[u8]) -> Result<Command, ProtocolError> {
        let command = match kind {
            FLAT_SWITCH => Command::Switch {
                level: switch_level(read_u8_payload(payload)?),
            },
            FLAT_FACTORY_RESET => {
                check_factory_reset_magic(payload)?;
                Command::FactoryReset
            }
            FLAT_RESET => {
                expect_len(payload, 0)?;
                Command::Reset
            }
            FLAT_DISCONNECT => {
                expect_len(payload, 0)?;
                Command::Disconnect
            }
            FLAT_SET_TIME => Command::SetTime {
                timestamp: read_u32_payload(payload)?,
            },
            FLAT_RESET_ERRORS => Command::ResetErrors {
                mask: read_u32_payload(payload)?,
            },
            FLAT_SCHEDULE_REMOVE => Command::RemoveScheduleEntry {
                index: read_u8_payload(payload)?,
            },
            other => return Err(ProtocolError::UnknownType(u16::from(other))),
        };
        Ok(command)
    }

    fn decode_setting(
        &self,
        channel: Channel,
        id: u8,
        opcode: u8,
        value: &[u8],
    ) -> Result<Command, ProtocolError> {
        let setting =
            Setting::from_flat(channel, id).ok_or(ProtocolError::UnknownType(u16::from(id)))?;
        match opcode {
            OPCODE_READ => {
                expect_len(value, 0)?;
                Ok(Command::read(setting))
            }
            OPCODE_WRITE => Ok(Command::WriteSetting {
                setting,
                value: SettingValue::decode(setting.value_kind(), value)?,
                scope: PersistenceScope::Stored,
                id: 0,
            }),
            other => Err(ProtocolError::InvalidData(format!(
                "unknown {} opcode {}",
                channel, other
            ))),
        }
    }
}

impl PacketFormat for FlatFormat {
    fn version(&self) -> ProtocolVersion {
        self.version
    }

    fn encode(&self, command: &Command) -> Result<WirePacket, ProtocolError> {
        let mut buf = Vec::with_capacity(HEADER_SIZE + 4);
        match command {
            Command::ReadSetting { setting, .. } => {
                let identity = self.identity(command, *setting)?;
                buf.put_u8(identity.id);
                buf.put_u8(OPCODE_READ);
                put_payload(&mut buf, &[])?;
                Ok(WirePacket::new(identity.channel, buf))
            }
            Command::WriteSetting { setting, value, .. } => {
                let identity = self.identity(command, *setting)?;
                check_write(*setting, value)?;
                buf.put_u8(identity.id);
                buf.put_u8(OPCODE_WRITE);
                put_payload(&mut buf, &value.to_bytes())?;
                Ok(WirePacket::new(identity.channel, buf))
            }
            _ => {
                buf.put_u8(self.control_type(command)?);
                buf.put_u8(0);
                put_payload(&mut buf, &Self::control_payload(command))?;
                Ok(WirePacket::control(buf))
            }
        }
    }

    fn decode(&self, packet: &WirePacket) -> Result<Command, ProtocolError> {
        check_header(&packet.bytes, HEADER_SIZE)?;
        let mut reader = ByteReader::new(&packet.bytes);
        let first = reader.read_u8()?;
        let second = reader.read_u8()?;
        let payload = read_declared(&mut reader)?;

        match packet.channel {
            Channel::Control => self.decode_control(first, payload),
            channel => self.decode_setting(channel, first, second, payload),
        }
    }

    fn decode_result(&self, bytes: &[u8]) -> Result<CommandResult, ProtocolError> {
        check_header(bytes, HEADER_SIZE)?;
        let mut reader = ByteReader::new(bytes);
        let command = u16::from(reader.read_u8()?);
        let code = ResultCode::from_u16(u16::from(reader.read_u8()?))?;
        let payload = read_declared(&mut reader)?.to_vec();
        Ok(CommandResult {
            command,
            code,
            payload,
        })
    }

    fn result_type(&self, command: &Command) -> Result<u16, ProtocolError> {
        match command {
            Command::ReadSetting { setting, .. } | Command::WriteSetting { setting, .. } => {
                Ok(u16::from(self.identity(command, *setting)?.id))
            }
            _ => Ok(u16::from(self.control_type(command)?)),
        }
    }
}
