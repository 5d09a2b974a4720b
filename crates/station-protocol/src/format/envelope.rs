//! Control-state envelope of V3 and later.
//!
//! ```text
//! V3 command:    type u16 | length u16 | payload
//! V5 command:    protocol u8 | type u16 | length u16 | payload
//! V3 result:     type u16 | result u16 | length u16 | payload
//! V5 result:     protocol u8 | type u16 | result u16 | length u16 | payload
//! state header:  state_type u16 | id u16 | scope u8 | reserved u8
//! ```
//!
//! V3 writes carry only the state type before the value; V5 writes carry
//! the full state header. Everything travels on the control channel.

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
use crate::setting::{PersistenceScope, Setting, SettingValue};
use crate::version::ProtocolVersion;

/// Framing for V3 firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlStateV3;

/// Framing for V5 and V5Extended firmware, told apart by the protocol byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlStateV5 {
    protocol: u8,
}

impl ControlStateV5 {
    pub const fn new(protocol: u8) -> Self {
        ControlStateV5 { protocol }
    }

    pub fn protocol(&self) -> u8 {
        self.protocol
    }

    fn envelope(&self) -> Envelope {
        Envelope {
            version: self.version(),
            protocol: Some(self.protocol),
        }
    }
}

impl ControlStateV3 {
    fn envelope(&self) -> Envelope {
        Envelope {
            version: ProtocolVersion::V3,
            protocol: None,
        }
    }
}

impl PacketFormat for ControlStateV3 {
    fn version(&self) -> ProtocolVersion {
        ProtocolVersion::V3
    }

    fn encode(&self, command: &Command) -> Result<WirePacket, ProtocolError> {
        self.envelope().encode(command)
    }

    fn decode(&self, packet: &WirePacket) -> Result<Command, ProtocolError> {
        self.envelope().decode(packet)
    }

    fn decode_result(&self, bytes: &[u8]) -> Result<CommandResult, ProtocolError> {
        self.envelope().decode_result(bytes)
    }

    fn result_type(&self, command: &Command) -> Result<u16, ProtocolError> {
        self.envelope().control_type(command)
    }
}

impl PacketFormat for ControlStateV5 {
    fn version(&self) -> ProtocolVersion {
        if self.protocol == PROTOCOL_V5_EXTENDED {
            ProtocolVersion::V5Extended
        } else {
            ProtocolVersion::V5
        }
    }

    fn encode(&self, command: &Command) -> Result<WirePacket, ProtocolError> {
        self.envelope().encode(command)
    }

    fn decode(&self, packet: &WirePacket) -> Result<Command, ProtocolError> {
        self.envelope().decode(packet)
    }

    fn decode_result(&self, bytes: &[u8]) -> Result<CommandResult, ProtocolError> {
        self.envelope().decode_result(bytes)
    }

    fn result_type(&self, command: &Command) -> Result<u16, ProtocolError> {
        self.envelope().control_type(command)
    }
}

/// Shared envelope logic, parameterized by the optional protocol byte.
#[derive(Debug, Clone, Copy)]
struct Envelope {
    version: ProtocolVersion,
    protocol: Option<u8>,
}

impl Envelope {
    fn prefix_len(&self) -> usize {
        usize::from(self.protocol.is_some())
    }

    /// Full state header on writes.
    fn writes_state_header(&self) -> bool {
        self.protocol.is_some()
    }

    fn control_type(&self, command: &Command) -> Result<u16, ProtocolError> {
        let kind = match command {
            Command::Switch { .. } | Command::TurnOn => CTRL_SWITCH,
            Command::FactoryReset => CTRL_FACTORY_RESET,
            Command::Reset => CTRL_RESET,
            Command::Disconnect => CTRL_DISCONNECT,
            Command::NoOperation => CTRL_NO_OPERATION,
            Command::SetTime { .. } => CTRL_SET_TIME,
            Command::ResetErrors { .. } => CTRL_RESET_ERRORS,
            Command::RemoveScheduleEntry { .. } => {
                // Schedules were replaced by behaviours in V5.
                if self.protocol.is_some() {
                    return Err(unsupported(command, self.version));
                }
                CTRL_SCHEDULE_REMOVE
            }
            Command::AddBehaviour { .. } => CTRL_ADD_BEHAVIOUR,
            Command::ReplaceBehaviour { .. } => CTRL_REPLACE_BEHAVIOUR,
            Command::RemoveBehaviour { .. } => CTRL_REMOVE_BEHAVIOUR,
            Command::GetBehaviour { .. } => CTRL_GET_BEHAVIOUR,
            Command::GetBehaviourIndices => CTRL_GET_BEHAVIOUR_INDICES,
            Command::ReadSetting { setting, .. } => {
                check_setting(command, *setting, self.version)?;
                CTRL_GET_STATE
            }
            Command::WriteSetting { setting, .. } => {
                check_setting(command, *setting, self.version)?;
                CTRL_SET_STATE
            }
        };
        Ok(kind)
    }

    fn payload(&self, command: &Command) -> Result<Vec<u8>, ProtocolError> {
        let mut buf = Vec::new();
        match command {
            Command::Switch { level } => buf.put_u8(switch_value(*level)),
            Command::TurnOn => buf.put_u8(SWITCH_ON_BY_BEHAVIOUR),
            Command::FactoryReset => buf.put_slice(&FACTORY_RESET_MAGIC),
            Command::Reset
            | Command::Disconnect
            | Command::NoOperation
            | Command::GetBehaviourIndices => {}
            Command::SetTime { timestamp } => buf.put_u32_le(*timestamp),
            Command::ResetErrors { mask } => buf.put_u32_le(*mask),
            Command::RemoveScheduleEntry { index }
            | Command::RemoveBehaviour { index }
            | Command::GetBehaviour { index } => buf.put_u8(*index),
            Command::AddBehaviour { payload } => buf.put_slice(payload),
            Command::ReplaceBehaviour { index, payload } => {
                buf.put_u8(*index);
                buf.put_slice(payload);
            }
            Command::ReadSetting { setting, scope, id } => {
                put_state_header(&mut buf, *setting, *id, *scope);
            }
            Command::WriteSetting {
                setting,
                value,
                scope,
                id,
            } => {
                check_write(*setting, value)?;
                if self.writes_state_header() {
                    put_state_header(&mut buf, *setting, *id, *scope);
                } else {
                    buf.put_u16_le(setting.state_type());
                }
                value.put(&mut buf);
            }
        }
        Ok(buf)
    }

    fn encode(&self, command: &Command) -> Result<WirePacket, ProtocolError> {
        let kind = self.control_type(command)?;
        let payload = self.payload(command)?;

        let mut buf = Vec::with_capacity(self.prefix_len() + 4 + payload.len());
        if let Some(protocol) = self.protocol {
            buf.put_u8(protocol);
        }
        buf.put_u16_le(kind);
        put_payload(&mut buf, &payload)?;
        Ok(WirePacket::control(buf))
    }

    fn check_protocol(&self, reader: &mut ByteReader<'_>) -> Result<(), ProtocolError> {
        if let Some(expected) = self.protocol {
            let actual = reader.read_u8()?;
            if actual != expected {
                return Err(ProtocolError::ProtocolMismatch { expected, actual });
            }
        }
        Ok(())
    }

    fn decode(&self, packet: &WirePacket) -> Result<Command, ProtocolError> {
        if packet.channel != Channel::Control {
            return Err(ProtocolError::InvalidData(format!(
                "{} packets travel on the control channel, got {}",
                self.version, packet.channel
            )));
        }
        check_header(&packet.bytes, self.prefix_len() + 4)?;
        let mut reader = ByteReader::new(&packet.bytes);
        self.check_protocol(&mut reader)?;
        let kind = reader.read_u16()?;
        let payload = read_declared(&mut reader)?;

        let command = match kind {
            CTRL_SWITCH => match read_u8_payload(payload)? {
                SWITCH_ON_BY_BEHAVIOUR => Command::TurnOn,
                value => Command::Switch {
                    level: switch_level(value),
                },
            },
            CTRL_FACTORY_RESET => {
                check_factory_reset_magic(payload)?;
                Command::FactoryReset
            }
            CTRL_RESET => empty(payload, Command::Reset)?,
            CTRL_DISCONNECT => empty(payload, Command::Disconnect)?,
            CTRL_NO_OPERATION => empty(payload, Command::NoOperation)?,
            CTRL_GET_BEHAVIOUR_INDICES => empty(payload, Command::GetBehaviourIndices)?,
            CTRL_SET_TIME => Command::SetTime {
                timestamp: read_u32_payload(payload)?,
            },
            CTRL_RESET_ERRORS => Command::ResetErrors {
                mask: read_u32_payload(payload)?,
            },
            CTRL_SCHEDULE_REMOVE if self.protocol.is_none() => Command::RemoveScheduleEntry {
                index: read_u8_payload(payload)?,
            },
            CTRL_ADD_BEHAVIOUR => Command::AddBehaviour {
                payload: payload.to_vec(),
            },
            CTRL_REPLACE_BEHAVIOUR => {
                let mut inner = ByteReader::new(payload);
                Command::ReplaceBehaviour {
                    index: inner.read_u8()?,
                    payload: inner.read_rest().to_vec(),
                }
            }
            CTRL_REMOVE_BEHAVIOUR => Command::RemoveBehaviour {
                index: read_u8_payload(payload)?,
            },
            CTRL_GET_BEHAVIOUR => Command::GetBehaviour {
                index: read_u8_payload(payload)?,
            },
            CTRL_GET_STATE => {
                expect_len(payload, STATE_HEADER_SIZE)?;
                let mut inner = ByteReader::new(payload);
                let (setting, id, scope) = read_state_header(&mut inner)?;
                Command::ReadSetting { setting, scope, id }
            }
            CTRL_SET_STATE => {
                let mut inner = ByteReader::new(payload);
                let (setting, id, scope) = if self.writes_state_header() {
                    read_state_header(&mut inner)?
                } else {
                    (read_setting(&mut inner)?, 0, PersistenceScope::Stored)
                };
                let value = SettingValue::decode(setting.value_kind(), inner.read_rest())?;
                Command::WriteSetting {
                    setting,
                    value,
                    scope,
                    id,
                }
            }
            other => return Err(ProtocolError::UnknownType(other)),
        };
        Ok(command)
    }

    fn decode_result(&self, bytes: &[u8]) -> Result<CommandResult, ProtocolError> {
        check_header(bytes, self.prefix_len() + 6)?;
        let mut reader = ByteReader::new(bytes);
        self.check_protocol(&mut reader)?;
        let command = reader.read_u16()?;
        let code = ResultCode::from_u16(reader.read_u16()?)?;
        let payload = read_declared(&mut reader)?.to_vec();
        Ok(CommandResult {
            command,
            code,
            payload,
        })
    }
}

fn empty(payload: &[u8], command: Command) -> Result<Command, ProtocolError> {
    expect_len(payload, 0)?;
    Ok(command)
}

fn put_state_header(buf: &mut Vec<u8>, setting: Setting, id: u16, scope: PersistenceScope) {
    buf.put_u16_le(setting.state_type());
    buf.put_u16_le(id);
    buf.put_u8(scope.as_u8());
    buf.put_u8(0);
}

fn read_setting(reader: &mut ByteReader<'_>) -> Result<Setting, ProtocolError> {
    let state_type = reader.read_u16()?;
    Setting::from_state_type(state_type).ok_or(ProtocolError::UnknownType(state_type))
}

fn read_state_header(
    reader: &mut ByteReader<'_>,
) -> Result<(Setting, u16, PersistenceScope), ProtocolError> {
    let setting = read_setting(reader)?;
    let id = reader.read_u16()?;
    let scope = PersistenceScope::from_u8(reader.read_u8()?)?;
    let _reserved = reader.read_u8()?;
    Ok((setting, id, scope))
}
