//! Commands that can be sent to a station.

use serde::Serialize;

use crate::error::ProtocolError;
use crate::packet::WirePacket;
use crate::setting::{PersistenceScope, Setting, SettingValue};
use crate::version::ProtocolVersion;

/// Commands that can be sent to a station, independent of wire format.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Set the output level.
    Switch {
        /// Fraction in `[0, 1]`; out-of-range values are clamped.
        level: f32,
    },

    /// Turn on at whatever level the active behaviour dictates.
    TurnOn,

    /// Wipe all configuration.
    FactoryReset,

    /// Reboot.
    Reset,

    /// Ask the station to drop the connection.
    Disconnect,

    /// Keep-alive.
    NoOperation,

    /// Set the station clock.
    SetTime {
        /// Seconds since epoch.
        timestamp: u32,
    },

    /// Clear error bits.
    ResetErrors {
        /// Bits to clear.
        mask: u32,
    },

    /// Remove a legacy schedule entry.
    RemoveScheduleEntry {
        /// Entry index.
        index: u8,
    },

    /// Upload a new behaviour.
    AddBehaviour {
        /// Serialized behaviour.
        #[serde(serialize_with = "serialize_hex")]
        payload: Vec<u8>,
    },

    /// Overwrite the behaviour at an index.
    ReplaceBehaviour {
        /// Remote index.
        index: u8,
        /// Serialized behaviour.
        #[serde(serialize_with = "serialize_hex")]
        payload: Vec<u8>,
    },

    /// Delete the behaviour at an index.
    RemoveBehaviour {
        /// Remote index.
        index: u8,
    },

    /// Fetch the behaviour at an index.
    GetBehaviour {
        /// Remote index.
        index: u8,
    },

    /// Fetch the list of `(index, hash)` pairs.
    GetBehaviourIndices,

    /// Read a named setting.
    ReadSetting {
        setting: Setting,
        scope: PersistenceScope,
        /// Instance id for settings that have several.
        id: u16,
    },

    /// Write a named setting.
    WriteSetting {
        setting: Setting,
        value: SettingValue,
        scope: PersistenceScope,
        id: u16,
    },
}

impl Command {
    /// Read a setting's current value, instance 0.
    pub fn read(setting: Setting) -> Self {
        Command::ReadSetting {
            setting,
            scope: PersistenceScope::Current,
            id: 0,
        }
    }

    /// Write a setting persistently, instance 0.
    pub fn write(setting: Setting, value: SettingValue) -> Self {
        Command::WriteSetting {
            setting,
            value,
            scope: PersistenceScope::Stored,
            id: 0,
        }
    }

    /// Name used in errors, logs and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Switch { .. } => "switch",
            Command::TurnOn => "turn_on",
            Command::FactoryReset => "factory_reset",
            Command::Reset => "reset",
            Command::Disconnect => "disconnect",
            Command::NoOperation => "no_operation",
            Command::SetTime { .. } => "set_time",
            Command::ResetErrors { .. } => "reset_errors",
            Command::RemoveScheduleEntry { .. } => "remove_schedule_entry",
            Command::AddBehaviour { .. } => "add_behaviour",
            Command::ReplaceBehaviour { .. } => "replace_behaviour",
            Command::RemoveBehaviour { .. } => "remove_behaviour",
            Command::GetBehaviour { .. } => "get_behaviour",
            Command::GetBehaviourIndices => "get_behaviour_indices",
            Command::ReadSetting { .. } => "read_setting",
            Command::WriteSetting { .. } => "write_setting",
        }
    }

    /// Encode for `version`.
    pub fn encode(&self, version: ProtocolVersion) -> Result<WirePacket, ProtocolError> {
        version.format().encode(self)
    }

    /// Type a result packet answering this command must carry under `version`.
    pub fn expected_result_type(&self, version: ProtocolVersion) -> Result<u16, ProtocolError> {
        version.format().result_type(self)
    }
}

/// Clamp a level to `[0, 1]`, scale to percent and truncate.
pub fn switch_value(level: f32) -> u8 {
    // NaN clamps to NaN and casts to 0.
    (level.clamp(0.0, 1.0) * 100.0) as u8
}

/// Level for a decoded switch byte; `switch_value` maps it back to `value`.
pub fn switch_level(value: u8) -> f32 {
    let level = f32::from(value) / 100.0;
    if switch_value(level) < value.min(100) {
        // 0.53 and 0.59 scale to just under their percent in f32.
        level + f32::EPSILON
    } else {
        level
    }
}

fn serialize_hex<S: serde::Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&station_packet::bytes_to_hex(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_switch_value_clamps_and_truncates() {
        assert_eq!(switch_value(0.0), 0);
        assert_eq!(switch_value(0.555), 55);
        assert_eq!(switch_value(1.0), 100);
        assert_eq!(switch_value(1.7), 100);
        assert_eq!(switch_value(-0.2), 0);
        assert_eq!(switch_value(f32::NAN), 0);
    }

    #[test]
    fn test_switch_level_maps_back_to_byte() {
        for value in 0..=100u8 {
            assert_eq!(switch_value(switch_level(value)), value, "byte {}", value);
        }
        assert_eq!(switch_level(50), 0.5);
        assert_eq!(switch_level(25), 0.25);
        assert_eq!(switch_value(switch_level(200)), 100);
    }

    #[test]
    fn test_setting_helpers() {
        assert_eq!(
            Command::read(Setting::Time),
            Command::ReadSetting {
                setting: Setting::Time,
                scope: PersistenceScope::Current,
                id: 0
            }
        );
        assert_eq!(Command::write(Setting::Time, SettingValue::U32(1)).name(), "write_setting");
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(Command::AddBehaviour {
            payload: vec![0xab, 0x01],
        })
        .unwrap();
        assert_eq!(json["command"], "add_behaviour");
        assert_eq!(json["payload"], "ab01");
    }
}
