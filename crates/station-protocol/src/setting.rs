//! Named settings and their typed values.

use std::fmt;

use bytes::BufMut;
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::packet::Channel;
use crate::version::ProtocolVersion;

/// A configuration or state value a station exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Setting {
    SwitchcraftEnabled,
    TapToToggleEnabled,
    TapToToggleRssiOffset,
    DimmingAllowed,
    SwitchLocked,
    SwitchState,
    ErrorBitmask,
    Time,
    BehaviourMasterHash,
    SoftOnSpeed,
    DefaultDimValue,
}

/// Where a setting lives on the flat generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatIdentity {
    pub channel: Channel,
    pub id: u8,
}

impl FlatIdentity {
    const fn config(id: u8) -> Self {
        FlatIdentity {
            channel: Channel::Config,
            id,
        }
    }

    const fn state(id: u8) -> Self {
        FlatIdentity {
            channel: Channel::State,
            id,
        }
    }
}

impl Setting {
    pub const ALL: [Setting; 11] = [
        Setting::SwitchcraftEnabled,
        Setting::TapToToggleEnabled,
        Setting::TapToToggleRssiOffset,
        Setting::DimmingAllowed,
        Setting::SwitchLocked,
        Setting::SwitchState,
        Setting::ErrorBitmask,
        Setting::Time,
        Setting::BehaviourMasterHash,
        Setting::SoftOnSpeed,
        Setting::DefaultDimValue,
    ];

    /// State type used by the envelope generations.
    pub fn state_type(self) -> u16 {
        match self {
            Setting::SwitchcraftEnabled => 43,
            Setting::TapToToggleEnabled => 51,
            Setting::TapToToggleRssiOffset => 52,
            Setting::DimmingAllowed => 40,
            Setting::SwitchLocked => 41,
            Setting::SwitchState => 134,
            Setting::ErrorBitmask => 139,
            Setting::Time => 135,
            Setting::BehaviourMasterHash => 137,
            Setting::SoftOnSpeed => 83,
            Setting::DefaultDimValue => 160,
        }
    }

    /// Config or state packet id on the flat generations, if the setting exists there.
    pub fn flat_identity(self) -> Option<FlatIdentity> {
        match self {
            Setting::SwitchcraftEnabled => Some(FlatIdentity::config(61)),
            Setting::TapToToggleEnabled => Some(FlatIdentity::config(52)),
            Setting::TapToToggleRssiOffset => Some(FlatIdentity::config(53)),
            Setting::DimmingAllowed => Some(FlatIdentity::config(54)),
            Setting::SwitchLocked => Some(FlatIdentity::config(55)),
            Setting::SwitchState => Some(FlatIdentity::state(144)),
            Setting::ErrorBitmask => Some(FlatIdentity::state(139)),
            Setting::Time => Some(FlatIdentity::state(135)),
            Setting::BehaviourMasterHash | Setting::SoftOnSpeed | Setting::DefaultDimValue => None,
        }
    }

    pub fn value_kind(self) -> ValueKind {
        match self {
            Setting::SwitchcraftEnabled
            | Setting::TapToToggleEnabled
            | Setting::DimmingAllowed
            | Setting::SwitchLocked => ValueKind::Bool,
            Setting::TapToToggleRssiOffset => ValueKind::I8,
            Setting::SwitchState | Setting::SoftOnSpeed | Setting::DefaultDimValue => ValueKind::U8,
            Setting::ErrorBitmask | Setting::Time | Setting::BehaviourMasterHash => ValueKind::U32,
        }
    }

    /// Oldest version that knows the setting. `None` means every version.
    pub fn min_version(self) -> Option<ProtocolVersion> {
        match self {
            Setting::BehaviourMasterHash | Setting::SoftOnSpeed => Some(ProtocolVersion::V5),
            Setting::DefaultDimValue => Some(ProtocolVersion::V5Extended),
            _ => None,
        }
    }

    /// Reported by the firmware only.
    pub fn is_read_only(self) -> bool {
        matches!(
            self,
            Setting::SwitchState | Setting::ErrorBitmask | Setting::BehaviourMasterHash
        )
    }

    /// Whether `version` can address this setting at all.
    pub fn is_supported_by(self, version: ProtocolVersion) -> bool {
        if let Some(min) = self.min_version() {
            if version < min {
                return false;
            }
        }
        version.is_envelope() || self.flat_identity().is_some()
    }

    pub fn from_state_type(state_type: u16) -> Option<Setting> {
        Setting::ALL.into_iter().find(|s| s.state_type() == state_type)
    }

    pub fn from_flat(channel: Channel, id: u8) -> Option<Setting> {
        Setting::ALL
            .into_iter()
            .find(|s| s.flat_identity() == Some(FlatIdentity { channel, id }))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Setting::SwitchcraftEnabled => "switchcraft_enabled",
            Setting::TapToToggleEnabled => "tap_to_toggle_enabled",
            Setting::TapToToggleRssiOffset => "tap_to_toggle_rssi_offset",
            Setting::DimmingAllowed => "dimming_allowed",
            Setting::SwitchLocked => "switch_locked",
            Setting::SwitchState => "switch_state",
            Setting::ErrorBitmask => "error_bitmask",
            Setting::Time => "time",
            Setting::BehaviourMasterHash => "behaviour_master_hash",
            Setting::SoftOnSpeed => "soft_on_speed",
            Setting::DefaultDimValue => "default_dim_value",
        }
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Setting {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_").to_ascii_lowercase();
        Setting::ALL
            .into_iter()
            .find(|setting| setting.as_str() == wanted)
            .ok_or_else(|| ProtocolError::InvalidData(format!("unknown setting '{}'", s)))
    }
}

/// Shape of a setting value on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Bool,
    U8,
    I8,
    U32,
}

impl ValueKind {
    /// Exact encoded width.
    pub fn width(self) -> usize {
        match self {
            ValueKind::Bool | ValueKind::U8 | ValueKind::I8 => 1,
            ValueKind::U32 => 4,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Bool => "bool",
            ValueKind::U8 => "u8",
            ValueKind::I8 => "i8",
            ValueKind::U32 => "u32",
        };
        f.write_str(name)
    }
}

/// A typed setting value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SettingValue {
    Bool(bool),
    U8(u8),
    I8(i8),
    U32(u32),
}

impl SettingValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            SettingValue::Bool(_) => ValueKind::Bool,
            SettingValue::U8(_) => ValueKind::U8,
            SettingValue::I8(_) => ValueKind::I8,
            SettingValue::U32(_) => ValueKind::U32,
        }
    }

    /// Append the little-endian encoding to `buf`. Booleans are 0 or 1.
    pub fn put(&self, buf: &mut impl BufMut) {
        match self {
            SettingValue::Bool(v) => buf.put_u8(u8::from(*v)),
            SettingValue::U8(v) => buf.put_u8(*v),
            SettingValue::I8(v) => buf.put_i8(*v),
            SettingValue::U32(v) => buf.put_u32_le(*v),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.kind().width());
        self.put(&mut buf);
        buf
    }

    /// Decode a value of `kind` that must occupy exactly `bytes`.
    pub fn decode(kind: ValueKind, bytes: &[u8]) -> Result<Self, ProtocolError> {
        let width = kind.width();
        if bytes.len() != width {
            return Err(ProtocolError::LengthMismatch {
                expected: width,
                actual: bytes.len(),
            });
        }
        let value = match kind {
            ValueKind::Bool => SettingValue::Bool(bytes[0] != 0),
            ValueKind::U8 => SettingValue::U8(bytes[0]),
            ValueKind::I8 => SettingValue::I8(bytes[0] as i8),
            ValueKind::U32 => {
                SettingValue::U32(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            }
        };
        Ok(value)
    }

    /// Parse a textual value as `kind`. Booleans accept `true/false/on/off/1/0`.
    pub fn parse(kind: ValueKind, text: &str) -> Result<Self, ProtocolError> {
        let text = text.trim();
        let invalid = || ProtocolError::InvalidData(format!("'{}' is not a valid {}", text, kind));
        let value = match kind {
            ValueKind::Bool => match text.to_ascii_lowercase().as_str() {
                "true" | "on" | "1" => SettingValue::Bool(true),
                "false" | "off" | "0" => SettingValue::Bool(false),
                _ => return Err(invalid()),
            },
            ValueKind::U8 => SettingValue::U8(text.parse().map_err(|_| invalid())?),
            ValueKind::I8 => SettingValue::I8(text.parse().map_err(|_| invalid())?),
            ValueKind::U32 => SettingValue::U32(text.parse().map_err(|_| invalid())?),
        };
        Ok(value)
    }
}

/// Whether a state write should survive a reboot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistenceScope {
    #[default]
    Current,
    Stored,
}

impl PersistenceScope {
    pub fn as_u8(self) -> u8 {
        match self {
            PersistenceScope::Current => 0,
            PersistenceScope::Stored => 1,
        }
    }

    pub fn from_u8(value: u8) -> Result<Self, ProtocolError> {
        match value {
            0 => Ok(PersistenceScope::Current),
            1 => Ok(PersistenceScope::Stored),
            other => Err(ProtocolError::InvalidData(format!(
                "unknown persistence scope {}",
                other
            ))),
        }
    }
}
