//! Protocol versions and per-session negotiation.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::constants::{PROTOCOL_V5, PROTOCOL_V5_EXTENDED};
use crate::error::ProtocolError;
use crate::format::{ControlStateV3, ControlStateV5, FlatFormat, PacketFormat};

/// Firmware protocol generation.
///
/// Variants are ordered oldest to newest, so `>=` answers "is at least".
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum ProtocolVersion {
    /// Firmware did not report a version; treated like the flat generations.
    #[default]
    Unspecified,
    Legacy,
    V1,
    V2,
    V3,
    V5,
    V5Extended,
}

static FLAT_UNSPECIFIED: FlatFormat = FlatFormat::new(ProtocolVersion::Unspecified);
static FLAT_LEGACY: FlatFormat = FlatFormat::new(ProtocolVersion::Legacy);
static FLAT_V1: FlatFormat = FlatFormat::new(ProtocolVersion::V1);
static FLAT_V2: FlatFormat = FlatFormat::new(ProtocolVersion::V2);
static CONTROL_STATE_V3: ControlStateV3 = ControlStateV3;
static CONTROL_STATE_V5: ControlStateV5 = ControlStateV5::new(PROTOCOL_V5);
static CONTROL_STATE_V5_EXTENDED: ControlStateV5 = ControlStateV5::new(PROTOCOL_V5_EXTENDED);

impl ProtocolVersion {
    pub const ALL: [ProtocolVersion; 7] = [
        ProtocolVersion::Unspecified,
        ProtocolVersion::Legacy,
        ProtocolVersion::V1,
        ProtocolVersion::V2,
        ProtocolVersion::V3,
        ProtocolVersion::V5,
        ProtocolVersion::V5Extended,
    ];

    /// Map the version byte the firmware reports.
    pub fn from_reported(byte: u8) -> Result<Self, ProtocolError> {
        match byte {
            0 => Ok(ProtocolVersion::Legacy),
            1 => Ok(ProtocolVersion::V1),
            2 => Ok(ProtocolVersion::V2),
            3 => Ok(ProtocolVersion::V3),
            PROTOCOL_V5 => Ok(ProtocolVersion::V5),
            PROTOCOL_V5_EXTENDED => Ok(ProtocolVersion::V5Extended),
            other => Err(ProtocolError::UnknownProtocolVersion(other)),
        }
    }

    /// Packet format used by this version.
    pub fn format(self) -> &'static dyn PacketFormat {
        match self {
            ProtocolVersion::Unspecified => &FLAT_UNSPECIFIED,
            ProtocolVersion::Legacy => &FLAT_LEGACY,
            ProtocolVersion::V1 => &FLAT_V1,
            ProtocolVersion::V2 => &FLAT_V2,
            ProtocolVersion::V3 => &CONTROL_STATE_V3,
            ProtocolVersion::V5 => &CONTROL_STATE_V5,
            ProtocolVersion::V5Extended => &CONTROL_STATE_V5_EXTENDED,
        }
    }

    /// Whether this version uses the control-state envelope.
    pub fn is_envelope(self) -> bool {
        self >= ProtocolVersion::V3
    }

    /// Leading protocol byte of envelope packets, for versions that have one.
    pub fn protocol_byte(self) -> Option<u8> {
        match self {
            ProtocolVersion::V5 => Some(PROTOCOL_V5),
            ProtocolVersion::V5Extended => Some(PROTOCOL_V5_EXTENDED),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProtocolVersion::Unspecified => "unspecified",
            ProtocolVersion::Legacy => "legacy",
            ProtocolVersion::V1 => "v1",
            ProtocolVersion::V2 => "v2",
            ProtocolVersion::V3 => "v3",
            ProtocolVersion::V5 => "v5",
            ProtocolVersion::V5Extended => "v5-extended",
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProtocolVersion {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        ProtocolVersion::ALL
            .into_iter()
            .find(|v| v.as_str() == lowered)
            .ok_or_else(|| ProtocolError::InvalidData(format!("unknown protocol version '{}'", s)))
    }
}

/// Per-connection session state.
///
/// The version is fixed by the first successful negotiation and shared
/// read-only afterwards. Wrap in an `Arc` to share between a client and
/// anything else speaking to the same device.
#[derive(Debug, Default)]
pub struct Session {
    version: OnceLock<ProtocolVersion>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// A session that starts out negotiated.
    pub fn with_version(version: ProtocolVersion) -> Self {
        let session = Session::new();
        let _ = session.version.set(version);
        session
    }

    /// Fix the session's version.
    ///
    /// Repeating the negotiated version is a no-op; offering a different
    /// one fails without changing the session.
    pub fn negotiate(&self, version: ProtocolVersion) -> Result<(), ProtocolError> {
        let current = *self.version.get_or_init(|| {
            log::debug!("negotiated protocol version {}", version);
            version
        });
        if current == version {
            Ok(())
        } else {
            Err(ProtocolError::VersionAlreadyNegotiated {
                current,
                requested: version,
            })
        }
    }

    /// Negotiate from the version byte the firmware reported.
    pub fn negotiate_reported(&self, byte: u8) -> Result<ProtocolVersion, ProtocolError> {
        let version = ProtocolVersion::from_reported(byte)?;
        self.negotiate(version)?;
        Ok(version)
    }

    pub fn version(&self) -> Result<ProtocolVersion, ProtocolError> {
        self.version
            .get()
            .copied()
            .ok_or(ProtocolError::VersionNotNegotiated)
    }

    pub fn is_negotiated(&self) -> bool {
        self.version.get().is_some()
    }
}
