//! Behaviours (switching rules) and their content hash.
//!
//! A [`Behaviour`] is an opaque serialized rule plus the index the station
//! stores it under, if known. Equality across the link is decided by the
//! Fletcher-32 hash of the serialized bytes, never by index.
//!
//! [`BehaviourRule`] is the typed form used when authoring rules locally:
//!
//! ```text
//! kind u8 | intensity u8 | profile u8 | days u8 | from TimeOfDay | until TimeOfDay | [presence]
//! TimeOfDay = kind u8 | offset i32
//! Presence  = kind u8 | location_mask u64 | delay_secs u32      (switch rules only)
//! ```

use serde::{Deserialize, Serialize};
use station_packet::{ByteReader, PacketError};

/// A rule as stored on a station.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Behaviour {
    /// Remote index; `None` until the station has accepted the rule.
    pub index: Option<u8>,
    pub payload: Vec<u8>,
}

impl Behaviour {
    /// A rule that has not been uploaded yet.
    pub fn new(payload: Vec<u8>) -> Self {
        Behaviour {
            index: None,
            payload,
        }
    }

    pub fn with_index(index: u8, payload: Vec<u8>) -> Self {
        Behaviour {
            index: Some(index),
            payload,
        }
    }

    pub fn from_rule(rule: &BehaviourRule) -> Self {
        Self::new(rule.to_bytes())
    }

    /// Content hash the station reports in its index.
    pub fn hash(&self) -> u32 {
        fletcher32(&self.payload)
    }

    pub fn rule(&self) -> Result<BehaviourRule, PacketError> {
        BehaviourRule::from_bytes(&self.payload)
    }
}

/// Fletcher-32 over little-endian 16-bit words.
///
/// An odd trailing byte is padded with zero. Both sums are taken modulo
/// 65535 and the result is `c1 << 16 | c0`.
pub fn fletcher32(data: &[u8]) -> u32 {
    let mut c0: u32 = 0;
    let mut c1: u32 = 0;
    for chunk in data.chunks(2) {
        let word = u16::from_le_bytes([chunk[0], chunk.get(1).copied().unwrap_or(0)]);
        c0 = (c0 + u32::from(word)) % 65535;
        c1 = (c1 + c0) % 65535;
    }
    (c1 << 16) | c0
}

// ============================================================================
// Typed Rules
// ============================================================================

/// What a rule does while active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Switch to the intensity when presence conditions hold.
    Switch,
    /// Cap the intensity regardless of presence.
    Twilight,
}

/// Anchor of a time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeAnchor {
    /// Seconds after midnight.
    Clock,
    /// Seconds relative to sunrise.
    Sunrise,
    /// Seconds relative to sunset.
    Sunset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeOfDay {
    pub anchor: TimeAnchor,
    pub offset_secs: i32,
}

impl TimeOfDay {
    pub fn clock(hours: u8, minutes: u8) -> Self {
        TimeOfDay {
            anchor: TimeAnchor::Clock,
            offset_secs: i32::from(hours) * 3600 + i32::from(minutes) * 60,
        }
    }

    pub fn sunrise(offset_secs: i32) -> Self {
        TimeOfDay {
            anchor: TimeAnchor::Sunrise,
            offset_secs,
        }
    }

    pub fn sunset(offset_secs: i32) -> Self {
        TimeOfDay {
            anchor: TimeAnchor::Sunset,
            offset_secs,
        }
    }

    fn write(&self, out: &mut Vec<u8>) {
        let tag = match self.anchor {
            TimeAnchor::Clock => 0,
            TimeAnchor::Sunrise => 1,
            TimeAnchor::Sunset => 2,
        };
        out.push(tag);
        out.extend_from_slice(&self.offset_secs.to_le_bytes());
    }

    fn read(reader: &mut ByteReader<'_>) -> Result<Self, PacketError> {
        let anchor = match reader.read_u8()? {
            0 => TimeAnchor::Clock,
            1 => TimeAnchor::Sunrise,
            2 => TimeAnchor::Sunset,
            other => {
                return Err(PacketError::invalid_format(format!(
                    "unknown time anchor {}",
                    other
                )))
            }
        };
        Ok(TimeOfDay {
            anchor,
            offset_secs: reader.read_i32()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceKind {
    Ignore,
    SomeoneInSphere,
    NobodyInSphere,
    SomeoneInLocation,
    NobodyInLocation,
}

/// Presence condition of a switch rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presence {
    pub kind: PresenceKind,
    /// Bit per location id; only meaningful for the location kinds.
    pub location_mask: u64,
    /// How long presence must be absent before the condition lapses.
    pub delay_secs: u32,
}

impl Presence {
    pub const IGNORE: Presence = Presence {
        kind: PresenceKind::Ignore,
        location_mask: 0,
        delay_secs: 0,
    };

    pub fn someone_in_sphere(delay_secs: u32) -> Self {
        Presence {
            kind: PresenceKind::SomeoneInSphere,
            location_mask: 0,
            delay_secs,
        }
    }

    pub fn someone_in_locations(locations: &[u8], delay_secs: u32) -> Self {
        let location_mask = locations
            .iter()
            .filter(|&&id| id < 64)
            .fold(0u64, |mask, &id| mask | (1 << id));
        Presence {
            kind: PresenceKind::SomeoneInLocation,
            location_mask,
            delay_secs,
        }
    }

    fn write(&self, out: &mut Vec<u8>) {
        let tag = match self.kind {
            PresenceKind::Ignore => 0,
            PresenceKind::SomeoneInSphere => 1,
            PresenceKind::NobodyInSphere => 2,
            PresenceKind::SomeoneInLocation => 3,
            PresenceKind::NobodyInLocation => 4,
        };
        out.push(tag);
        out.extend_from_slice(&self.location_mask.to_le_bytes());
        out.extend_from_slice(&self.delay_secs.to_le_bytes());
    }

    fn read(reader: &mut ByteReader<'_>) -> Result<Self, PacketError> {
        let kind = match reader.read_u8()? {
            0 => PresenceKind::Ignore,
            1 => PresenceKind::SomeoneInSphere,
            2 => PresenceKind::NobodyInSphere,
            3 => PresenceKind::SomeoneInLocation,
            4 => PresenceKind::NobodyInLocation,
            other => {
                return Err(PacketError::invalid_format(format!(
                    "unknown presence kind {}",
                    other
                )))
            }
        };
        Ok(Presence {
            kind,
            location_mask: reader.read_u64()?,
            delay_secs: reader.read_u32()?,
        })
    }
}

/// Days a rule is active: bit 0 Sunday through bit 6 Saturday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveDays(pub u8);

impl ActiveDays {
    pub const EVERY_DAY: ActiveDays = ActiveDays(0x7F);
    pub const WEEKDAYS: ActiveDays = ActiveDays(0b0011_1110);
    pub const WEEKENDS: ActiveDays = ActiveDays(0b0100_0001);

    /// `day` counts from Sunday = 0.
    pub fn contains(&self, day: u8) -> bool {
        day < 7 && self.0 & (1 << day) != 0
    }
}

/// Typed rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviourRule {
    pub kind: RuleKind,
    /// Percent, 0..=100.
    pub intensity: u8,
    pub profile: u8,
    pub days: ActiveDays,
    pub from: TimeOfDay,
    pub until: TimeOfDay,
    /// Present exactly for [`RuleKind::Switch`].
    pub presence: Option<Presence>,
}

impl BehaviourRule {
    pub fn switch(intensity: u8, from: TimeOfDay, until: TimeOfDay, presence: Presence) -> Self {
        BehaviourRule {
            kind: RuleKind::Switch,
            intensity: intensity.min(100),
            profile: 0,
            days: ActiveDays::EVERY_DAY,
            from,
            until,
            presence: Some(presence),
        }
    }

    pub fn twilight(intensity: u8, from: TimeOfDay, until: TimeOfDay) -> Self {
        BehaviourRule {
            kind: RuleKind::Twilight,
            intensity: intensity.min(100),
            profile: 0,
            days: ActiveDays::EVERY_DAY,
            from,
            until,
            presence: None,
        }
    }

    pub fn on_days(mut self, days: ActiveDays) -> Self {
        self.days = days;
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(27);
        out.push(match self.kind {
            RuleKind::Switch => 0,
            RuleKind::Twilight => 1,
        });
        out.push(self.intensity);
        out.push(self.profile);
        out.push(self.days.0);
        self.from.write(&mut out);
        self.until.write(&mut out);
        if self.kind == RuleKind::Switch {
            self.presence.unwrap_or(Presence::IGNORE).write(&mut out);
        }
        out
    }

    /// Strict parse: every byte must be consumed.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PacketError> {
        let mut reader = ByteReader::new(bytes);
        let kind = match reader.read_u8()? {
            0 => RuleKind::Switch,
            1 => RuleKind::Twilight,
            other => {
                return Err(PacketError::invalid_format(format!(
                    "unknown behaviour kind {}",
                    other
                )))
            }
        };
        let intensity = reader.read_u8()?;
        if intensity > 100 {
            return Err(PacketError::invalid_format(format!(
                "intensity {} out of range",
                intensity
            )));
        }
        let profile = reader.read_u8()?;
        let days = ActiveDays(reader.read_u8()?);
        let from = TimeOfDay::read(&mut reader)?;
        let until = TimeOfDay::read(&mut reader)?;
        let presence = match kind {
            RuleKind::Switch => Some(Presence::read(&mut reader)?),
            RuleKind::Twilight => None,
        };
        if !reader.is_empty() {
            return Err(PacketError::invalid_format(format!(
                "{} trailing bytes after behaviour",
                reader.remaining()
            )));
        }
        Ok(BehaviourRule {
            kind,
            intensity,
            profile,
            days,
            from,
            until,
            presence,
        })
    }
}
