//! Typed service data records and the routines that read them.
//!
//! Every routine reads its fields front to back with a [`ByteReader`]. The
//! caller has already checked the exact payload length, so a cursor overrun
//! here means the layout table and the routine disagree.

use serde::Serialize;

use super::flags::{BackgroundFlags, HubFlags, StationFlags};
use super::DecodeContext;
use crate::timestamp::{reconstruct_timestamp, PartialTime};
use crate::{ByteReader, PacketError};

/// Raw power factor is scaled by 127.
pub fn scale_power_factor(raw: i8) -> f32 {
    f32::from(raw) / 127.0
}

/// Raw power usage is in 1/8 W.
pub fn scale_power_usage(raw: i16) -> f32 {
    f32::from(raw) / 8.0
}

/// Raw energy is in units of 64 J.
pub fn scale_energy_used(raw: i32) -> i64 {
    i64::from(raw) * 64
}

/// Switch state byte: bit 7 is the relay, bits 0..7 the dimmer level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SwitchState(pub u8);

impl SwitchState {
    pub fn relay_on(&self) -> bool {
        self.0 & 0x80 != 0
    }

    /// Dimmer level in percent.
    pub fn dimmer_level(&self) -> u8 {
        self.0 & 0x7F
    }
}

/// Regular state broadcast.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateData {
    pub station_id: u8,
    pub switch_state: SwitchState,
    pub flags: StationFlags,
    pub temperature: i8,
    pub power_factor_raw: i8,
    pub power_usage_raw: i16,
    pub energy_used_raw: i32,
    pub time: PartialTime,
    pub validation: u16,
}

impl StateData {
    pub(crate) fn read(reader: &mut ByteReader<'_>, ctx: &DecodeContext) -> Result<Self, PacketError> {
        let station_id = reader.read_u8()?;
        let switch_state = SwitchState(reader.read_u8()?);
        let flags = StationFlags::from(reader.read_bits()?);
        let temperature = reader.read_i8()?;
        let power_factor_raw = reader.read_i8()?;
        let power_usage_raw = reader.read_i16()?;
        let energy_used_raw = reader.read_i32()?;
        let time = PartialTime::from_raw(reader.read_u16()?, flags.time_set, ctx.now_secs);
        let validation = reader.read_u16()?;

        Ok(StateData {
            station_id,
            switch_state,
            flags,
            temperature,
            power_factor_raw,
            power_usage_raw,
            energy_used_raw,
            time,
            validation,
        })
    }

    pub fn power_factor(&self) -> f32 {
        scale_power_factor(self.power_factor_raw)
    }

    pub fn power_usage_watts(&self) -> f32 {
        scale_power_usage(self.power_usage_raw)
    }

    pub fn energy_used_joules(&self) -> i64 {
        scale_energy_used(self.energy_used_raw)
    }
}

/// Error broadcast.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorData {
    pub station_id: u8,
    pub errors: u32,
    pub error_timestamp: u32,
    pub flags: StationFlags,
    pub temperature: i8,
    pub time: PartialTime,
    pub power_usage_raw: i16,
}

impl ErrorData {
    pub(crate) fn read(reader: &mut ByteReader<'_>, ctx: &DecodeContext) -> Result<Self, PacketError> {
        let station_id = reader.read_u8()?;
        let errors = reader.read_u32()?;
        let error_timestamp = reader.read_u32()?;
        let flags = StationFlags::from(reader.read_bits()?);
        let temperature = reader.read_i8()?;
        let time = PartialTime::from_raw(reader.read_u16()?, flags.time_set, ctx.now_secs);
        let power_usage_raw = reader.read_i16()?;

        Ok(ErrorData {
            station_id,
            errors,
            error_timestamp,
            flags,
            temperature,
            time,
            power_usage_raw,
        })
    }

    pub fn power_usage_watts(&self) -> f32 {
        scale_power_usage(self.power_usage_raw)
    }
}

/// State of another station, relayed by the broadcaster.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExternalStateData {
    pub station_id: u8,
    pub switch_state: SwitchState,
    pub flags: StationFlags,
    pub temperature: i8,
    pub power_factor_raw: i8,
    pub power_usage_raw: i16,
    pub energy_used_raw: i32,
    pub time: PartialTime,
    /// Signal strength at which the broadcaster heard the other station.
    pub rssi: i8,
    pub validation: u8,
}

impl ExternalStateData {
    pub(crate) fn read(reader: &mut ByteReader<'_>, ctx: &DecodeContext) -> Result<Self, PacketError> {
        let station_id = reader.read_u8()?;
        let switch_state = SwitchState(reader.read_u8()?);
        let flags = StationFlags::from(reader.read_bits()?);
        let temperature = reader.read_i8()?;
        let power_factor_raw = reader.read_i8()?;
        let power_usage_raw = reader.read_i16()?;
        let energy_used_raw = reader.read_i32()?;
        let time = PartialTime::from_raw(reader.read_u16()?, flags.time_set, ctx.now_secs);
        let rssi = reader.read_i8()?;
        let validation = reader.read_u8()?;

        Ok(ExternalStateData {
            station_id,
            switch_state,
            flags,
            temperature,
            power_factor_raw,
            power_usage_raw,
            energy_used_raw,
            time,
            rssi,
            validation,
        })
    }

    pub fn power_usage_watts(&self) -> f32 {
        scale_power_usage(self.power_usage_raw)
    }
}

/// Errors of another station, relayed by the broadcaster.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExternalErrorData {
    pub station_id: u8,
    pub errors: u32,
    pub error_timestamp: u32,
    pub flags: StationFlags,
    pub temperature: i8,
    pub time: PartialTime,
    pub rssi: i8,
    pub validation: u8,
}

impl ExternalErrorData {
    pub(crate) fn read(reader: &mut ByteReader<'_>, ctx: &DecodeContext) -> Result<Self, PacketError> {
        let station_id = reader.read_u8()?;
        let errors = reader.read_u32()?;
        let error_timestamp = reader.read_u32()?;
        let flags = StationFlags::from(reader.read_bits()?);
        let temperature = reader.read_i8()?;
        let time = PartialTime::from_raw(reader.read_u16()?, flags.time_set, ctx.now_secs);
        let rssi = reader.read_i8()?;
        let validation = reader.read_u8()?;

        Ok(ExternalErrorData {
            station_id,
            errors,
            error_timestamp,
            flags,
            temperature,
            time,
            rssi,
            validation,
        })
    }
}

/// State broadcast that trades power readings for sync hashes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlternativeStateData {
    pub station_id: u8,
    pub switch_state: SwitchState,
    pub flags: StationFlags,
    /// Low 16 bits of the behaviour master hash; a change means the rule set changed.
    pub behaviour_master_hash: u16,
    pub asset_filter_version: u16,
    pub asset_filter_crc: u32,
    pub time: PartialTime,
    pub validation: u16,
}

impl AlternativeStateData {
    pub(crate) fn read(reader: &mut ByteReader<'_>, ctx: &DecodeContext) -> Result<Self, PacketError> {
        let station_id = reader.read_u8()?;
        let switch_state = SwitchState(reader.read_u8()?);
        let flags = StationFlags::from(reader.read_bits()?);
        let behaviour_master_hash = reader.read_u16()?;
        let asset_filter_version = reader.read_u16()?;
        let asset_filter_crc = reader.read_u32()?;
        let time = PartialTime::from_raw(reader.read_u16()?, flags.time_set, ctx.now_secs);
        let validation = reader.read_u16()?;

        Ok(AlternativeStateData {
            station_id,
            switch_state,
            flags,
            behaviour_master_hash,
            asset_filter_version,
            asset_filter_crc,
            time,
            validation,
        })
    }
}

/// Hub state broadcast.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HubStateData {
    pub station_id: u8,
    pub flags: HubFlags,
    /// Opaque hub-defined payload.
    pub hub_data: [u8; 9],
    pub time: PartialTime,
    pub validation: u16,
}

impl HubStateData {
    pub(crate) fn read(reader: &mut ByteReader<'_>, ctx: &DecodeContext) -> Result<Self, PacketError> {
        let station_id = reader.read_u8()?;
        let flags = HubFlags::from(reader.read_bits()?);
        let hub_data = reader.read_array()?;
        let time = PartialTime::from_raw(reader.read_u16()?, flags.time_set, ctx.now_secs);
        let validation = reader.read_u16()?;

        Ok(HubStateData {
            station_id,
            flags,
            hub_data,
            time,
            validation,
        })
    }
}

/// Broadcast emitted on behalf of a microapp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MicroappData {
    pub station_id: u8,
    pub flags: StationFlags,
    pub microapp_uuid: u16,
    pub microapp_data: [u8; 8],
    pub time: PartialTime,
    pub validation: u8,
}

impl MicroappData {
    pub(crate) fn read(reader: &mut ByteReader<'_>, ctx: &DecodeContext) -> Result<Self, PacketError> {
        let station_id = reader.read_u8()?;
        let flags = StationFlags::from(reader.read_bits()?);
        let microapp_uuid = reader.read_u16()?;
        let microapp_data = reader.read_array()?;
        let time = PartialTime::from_raw(reader.read_u16()?, flags.time_set, ctx.now_secs);
        let validation = reader.read_u8()?;

        Ok(MicroappData {
            station_id,
            flags,
            microapp_uuid,
            microapp_data,
            time,
            validation,
        })
    }
}

/// Unencrypted broadcast of a station in setup mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetupData {
    pub switch_state: SwitchState,
    pub flags: StationFlags,
    pub temperature: i8,
    pub power_factor_raw: i8,
    pub power_usage_raw: i16,
    pub errors: u32,
    /// Changes with every broadcast so scanners do not filter it as a duplicate.
    pub unique_element: u8,
}

impl SetupData {
    pub(crate) fn read(reader: &mut ByteReader<'_>, _ctx: &DecodeContext) -> Result<Self, PacketError> {
        let switch_state = SwitchState(reader.read_u8()?);
        let flags = StationFlags::from(reader.read_bits()?);
        let temperature = reader.read_i8()?;
        let power_factor_raw = reader.read_i8()?;
        let power_usage_raw = reader.read_i16()?;
        let errors = reader.read_u32()?;
        let unique_element = reader.read_u8()?;
        reader.read_bytes(4)?;

        Ok(SetupData {
            switch_state,
            flags,
            temperature,
            power_factor_raw,
            power_usage_raw,
            errors,
            unique_element,
        })
    }

    pub fn power_factor(&self) -> f32 {
        scale_power_factor(self.power_factor_raw)
    }

    pub fn power_usage_watts(&self) -> f32 {
        scale_power_usage(self.power_usage_raw)
    }
}

/// Background broadcast from a phone, deciphered with the advertisement key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackgroundData {
    pub sphere_uid: u8,
    /// Sender time reconstructed from the validation field.
    pub timestamp: u64,
    pub flags: BackgroundFlags,
    pub device_token: u8,
    /// The reconstructed time lies within the configured tolerance of now.
    pub validated: bool,
}

impl BackgroundData {
    /// Returns `None` when no key is configured; the block cannot be interpreted.
    pub(crate) fn read(
        reader: &mut ByteReader<'_>,
        ctx: &DecodeContext,
    ) -> Result<Option<Self>, PacketError> {
        let sphere_uid = reader.read_u8()?;
        let block = reader.read_array::<4>()?;

        let Some(cipher) = ctx.key.as_ref() else {
            return Ok(None);
        };

        let plain = cipher.decrypt_bytes(block);
        let mut inner = ByteReader::new(&plain);
        let lsb = inner.read_u16()?;
        let flags = BackgroundFlags::from(inner.read_bits()?);
        let device_token = inner.read_u8()?;

        let timestamp = reconstruct_timestamp(ctx.now_secs, lsb);
        let validated = timestamp.abs_diff(ctx.now_secs) <= ctx.validation_tolerance_secs;

        Ok(Some(BackgroundData {
            sphere_uid,
            timestamp,
            flags,
            device_token,
            validated,
        }))
    }
}
