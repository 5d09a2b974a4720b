//! Service data (advertisement payload) decoding.
//!
//! A broadcast is identified by an opcode and a sub-type; the rest of the
//! payload is laid out according to that pair. Decoding is lenient by design:
//! an unknown pair or a payload of the wrong size is silently skipped, since
//! truncated and foreign frames are normal on a public radio channel.
//!
//! | Opcode | Sub-types | Meaning                                   |
//! |--------|-----------|-------------------------------------------|
//! | 3      | 0..=3     | Legacy encrypted broadcast                |
//! | 6      | 0         | Setup mode (unencrypted)                  |
//! | 7      | 0..=6     | Encrypted broadcast                       |
//! | 8      | 0         | Background broadcast from a phone         |

mod flags;
mod records;

pub use flags::*;
pub use records::*;

use serde::Serialize;

use crate::{BlockCipher, ByteReader, PacketError};

/// Legacy encrypted broadcast opcode.
pub const OPCODE_LEGACY: u8 = 3;
/// Setup mode broadcast opcode.
pub const OPCODE_SETUP: u8 = 6;
/// Encrypted broadcast opcode.
pub const OPCODE_ENCRYPTED: u8 = 7;
/// Background broadcast opcode.
pub const OPCODE_BACKGROUND: u8 = 8;

/// Payload size of every fixed station record.
pub const RECORD_SIZE: usize = 15;
/// Payload size of a background broadcast: sphere uid + one cipher block.
pub const BACKGROUND_SIZE: usize = 5;

/// Default tolerance for background broadcast validation, in seconds.
pub const DEFAULT_VALIDATION_TOLERANCE_SECS: u64 = 120;

/// Inputs a decode needs besides the payload itself.
#[derive(Debug, Clone)]
pub struct DecodeContext {
    /// Receiver wall clock, seconds since epoch.
    pub now_secs: u64,
    /// Key for background broadcasts.
    pub key: Option<BlockCipher>,
    pub validation_tolerance_secs: u64,
}

impl DecodeContext {
    pub fn new(now_secs: u64) -> Self {
        DecodeContext {
            now_secs,
            key: None,
            validation_tolerance_secs: DEFAULT_VALIDATION_TOLERANCE_SECS,
        }
    }

    pub fn with_key(mut self, key: BlockCipher) -> Self {
        self.key = Some(key);
        self
    }

    pub fn with_validation_tolerance(mut self, secs: u64) -> Self {
        self.validation_tolerance_secs = secs;
        self
    }
}

/// A decoded broadcast. One variant per opcode/sub-type layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServiceData {
    State(StateData),
    Error(ErrorData),
    ExternalState(ExternalStateData),
    ExternalError(ExternalErrorData),
    AlternativeState(AlternativeStateData),
    HubState(HubStateData),
    Microapp(MicroappData),
    Setup(SetupData),
    Background(BackgroundData),
}

impl ServiceData {
    /// Short name of the variant, used as a metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceData::State(_) => "state",
            ServiceData::Error(_) => "error",
            ServiceData::ExternalState(_) => "external_state",
            ServiceData::ExternalError(_) => "external_error",
            ServiceData::AlternativeState(_) => "alternative_state",
            ServiceData::HubState(_) => "hub_state",
            ServiceData::Microapp(_) => "microapp",
            ServiceData::Setup(_) => "setup",
            ServiceData::Background(_) => "background",
        }
    }

    /// Id of the station the record describes, where the layout carries one.
    pub fn station_id(&self) -> Option<u8> {
        match self {
            ServiceData::State(d) => Some(d.station_id),
            ServiceData::Error(d) => Some(d.station_id),
            ServiceData::ExternalState(d) => Some(d.station_id),
            ServiceData::ExternalError(d) => Some(d.station_id),
            ServiceData::AlternativeState(d) => Some(d.station_id),
            ServiceData::HubState(d) => Some(d.station_id),
            ServiceData::Microapp(d) => Some(d.station_id),
            ServiceData::Setup(_) | ServiceData::Background(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    State,
    Error,
    ExternalState,
    ExternalError,
    AlternativeState,
    HubState,
    Microapp,
    Setup,
    Background,
}

impl Layout {
    fn lookup(opcode: u8, subtype: u8) -> Option<Self> {
        match (opcode, subtype) {
            (OPCODE_ENCRYPTED | OPCODE_LEGACY, 0) => Some(Layout::State),
            (OPCODE_ENCRYPTED | OPCODE_LEGACY, 1) => Some(Layout::Error),
            (OPCODE_ENCRYPTED | OPCODE_LEGACY, 2) => Some(Layout::ExternalState),
            (OPCODE_ENCRYPTED | OPCODE_LEGACY, 3) => Some(Layout::ExternalError),
            (OPCODE_ENCRYPTED, 4) => Some(Layout::AlternativeState),
            (OPCODE_ENCRYPTED, 5) => Some(Layout::HubState),
            (OPCODE_ENCRYPTED, 6) => Some(Layout::Microapp),
            (OPCODE_SETUP, 0) => Some(Layout::Setup),
            (OPCODE_BACKGROUND, 0) => Some(Layout::Background),
            _ => None,
        }
    }

    fn expected_len(self) -> usize {
        match self {
            Layout::Background => BACKGROUND_SIZE,
            _ => RECORD_SIZE,
        }
    }

    fn read(
        self,
        reader: &mut ByteReader<'_>,
        ctx: &DecodeContext,
    ) -> Result<Option<ServiceData>, PacketError> {
        let data = match self {
            Layout::State => ServiceData::State(StateData::read(reader, ctx)?),
            Layout::Error => ServiceData::Error(ErrorData::read(reader, ctx)?),
            Layout::ExternalState => ServiceData::ExternalState(ExternalStateData::read(reader, ctx)?),
            Layout::ExternalError => ServiceData::ExternalError(ExternalErrorData::read(reader, ctx)?),
            Layout::AlternativeState => {
                ServiceData::AlternativeState(AlternativeStateData::read(reader, ctx)?)
            }
            Layout::HubState => ServiceData::HubState(HubStateData::read(reader, ctx)?),
            Layout::Microapp => ServiceData::Microapp(MicroappData::read(reader, ctx)?),
            Layout::Setup => ServiceData::Setup(SetupData::read(reader, ctx)?),
            Layout::Background => match BackgroundData::read(reader, ctx)? {
                Some(data) => ServiceData::Background(data),
                None => return Ok(None),
            },
        };
        Ok(Some(data))
    }
}

/// Expected payload length for an opcode/sub-type pair, if the pair is known.
pub fn expected_payload_len(opcode: u8, subtype: u8) -> Option<usize> {
    Layout::lookup(opcode, subtype).map(Layout::expected_len)
}

/// Decode one advertisement payload.
///
/// Returns `Ok(None)` for an unknown opcode/sub-type, a payload whose length
/// does not match the layout, or a background broadcast without a key.
/// A cursor overrun inside a routine is returned as
/// [`PacketError::PayloadTooShort`].
pub fn decode_advertisement(
    opcode: u8,
    subtype: u8,
    payload: &[u8],
    ctx: &DecodeContext,
) -> Result<Option<ServiceData>, PacketError> {
    let Some(layout) = Layout::lookup(opcode, subtype) else {
        log::trace!("skipping unknown service data {}/{}", opcode, subtype);
        return Ok(None);
    };

    if payload.len() != layout.expected_len() {
        log::trace!(
            "skipping service data {}/{}: expected {} bytes, got {}",
            opcode,
            subtype,
            layout.expected_len(),
            payload.len()
        );
        return Ok(None);
    }

    let mut reader = ByteReader::new(payload);
    layout.read(&mut reader, ctx).map_err(|err| {
        log::warn!("service data {}/{} decoder overran payload: {}", opcode, subtype, err);
        err
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timestamp::PartialTime;

    const NOW: u64 = 1_700_000_000;

    fn state_payload(flags: u8, partial_ts: u16) -> Vec<u8> {
        let mut p = vec![
            12,        // station id
            0x80 | 50, // relay on, dim 50
            flags,
            23,  // temperature
            127, // power factor
        ];
        p.extend_from_slice(&800i16.to_le_bytes());
        p.extend_from_slice(&1000i32.to_le_bytes());
        p.extend_from_slice(&partial_ts.to_le_bytes());
        p.extend_from_slice(&0xFACEu16.to_le_bytes());
        p
    }

    #[test]
    fn test_decode_state_with_time_set() {
        let lsb = (NOW % 65536) as u16;
        let payload = state_payload(0b0001_0010, lsb);
        let data = decode_advertisement(7, 0, &payload, &DecodeContext::new(NOW))
            .unwrap()
            .unwrap();

        let ServiceData::State(state) = data else {
            panic!("expected state record");
        };
        assert_eq!(state.station_id, 12);
        assert!(state.switch_state.relay_on());
        assert_eq!(state.switch_state.dimmer_level(), 50);
        assert!(state.flags.dimming_allowed);
        assert!(state.flags.time_set);
        assert_eq!(state.temperature, 23);
        assert_eq!(state.power_factor(), 1.0);
        assert_eq!(state.power_usage_watts(), 100.0);
        assert_eq!(state.energy_used_joules(), 64_000);
        assert_eq!(state.time, PartialTime::Timestamp(NOW));
        assert_eq!(state.validation, 0xFACE);
    }

    #[test]
    fn test_decode_state_without_time_set_is_counter() {
        let payload = state_payload(0, 4321);
        let data = decode_advertisement(7, 0, &payload, &DecodeContext::new(NOW))
            .unwrap()
            .unwrap();
        let ServiceData::State(state) = data else {
            panic!("expected state record");
        };
        assert_eq!(state.time, PartialTime::Counter(4321));
    }

    #[test]
    fn test_legacy_opcode_shares_layout() {
        let payload = state_payload(0, 1);
        let data = decode_advertisement(3, 0, &payload, &DecodeContext::new(NOW)).unwrap();
        assert_eq!(data.map(|d| d.kind()), Some("state"));
        // Newer sub-types do not exist on the legacy opcode.
        assert_eq!(decode_advertisement(3, 5, &payload, &DecodeContext::new(NOW)).unwrap(), None);
    }

    #[test]
    fn test_wrong_length_is_silently_skipped() {
        let mut payload = state_payload(0, 1);
        payload.pop();
        assert_eq!(decode_advertisement(7, 0, &payload, &DecodeContext::new(NOW)).unwrap(), None);
        payload.extend_from_slice(&[0, 0]);
        assert_eq!(decode_advertisement(7, 0, &payload, &DecodeContext::new(NOW)).unwrap(), None);
        assert_eq!(decode_advertisement(7, 0, &[], &DecodeContext::new(NOW)).unwrap(), None);
    }

    #[test]
    fn test_unknown_pair_is_skipped() {
        let payload = state_payload(0, 1);
        assert_eq!(decode_advertisement(42, 0, &payload, &DecodeContext::new(NOW)).unwrap(), None);
        assert_eq!(decode_advertisement(7, 99, &payload, &DecodeContext::new(NOW)).unwrap(), None);
    }

    #[test]
    fn test_decode_error_record() {
        let mut payload = vec![4];
        payload.extend_from_slice(&0x0000_0005u32.to_le_bytes());
        payload.extend_from_slice(&1_600_000_000u32.to_le_bytes());
        payload.push(0b0000_0100);
        payload.push(-5i8 as u8);
        payload.extend_from_slice(&7u16.to_le_bytes());
        payload.extend_from_slice(&(-16i16).to_le_bytes());

        let data = decode_advertisement(7, 1, &payload, &DecodeContext::new(NOW))
            .unwrap()
            .unwrap();
        let ServiceData::Error(error) = data else {
            panic!("expected error record");
        };
        assert_eq!(error.station_id, 4);
        assert_eq!(error.errors, 5);
        assert_eq!(error.error_timestamp, 1_600_000_000);
        assert!(error.flags.has_error);
        assert_eq!(error.temperature, -5);
        assert_eq!(error.time, PartialTime::Counter(7));
        assert_eq!(error.power_usage_watts(), -2.0);
    }

    #[test]
    fn test_hub_flags_drive_time_reconstruction() {
        let lsb = (NOW % 65536) as u16;
        let mut payload = vec![9, 0b1001_0000];
        payload.extend_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8, 9]);
        payload.extend_from_slice(&lsb.to_le_bytes());
        payload.extend_from_slice(&0u16.to_le_bytes());

        let data = decode_advertisement(7, 5, &payload, &DecodeContext::new(NOW))
            .unwrap()
            .unwrap();
        let ServiceData::HubState(hub) = data else {
            panic!("expected hub record");
        };
        assert!(hub.flags.time_set);
        assert!(hub.flags.hub_has_been_set_up);
        assert_eq!(hub.hub_data, [1, 2, 3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(hub.time, PartialTime::Timestamp(NOW));
    }

    #[test]
    fn test_decode_setup_record() {
        let mut payload = vec![100, 0b0000_0001, 30, 100];
        payload.extend_from_slice(&40i16.to_le_bytes());
        payload.extend_from_slice(&0u32.to_le_bytes());
        payload.push(77);
        payload.extend_from_slice(&[0; 4]);

        let data = decode_advertisement(6, 0, &payload, &DecodeContext::new(NOW))
            .unwrap()
            .unwrap();
        let ServiceData::Setup(setup) = data else {
            panic!("expected setup record");
        };
        assert_eq!(setup.switch_state.dimmer_level(), 100);
        assert!(setup.flags.dimmer_ready);
        assert_eq!(setup.unique_element, 77);
        assert_eq!(setup.power_usage_watts(), 5.0);
        assert_eq!(ServiceData::Setup(setup).station_id(), None);
    }

    #[test]
    fn test_background_requires_key() {
        let key = [0x11u8; 16];
        let cipher = BlockCipher::new(&key);
        let lsb = (NOW % 65536) as u16;
        let plain = [lsb as u8, (lsb >> 8) as u8, 0b0000_0011, 0x42];
        let block = cipher.encrypt_bytes(plain);
        let mut payload = vec![3];
        payload.extend_from_slice(&block);

        assert_eq!(decode_advertisement(8, 0, &payload, &DecodeContext::new(NOW)).unwrap(), None);

        let ctx = DecodeContext::new(NOW).with_key(cipher);
        let data = decode_advertisement(8, 0, &payload, &ctx).unwrap().unwrap();
        let ServiceData::Background(bg) = data else {
            panic!("expected background record");
        };
        assert_eq!(bg.sphere_uid, 3);
        assert_eq!(bg.timestamp, NOW);
        assert!(bg.flags.tap_to_toggle);
        assert!(bg.flags.ignore_for_behaviour);
        assert_eq!(bg.device_token, 0x42);
        assert!(bg.validated);
    }

    #[test]
    fn test_background_with_wrong_key_is_not_validated() {
        let sender = BlockCipher::new(&[0x11u8; 16]);
        let receiver = BlockCipher::new(&[0x22u8; 16]);
        let lsb = (NOW % 65536) as u16;
        let block = sender.encrypt_bytes([lsb as u8, (lsb >> 8) as u8, 0, 0]);
        let mut payload = vec![3];
        payload.extend_from_slice(&block);

        let ctx = DecodeContext::new(NOW)
            .with_key(receiver)
            .with_validation_tolerance(0);
        let data = decode_advertisement(8, 0, &payload, &ctx).unwrap().unwrap();
        let ServiceData::Background(bg) = data else {
            panic!("expected background record");
        };
        // A wrong key yields an arbitrary time; with zero tolerance it only
        // validates if it happens to decode to exactly now.
        assert_eq!(bg.validated, bg.timestamp == NOW);
    }

    #[test]
    fn test_expected_payload_len() {
        assert_eq!(expected_payload_len(7, 0), Some(RECORD_SIZE));
        assert_eq!(expected_payload_len(8, 0), Some(BACKGROUND_SIZE));
        assert_eq!(expected_payload_len(1, 1), None);
    }

    #[test]
    fn test_arbitrary_input_never_panics() {
        let ctx = DecodeContext::new(NOW).with_key(BlockCipher::new(&[0u8; 16]));
        for opcode in 0..=9u8 {
            for subtype in 0..=7u8 {
                for len in 0..=20usize {
                    let payload = vec![0xA5; len];
                    assert!(decode_advertisement(opcode, subtype, &payload, &ctx).is_ok());
                }
            }
        }
    }
}
