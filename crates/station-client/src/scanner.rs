//! Advertisement scanning.
//!
//! The transport hands every received advertisement to [`Scanner::handle`].
//! Frames are unordered and often repeated, so the scanner remembers the
//! last few payloads and drops exact repeats before decoding.

use std::collections::{HashSet, VecDeque};

use chrono::Utc;
use station_metrics::{metric_defs, metrics, AdvertisementLabels};
use station_packet::{decode_advertisement, BlockCipher, DecodeContext, PacketError, ServiceData};
use tracing::{trace, warn};

use crate::config::StationConfig;
use crate::error::ClientError;

/// Source of the current time in seconds since the epoch.
pub trait WallClock: Send + Sync {
    fn now_secs(&self) -> u64;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now_secs(&self) -> u64 {
        Utc::now().timestamp().max(0) as u64
    }
}

/// A clock stuck at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub u64);

impl WallClock for FixedClock {
    fn now_secs(&self) -> u64 {
        self.0
    }
}

/// What became of one advertisement.
#[derive(Debug, Clone, PartialEq)]
pub enum Scanned {
    Record(ServiceData),
    /// Same opcode, sub-type and payload as a recent frame.
    Duplicate,
    /// Unknown layout, wrong length, or no key for a background frame.
    Skipped,
}

impl Scanned {
    pub fn into_record(self) -> Option<ServiceData> {
        match self {
            Scanned::Record(data) => Some(data),
            _ => None,
        }
    }
}

/// Decodes advertisements, dropping recent duplicates.
pub struct Scanner<C: WallClock = SystemClock> {
    clock: C,
    key: Option<BlockCipher>,
    validation_tolerance_secs: u64,
    window: usize,
    recent: VecDeque<Vec<u8>>,
    seen: HashSet<Vec<u8>>,
}

impl Scanner<SystemClock> {
    pub fn new(window: usize) -> Self {
        Scanner::with_clock(SystemClock, window)
    }

    /// Build from configuration, using the system clock.
    pub fn from_config(config: &StationConfig) -> Result<Self, ClientError> {
        let mut scanner = Scanner::new(config.dedup_window)
            .with_validation_tolerance(config.validation_tolerance_secs);
        if let Some(key) = config.advertisement_key()? {
            scanner = scanner.with_key(key);
        }
        Ok(scanner)
    }
}

impl<C: WallClock> Scanner<C> {
    pub fn with_clock(clock: C, window: usize) -> Self {
        Scanner {
            clock,
            key: None,
            validation_tolerance_secs: station_packet::service_data::DEFAULT_VALIDATION_TOLERANCE_SECS,
            window,
            recent: VecDeque::with_capacity(window),
            seen: HashSet::with_capacity(window),
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

    /// Number of payloads currently remembered.
    pub fn remembered(&self) -> usize {
        self.recent.len()
    }

    /// Forget every remembered payload.
    pub fn clear(&mut self) {
        self.recent.clear();
        self.seen.clear();
    }

    /// Handle one received advertisement.
    ///
    /// Only a cursor overrun inside a record is an error; everything else
    /// the decoder cannot use is [`Scanned::Skipped`].
    pub fn handle(
        &mut self,
        opcode: u8,
        subtype: u8,
        payload: &[u8],
    ) -> Result<Scanned, PacketError> {
        let labels = AdvertisementLabels::new(opcode, subtype);

        if !self.remember(opcode, subtype, payload) {
            metrics::counter!(metric_defs::ADV_DUPLICATE.name, &labels.to_labels()).increment(1);
            trace!(opcode, subtype, "duplicate advertisement");
            return Ok(Scanned::Duplicate);
        }

        let mut ctx = DecodeContext::new(self.clock.now_secs())
            .with_validation_tolerance(self.validation_tolerance_secs);
        if let Some(key) = &self.key {
            ctx = ctx.with_key(key.clone());
        }

        match decode_advertisement(opcode, subtype, payload, &ctx) {
            Ok(Some(data)) => {
                metrics::counter!(metric_defs::ADV_DECODED.name, &labels.with_kind(data.kind()))
                    .increment(1);
                if let ServiceData::Background(background) = &data {
                    if !background.validated {
                        metrics::counter!(metric_defs::ADV_UNVALIDATED.name).increment(1);
                    }
                }
                Ok(Scanned::Record(data))
            }
            Ok(None) => {
                metrics::counter!(metric_defs::ADV_SKIPPED.name, &labels.to_labels()).increment(1);
                Ok(Scanned::Skipped)
            }
            Err(e) => {
                metrics::counter!(metric_defs::ADV_FAILED.name, &labels.to_labels()).increment(1);
                warn!(opcode, subtype, error = %e, "advertisement decode failed");
                Err(e)
            }
        }
    }

    /// Record a frame; returns `false` if it is already in the window.
    fn remember(&mut self, opcode: u8, subtype: u8, payload: &[u8]) -> bool {
        if self.window == 0 {
            return true;
        }
        let mut key = Vec::with_capacity(payload.len() + 2);
        key.push(opcode);
        key.push(subtype);
        key.extend_from_slice(payload);

        if self.seen.contains(&key) {
            return false;
        }
        if self.recent.len() == self.window {
            if let Some(oldest) = self.recent.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        self.seen.insert(key.clone());
        self.recent.push_back(key);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use station_packet::service_data::{OPCODE_BACKGROUND, OPCODE_ENCRYPTED};

    const NOW: u64 = 1_700_000_000;

    fn state_payload(station_id: u8) -> Vec<u8> {
        let mut payload = vec![station_id, 0x80, 0, 21, 127];
        payload.extend_from_slice(&[0; 10]);
        payload
    }

    #[test]
    fn test_duplicates_dropped() {
        let mut scanner = Scanner::with_clock(FixedClock(NOW), 4);
        let payload = state_payload(5);

        let first = scanner.handle(OPCODE_ENCRYPTED, 0, &payload).unwrap();
        assert_eq!(first.into_record().and_then(|d| d.station_id()), Some(5));
        assert_eq!(
            scanner.handle(OPCODE_ENCRYPTED, 0, &payload).unwrap(),
            Scanned::Duplicate
        );
        // Same bytes under another layout are not a duplicate.
        assert!(matches!(
            scanner.handle(3, 0, &payload).unwrap(),
            Scanned::Record(_)
        ));
    }

    #[test]
    fn test_window_is_bounded() {
        let mut scanner = Scanner::with_clock(FixedClock(NOW), 2);
        for id in 0..3 {
            scanner.handle(OPCODE_ENCRYPTED, 0, &state_payload(id)).unwrap();
        }
        assert_eq!(scanner.remembered(), 2);

        // Station 0 fell out of the window and decodes again.
        assert!(matches!(
            scanner.handle(OPCODE_ENCRYPTED, 0, &state_payload(0)).unwrap(),
            Scanned::Record(_)
        ));
        assert_eq!(
            scanner.handle(OPCODE_ENCRYPTED, 0, &state_payload(2)).unwrap(),
            Scanned::Duplicate
        );

        scanner.clear();
        assert_eq!(scanner.remembered(), 0);
    }

    #[test]
    fn test_zero_window_disables_dedup() {
        let mut scanner = Scanner::with_clock(FixedClock(NOW), 0);
        let payload = state_payload(1);
        for _ in 0..3 {
            assert!(matches!(
                scanner.handle(OPCODE_ENCRYPTED, 0, &payload).unwrap(),
                Scanned::Record(_)
            ));
        }
        assert_eq!(scanner.remembered(), 0);
    }

    #[test]
    fn test_skipped_frames() {
        let mut scanner = Scanner::with_clock(FixedClock(NOW), 8);
        assert_eq!(scanner.handle(OPCODE_ENCRYPTED, 0, &[1, 2, 3]).unwrap(), Scanned::Skipped);
        assert_eq!(scanner.handle(42, 0, &state_payload(1)).unwrap(), Scanned::Skipped);
        assert_eq!(
            scanner.handle(OPCODE_BACKGROUND, 0, &[1, 2, 3, 4, 5]).unwrap(),
            Scanned::Skipped
        );
    }

    #[test]
    fn test_background_with_key() {
        let cipher = BlockCipher::new(&[0x33u8; 16]);
        let lsb = (NOW % 65536) as u16;
        let block = cipher.encrypt_bytes([lsb as u8, (lsb >> 8) as u8, 0, 9]);
        let mut payload = vec![1];
        payload.extend_from_slice(&block);

        let mut scanner = Scanner::with_clock(FixedClock(NOW + 30), 8).with_key(cipher);
        let Scanned::Record(ServiceData::Background(background)) =
            scanner.handle(OPCODE_BACKGROUND, 0, &payload).unwrap()
        else {
            panic!("expected background record");
        };
        assert_eq!(background.timestamp, NOW);
        assert_eq!(background.device_token, 9);
        assert!(background.validated);
    }

    #[test]
    fn test_from_config() {
        let config = StationConfig::from_yaml_str(
            "dedup_window: 3\nadvertisement_key: \"00112233445566778899aabbccddeeff\"\n",
        )
        .unwrap();
        let scanner = Scanner::from_config(&config).unwrap();
        assert_eq!(scanner.window, 3);
        assert!(scanner.key.is_some());
    }
}
