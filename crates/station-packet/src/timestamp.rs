//! Partial timestamp reconstruction.
//!
//! Broadcasts only carry the low 16 bits of the sender's clock. Given a
//! recent wall-clock reading, the full value is the one closest to "now"
//! that shares those low bits.

use serde::Serialize;

const WINDOW: i64 = 1 << 16;
const HALF_WINDOW: i64 = WINDOW / 2;

/// A 16-bit time field after interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialTime {
    /// Seconds since epoch, reconstructed against the receiver's clock.
    Timestamp(u64),
    /// The sender's clock was not set; the raw value is only a counter.
    Counter(u16),
}

impl PartialTime {
    /// Interpret a raw field depending on the sender's "time set" flag.
    pub fn from_raw(lsb: u16, time_set: bool, now_secs: u64) -> Self {
        if time_set {
            PartialTime::Timestamp(reconstruct_timestamp(now_secs, lsb))
        } else {
            PartialTime::Counter(lsb)
        }
    }

    /// The reconstructed timestamp, if there is one.
    pub fn timestamp(&self) -> Option<u64> {
        match self {
            PartialTime::Timestamp(ts) => Some(*ts),
            PartialTime::Counter(_) => None,
        }
    }
}

/// Rebuild a full timestamp from its low 16 bits.
///
/// The low bits of `now_secs` are replaced by `lsb`, then the result is moved
/// by one 65536 s window if needed so it lies within 32768 s of `now_secs`.
/// Never goes below zero.
pub fn reconstruct_timestamp(now_secs: u64, lsb: u16) -> u64 {
    let now = now_secs as i64;
    let mut candidate = (now & !(WINDOW - 1)) | i64::from(lsb);
    let delta = candidate - now;

    if delta > HALF_WINDOW {
        candidate -= WINDOW;
    } else if delta < -HALF_WINDOW {
        candidate += WINDOW;
    }

    candidate.max(0) as u64
}
