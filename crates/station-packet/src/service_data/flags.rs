//! Bitmask tables for service data flags.
//!
//! The station and hub tables share physical bit positions but not meanings:
//! bit 4 is "time set" for a station and "has been set up" for a hub, bit 7
//! is "behaviour overridden" for a station and "time set" for a hub.

use serde::Serialize;

/// Flags byte carried by station state, error and setup broadcasts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StationFlags {
    pub dimmer_ready: bool,
    pub dimming_allowed: bool,
    pub has_error: bool,
    pub switch_locked: bool,
    pub time_set: bool,
    pub switchcraft_enabled: bool,
    pub tap_to_toggle_enabled: bool,
    pub behaviour_overridden: bool,
}

impl From<[bool; 8]> for StationFlags {
    fn from(bits: [bool; 8]) -> Self {
        StationFlags {
            dimmer_ready: bits[0],
            dimming_allowed: bits[1],
            has_error: bits[2],
            switch_locked: bits[3],
            time_set: bits[4],
            switchcraft_enabled: bits[5],
            tap_to_toggle_enabled: bits[6],
            behaviour_overridden: bits[7],
        }
    }
}

/// Flags byte carried by hub state broadcasts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HubFlags {
    pub uart_alive: bool,
    pub uart_alive_encrypted: bool,
    pub uart_encryption_required_by_station: bool,
    pub uart_encryption_required_by_hub: bool,
    pub hub_has_been_set_up: bool,
    pub hub_has_internet: bool,
    pub hub_has_error: bool,
    pub time_set: bool,
}

impl From<[bool; 8]> for HubFlags {
    fn from(bits: [bool; 8]) -> Self {
        HubFlags {
            uart_alive: bits[0],
            uart_alive_encrypted: bits[1],
            uart_encryption_required_by_station: bits[2],
            uart_encryption_required_by_hub: bits[3],
            hub_has_been_set_up: bits[4],
            hub_has_internet: bits[5],
            hub_has_error: bits[6],
            time_set: bits[7],
        }
    }
}

/// Flags in the low data byte of a deciphered background broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackgroundFlags {
    pub tap_to_toggle: bool,
    pub ignore_for_behaviour: bool,
}

impl From<[bool; 8]> for BackgroundFlags {
    fn from(bits: [bool; 8]) -> Self {
        BackgroundFlags {
            tap_to_toggle: bits[0],
            ignore_for_behaviour: bits[1],
        }
    }
}
