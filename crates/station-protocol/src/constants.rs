//! Wire constants for every firmware generation.

// ============================================================================
// Flat Control Types (Unspecified, Legacy, V1, V2)
// ============================================================================

pub const FLAT_SWITCH: u8 = 0;
pub const FLAT_SET_TIME: u8 = 2;
pub const FLAT_RESET: u8 = 4;
pub const FLAT_FACTORY_RESET: u8 = 5;
pub const FLAT_RESET_ERRORS: u8 = 19;
pub const FLAT_DISCONNECT: u8 = 20;
pub const FLAT_SCHEDULE_REMOVE: u8 = 22;

// ============================================================================
// Flat Config/State Opcodes
// ============================================================================

pub const OPCODE_READ: u8 = 0;
pub const OPCODE_WRITE: u8 = 1;

// ============================================================================
// Envelope Control Types (V3, V5, V5Extended)
// ============================================================================

pub const CTRL_FACTORY_RESET: u16 = 1;
pub const CTRL_GET_STATE: u16 = 2;
pub const CTRL_SET_STATE: u16 = 3;
pub const CTRL_RESET: u16 = 10;
pub const CTRL_NO_OPERATION: u16 = 12;
pub const CTRL_DISCONNECT: u16 = 13;
pub const CTRL_SWITCH: u16 = 20;
pub const CTRL_SET_TIME: u16 = 30;
pub const CTRL_RESET_ERRORS: u16 = 40;
pub const CTRL_SCHEDULE_REMOVE: u16 = 51;
pub const CTRL_ADD_BEHAVIOUR: u16 = 60;
pub const CTRL_REPLACE_BEHAVIOUR: u16 = 61;
pub const CTRL_REMOVE_BEHAVIOUR: u16 = 62;
pub const CTRL_GET_BEHAVIOUR: u16 = 63;
pub const CTRL_GET_BEHAVIOUR_INDICES: u16 = 64;

// ============================================================================
// Envelope Protocol Bytes
// ============================================================================

pub const PROTOCOL_V5: u8 = 5;
pub const PROTOCOL_V5_EXTENDED: u8 = 6;

// ============================================================================
// Payload Values
// ============================================================================

/// Factory reset magic `0xdeadbeef` in wire order.
pub const FACTORY_RESET_MAGIC: [u8; 4] = [0xEF, 0xBE, 0xAD, 0xDE];

/// Switch value meaning "on, at whatever level behaviours dictate".
pub const SWITCH_ON_BY_BEHAVIOUR: u8 = 255;

/// Largest payload a 16-bit length field can describe.
pub const MAX_PAYLOAD_SIZE: usize = u16::MAX as usize;

/// Size of the state header (`state_type u16 | id u16 | scope u8 | reserved u8`).
pub const STATE_HEADER_SIZE: usize = 6;
