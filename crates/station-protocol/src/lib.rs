//! Station Command/State Protocol
//!
//! Encodes commands and decodes results for every station firmware
//! generation. The wire format is chosen by the session's negotiated
//! [`ProtocolVersion`]:
//!
//! - **Flat** (Unspecified, Legacy, V1, V2): control packets with an 8-bit
//!   type, plus separate config and state channels for settings
//! - **Control-state envelope** (V3): 16-bit type, settings addressed by
//!   state type
//! - **Envelope with protocol byte** (V5, V5Extended): as V3, prefixed with
//!   the protocol byte
//!
//! # Example
//!
//! ```rust,ignore
//! use station_protocol::{Command, ProtocolVersion, Setting, encode_command, decode_result};
//!
//! let packet = encode_command(&Command::read(Setting::SwitchcraftEnabled), ProtocolVersion::V5)?;
//! transport.write(packet.channel, &packet.bytes);
//!
//! let result = decode_result(&reply, ProtocolVersion::V5)?;
//! let enabled = result.setting_value(Setting::SwitchcraftEnabled, ProtocolVersion::V5)?;
//! ```

mod commands;
mod constants;
mod error;
mod format;
mod packet;
mod result;
mod setting;
mod version;

pub use commands::*;
pub use constants::*;
pub use error::*;
pub use format::*;
pub use packet::*;
pub use result::*;
pub use setting::*;
pub use version::*;
