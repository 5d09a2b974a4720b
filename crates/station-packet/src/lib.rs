//! Station Packet Primitives
//!
//! Low-level building blocks for talking to stations (smart switches):
//!
//! - [`bytes`]: little-endian integer packing, bit expansion, hex helpers and
//!   a bounds-checked [`ByteReader`]
//! - [`cipher`]: the 32-bit block cipher that protects background broadcasts
//! - [`timestamp`]: reconstruction of 16-bit partial timestamps
//! - [`service_data`]: decoding of advertisement (broadcast) payloads
//!
//! # Example
//!
//! ```rust,ignore
//! use station_packet::{decode_advertisement, DecodeContext};
//!
//! let ctx = DecodeContext::new(now_secs);
//! if let Some(data) = decode_advertisement(7, 0, &payload, &ctx)? {
//!     println!("{}: {:?}", data.kind(), data);
//! }
//! ```

pub mod bytes;
pub mod cipher;
pub mod error;
pub mod service_data;
pub mod timestamp;

pub use bytes::*;
pub use cipher::{expand_key, BlockCipher, KEY_SIZE};
pub use error::PacketError;
pub use service_data::{decode_advertisement, DecodeContext, ServiceData};
pub use timestamp::{reconstruct_timestamp, PartialTime};
