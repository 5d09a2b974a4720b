//! Fixed-width integer conversions, bit expansion, hex helpers and a
//! cursor-based reader.
//!
//! Everything on the wire is little-endian.

use crate::PacketError;

// ============================================================================
// Integer Conversions
// ============================================================================

/// Pack a `u16` as two little-endian bytes.
pub fn u16_to_bytes(value: u16) -> [u8; 2] {
    value.to_le_bytes()
}

/// Pack a `u32` as four little-endian bytes.
pub fn u32_to_bytes(value: u32) -> [u8; 4] {
    value.to_le_bytes()
}

/// Unpack two little-endian bytes.
pub fn bytes_to_u16(bytes: [u8; 2]) -> u16 {
    u16::from_le_bytes(bytes)
}

/// Unpack four little-endian bytes.
pub fn bytes_to_u32(bytes: [u8; 4]) -> u32 {
    u32::from_le_bytes(bytes)
}

/// Expand a byte into eight booleans, bit 0 at index 0.
pub fn expand_bits(byte: u8) -> [bool; 8] {
    let mut bits = [false; 8];
    for (i, bit) in bits.iter_mut().enumerate() {
        *bit = (byte >> i) & 1 == 1;
    }
    bits
}

// ============================================================================
// Hex Helpers
// ============================================================================

/// Decode a hex string into bytes.
///
/// Accepts an optional `0x` prefix and ignores whitespace and `:` separators,
/// so both `"de:ad:be:ef"` and `"0xDEADBEEF"` decode to the same bytes.
pub fn hex_to_bytes(input: &str) -> Result<Vec<u8>, PacketError> {
    let trimmed = input.trim();
    let trimmed = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let cleaned: String = trimmed
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    Ok(hex::decode(cleaned)?)
}

/// Encode bytes as a lowercase hex string.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Decode a big-endian hex literal and reverse it into wire order.
///
/// `"deadbeef"` becomes `[0xEF, 0xBE, 0xAD, 0xDE]`.
pub fn reversed_hex_to_bytes(input: &str) -> Result<Vec<u8>, PacketError> {
    let mut bytes = hex_to_bytes(input)?;
    bytes.reverse();
    Ok(bytes)
}

// ============================================================================
// Cursor Reader
// ============================================================================

/// A cursor over a byte slice that reads little-endian fields front to back.
///
/// A read that would run past the end fails with
/// [`PacketError::PayloadTooShort`] and leaves the cursor where it was.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    /// Create a reader positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        ByteReader { data, position: 0 }
    }

    /// Current offset from the start of the slice.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// Whether every byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Read `count` raw bytes.
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], PacketError> {
        if count > self.remaining() {
            return Err(PacketError::PayloadTooShort {
                needed: count,
                remaining: self.remaining(),
            });
        }
        let slice = &self.data[self.position..self.position + count];
        self.position += count;
        Ok(slice)
    }

    /// Read a fixed-size block.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], PacketError> {
        let slice = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    /// Read everything that is left.
    pub fn read_rest(&mut self) -> &'a [u8] {
        let slice = &self.data[self.position..];
        self.position = self.data.len();
        slice
    }

    pub fn read_u8(&mut self) -> Result<u8, PacketError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8, PacketError> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16, PacketError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_i16(&mut self) -> Result<i16, PacketError> {
        Ok(i16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, PacketError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, PacketError> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, PacketError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Read one byte and expand it into eight booleans.
    pub fn read_bits(&mut self) -> Result<[bool; 8], PacketError> {
        Ok(expand_bits(self.read_u8()?))
    }
}
