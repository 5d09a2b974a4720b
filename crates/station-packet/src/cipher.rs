//! 32-bit block cipher used to validate and obscure advertisement payloads.
//!
//! RC5 with 16-bit words and 12 rounds. A 16-byte key expands into a
//! schedule of 26 subkey words; a block is two 16-bit halves (low half
//! first, matching the little-endian wire order).
//!
//! This is not the session encryption. It only protects the short blocks
//! that phones broadcast to stations in the background.

use crate::PacketError;

/// Key length in bytes.
pub const KEY_SIZE: usize = 16;

/// Number of rounds.
pub const ROUNDS: usize = 12;

/// Number of subkey words in the expanded schedule (`2 * (ROUNDS + 1)`).
pub const SUBKEY_COUNT: usize = 2 * (ROUNDS + 1);

const KEY_WORDS: usize = KEY_SIZE / 2;
const P16: u16 = 0xB7E1;
const Q16: u16 = 0x9E37;

/// A block cipher instance holding an expanded key schedule.
#[derive(Clone, PartialEq, Eq)]
pub struct BlockCipher {
    subkeys: [u16; SUBKEY_COUNT],
}

impl std::fmt::Debug for BlockCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Subkeys are key material.
        f.debug_struct("BlockCipher").finish_non_exhaustive()
    }
}

impl BlockCipher {
    /// Expand a 16-byte key.
    pub fn new(key: &[u8; KEY_SIZE]) -> Self {
        BlockCipher {
            subkeys: expand_key(key),
        }
    }

    /// Expand a key given as a slice. Fails unless the slice is exactly 16 bytes.
    pub fn from_slice(key: &[u8]) -> Result<Self, PacketError> {
        let key: [u8; KEY_SIZE] = key.try_into().map_err(|_| PacketError::InvalidKeyLength {
            expected: KEY_SIZE,
            actual: key.len(),
        })?;
        Ok(Self::new(&key))
    }

    /// The expanded schedule.
    pub fn subkeys(&self) -> &[u16; SUBKEY_COUNT] {
        &self.subkeys
    }

    /// Encrypt one 32-bit block.
    pub fn encrypt_block(&self, block: u32) -> u32 {
        let s = &self.subkeys;
        let mut a = (block as u16).wrapping_add(s[0]);
        let mut b = ((block >> 16) as u16).wrapping_add(s[1]);

        for round in 1..=ROUNDS {
            a = (a ^ b).rotate_left(u32::from(b % 16)).wrapping_add(s[2 * round]);
            b = (b ^ a).rotate_left(u32::from(a % 16)).wrapping_add(s[2 * round + 1]);
        }

        u32::from(a) | (u32::from(b) << 16)
    }

    /// Decrypt one 32-bit block.
    pub fn decrypt_block(&self, block: u32) -> u32 {
        let s = &self.subkeys;
        let mut a = block as u16;
        let mut b = (block >> 16) as u16;

        for round in (1..=ROUNDS).rev() {
            b = b.wrapping_sub(s[2 * round + 1]).rotate_right(u32::from(a % 16)) ^ a;
            a = a.wrapping_sub(s[2 * round]).rotate_right(u32::from(b % 16)) ^ b;
        }

        let b = b.wrapping_sub(s[1]);
        let a = a.wrapping_sub(s[0]);
        u32::from(a) | (u32::from(b) << 16)
    }

    /// Encrypt a block given in wire (little-endian) order.
    pub fn encrypt_bytes(&self, block: [u8; 4]) -> [u8; 4] {
        self.encrypt_block(u32::from_le_bytes(block)).to_le_bytes()
    }

    /// Decrypt a block given in wire (little-endian) order.
    pub fn decrypt_bytes(&self, block: [u8; 4]) -> [u8; 4] {
        self.decrypt_block(u32::from_le_bytes(block)).to_le_bytes()
    }
}

/// Derive the 26-word schedule from a 16-byte key.
///
/// Key bytes are packed into eight little-endian words, the schedule is seeded
/// from the magic constants, then both arrays are mixed for `3 * 26` steps
/// with two running accumulators.
pub fn expand_key(key: &[u8; KEY_SIZE]) -> [u16; SUBKEY_COUNT] {
    let mut l = [0u16; KEY_WORDS];
    for (i, word) in l.iter_mut().enumerate() {
        *word = u16::from_le_bytes([key[2 * i], key[2 * i + 1]]);
    }

    let mut s = [0u16; SUBKEY_COUNT];
    s[0] = P16;
    for i in 1..SUBKEY_COUNT {
        s[i] = s[i - 1].wrapping_add(Q16);
    }

    let (mut a, mut b) = (0u16, 0u16);
    let (mut i, mut j) = (0usize, 0usize);
    for _ in 0..3 * SUBKEY_COUNT {
        a = s[i].wrapping_add(a).wrapping_add(b).rotate_left(3);
        s[i] = a;
        let sum = a.wrapping_add(b);
        b = l[j].wrapping_add(sum).rotate_left(u32::from(sum % 16));
        l[j] = b;
        i = (i + 1) % SUBKEY_COUNT;
        j = (j + 1) % KEY_WORDS;
    }

    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn sequential_key() -> [u8; KEY_SIZE] {
        let mut key = [0u8; KEY_SIZE];
        for (i, b) in key.iter_mut().enumerate() {
            *b = i as u8;
        }
        key
    }

    /// Schedule for key 00 01 02 .. 0f, used only as a fixture.
    const SEQUENTIAL_KEY_SCHEDULE: [u16; SUBKEY_COUNT] = [
        0x8a07, 0x6e98, 0x585a, 0x8833, 0xb0b2, 0xb452, 0x5931, 0xe7fc, 0xb9a2, 0x8c16, 0x0bfb,
        0x2453, 0x7d1f, 0xf2e6, 0x0387, 0x2033, 0xdf5b, 0xb1b5, 0x71f1, 0xcda5, 0x6bca, 0x8fca,
        0xf98b, 0x6273, 0x9e64, 0x2023,
    ];

    #[test]
    fn test_key_schedule_matches_fixture() {
        let cipher = BlockCipher::new(&sequential_key());
        assert_eq!(cipher.subkeys(), &SEQUENTIAL_KEY_SCHEDULE);
    }

    #[test]
    fn test_key_schedule_is_deterministic() {
        let key = [0x5Au8; KEY_SIZE];
        assert_eq!(expand_key(&key), expand_key(&key));
        assert_ne!(expand_key(&key), expand_key(&sequential_key()));
    }

    #[test]
    fn test_known_vectors() {
        let cipher = BlockCipher::new(&sequential_key());
        assert_eq!(cipher.encrypt_block(0x0000_0000), 0x596f_1d3a);
        assert_eq!(cipher.encrypt_block(0x1234_5678), 0xd34a_5dd3);
        assert_eq!(cipher.encrypt_block(0xdead_beef), 0xd15e_bd2f);
        assert_eq!(cipher.encrypt_block(0xffff_ffff), 0xcf79_ca7f);
        assert_eq!(cipher.decrypt_block(0xd34a_5dd3), 0x1234_5678);

        let zero = BlockCipher::new(&[0u8; KEY_SIZE]);
        assert_eq!(zero.encrypt_block(0), 0xbe2a_b619);
    }

    #[test]
    fn test_round_trip_random_keys_and_blocks() {
        let mut rng = ChaCha8Rng::seed_from_u64(0x5eed);
        for _ in 0..10_000 {
            let key: [u8; KEY_SIZE] = rng.gen();
            let plaintext: u32 = rng.gen();
            let cipher = BlockCipher::new(&key);
            assert_eq!(cipher.decrypt_block(cipher.encrypt_block(plaintext)), plaintext);
        }
    }

    #[test]
    fn test_byte_order() {
        let cipher = BlockCipher::new(&sequential_key());
        let encrypted = cipher.encrypt_bytes([0x78, 0x56, 0x34, 0x12]);
        assert_eq!(encrypted, 0xd34a_5dd3u32.to_le_bytes());
        assert_eq!(cipher.decrypt_bytes(encrypted), [0x78, 0x56, 0x34, 0x12]);
    }

    #[test]
    fn test_from_slice_rejects_wrong_length() {
        assert!(BlockCipher::from_slice(&[0u8; 16]).is_ok());
        assert_eq!(
            BlockCipher::from_slice(&[0u8; 15]).unwrap_err(),
            PacketError::InvalidKeyLength {
                expected: 16,
                actual: 15
            }
        );
    }
}
