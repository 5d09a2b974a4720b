//! Behaviour result payloads.
//!
//! ```text
//! indices:         (index u8 | hash u32)*
//! add / replace:   index u8 | hash u32
//! remove:          index u8
//! get:             index u8 | behaviour bytes
//! ```

use serde::Serialize;
use station_packet::ByteReader;
use station_protocol::ProtocolError;

use crate::behaviour::Behaviour;

/// Size of one record in the index listing.
pub const INDEX_RECORD_SIZE: usize = 5;

/// One entry of the station's behaviour index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RemoteIndexEntry {
    pub index: u8,
    pub hash: u32,
}

impl RemoteIndexEntry {
    pub fn new(index: u8, hash: u32) -> Self {
        RemoteIndexEntry { index, hash }
    }

    pub fn to_bytes(&self) -> [u8; INDEX_RECORD_SIZE] {
        let hash = self.hash.to_le_bytes();
        [self.index, hash[0], hash[1], hash[2], hash[3]]
    }
}

/// Parse a `GET_BEHAVIOUR_INDICES` result payload, preserving order.
pub fn parse_indices(payload: &[u8]) -> Result<Vec<RemoteIndexEntry>, ProtocolError> {
    if payload.len() % INDEX_RECORD_SIZE != 0 {
        return Err(ProtocolError::LengthMismatch {
            expected: payload.len() / INDEX_RECORD_SIZE * INDEX_RECORD_SIZE,
            actual: payload.len(),
        });
    }
    let mut reader = ByteReader::new(payload);
    let mut entries = Vec::with_capacity(payload.len() / INDEX_RECORD_SIZE);
    while !reader.is_empty() {
        entries.push(read_entry(&mut reader)?);
    }
    Ok(entries)
}

/// Parse the result of `ADD_BEHAVIOUR` or `REPLACE_BEHAVIOUR`.
pub fn parse_stored(payload: &[u8]) -> Result<RemoteIndexEntry, ProtocolError> {
    exact_len(payload, INDEX_RECORD_SIZE)?;
    Ok(read_entry(&mut ByteReader::new(payload))?)
}

/// Parse the result of `REMOVE_BEHAVIOUR`.
pub fn parse_removed(payload: &[u8]) -> Result<u8, ProtocolError> {
    exact_len(payload, 1)?;
    Ok(payload[0])
}

/// Parse the result of `GET_BEHAVIOUR`.
pub fn parse_behaviour(payload: &[u8]) -> Result<Behaviour, ProtocolError> {
    let mut reader = ByteReader::new(payload);
    let index = reader.read_u8()?;
    Ok(Behaviour::with_index(index, reader.read_rest().to_vec()))
}

fn read_entry(reader: &mut ByteReader<'_>) -> Result<RemoteIndexEntry, ProtocolError> {
    Ok(RemoteIndexEntry {
        index: reader.read_u8()?,
        hash: reader.read_u32()?,
    })
}

fn exact_len(payload: &[u8], expected: usize) -> Result<(), ProtocolError> {
    if payload.len() != expected {
        return Err(ProtocolError::LengthMismatch {
            expected,
            actual: payload.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use station_packet::PacketError;

    #[test]
    fn test_parse_indices() {
        let mut payload = RemoteIndexEntry::new(3, 0xDEAD_BEEF).to_bytes().to_vec();
        payload.extend_from_slice(&RemoteIndexEntry::new(7, 1).to_bytes());

        let entries = parse_indices(&payload).unwrap();
        assert_eq!(
            entries,
            vec![
                RemoteIndexEntry::new(3, 0xDEAD_BEEF),
                RemoteIndexEntry::new(7, 1)
            ]
        );
        assert_eq!(&payload[1..5], &[0xEF, 0xBE, 0xAD, 0xDE]);
        assert!(parse_indices(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_parse_indices_rejects_partial_record() {
        assert_eq!(
            parse_indices(&[1, 2, 3, 4, 5, 6]),
            Err(ProtocolError::LengthMismatch {
                expected: 5,
                actual: 6
            })
        );
    }

    #[test]
    fn test_parse_stored_and_removed() {
        assert_eq!(
            parse_stored(&[4, 1, 0, 0, 0]).unwrap(),
            RemoteIndexEntry::new(4, 1)
        );
        assert!(matches!(
            parse_stored(&[4, 1, 0]),
            Err(ProtocolError::LengthMismatch { .. })
        ));
        assert_eq!(parse_removed(&[9]).unwrap(), 9);
        assert!(parse_removed(&[]).is_err());
    }

    #[test]
    fn test_parse_behaviour() {
        let behaviour = parse_behaviour(&[7, 0xAA, 0xBB]).unwrap();
        assert_eq!(behaviour.index, Some(7));
        assert_eq!(behaviour.payload, vec![0xAA, 0xBB]);

        assert_eq!(
            parse_behaviour(&[]),
            Err(ProtocolError::Packet(PacketError::PayloadTooShort {
                needed: 1,
                remaining: 0
            }))
        );
    }
}
