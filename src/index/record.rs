//! Index record codec
//!
//! Packing and unpacking of the fixed 58-byte index record.
//!
//! ## Record Format
//! ```text
//! ┌─────────┬──────────┬──────────┬────────────┬─────────┬───────────┐
//! │ Key (32)│ Start (8)│ Length(8)│ Position(8)│ Active  │ EncodedLen│
//! │         │   LE u64 │   LE u64 │     LE u64 │ (1 byte)│  (1 byte) │
//! └─────────┴──────────┴──────────┴────────────┴─────────┴───────────┘
//! ```
//!
//! The numeric fields always occupy bytes 0..56; byte 57 records that
//! encoded length (constant 56, validated on read). Layout is an explicit
//! byte codec so on-disk bytes never depend on platform alignment rules.

use crate::error::{KegError, Result};

/// Total record size on disk
pub const RECORD_LEN: usize = 58;

/// Item key size (SHA-256 digest)
pub const KEY_LEN: usize = 32;

/// Byte offset of the `active` flag within a record
pub const ACTIVE_OFFSET: usize = 56;

/// Fixed byte length of the key/start/length/position encoding
const ENCODED_LEN: usize = 56;

const START_OFFSET: usize = 32;
const LENGTH_OFFSET: usize = 40;
const POSITION_OFFSET: usize = 48;
const ENCODED_LEN_OFFSET: usize = 57;

/// Derived 32-byte item key
pub type ItemKey = [u8; KEY_LEN];

/// One live index entry: where a key's payload lives in the data file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRecord {
    /// Hash of bucket + external id
    pub key: ItemKey,

    /// Byte offset of the payload in the data file
    pub start: u64,

    /// Payload length in bytes
    pub length: u64,

    /// Ordinal slot index; `position * 58` is this record's own file offset
    pub position: u64,
}

/// Pack a live record into its 58-byte on-disk form
pub fn pack_record(record: &IndexRecord) -> [u8; RECORD_LEN] {
    let mut buf = [0u8; RECORD_LEN];
    buf[..KEY_LEN].copy_from_slice(&record.key);
    buf[START_OFFSET..START_OFFSET + 8].copy_from_slice(&record.start.to_le_bytes());
    buf[LENGTH_OFFSET..LENGTH_OFFSET + 8].copy_from_slice(&record.length.to_le_bytes());
    buf[POSITION_OFFSET..POSITION_OFFSET + 8]
        .copy_from_slice(&record.position.to_le_bytes());
    buf[ACTIVE_OFFSET] = 1;
    buf[ENCODED_LEN_OFFSET] = ENCODED_LEN as u8;
    buf
}

/// Unpack one 58-byte slot.
///
/// Returns `Ok(None)` for a tombstoned slot (active byte cleared).
pub fn unpack_record(buf: &[u8]) -> Result<Option<IndexRecord>> {
    if buf.len() != RECORD_LEN {
        return Err(KegError::CorruptRecord(format!(
            "index slot is {} bytes, expected {}",
            buf.len(),
            RECORD_LEN
        )));
    }

    if buf[ACTIVE_OFFSET] == 0 {
        return Ok(None);
    }

    let encoded = buf[ENCODED_LEN_OFFSET] as usize;
    if encoded != ENCODED_LEN {
        return Err(KegError::CorruptRecord(format!(
            "index slot encoded length is {}, expected {}",
            encoded, ENCODED_LEN
        )));
    }

    let mut key = [0u8; KEY_LEN];
    key.copy_from_slice(&buf[..KEY_LEN]);

    Ok(Some(IndexRecord {
        key,
        start: read_u64(buf, START_OFFSET),
        length: read_u64(buf, LENGTH_OFFSET),
        position: read_u64(buf, POSITION_OFFSET),
    }))
}

fn read_u64(buf: &[u8], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[offset..offset + 8]);
    u64::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> IndexRecord {
        IndexRecord {
            key: [0xAB; KEY_LEN],
            start: 0x0102030405060708,
            length: 259,
            position: 7,
        }
    }

    #[test]
    fn pack_unpack_round_trip() {
        let record = sample_record();
        let buf = pack_record(&record);
        let parsed = unpack_record(&buf).unwrap().expect("live record");
        assert_eq!(parsed, record);
    }

    #[test]
    fn byte_layout_is_exact() {
        let buf = pack_record(&sample_record());
        assert_eq!(&buf[..32], &[0xAB; 32]);
        // start, little-endian
        assert_eq!(&buf[32..40], &[0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01]);
        // length = 259 = 0x0103
        assert_eq!(&buf[40..48], &[0x03, 0x01, 0, 0, 0, 0, 0, 0]);
        // position = 7
        assert_eq!(&buf[48..56], &[7, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(buf[56], 1);
        assert_eq!(buf[57], 56);
    }

    #[test]
    fn tombstoned_slot_unpacks_to_none() {
        let mut buf = pack_record(&sample_record());
        buf[ACTIVE_OFFSET] = 0;
        assert!(unpack_record(&buf).unwrap().is_none());
    }

    #[test]
    fn bad_encoded_length_is_corrupt() {
        let mut buf = pack_record(&sample_record());
        buf[57] = 55;
        assert!(matches!(
            unpack_record(&buf),
            Err(KegError::CorruptRecord(_))
        ));
    }

    #[test]
    fn short_slot_is_corrupt() {
        let buf = pack_record(&sample_record());
        assert!(matches!(
            unpack_record(&buf[..40]),
            Err(KegError::CorruptRecord(_))
        ));
    }
}
