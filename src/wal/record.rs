//! WAL record encoding.
//!
//! On-disk format (big-endian):
//!
//! ```text
//!  1 byte   record type   (0 = Put, 1 = Delete)
//!  4 bytes  key length
//!  4 bytes  value length
//!  N bytes  key
//!  M bytes  value
//!  4 bytes  crc32 (IEEE) over everything above
//! ```
//!
//! A Delete record carries a zero-length value; on replay the memtable
//! receives the empty value and reads observe the tombstone.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::util::crc::{crc32, verify_crc};
use crate::{Error, Result};

/// Fixed bytes before the key: type + key length + value length.
pub const HEADER_SIZE: usize = 9;

/// Trailing checksum width.
pub const CRC_SIZE: usize = 4;

/// Sanity cap on key length (10 MiB). Larger lengths indicate corruption.
pub const MAX_KEY_LEN: usize = 10 * 1024 * 1024;

/// Sanity cap on value length (100 MiB).
pub const MAX_VALUE_LEN: usize = 100 * 1024 * 1024;

/// Record type stored in the WAL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordType {
    /// Key-value insertion.
    Put = 0,
    /// Deletion marker.
    Delete = 1,
}

impl RecordType {
    /// Parse from the on-disk byte.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(RecordType::Put),
            1 => Some(RecordType::Delete),
            _ => None,
        }
    }
}

/// A single WAL record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Put or Delete.
    pub record_type: RecordType,
    /// The key bytes.
    pub key: Bytes,
    /// The value bytes; empty for Delete.
    pub value: Bytes,
}

impl Record {
    /// Build a record from a mutation. An empty value means Delete.
    pub fn new(key: &[u8], value: &[u8]) -> Self {
        let record_type = if value.is_empty() {
            RecordType::Delete
        } else {
            RecordType::Put
        };
        Self {
            record_type,
            key: Bytes::copy_from_slice(key),
            value: Bytes::copy_from_slice(value),
        }
    }

    /// Encoded length on disk.
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.key.len() + self.value.len() + CRC_SIZE
    }

    /// Serialize the record, appending the CRC over all preceding bytes.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        buf.put_u8(self.record_type as u8);
        buf.put_u32(self.key.len() as u32);
        buf.put_u32(self.value.len() as u32);
        buf.put_slice(&self.key);
        buf.put_slice(&self.value);
        let crc = crc32(&buf);
        buf.put_u32(crc);
        buf.freeze()
    }

    /// Decode one record from the front of `data`, returning it together
    /// with the number of bytes consumed.
    pub fn decode(data: &[u8]) -> Result<(Self, usize)> {
        if data.len() < HEADER_SIZE {
            return Err(Error::wal_corrupted("record header truncated"));
        }

        let mut header = &data[..HEADER_SIZE];
        let type_byte = header.get_u8();
        let record_type = RecordType::from_byte(type_byte)
            .ok_or_else(|| Error::codec(format!("unknown record type {}", type_byte)))?;
        let key_len = header.get_u32() as usize;
        let value_len = header.get_u32() as usize;

        if key_len == 0 {
            return Err(Error::EmptyKey);
        }
        if key_len > MAX_KEY_LEN {
            return Err(Error::KeyTooLarge {
                size: key_len,
                max: MAX_KEY_LEN,
            });
        }
        if value_len > MAX_VALUE_LEN {
            return Err(Error::ValueTooLarge {
                size: value_len,
                max: MAX_VALUE_LEN,
            });
        }

        let total = HEADER_SIZE + key_len + value_len + CRC_SIZE;
        if data.len() < total {
            return Err(Error::wal_corrupted("record payload truncated"));
        }

        let payload_end = HEADER_SIZE + key_len + value_len;
        let expected = (&data[payload_end..total]).get_u32();
        if !verify_crc(&data[..payload_end], expected) {
            return Err(Error::CrcMismatch {
                expected,
                actual: crc32(&data[..payload_end]),
            });
        }

        let key = Bytes::copy_from_slice(&data[HEADER_SIZE..HEADER_SIZE + key_len]);
        let value = Bytes::copy_from_slice(&data[HEADER_SIZE + key_len..payload_end]);

        Ok((
            Self {
                record_type,
                key,
                value,
            },
            total,
        ))
    }
}
