//! Block index entries.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{Error, Result};

/// Index entry describing one data block.
///
/// Wire form (big-endian):
/// `{start_key_len:u32, end_key_len:u32, start_key, end_key, offset:i64, length:i64}`.
/// `offset` is relative to the start of the data section; `length` is the
/// block's byte length and doubles as the lookup key into the filter section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// First key in the block.
    pub start_key: Bytes,
    /// Last key in the block.
    pub end_key: Bytes,
    /// Block offset within the data section.
    pub offset: i64,
    /// Block byte length.
    pub length: i64,
}

impl IndexEntry {
    /// Whether `key` falls inside this block's inclusive key range.
    pub fn contains(&self, key: &[u8]) -> bool {
        key >= self.start_key.as_ref() && key <= self.end_key.as_ref()
    }

    /// Append the wire form to `buf`.
    pub fn encode_to(&self, buf: &mut BytesMut) {
        buf.put_u32(self.start_key.len() as u32);
        buf.put_u32(self.end_key.len() as u32);
        buf.put_slice(&self.start_key);
        buf.put_slice(&self.end_key);
        buf.put_i64(self.offset);
        buf.put_i64(self.length);
    }

    /// Decode one entry from the front of `data`, returning it together with
    /// the number of bytes consumed.
    pub fn decode(data: &[u8]) -> Result<(Self, usize)> {
        if data.len() < 8 {
            return Err(Error::sst_corrupted("index entry header truncated"));
        }
        let mut cursor = data;
        let start_key_len = cursor.get_u32() as usize;
        let end_key_len = cursor.get_u32() as usize;

        let total = 8 + start_key_len + end_key_len + 16;
        if data.len() < total {
            return Err(Error::sst_corrupted("index entry truncated"));
        }

        let start_key = Bytes::copy_from_slice(&cursor[..start_key_len]);
        cursor.advance(start_key_len);
        let end_key = Bytes::copy_from_slice(&cursor[..end_key_len]);
        cursor.advance(end_key_len);
        let offset = cursor.get_i64();
        let length = cursor.get_i64();

        Ok((
            Self {
                start_key,
                end_key,
                offset,
                length,
            },
            total,
        ))
    }
}
