//! Data block building and parsing.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::KeyValue;
use crate::{Error, Result};

/// Accumulates `{key_len, value_len, key, value}` entries for one data block.
pub(crate) struct DataBlockBuilder {
    buf: BytesMut,
    entry_count: usize,
    first_key: Option<Bytes>,
    last_key: Option<Bytes>,
}

/// A closed block ready to be appended to the data section.
pub(crate) struct FinishedBlock {
    pub data: Bytes,
    pub first_key: Bytes,
    pub last_key: Bytes,
}

impl DataBlockBuilder {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::new(),
            entry_count: 0,
            first_key: None,
            last_key: None,
        }
    }

    /// Append one entry. Keys must arrive in ascending order.
    pub fn add(&mut self, key: &[u8], value: &[u8]) {
        debug_assert!(
            self.last_key.as_deref().map_or(true, |last| key > last),
            "keys must be added in ascending order"
        );

        let key = Bytes::copy_from_slice(key);
        if self.first_key.is_none() {
            self.first_key = Some(key.clone());
        }
        self.last_key = Some(key.clone());

        self.buf.put_u32(key.len() as u32);
        self.buf.put_u32(value.len() as u32);
        self.buf.put_slice(&key);
        self.buf.put_slice(value);
        self.entry_count += 1;
    }

    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    pub fn is_empty(&self) -> bool {
        self.entry_count == 0
    }

    /// Close the block and reset the builder for the next one.
    pub fn finish(&mut self) -> FinishedBlock {
        debug_assert!(!self.is_empty(), "cannot finish an empty block");
        let data = self.buf.split().freeze();
        self.entry_count = 0;
        FinishedBlock {
            data,
            first_key: self.first_key.take().unwrap_or_default(),
            last_key: self.last_key.take().unwrap_or_default(),
        }
    }
}

/// Parse the entries of one block (or a whole data section).
pub(crate) fn parse_entries(mut data: &[u8]) -> Result<Vec<KeyValue>> {
    let mut entries = Vec::new();
    while !data.is_empty() {
        if data.len() < 8 {
            return Err(Error::sst_corrupted("entry header truncated"));
        }
        let key_len = data.get_u32() as usize;
        let value_len = data.get_u32() as usize;
        if data.len() < key_len + value_len {
            return Err(Error::sst_corrupted("entry payload truncated"));
        }
        let key = Bytes::copy_from_slice(&data[..key_len]);
        data.advance(key_len);
        let value = Bytes::copy_from_slice(&data[..value_len]);
        data.advance(value_len);
        entries.push(KeyValue { key, value });
    }
    Ok(entries)
}
