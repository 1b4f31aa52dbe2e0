//! Sorted String Tables.
//!
//! An SST is an immutable on-disk table produced by compacting a sealed
//! memtable. File layout, all integers big-endian:
//!
//! ```text
//! +-----------------+------------------+------------------+-----------+
//! |   data section  |  index section   |  filter section  |  footer   |
//! +-----------------+------------------+------------------+-----------+
//! ```
//!
//! The data section is a run of data blocks, each a run of
//! `{key_len:u32, value_len:u32, key, value}` entries in ascending key
//! order. The index section holds one [`IndexEntry`] per block, the filter
//! section one serialized bloom filter per block keyed by the block's byte
//! length, and the footer records the three section lengths.

mod block;
mod index;
mod node;
mod reader;
mod writer;

use bytes::{Buf, Bytes};

pub use index::IndexEntry;
pub use node::Node;
pub use reader::{SstIterator, SstReader};
pub use writer::SstWriter;

use crate::{Error, Result};

/// Footer width at the end of every SST file.
pub const FOOTER_SIZE: usize = 12;

/// One key-value entry materialized from the data section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    /// The key bytes.
    pub key: Bytes,
    /// The value bytes; empty marks a tombstone.
    pub value: Bytes,
}

/// Fixed-size trailer recording the three section lengths.
///
/// Invariant: `data_len + index_len + filter_len + 12 == file_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footer {
    /// Byte length of the data section.
    pub data_len: u32,
    /// Byte length of the index section.
    pub index_len: u32,
    /// Byte length of the filter section.
    pub filter_len: u32,
}

impl Footer {
    /// Serialize to the fixed 12-byte wire form.
    pub fn encode(&self) -> [u8; FOOTER_SIZE] {
        let mut buf = [0u8; FOOTER_SIZE];
        buf[0..4].copy_from_slice(&self.data_len.to_be_bytes());
        buf[4..8].copy_from_slice(&self.index_len.to_be_bytes());
        buf[8..12].copy_from_slice(&self.filter_len.to_be_bytes());
        buf
    }

    /// Parse from the last 12 bytes of a file.
    pub fn decode(mut data: &[u8]) -> Result<Self> {
        if data.len() != FOOTER_SIZE {
            return Err(Error::InvalidSstFormat(format!(
                "footer must be {} bytes, got {}",
                FOOTER_SIZE,
                data.len()
            )));
        }
        Ok(Self {
            data_len: data.get_u32(),
            index_len: data.get_u32(),
            filter_len: data.get_u32(),
        })
    }

    /// Validate the section sum against the file size.
    pub fn check_file_size(&self, file_size: u64) -> Result<()> {
        let expected = self.data_len as u64
            + self.index_len as u64
            + self.filter_len as u64
            + FOOTER_SIZE as u64;
        if expected != file_size {
            return Err(Error::InvalidSstFormat(format!(
                "section lengths sum to {} but file is {} bytes",
                expected, file_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_footer_round_trip() {
        let footer = Footer {
            data_len: 1000,
            index_len: 200,
            filter_len: 300,
        };
        let encoded = footer.encode();
        assert_eq!(encoded.len(), FOOTER_SIZE);
        assert_eq!(Footer::decode(&encoded).unwrap(), footer);
    }

    #[test]
    fn test_footer_file_size_invariant() {
        let footer = Footer {
            data_len: 100,
            index_len: 50,
            filter_len: 25,
        };
        assert!(footer.check_file_size(100 + 50 + 25 + 12).is_ok());
        assert!(matches!(
            footer.check_file_size(100),
            Err(Error::InvalidSstFormat(_))
        ));
    }

    #[test]
    fn test_footer_rejects_wrong_width() {
        assert!(matches!(
            Footer::decode(&[0u8; 11]),
            Err(Error::InvalidSstFormat(_))
        ));
    }
}
