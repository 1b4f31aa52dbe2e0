//! In-memory handle for one installed SST.

use std::path::Path;

use bytes::Bytes;

use super::reader::{SstIterator, SstReader};
use crate::{Error, Result};

/// An SST installed at a level with a per-level sequence number.
///
/// Within a level, higher `seq` means newer; the read path visits nodes
/// newest-first.
pub struct Node {
    level: usize,
    seq: u32,
    reader: SstReader,
}

impl Node {
    /// Wrap an opened reader with its placement metadata.
    pub fn new(level: usize, seq: u32, reader: SstReader) -> Self {
        Self { level, seq, reader }
    }

    /// Point lookup. A tombstone (empty value) surfaces as
    /// [`Error::ValueDeleted`], distinct from [`Error::KeyNotFound`].
    pub fn get(&self, key: &[u8]) -> Result<Bytes> {
        let value = self.reader.get(key)?;
        if value.is_empty() {
            return Err(Error::ValueDeleted);
        }
        Ok(value)
    }

    /// Iterate all entries in ascending key order.
    pub fn iter(&self) -> SstIterator<'_> {
        self.reader.iter()
    }

    /// Level this node is installed at.
    pub fn level(&self) -> usize {
        self.level
    }

    /// Install sequence within the level.
    pub fn seq(&self) -> u32 {
        self.seq
    }

    /// Smallest key, if the table is non-empty.
    pub fn min_key(&self) -> Option<&[u8]> {
        self.reader.min_key()
    }

    /// Largest key, if the table is non-empty.
    pub fn max_key(&self) -> Option<&[u8]> {
        self.reader.max_key()
    }

    /// File size in bytes.
    pub fn size(&self) -> u64 {
        self.reader.file_size()
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        self.reader.path()
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("level", &self.level)
            .field("seq", &self.seq)
            .field("path", &self.reader.path())
            .field("size", &self.reader.file_size())
            .finish()
    }
}
