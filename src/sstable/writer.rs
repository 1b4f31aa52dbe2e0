//! SST writer: builds one complete table file from an ordered key stream.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use bytes::{BufMut, BytesMut};

use super::block::DataBlockBuilder;
use super::{Footer, IndexEntry};
use crate::filter::Filter;
use crate::options::Options;
use crate::{Error, Result};

/// Builds an SST from `(key, value)` pairs supplied in ascending key order.
///
/// Entries accumulate into data blocks; a block closes once it reaches the
/// configured entry count, emitting its bloom filter (keyed by the block's
/// byte length) and an index entry. `flush` writes the three sections and
/// the footer; after that no further `add` is permitted.
pub struct SstWriter {
    path: PathBuf,
    file: BufWriter<File>,
    data_buf: BytesMut,
    block: DataBlockBuilder,
    filter: Box<dyn Filter>,
    filters: Vec<(i64, Vec<u8>)>,
    index: Vec<IndexEntry>,
    block_size: usize,
    finished: bool,
}

impl SstWriter {
    /// Create or truncate the target file.
    pub fn new(conf: &Options, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;

        Ok(Self {
            path,
            file: BufWriter::new(file),
            data_buf: BytesMut::new(),
            block: DataBlockBuilder::new(),
            filter: (conf.filter_constructor)(conf.bloom_bits, conf.bloom_hashes),
            filters: Vec::new(),
            index: Vec::new(),
            block_size: conf.block_size,
            finished: false,
        })
    }

    /// Path of the file being written.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry to the current block.
    pub fn add(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        if self.finished {
            return Err(Error::Closed);
        }
        if key.is_empty() {
            return Err(Error::EmptyKey);
        }

        self.block.add(key, value);
        self.filter.add(key);

        if self.block.entry_count() >= self.block_size {
            self.roll_block();
        }
        Ok(())
    }

    /// Close the in-progress block: save its filter under the block's byte
    /// length, record its index entry, and append its bytes to the data
    /// section.
    fn roll_block(&mut self) {
        if self.block.is_empty() {
            return;
        }

        let block = self.block.finish();
        let length = block.data.len() as i64;
        let offset = self.data_buf.len() as i64;

        self.filters.push((length, self.filter.save()));
        self.filter.reset();

        self.index.push(IndexEntry {
            start_key: block.first_key,
            end_key: block.last_key,
            offset,
            length,
        });

        self.data_buf.extend_from_slice(&block.data);
    }

    /// Roll the final block and write data, index, filter sections and the
    /// footer. The file is synced before this returns.
    ///
    /// On any I/O error the on-disk file is indeterminate; the caller is
    /// expected to delete it and retry from the source memtable.
    pub fn flush(&mut self) -> Result<()> {
        if self.finished {
            return Err(Error::Closed);
        }
        self.roll_block();
        self.finished = true;

        let mut index_buf = BytesMut::new();
        for entry in &self.index {
            entry.encode_to(&mut index_buf);
        }

        let mut filter_buf = BytesMut::new();
        for (block_length, filter_bytes) in &self.filters {
            filter_buf.put_i64(*block_length);
            filter_buf.put_u32(filter_bytes.len() as u32);
            filter_buf.put_slice(filter_bytes);
        }

        let footer = Footer {
            data_len: self.data_buf.len() as u32,
            index_len: index_buf.len() as u32,
            filter_len: filter_buf.len() as u32,
        };

        self.file.write_all(&self.data_buf)?;
        self.file.write_all(&index_buf)?;
        self.file.write_all(&filter_buf)?;
        self.file.write_all(&footer.encode())?;
        self.file.flush()?;
        self.file.get_ref().sync_all()?;

        Ok(())
    }

    /// Release file resources.
    pub fn close(self) -> Result<()> {
        Ok(())
    }
}
