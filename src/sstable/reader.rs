//! SST reader: eager table loading and point lookups.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use bytes::{Buf, Bytes};

use super::block::parse_entries;
use super::{Footer, IndexEntry, KeyValue, FOOTER_SIZE};
use crate::filter::Filter;
use crate::options::Options;
use crate::{Error, Result};

/// Reader over one SST file.
///
/// `open` loads the whole table eagerly: the footer is validated, the data
/// section is parsed into an in-memory entry list (with per-block ranges),
/// and the index and filter sections are decoded. The file handle is not
/// retained afterwards.
pub struct SstReader {
    path: PathBuf,
    file_size: u64,
    index: Vec<IndexEntry>,
    filters: HashMap<i64, Box<dyn Filter>>,
    kv_list: Vec<KeyValue>,
    /// Entry range in `kv_list` for each index entry, in block order.
    block_ranges: Vec<(usize, usize)>,
}

impl SstReader {
    /// Open and fully load the table at `path`.
    pub fn open(conf: &Options, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path)?;
        let file_size = file.metadata()?.len();

        if file_size < FOOTER_SIZE as u64 {
            return Err(Error::InvalidSstFormat(format!(
                "file is {} bytes, smaller than the footer",
                file_size
            )));
        }

        let mut footer_bytes = [0u8; FOOTER_SIZE];
        file.seek(SeekFrom::End(-(FOOTER_SIZE as i64)))?;
        file.read_exact(&mut footer_bytes)?;
        let footer = Footer::decode(&footer_bytes)?;
        footer.check_file_size(file_size)?;

        file.seek(SeekFrom::Start(0))?;
        let mut data_section = vec![0u8; footer.data_len as usize];
        file.read_exact(&mut data_section)?;
        let mut index_section = vec![0u8; footer.index_len as usize];
        file.read_exact(&mut index_section)?;
        let mut filter_section = vec![0u8; footer.filter_len as usize];
        file.read_exact(&mut filter_section)?;

        let index = Self::load_index(&index_section)?;
        let (kv_list, block_ranges) = Self::load_data_blocks(&data_section, &index)?;
        let filters = Self::load_filters(conf, &filter_section)?;

        Ok(Self {
            path,
            file_size,
            index,
            filters,
            kv_list,
            block_ranges,
        })
    }

    fn load_index(mut section: &[u8]) -> Result<Vec<IndexEntry>> {
        let mut index = Vec::new();
        while !section.is_empty() {
            let (entry, consumed) = IndexEntry::decode(section)?;
            section = &section[consumed..];
            index.push(entry);
        }
        Ok(index)
    }

    fn load_data_blocks(
        section: &[u8],
        index: &[IndexEntry],
    ) -> Result<(Vec<KeyValue>, Vec<(usize, usize)>)> {
        let mut kv_list = Vec::new();
        let mut ranges = Vec::with_capacity(index.len());

        for entry in index {
            if entry.offset < 0 || entry.length < 0 {
                return Err(Error::sst_corrupted("negative block offset or length"));
            }
            let start = entry.offset as usize;
            let end = start + entry.length as usize;
            if end > section.len() {
                return Err(Error::sst_corrupted(
                    "block extends beyond the data section",
                ));
            }

            let from = kv_list.len();
            kv_list.extend(parse_entries(&section[start..end])?);
            ranges.push((from, kv_list.len()));
        }

        Ok((kv_list, ranges))
    }

    fn load_filters(conf: &Options, mut section: &[u8]) -> Result<HashMap<i64, Box<dyn Filter>>> {
        let mut filters = HashMap::new();
        while !section.is_empty() {
            if section.len() < 12 {
                return Err(Error::FilterInvalid("filter entry header truncated".into()));
            }
            let block_length = section.get_i64();
            let filter_len = section.get_u32() as usize;
            if filter_len == 0 || filter_len > section.len() {
                return Err(Error::FilterInvalid(format!(
                    "filter length {} inconsistent with remaining {} bytes",
                    filter_len,
                    section.len()
                )));
            }

            let mut filter = (conf.filter_constructor)(conf.bloom_bits, conf.bloom_hashes);
            filter.load(&section[..filter_len])?;
            section.advance(filter_len);

            filters.insert(block_length, filter);
        }
        Ok(filters)
    }

    /// Point lookup. An empty value (tombstone) is returned as-is; mapping it
    /// to the deletion error is the caller's concern.
    ///
    /// The index narrows the search to blocks whose key range covers `key`;
    /// each candidate block is gated by its bloom filter and then searched
    /// by bisection over the materialized entries.
    pub fn get(&self, key: &[u8]) -> Result<Bytes> {
        for (pos, entry) in self.index.iter().enumerate() {
            if !entry.contains(key) {
                continue;
            }
            if let Some(filter) = self.filters.get(&entry.length) {
                if !filter.contains(key) {
                    continue;
                }
            }

            let (from, to) = self.block_ranges[pos];
            let block = &self.kv_list[from..to];
            if let Ok(i) = block.binary_search_by(|kv| kv.key.as_ref().cmp(key)) {
                return Ok(block[i].value.clone());
            }
        }
        Err(Error::KeyNotFound)
    }

    /// Iterate all entries in file order (ascending key order). The iterator
    /// is finite and not restartable; call `iter` again for a second pass.
    pub fn iter(&self) -> SstIterator<'_> {
        SstIterator {
            entries: &self.kv_list,
            pos: 0,
        }
    }

    /// Smallest key in the table, if any.
    pub fn min_key(&self) -> Option<&[u8]> {
        self.index.first().map(|e| e.start_key.as_ref())
    }

    /// Largest key in the table, if any.
    pub fn max_key(&self) -> Option<&[u8]> {
        self.index.last().map(|e| e.end_key.as_ref())
    }

    /// Total file size in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Number of materialized entries.
    pub fn entry_count(&self) -> usize {
        self.kv_list.len()
    }

    /// Path this table was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for SstReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SstReader")
            .field("path", &self.path)
            .field("file_size", &self.file_size)
            .field("blocks", &self.index.len())
            .field("entries", &self.kv_list.len())
            .finish()
    }
}

/// Forward iterator over a table's entries.
pub struct SstIterator<'a> {
    entries: &'a [KeyValue],
    pos: usize,
}

impl<'a> Iterator for SstIterator<'a> {
    type Item = &'a KeyValue;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.entries.get(self.pos)?;
        self.pos += 1;
        Some(entry)
    }
}
