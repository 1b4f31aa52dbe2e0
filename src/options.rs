//! Configuration options for siltdb.

use crate::filter::{new_bloom_filter, FilterConstructor};

/// Default subdirectory for WAL files under the data directory.
pub const DEFAULT_WAL_DIR: &str = "wal";

/// Default subdirectory for SST files under the data directory.
pub const DEFAULT_SST_DIR: &str = "sst";

/// Default number of entries per SST data block.
pub const DEFAULT_BLOCK_SIZE: usize = 16;

/// Default WAL byte size that triggers memtable rotation (1MB).
pub const DEFAULT_WAL_SIZE: u64 = 1024 * 1024;

/// Default number of on-disk levels. Only level 0 is written by the current
/// compaction scheme; the rest are reserved.
pub const DEFAULT_LEVEL_COUNT: usize = 5;

/// Default B-tree branching hint for the btree memtable.
pub const DEFAULT_MEMTABLE_DEGREE: usize = 16;

/// Default bloom filter bit count per data block.
pub const DEFAULT_BLOOM_BITS: u64 = 1024;

/// Default bloom filter hash probe count.
pub const DEFAULT_BLOOM_HASHES: u32 = 3;

/// Memtable backing structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemTableKind {
    /// Ordered map with B-tree layout.
    #[default]
    BTree,
    /// Concurrent skip list.
    SkipList,
}

/// Store configuration options.
///
/// The data directory itself is the argument to [`Store::open`]; everything
/// under it is controlled here.
///
/// [`Store::open`]: crate::Store::open
#[derive(Debug, Clone)]
pub struct Options {
    /// Subdirectory name for WAL files.
    pub wal_dir: String,

    /// Subdirectory name for SST files.
    pub sst_dir: String,

    /// If `true`, every WAL append is followed by fsync.
    pub auto_sync: bool,

    /// Entry count at which the SST writer rolls a data block.
    pub block_size: usize,

    /// WAL byte size beyond which the engine seals the current
    /// (memtable, WAL) pair and opens a fresh one.
    pub wal_size: u64,

    /// Memtable backing structure.
    pub memtable_kind: MemTableKind,

    /// Branching hint for the btree memtable. Advisory: the std B-tree map
    /// has a fixed fanout.
    pub memtable_degree: usize,

    /// Number of on-disk levels to pre-allocate.
    pub level_count: usize,

    /// Constructor for per-block membership filters.
    pub filter_constructor: FilterConstructor,

    /// Bit count handed to the filter constructor.
    pub bloom_bits: u64,

    /// Hash probe count handed to the filter constructor.
    pub bloom_hashes: u32,

    /// Emit extra diagnostics from rotation and compaction.
    pub is_debug: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            wal_dir: DEFAULT_WAL_DIR.to_string(),
            sst_dir: DEFAULT_SST_DIR.to_string(),
            auto_sync: true,
            block_size: DEFAULT_BLOCK_SIZE,
            wal_size: DEFAULT_WAL_SIZE,
            memtable_kind: MemTableKind::default(),
            memtable_degree: DEFAULT_MEMTABLE_DEGREE,
            level_count: DEFAULT_LEVEL_COUNT,
            filter_constructor: new_bloom_filter,
            bloom_bits: DEFAULT_BLOOM_BITS,
            bloom_hashes: DEFAULT_BLOOM_HASHES,
            is_debug: false,
        }
    }
}

impl Options {
    /// Create new options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the options.
    pub fn validate(&self) -> crate::Result<()> {
        if self.wal_dir.is_empty() || self.sst_dir.is_empty() {
            return Err(crate::Error::InvalidConfiguration(
                "wal_dir and sst_dir must be non-empty".into(),
            ));
        }

        if self.wal_dir == self.sst_dir {
            return Err(crate::Error::InvalidConfiguration(
                "wal_dir and sst_dir must differ".into(),
            ));
        }

        if self.block_size == 0 {
            return Err(crate::Error::InvalidConfiguration(
                "block_size must be at least 1 entry".into(),
            ));
        }

        if self.wal_size == 0 {
            return Err(crate::Error::InvalidConfiguration(
                "wal_size must be non-zero".into(),
            ));
        }

        if self.level_count == 0 {
            return Err(crate::Error::InvalidConfiguration(
                "level_count must be at least 1".into(),
            ));
        }

        if self.bloom_bits == 0 || self.bloom_hashes == 0 {
            return Err(crate::Error::InvalidConfiguration(
                "bloom_bits and bloom_hashes must be non-zero".into(),
            ));
        }

        Ok(())
    }
}

/// Builder for [`Options`].
#[derive(Debug, Clone, Default)]
pub struct OptionsBuilder {
    options: Options,
}

impl OptionsBuilder {
    /// Create a new builder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the WAL subdirectory name.
    pub fn wal_dir(mut self, dir: impl Into<String>) -> Self {
        self.options.wal_dir = dir.into();
        self
    }

    /// Set the SST subdirectory name.
    pub fn sst_dir(mut self, dir: impl Into<String>) -> Self {
        self.options.sst_dir = dir.into();
        self
    }

    /// Set per-record fsync behavior.
    pub fn auto_sync(mut self, value: bool) -> Self {
        self.options.auto_sync = value;
        self
    }

    /// Set the block entry count threshold.
    pub fn block_size(mut self, entries: usize) -> Self {
        self.options.block_size = entries;
        self
    }

    /// Set the WAL rotation threshold in bytes.
    pub fn wal_size(mut self, bytes: u64) -> Self {
        self.options.wal_size = bytes;
        self
    }

    /// Set the memtable backing structure.
    pub fn memtable_kind(mut self, kind: MemTableKind) -> Self {
        self.options.memtable_kind = kind;
        self
    }

    /// Set the btree memtable branching hint.
    pub fn memtable_degree(mut self, degree: usize) -> Self {
        self.options.memtable_degree = degree;
        self
    }

    /// Set the number of pre-allocated levels.
    pub fn level_count(mut self, levels: usize) -> Self {
        self.options.level_count = levels;
        self
    }

    /// Set the filter constructor and its parameters.
    pub fn filter(mut self, constructor: FilterConstructor, bits: u64, hashes: u32) -> Self {
        self.options.filter_constructor = constructor;
        self.options.bloom_bits = bits;
        self.options.bloom_hashes = hashes;
        self
    }

    /// Enable verbose diagnostics.
    pub fn debug(mut self, value: bool) -> Self {
        self.options.is_debug = value;
        self
    }

    /// Build the options.
    pub fn build(self) -> crate::Result<Options> {
        self.options.validate()?;
        Ok(self.options)
    }
}
