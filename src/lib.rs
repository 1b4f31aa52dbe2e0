//! # siltdb
//!
//! A persistent, embeddable ordered key-value store built around a
//! Log-Structured Merge tree.
//!
//! ## Design
//!
//! - **Write path**: every mutation is appended to a CRC-protected
//!   write-ahead log before it reaches the in-memory ordered memtable, so an
//!   acknowledged write survives a crash.
//! - **Rotation**: once the WAL crosses a size threshold, the
//!   (memtable, WAL) pair is sealed and a fresh pair installed; a background
//!   worker serializes sealed memtables into immutable level-0 Sorted String
//!   Tables and reclaims their WALs.
//! - **Read path**: mutable memtable, then sealed memtables newest to
//!   oldest, then on-disk tables by level and descending install order.
//!   First hit wins; a tombstone ends the search.
//! - **Recovery**: on open, the SST directory is scanned into level state
//!   and every surviving WAL is replayed into a sealed memtable that the
//!   worker compacts in the background.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use siltdb::Store;
//!
//! # fn main() -> siltdb::Result<()> {
//! let store = Store::open("./data")?;
//!
//! store.put(b"hello", b"world")?;
//! let value = store.get(b"hello")?;
//! store.delete(b"hello")?;
//!
//! store.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! Deleted keys read back as [`Error::ValueDeleted`], distinct from
//! [`Error::KeyNotFound`]. A consequence of tombstones being empty values:
//! storing a legitimately empty value is indistinguishable from a delete.

// Public modules
pub mod error;
pub mod filter;
pub mod memtable;
pub mod options;

// Storage layers
pub mod sstable;
pub mod wal;

// Engine internals
mod compaction;
mod recovery;
mod store;
mod util;

pub use error::{Error, Result};
pub use filter::{new_bloom_filter, BloomFilter, Filter, FilterConstructor};
pub use memtable::{new_memtable, BTreeMemTable, MemTable, SkipListMemTable};
pub use options::{MemTableKind, Options, OptionsBuilder};
pub use sstable::{Node, SstReader, SstWriter};
pub use store::Store;
pub use wal::Wal;
