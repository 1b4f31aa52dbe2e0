//! Write-ahead log.
//!
//! One `Wal` owns one append-only file named `wal-<id>.log`. Every mutation
//! is appended as a CRC-protected [`Record`] before the memtable sees it, so
//! an acknowledged write survives a crash and is rebuilt by replay on open.

mod record;

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub use record::{Record, RecordType, MAX_KEY_LEN, MAX_VALUE_LEN};

use crate::memtable::MemTable;
use crate::options::Options;
use crate::util::filename::{delete_file, wal_file_path};
use crate::{Error, Result};

/// Append-only log of mutations.
pub struct Wal {
    id: u32,
    path: PathBuf,
    writer: BufWriter<File>,
    size: u64,
    auto_sync: bool,
}

impl Wal {
    /// Create or open the log with the given id for appending.
    pub fn new(conf: &Options, dir: &Path, id: u32) -> Result<Self> {
        let path = wal_file_path(dir, id);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            id,
            path,
            writer: BufWriter::new(file),
            size,
            auto_sync: conf.auto_sync,
        })
    }

    /// Log id.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current byte length of the log.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Append one record. An empty value records a Delete.
    pub fn write(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Err(Error::EmptyKey);
        }
        if key.len() > MAX_KEY_LEN {
            return Err(Error::KeyTooLarge {
                size: key.len(),
                max: MAX_KEY_LEN,
            });
        }
        if value.len() > MAX_VALUE_LEN {
            return Err(Error::ValueTooLarge {
                size: value.len(),
                max: MAX_VALUE_LEN,
            });
        }

        let encoded = Record::new(key, value).encode();
        self.writer.write_all(&encoded)?;
        self.writer.flush()?;
        if self.auto_sync {
            self.writer.get_ref().sync_data()?;
        }
        self.size += encoded.len() as u64;
        Ok(())
    }

    /// Stream-decode every record and replay it into `memtable`.
    ///
    /// Delete records decode to an empty value, so the memtable ends up
    /// holding the tombstone marker.
    pub fn read_all(&self, memtable: &dyn MemTable) -> Result<()> {
        let data = std::fs::read(&self.path)?;
        let mut offset = 0;
        while offset < data.len() {
            let (record, consumed) = Record::decode(&data[offset..])?;
            memtable.put(&record.key, &record.value)?;
            offset += consumed;
        }
        Ok(())
    }

    /// Flush buffered data and sync the file.
    pub fn close(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        Ok(())
    }

    /// Remove the backing file from disk.
    pub fn delete(&mut self) -> Result<()> {
        self.writer.flush()?;
        delete_file(&self.path)?;
        Ok(())
    }
}

impl std::fmt::Debug for Wal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wal")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("size", &self.size)
            .field("auto_sync", &self.auto_sync)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memtable::{new_memtable, MemTable};
    use crate::options::MemTableKind;
    use bytes::Bytes;
    use tempfile::tempdir;

    fn test_options() -> Options {
        Options {
            auto_sync: false,
            ..Options::default()
        }
    }

    #[test]
    fn test_write_and_replay() {
        let dir = tempdir().unwrap();
        let conf = test_options();

        let mut wal = Wal::new(&conf, dir.path(), 0).unwrap();
        wal.write(b"alpha", b"1").unwrap();
        wal.write(b"beta", b"2").unwrap();
        wal.write(b"alpha", b"3").unwrap();
        wal.close().unwrap();

        let memtable = new_memtable(MemTableKind::BTree, 16);
        let wal = Wal::new(&conf, dir.path(), 0).unwrap();
        wal.read_all(&*memtable).unwrap();

        assert_eq!(memtable.get(b"alpha").unwrap(), Bytes::from("3"));
        assert_eq!(memtable.get(b"beta").unwrap(), Bytes::from("2"));
        assert_eq!(memtable.len(), 2);
    }

    #[test]
    fn test_delete_replays_as_tombstone() {
        let dir = tempdir().unwrap();
        let conf = test_options();

        let mut wal = Wal::new(&conf, dir.path(), 0).unwrap();
        wal.write(b"key", b"value").unwrap();
        wal.write(b"key", b"").unwrap();
        wal.close().unwrap();

        let memtable = new_memtable(MemTableKind::BTree, 16);
        wal.read_all(&*memtable).unwrap();

        assert_eq!(memtable.get(b"key").unwrap(), Bytes::new());
    }

    #[test]
    fn test_size_tracks_appends() {
        let dir = tempdir().unwrap();
        let conf = test_options();

        let mut wal = Wal::new(&conf, dir.path(), 0).unwrap();
        assert_eq!(wal.size(), 0);

        wal.write(b"key", b"value").unwrap();
        let first = wal.size();
        assert!(first > 0);

        wal.write(b"key2", b"value2").unwrap();
        assert!(wal.size() > first);
    }

    #[test]
    fn test_reopen_resumes_size() {
        let dir = tempdir().unwrap();
        let conf = test_options();

        let mut wal = Wal::new(&conf, dir.path(), 3).unwrap();
        wal.write(b"key", b"value").unwrap();
        let size = wal.size();
        wal.close().unwrap();
        drop(wal);

        let wal = Wal::new(&conf, dir.path(), 3).unwrap();
        assert_eq!(wal.size(), size);
    }

    #[test]
    fn test_corrupted_record_fails_replay() {
        let dir = tempdir().unwrap();
        let conf = test_options();

        let mut wal = Wal::new(&conf, dir.path(), 0).unwrap();
        wal.write(b"key", b"value").unwrap();
        wal.close().unwrap();

        // Flip one payload bit on disk.
        let path = wal.path().to_path_buf();
        let mut data = std::fs::read(&path).unwrap();
        data[10] ^= 0x01;
        std::fs::write(&path, &data).unwrap();

        let memtable = new_memtable(MemTableKind::BTree, 16);
        let result = wal.read_all(&*memtable);
        assert!(matches!(result, Err(Error::CrcMismatch { .. })));
    }

    #[test]
    fn test_delete_removes_file() {
        let dir = tempdir().unwrap();
        let conf = test_options();

        let mut wal = Wal::new(&conf, dir.path(), 0).unwrap();
        wal.write(b"key", b"value").unwrap();
        let path = wal.path().to_path_buf();
        assert!(path.exists());

        wal.delete().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_empty_key_rejected() {
        let dir = tempdir().unwrap();
        let conf = test_options();

        let mut wal = Wal::new(&conf, dir.path(), 0).unwrap();
        assert!(matches!(wal.write(b"", b"v"), Err(Error::EmptyKey)));
    }
}
