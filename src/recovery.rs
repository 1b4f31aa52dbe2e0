//! Startup recovery: rebuild engine state from the WAL and SST directories.
//!
//! The filename grammar is strict. A foreign file in either directory is
//! treated as corruption and aborts the open, rather than being silently
//! skipped over.

use std::path::Path;
use std::sync::Arc;

use crate::compaction::Immutable;
use crate::memtable::new_memtable;
use crate::options::Options;
use crate::sstable::{Node, SstReader};
use crate::util::filename::{parse_sst_file_name, parse_wal_file_name, sst_file_path};
use crate::wal::Wal;
use crate::{Error, Result};

/// Engine state reconstructed from disk.
pub(crate) struct Recovered {
    /// Nodes per level, each level ordered by ascending seq (oldest first).
    pub(crate) levels: Vec<Vec<Arc<Node>>>,
    /// Next free seq per level.
    pub(crate) next_seq: Vec<u32>,
    /// Sealed memtables rebuilt from their WALs, oldest first.
    pub(crate) sealed: Vec<Arc<Immutable>>,
    /// Highest WAL id seen, if any.
    pub(crate) last_wal_id: Option<u32>,
}

/// Scan both directories and rebuild in-memory state.
pub(crate) fn recover(options: &Options, wal_dir: &Path, sst_dir: &Path) -> Result<Recovered> {
    let (levels, next_seq) = load_sstables(options, sst_dir)?;
    let (sealed, last_wal_id) = load_wals(options, wal_dir)?;

    if !sealed.is_empty() {
        tracing::info!(
            count = sealed.len(),
            "recovered sealed memtables awaiting compaction"
        );
    }

    Ok(Recovered {
        levels,
        next_seq,
        sealed,
        last_wal_id,
    })
}

/// Load every `<level>_<seq>.sst` file, sorted by `(level asc, seq asc)`.
fn load_sstables(
    options: &Options,
    sst_dir: &Path,
) -> Result<(Vec<Vec<Arc<Node>>>, Vec<u32>)> {
    let mut files: Vec<(usize, u32)> = Vec::new();
    for entry in std::fs::read_dir(sst_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name
            .to_str()
            .ok_or_else(|| Error::sst_corrupted("non-UTF-8 file name in SST directory"))?;
        let (level, seq) = parse_sst_file_name(name)
            .ok_or_else(|| Error::SstCorrupted(format!("unexpected file name: {}", name)))?;
        files.push((level, seq));
    }
    files.sort_unstable();

    // Size the level vector for the configured count, growing it if an
    // existing directory was written with a larger one.
    let max_level = files.iter().map(|(level, _)| *level).max();
    let level_count = options
        .level_count
        .max(max_level.map_or(0, |level| level + 1));

    let mut levels: Vec<Vec<Arc<Node>>> = (0..level_count).map(|_| Vec::new()).collect();
    let mut next_seq = vec![0u32; level_count];

    for (level, seq) in files {
        let path = sst_file_path(sst_dir, level, seq);
        let reader = SstReader::open(options, &path)?;
        levels[level].push(Arc::new(Node::new(level, seq, reader)));
        next_seq[level] = next_seq[level].max(seq + 1);
        if options.is_debug {
            tracing::debug!(level, seq, "loaded table");
        }
    }

    Ok((levels, next_seq))
}

/// Load every `wal-<id>.log` file in id order, replaying each into a fresh
/// memtable to form a sealed immutable.
fn load_wals(options: &Options, wal_dir: &Path) -> Result<(Vec<Arc<Immutable>>, Option<u32>)> {
    let mut ids: Vec<u32> = Vec::new();
    for entry in std::fs::read_dir(wal_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name
            .to_str()
            .ok_or_else(|| Error::wal_corrupted("non-UTF-8 file name in WAL directory"))?;
        let id = parse_wal_file_name(name)
            .ok_or_else(|| Error::WalCorrupted(format!("unexpected file name: {}", name)))?;
        ids.push(id);
    }
    ids.sort_unstable();

    let mut sealed = Vec::with_capacity(ids.len());
    for &id in &ids {
        let wal = Wal::new(options, wal_dir, id)?;
        let memtable = new_memtable(options.memtable_kind, options.memtable_degree);
        wal.read_all(&*memtable)?;
        if options.is_debug {
            tracing::debug!(id, entries = memtable.len(), "replayed WAL");
        }
        sealed.push(Arc::new(Immutable::new(memtable, wal)));
    }

    Ok((sealed, ids.last().copied()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sstable::SstWriter;
    use crate::util::filename::create_dir_if_missing;
    use bytes::Bytes;
    use tempfile::tempdir;

    fn dirs(root: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
        let wal_dir = root.join("wal");
        let sst_dir = root.join("sst");
        create_dir_if_missing(&wal_dir).unwrap();
        create_dir_if_missing(&sst_dir).unwrap();
        (wal_dir, sst_dir)
    }

    #[test]
    fn test_recover_empty_directories() {
        let root = tempdir().unwrap();
        let (wal_dir, sst_dir) = dirs(root.path());
        let options = Options::default();

        let recovered = recover(&options, &wal_dir, &sst_dir).unwrap();
        assert_eq!(recovered.levels.len(), options.level_count);
        assert!(recovered.sealed.is_empty());
        assert_eq!(recovered.last_wal_id, None);
        assert!(recovered.next_seq.iter().all(|&seq| seq == 0));
    }

    #[test]
    fn test_recover_wals_in_id_order() {
        let root = tempdir().unwrap();
        let (wal_dir, sst_dir) = dirs(root.path());
        let options = Options {
            auto_sync: false,
            ..Options::default()
        };

        for id in [2u32, 0, 1] {
            let mut wal = Wal::new(&options, &wal_dir, id).unwrap();
            wal.write(b"key", format!("from-{}", id).as_bytes()).unwrap();
            wal.close().unwrap();
        }

        let recovered = recover(&options, &wal_dir, &sst_dir).unwrap();
        assert_eq!(recovered.sealed.len(), 3);
        assert_eq!(recovered.last_wal_id, Some(2));

        // Newest-last: the last sealed entry holds the id-2 write.
        let newest = recovered.sealed.last().unwrap();
        assert_eq!(
            newest.memtable.get(b"key").unwrap(),
            Bytes::from("from-2")
        );
    }

    #[test]
    fn test_recover_ssts_resume_seq() {
        let root = tempdir().unwrap();
        let (wal_dir, sst_dir) = dirs(root.path());
        let options = Options::default();

        for seq in [0u32, 3] {
            let path = sst_file_path(&sst_dir, 0, seq);
            let mut writer = SstWriter::new(&options, &path).unwrap();
            writer.add(format!("key-{}", seq).as_bytes(), b"v").unwrap();
            writer.flush().unwrap();
        }

        let recovered = recover(&options, &wal_dir, &sst_dir).unwrap();
        assert_eq!(recovered.levels[0].len(), 2);
        assert_eq!(recovered.levels[0][0].seq(), 0);
        assert_eq!(recovered.levels[0][1].seq(), 3);
        assert_eq!(recovered.next_seq[0], 4);
    }

    #[test]
    fn test_foreign_file_in_sst_dir_aborts() {
        let root = tempdir().unwrap();
        let (wal_dir, sst_dir) = dirs(root.path());
        std::fs::write(sst_dir.join("notes.txt"), "x").unwrap();

        let result = recover(&Options::default(), &wal_dir, &sst_dir);
        assert!(matches!(result, Err(Error::SstCorrupted(_))));
    }

    #[test]
    fn test_foreign_file_in_wal_dir_aborts() {
        let root = tempdir().unwrap();
        let (wal_dir, sst_dir) = dirs(root.path());
        std::fs::write(wal_dir.join("wal-x.log"), "x").unwrap();

        let result = recover(&Options::default(), &wal_dir, &sst_dir);
        assert!(matches!(result, Err(Error::WalCorrupted(_))));
    }

    #[test]
    fn test_level_vector_grows_past_configured_count() {
        let root = tempdir().unwrap();
        let (wal_dir, sst_dir) = dirs(root.path());
        let options = Options {
            level_count: 2,
            ..Options::default()
        };

        let path = sst_file_path(&sst_dir, 4, 0);
        let mut writer = SstWriter::new(&options, &path).unwrap();
        writer.add(b"k", b"v").unwrap();
        writer.flush().unwrap();

        let recovered = recover(&options, &wal_dir, &sst_dir).unwrap();
        assert_eq!(recovered.levels.len(), 5);
        assert_eq!(recovered.levels[4].len(), 1);
        assert_eq!(recovered.next_seq[4], 1);
    }
}
