//! On-disk file naming conventions.
//!
//! ```text
//! <data_dir>/<wal_dir>/wal-<id>.log        one per (current + sealed) WAL
//! <data_dir>/<sst_dir>/<level>_<seq>.sst   one per installed SST
//! ```
//!
//! The grammar is strict: `<id>` and `<seq>` are decimal `u32`, `<level>` a
//! decimal non-negative integer. Anything else in these directories aborts
//! recovery.

use std::path::{Path, PathBuf};

/// Path of the WAL file with the given id.
pub fn wal_file_path(wal_dir: &Path, id: u32) -> PathBuf {
    wal_dir.join(format!("wal-{}.log", id))
}

/// Path of the SST file with the given level and sequence.
pub fn sst_file_path(sst_dir: &Path, level: usize, seq: u32) -> PathBuf {
    sst_dir.join(format!("{}_{}.sst", level, seq))
}

/// Path of the process lock file under the data directory.
pub fn lock_file_path(data_dir: &Path) -> PathBuf {
    data_dir.join("LOCK")
}

/// Parse a WAL file name of the form `wal-<id>.log`.
pub fn parse_wal_file_name(name: &str) -> Option<u32> {
    let id = name.strip_prefix("wal-")?.strip_suffix(".log")?;
    if !is_decimal(id) {
        return None;
    }
    id.parse::<u32>().ok()
}

/// Parse an SST file name of the form `<level>_<seq>.sst`.
pub fn parse_sst_file_name(name: &str) -> Option<(usize, u32)> {
    let stem = name.strip_suffix(".sst")?;
    let (level, seq) = stem.split_once('_')?;
    if !is_decimal(level) || !is_decimal(seq) {
        return None;
    }
    Some((level.parse::<usize>().ok()?, seq.parse::<u32>().ok()?))
}

fn is_decimal(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Create a directory and its parents if missing.
pub fn create_dir_if_missing(path: &Path) -> std::io::Result<()> {
    match std::fs::create_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e),
    }
}

/// Delete a file, ignoring "not found" errors.
pub fn delete_file(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Sync a directory so renames and removals inside it are durable.
pub fn sync_dir(path: &Path) -> std::io::Result<()> {
    let dir = std::fs::File::open(path)?;
    dir.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wal_paths() {
        let dir = Path::new("/data/wal");
        assert_eq!(wal_file_path(dir, 0), Path::new("/data/wal/wal-0.log"));
        assert_eq!(wal_file_path(dir, 42), Path::new("/data/wal/wal-42.log"));
    }

    #[test]
    fn test_sst_paths() {
        let dir = Path::new("/data/sst");
        assert_eq!(sst_file_path(dir, 0, 7), Path::new("/data/sst/0_7.sst"));
        assert_eq!(sst_file_path(dir, 2, 13), Path::new("/data/sst/2_13.sst"));
    }

    #[test]
    fn test_parse_wal_file_name() {
        assert_eq!(parse_wal_file_name("wal-0.log"), Some(0));
        assert_eq!(parse_wal_file_name("wal-4294967295.log"), Some(u32::MAX));

        assert_eq!(parse_wal_file_name("wal-.log"), None);
        assert_eq!(parse_wal_file_name("wal-x.log"), None);
        assert_eq!(parse_wal_file_name("wal-1.txt"), None);
        assert_eq!(parse_wal_file_name("0_1.sst"), None);
        assert_eq!(parse_wal_file_name("wal-1.log.bak"), None);
    }

    #[test]
    fn test_parse_sst_file_name() {
        assert_eq!(parse_sst_file_name("0_0.sst"), Some((0, 0)));
        assert_eq!(parse_sst_file_name("3_17.sst"), Some((3, 17)));

        assert_eq!(parse_sst_file_name("0.sst"), None);
        assert_eq!(parse_sst_file_name("a_1.sst"), None);
        assert_eq!(parse_sst_file_name("1_b.sst"), None);
        assert_eq!(parse_sst_file_name("1_2.log"), None);
        assert_eq!(parse_sst_file_name("wal-1.log"), None);
    }

    #[test]
    fn test_delete_file_missing_ok() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent");
        assert!(delete_file(&path).is_ok());

        std::fs::write(&path, "x").unwrap();
        delete_file(&path).unwrap();
        assert!(!path.exists());
    }
}
