//! Error types for siltdb.

use std::io;
use thiserror::Error;

/// Result type alias for siltdb operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for store operations.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// I/O error from file operations.
    #[error("I/O error: {0}")]
    Io(String),

    /// Empty key is not allowed.
    #[error("Empty key is not allowed")]
    EmptyKey,

    /// No source holds the key.
    #[error("Key not found")]
    KeyNotFound,

    /// The key existed but has been deleted; its newest entry is a tombstone.
    #[error("Value has been deleted")]
    ValueDeleted,

    /// SST file smaller than its footer, or footer length sum mismatch.
    #[error("Invalid SST format: {0}")]
    InvalidSstFormat(String),

    /// Malformed SST filename or unreadable structure during recovery.
    #[error("SST corrupted: {0}")]
    SstCorrupted(String),

    /// Malformed WAL filename or truncated record during recovery.
    #[error("WAL corrupted: {0}")]
    WalCorrupted(String),

    /// Record-level CRC check failed.
    #[error("CRC mismatch: expected {expected:#x}, got {actual:#x}")]
    CrcMismatch { expected: u32, actual: u32 },

    /// Record serialization or deserialization failure.
    #[error("Codec error: {0}")]
    Codec(String),

    /// Filter section framing was inconsistent with its contents.
    #[error("Invalid filter: {0}")]
    FilterInvalid(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Key is too large.
    #[error("Key too large: {size} bytes (max: {max})")]
    KeyTooLarge { size: usize, max: usize },

    /// Value is too large.
    #[error("Value too large: {size} bytes (max: {max})")]
    ValueTooLarge { size: usize, max: usize },

    /// The store is locked by another process.
    #[error("Store is locked by another process")]
    Locked,

    /// The store has been closed.
    #[error("Store is closed")]
    Closed,
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl Error {
    /// Create an SST corruption error with the given message.
    pub fn sst_corrupted<S: Into<String>>(msg: S) -> Self {
        Error::SstCorrupted(msg.into())
    }

    /// Create a WAL corruption error with the given message.
    pub fn wal_corrupted<S: Into<String>>(msg: S) -> Self {
        Error::WalCorrupted(msg.into())
    }

    /// Create a codec error.
    pub fn codec<S: Into<String>>(msg: S) -> Self {
        Error::Codec(msg.into())
    }

    /// Check if this error indicates on-disk corruption.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Error::SstCorrupted(_)
                | Error::WalCorrupted(_)
                | Error::CrcMismatch { .. }
                | Error::InvalidSstFormat(_)
                | Error::FilterInvalid(_)
        )
    }

    /// Check if this error is a miss rather than a failure: the key is absent
    /// or its newest entry is a tombstone.
    pub fn is_miss(&self) -> bool {
        matches!(self, Error::KeyNotFound | Error::ValueDeleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::sst_corrupted("bad block");
        assert_eq!(format!("{}", err), "SST corrupted: bad block");

        let err = Error::KeyTooLarge {
            size: 1000,
            max: 100,
        };
        assert_eq!(format!("{}", err), "Key too large: 1000 bytes (max: 100)");
    }

    #[test]
    fn test_error_is_corruption() {
        assert!(Error::wal_corrupted("bad").is_corruption());
        assert!(Error::CrcMismatch {
            expected: 1,
            actual: 2
        }
        .is_corruption());
        assert!(!Error::KeyNotFound.is_corruption());
    }

    #[test]
    fn test_error_is_miss() {
        assert!(Error::KeyNotFound.is_miss());
        assert!(Error::ValueDeleted.is_miss());
        assert!(!Error::EmptyKey.is_miss());
    }
}
