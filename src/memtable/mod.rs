//! In-memory ordered storage for recent writes.
//!
//! The memtable is the first destination for every mutation. Two backing
//! structures are provided behind one trait: a B-tree map guarded by a
//! reader/writer lock and a lock-free concurrent skip list. Both take full
//! ownership of a stable copy of key and value on insert.
//!
//! A tombstone is stored as an empty value; the deletion *type* travels in
//! the WAL record, not here. Readers treat an empty value found in any
//! source as a tombstone.

mod btree;
mod skiplist;

use std::sync::Arc;

use bytes::Bytes;

pub use btree::BTreeMemTable;
pub use skiplist::SkipListMemTable;

use crate::options::MemTableKind;
use crate::Result;

/// Mutable ordered mapping of key to value-or-tombstone.
///
/// Implementations are safe for concurrent readers alongside a writer.
pub trait MemTable: Send + Sync {
    /// Insert or overwrite a key. An empty value is stored verbatim and acts
    /// as the tombstone marker.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Look up a key. An empty value is returned as-is; callers distinguish
    /// tombstones by the value being empty.
    fn get(&self, key: &[u8]) -> Result<Bytes>;

    /// Remove a key outright. Fails with [`Error::KeyNotFound`] if absent.
    ///
    /// [`Error::KeyNotFound`]: crate::Error::KeyNotFound
    fn delete(&self, key: &[u8]) -> Result<()>;

    /// Visit all entries in key-ascending order. The visitor receives owned
    /// copies and may stop early by returning `false`.
    fn for_each(&self, visitor: &mut dyn FnMut(Bytes, Bytes) -> bool);

    /// Visit all entries in key-ascending order without copying. The visitor
    /// receives borrows into internal storage and must not re-enter the
    /// memtable.
    fn for_each_ref(&self, visitor: &mut dyn FnMut(&[u8], &[u8]) -> bool);

    /// Number of entries.
    fn len(&self) -> usize;

    /// Whether the memtable holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Construct a memtable of the requested kind.
///
/// `degree` is the branching hint for the B-tree variant; the skip list
/// ignores it.
pub fn new_memtable(kind: MemTableKind, degree: usize) -> Arc<dyn MemTable> {
    match kind {
        MemTableKind::BTree => Arc::new(BTreeMemTable::new(degree)),
        MemTableKind::SkipList => Arc::new(SkipListMemTable::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn all_kinds() -> Vec<Arc<dyn MemTable>> {
        vec![
            new_memtable(MemTableKind::BTree, 16),
            new_memtable(MemTableKind::SkipList, 16),
        ]
    }

    #[test]
    fn test_put_get() {
        for table in all_kinds() {
            table.put(b"hello", b"world").unwrap();
            assert_eq!(table.get(b"hello").unwrap(), Bytes::from("world"));
            assert_eq!(table.len(), 1);
        }
    }

    #[test]
    fn test_get_missing() {
        for table in all_kinds() {
            table.put(b"a", b"1").unwrap();
            assert!(matches!(table.get(b"b"), Err(Error::KeyNotFound)));
        }
    }

    #[test]
    fn test_empty_key_rejected() {
        for table in all_kinds() {
            assert!(matches!(table.put(b"", b"v"), Err(Error::EmptyKey)));
            assert!(matches!(table.get(b""), Err(Error::EmptyKey)));
            assert!(matches!(table.delete(b""), Err(Error::EmptyKey)));
        }
    }

    #[test]
    fn test_overwrite() {
        for table in all_kinds() {
            table.put(b"k", b"v1").unwrap();
            table.put(b"k", b"v2").unwrap();
            assert_eq!(table.get(b"k").unwrap(), Bytes::from("v2"));
            assert_eq!(table.len(), 1);
        }
    }

    #[test]
    fn test_empty_value_round_trips() {
        for table in all_kinds() {
            table.put(b"k", b"").unwrap();
            assert_eq!(table.get(b"k").unwrap(), Bytes::new());
        }
    }

    #[test]
    fn test_delete() {
        for table in all_kinds() {
            table.put(b"k", b"v").unwrap();
            table.delete(b"k").unwrap();
            assert!(matches!(table.get(b"k"), Err(Error::KeyNotFound)));
            assert!(matches!(table.delete(b"k"), Err(Error::KeyNotFound)));
        }
    }

    #[test]
    fn test_for_each_ordered() {
        for table in all_kinds() {
            for i in [3, 1, 4, 1, 5, 9, 2, 6] {
                table
                    .put(format!("key-{:02}", i).as_bytes(), format!("{}", i).as_bytes())
                    .unwrap();
            }

            let mut keys = Vec::new();
            table.for_each(&mut |k, _| {
                keys.push(k);
                true
            });

            let mut sorted = keys.clone();
            sorted.sort();
            assert_eq!(keys, sorted);
            assert_eq!(keys.len(), 7);
        }
    }

    #[test]
    fn test_for_each_early_stop() {
        for table in all_kinds() {
            for i in 0..10 {
                table.put(format!("key-{}", i).as_bytes(), b"v").unwrap();
            }

            let mut seen = 0;
            table.for_each(&mut |_, _| {
                seen += 1;
                seen < 3
            });
            assert_eq!(seen, 3);
        }
    }

    #[test]
    fn test_for_each_ref_matches_for_each() {
        for table in all_kinds() {
            for i in 0..20 {
                table
                    .put(format!("key-{:02}", i).as_bytes(), format!("v{}", i).as_bytes())
                    .unwrap();
            }

            let mut copied = Vec::new();
            table.for_each(&mut |k, v| {
                copied.push((k.to_vec(), v.to_vec()));
                true
            });

            let mut borrowed = Vec::new();
            table.for_each_ref(&mut |k, v| {
                borrowed.push((k.to_vec(), v.to_vec()));
                true
            });

            assert_eq!(copied, borrowed);
        }
    }

    #[test]
    fn test_concurrent_readers() {
        for table in all_kinds() {
            for i in 0..100 {
                table
                    .put(format!("key-{:03}", i).as_bytes(), format!("v{}", i).as_bytes())
                    .unwrap();
            }

            let mut handles = Vec::new();
            for _ in 0..4 {
                let table = Arc::clone(&table);
                handles.push(std::thread::spawn(move || {
                    for i in 0..100 {
                        let value = table.get(format!("key-{:03}", i).as_bytes()).unwrap();
                        assert_eq!(value, Bytes::from(format!("v{}", i)));
                    }
                }));
            }
            for handle in handles {
                handle.join().unwrap();
            }
        }
    }
}
