//! B-tree-backed memtable.

use std::collections::BTreeMap;

use bytes::Bytes;
use parking_lot::RwLock;

use super::MemTable;
use crate::{Error, Result};

/// Ordered memtable over a B-tree map.
///
/// Writes take the exclusive lock, reads the shared lock. The branching
/// `degree` is accepted for configuration parity; the underlying map uses a
/// fixed fanout.
pub struct BTreeMemTable {
    map: RwLock<BTreeMap<Bytes, Bytes>>,
    #[allow(dead_code)]
    degree: usize,
}

impl BTreeMemTable {
    /// Create an empty table.
    pub fn new(degree: usize) -> Self {
        Self {
            map: RwLock::new(BTreeMap::new()),
            degree: degree.max(2),
        }
    }
}

impl MemTable for BTreeMemTable {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Err(Error::EmptyKey);
        }
        self.map
            .write()
            .insert(Bytes::copy_from_slice(key), Bytes::copy_from_slice(value));
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Bytes> {
        if key.is_empty() {
            return Err(Error::EmptyKey);
        }
        self.map.read().get(key).cloned().ok_or(Error::KeyNotFound)
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Err(Error::EmptyKey);
        }
        match self.map.write().remove(key) {
            Some(_) => Ok(()),
            None => Err(Error::KeyNotFound),
        }
    }

    fn for_each(&self, visitor: &mut dyn FnMut(Bytes, Bytes) -> bool) {
        let map = self.map.read();
        for (key, value) in map.iter() {
            if !visitor(key.clone(), value.clone()) {
                break;
            }
        }
    }

    fn for_each_ref(&self, visitor: &mut dyn FnMut(&[u8], &[u8]) -> bool) {
        let map = self.map.read();
        for (key, value) in map.iter() {
            if !visitor(key, value) {
                break;
            }
        }
    }

    fn len(&self) -> usize {
        self.map.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degree_is_clamped() {
        let table = BTreeMemTable::new(0);
        table.put(b"k", b"v").unwrap();
        assert_eq!(table.get(b"k").unwrap(), Bytes::from("v"));
    }

    #[test]
    fn test_insert_keeps_owned_copies() {
        let table = BTreeMemTable::new(16);
        let mut key = b"mutable-key".to_vec();
        table.put(&key, b"v").unwrap();
        key[0] = b'X';
        assert_eq!(table.get(b"mutable-key").unwrap(), Bytes::from("v"));
    }
}
