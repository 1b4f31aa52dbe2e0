//! Skip-list-backed memtable.

use bytes::Bytes;
use crossbeam_skiplist::SkipMap;

use super::MemTable;
use crate::{Error, Result};

/// Ordered memtable over a lock-free concurrent skip list.
///
/// Entry counting is left to the skip list itself, so concurrent writers
/// cannot skew `len()`.
pub struct SkipListMemTable {
    map: SkipMap<Bytes, Bytes>,
}

impl SkipListMemTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            map: SkipMap::new(),
        }
    }
}

impl Default for SkipListMemTable {
    fn default() -> Self {
        Self::new()
    }
}

impl MemTable for SkipListMemTable {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Err(Error::EmptyKey);
        }
        self.map
            .insert(Bytes::copy_from_slice(key), Bytes::copy_from_slice(value));
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Bytes> {
        if key.is_empty() {
            return Err(Error::EmptyKey);
        }
        self.map
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or(Error::KeyNotFound)
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Err(Error::EmptyKey);
        }
        match self.map.remove(key) {
            Some(_) => Ok(()),
            None => Err(Error::KeyNotFound),
        }
    }

    fn for_each(&self, visitor: &mut dyn FnMut(Bytes, Bytes) -> bool) {
        for entry in self.map.iter() {
            if !visitor(entry.key().clone(), entry.value().clone()) {
                break;
            }
        }
    }

    fn for_each_ref(&self, visitor: &mut dyn FnMut(&[u8], &[u8]) -> bool) {
        for entry in self.map.iter() {
            if !visitor(entry.key(), entry.value()) {
                break;
            }
        }
    }

    fn len(&self) -> usize {
        self.map.len()
    }
}
