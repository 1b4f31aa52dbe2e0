//! Store - the LSM engine tying the pieces together.
//!
//! A mutation is appended to the current WAL, inserted into the mutable
//! memtable, and, once the WAL crosses its size threshold, the
//! (memtable, WAL) pair is sealed and handed to the background compaction
//! worker. Reads consult the mutable memtable, then sealed memtables newest
//! to oldest, then on-disk tables level by level, newest seq first. The
//! first hit wins; a tombstone hit ends the search.
//!
//! # Thread Safety
//!
//! The store is safe to share across threads. Reads run concurrently;
//! writes serialize on an internal mutex. The sealed list and the level
//! vector are the only state touched by both the callers and the worker:
//! the former sits behind a reader/writer lock, the latter is an immutable
//! snapshot swapped atomically by its single writer.

use std::fs::{File, OpenOptions};
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use bytes::Bytes;
use parking_lot::{Mutex, RwLock};

use crate::compaction::{CompactionWorker, Immutable};
use crate::memtable::{new_memtable, MemTable};
use crate::options::Options;
use crate::recovery::recover;
use crate::sstable::Node;
use crate::util::filename::{create_dir_if_missing, lock_file_path};
use crate::wal::Wal;
use crate::{Error, Result};

/// State shared between the callers and the compaction worker.
pub(crate) struct LsmState {
    /// Sealed (memtable, WAL) pairs, oldest first. Rotation appends,
    /// compaction removes.
    pub(crate) sealed: RwLock<Vec<Arc<Immutable>>>,
    /// Installed nodes per level, each level ordered by ascending seq.
    /// Swapped wholesale by the compaction worker.
    pub(crate) levels: ArcSwap<Vec<Vec<Arc<Node>>>>,
    /// Next free seq per level.
    pub(crate) level_seq: Vec<AtomicU32>,
}

/// Persistent, embeddable ordered key-value store.
pub struct Store {
    options: Arc<Options>,
    data_dir: PathBuf,
    wal_dir: PathBuf,
    state: Arc<LsmState>,
    /// Mutable memtable. Swapped only at rotation, under `write_mutex`.
    memtable: RwLock<Arc<dyn MemTable>>,
    /// Current writable WAL; `None` once closed.
    wal: Mutex<Option<Wal>>,
    /// Id of the current WAL.
    wal_id: AtomicU32,
    /// Serializes the write path, including rotation.
    write_mutex: Mutex<()>,
    shutting_down: AtomicBool,
    worker: CompactionWorker,
    /// Held open for the store's lifetime to keep the flock.
    _lock_file: File,
}

impl Store {
    /// Open a store rooted at `data_dir` with default options.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_options(data_dir, Options::default())
    }

    /// Open a store with custom options, creating the WAL and SST
    /// directories if absent, recovering prior state, and starting the
    /// compaction worker.
    pub fn open_with_options(data_dir: impl AsRef<Path>, options: Options) -> Result<Self> {
        options.validate()?;
        let options = Arc::new(options);

        let data_dir = data_dir.as_ref().to_path_buf();
        let wal_dir = data_dir.join(&options.wal_dir);
        let sst_dir = data_dir.join(&options.sst_dir);
        create_dir_if_missing(&wal_dir)?;
        create_dir_if_missing(&sst_dir)?;

        let lock_file = Self::acquire_lock(&data_dir)?;

        let recovered = recover(&options, &wal_dir, &sst_dir)?;

        let state = Arc::new(LsmState {
            sealed: RwLock::new(recovered.sealed),
            levels: ArcSwap::from_pointee(recovered.levels),
            level_seq: recovered.next_seq.into_iter().map(AtomicU32::new).collect(),
        });

        let wal_id = recovered.last_wal_id.map_or(0, |id| id + 1);
        let wal = Wal::new(&options, &wal_dir, wal_id)?;
        let memtable = new_memtable(options.memtable_kind, options.memtable_degree);

        let worker = CompactionWorker::start(Arc::clone(&options), sst_dir, Arc::clone(&state));

        let store = Self {
            options,
            data_dir,
            wal_dir,
            state,
            memtable: RwLock::new(memtable),
            wal: Mutex::new(Some(wal)),
            wal_id: AtomicU32::new(wal_id),
            write_mutex: Mutex::new(()),
            shutting_down: AtomicBool::new(false),
            worker,
            _lock_file: lock_file,
        };

        // Recovered immutables are already listed; nudge the worker.
        if !store.state.sealed.read().is_empty() {
            store.worker.notify();
        }

        Ok(store)
    }

    /// Take the exclusive process lock for this data directory.
    fn acquire_lock(data_dir: &Path) -> Result<File> {
        let lock_path = lock_file_path(data_dir);
        let mut lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&lock_path)?;

        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            let rc = unsafe { libc::flock(lock_file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
            if rc != 0 {
                return Err(Error::Locked);
            }
        }

        writeln!(lock_file, "siltdb lock").ok();
        Ok(lock_file)
    }

    /// Insert or overwrite a key. An empty value is indistinguishable from a
    /// deletion.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.write_record(key, value)
    }

    /// Delete a key by recording a tombstone.
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.write_record(key, b"")
    }

    fn write_record(&self, key: &[u8], value: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Err(Error::EmptyKey);
        }
        if self.shutting_down.load(Ordering::SeqCst) {
            return Err(Error::Closed);
        }

        let _write_guard = self.write_mutex.lock();

        // WAL first: a failure here leaves the memtable untouched.
        let wal_size = {
            let mut wal_guard = self.wal.lock();
            let wal = wal_guard.as_mut().ok_or(Error::Closed)?;
            wal.write(key, value)?;
            wal.size()
        };

        self.memtable.read().put(key, value)?;

        if wal_size > self.options.wal_size {
            self.rotate()?;
        }
        Ok(())
    }

    /// Seal the current (memtable, WAL) pair and install a fresh one.
    ///
    /// Caller holds `write_mutex`. The new WAL is created before any shared
    /// state changes, so a creation failure leaves the current pair active.
    fn rotate(&self) -> Result<()> {
        let new_id = self.wal_id.load(Ordering::SeqCst) + 1;
        let new_wal = Wal::new(&self.options, &self.wal_dir, new_id)?;
        let new_memtable = new_memtable(self.options.memtable_kind, self.options.memtable_degree);

        {
            let mut sealed = self.state.sealed.write();
            let mut wal_guard = self.wal.lock();
            let mut mem_guard = self.memtable.write();

            let old_wal = wal_guard.replace(new_wal).ok_or(Error::Closed)?;
            let old_memtable = std::mem::replace(&mut *mem_guard, new_memtable);
            self.wal_id.store(new_id, Ordering::SeqCst);
            sealed.push(Arc::new(Immutable::new(old_memtable, old_wal)));
        }

        self.worker.notify();
        if self.options.is_debug {
            tracing::debug!(wal_id = new_id, "sealed memtable, opened fresh WAL");
        }
        Ok(())
    }

    /// Look up a key.
    ///
    /// Returns [`Error::KeyNotFound`] if no source holds it and
    /// [`Error::ValueDeleted`] if the newest entry is a tombstone.
    pub fn get(&self, key: &[u8]) -> Result<Bytes> {
        if key.is_empty() {
            return Err(Error::EmptyKey);
        }

        // Mutable memtable.
        let memtable = Arc::clone(&*self.memtable.read());
        match memtable.get(key) {
            Ok(value) => return tombstone_to_error(value),
            Err(Error::KeyNotFound) => {}
            Err(e) => return Err(e),
        }

        // Sealed memtables, newest to oldest.
        let sealed = self.state.sealed.read().clone();
        for imm in sealed.iter().rev() {
            match imm.memtable.get(key) {
                Ok(value) => return tombstone_to_error(value),
                Err(Error::KeyNotFound) => {}
                Err(e) => return Err(e),
            }
        }

        // On-disk levels: lower levels are newer; within a level, highest
        // seq first.
        let levels = self.state.levels.load();
        for level in levels.iter() {
            for node in level.iter().rev() {
                match node.get(key) {
                    Ok(value) => return Ok(value),
                    Err(Error::KeyNotFound) => {}
                    Err(e) => return Err(e),
                }
            }
        }

        Err(Error::KeyNotFound)
    }

    /// Close the store: stop the compaction worker (an in-flight compaction
    /// completes), then close the current and sealed WALs. Errors are
    /// reported but do not stop the remaining steps.
    pub fn close(&self) -> Result<()> {
        if self.shutting_down.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        self.worker.stop();

        let _write_guard = self.write_mutex.lock();
        let mut result = Ok(());

        if let Some(mut wal) = self.wal.lock().take() {
            if let Err(e) = wal.close() {
                tracing::warn!(error = %e, "failed to close current WAL");
                result = Err(e);
            }
        }

        for imm in self.state.sealed.read().iter() {
            if let Err(e) = imm.wal.lock().close() {
                tracing::warn!(error = %e, "failed to close sealed WAL");
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }

        result
    }

    /// Root data directory.
    pub fn path(&self) -> &Path {
        &self.data_dir
    }

    /// The options this store was opened with.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Id of the current writable WAL.
    pub fn wal_id(&self) -> u32 {
        self.wal_id.load(Ordering::SeqCst)
    }

    /// Number of sealed memtables awaiting compaction.
    pub fn sealed_count(&self) -> usize {
        self.state.sealed.read().len()
    }

    /// Number of installed tables per level.
    pub fn level_node_counts(&self) -> Vec<usize> {
        self.state.levels.load().iter().map(|level| level.len()).collect()
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("data_dir", &self.data_dir)
            .field("wal_id", &self.wal_id())
            .field("memtable_entries", &self.memtable.read().len())
            .field("sealed", &self.sealed_count())
            .field("levels", &self.level_node_counts())
            .finish()
    }
}

fn tombstone_to_error(value: Bytes) -> Result<Bytes> {
    if value.is_empty() {
        Err(Error::ValueDeleted)
    } else {
        Ok(value)
    }
}
