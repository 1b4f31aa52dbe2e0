//! Background compaction: sealed memtables become level-0 SSTs.
//!
//! A single long-lived worker thread drains the sealed list oldest-first.
//! Rotation signals the worker through a condvar; the worker also rescans on
//! a periodic timeout, so a missed signal delays a compaction but never
//! loses one. Compaction errors are logged and the sealed memtable stays
//! listed for a later retry.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::memtable::MemTable;
use crate::options::Options;
use crate::sstable::{Node, SstReader, SstWriter};
use crate::store::LsmState;
use crate::util::filename::{delete_file, sst_file_path, sync_dir};
use crate::wal::Wal;
use crate::Result;

/// How long the worker sleeps before rescanning the sealed list unprompted.
const RESCAN_INTERVAL: Duration = Duration::from_millis(200);

/// A sealed (memtable, WAL) pair awaiting compaction.
pub(crate) struct Immutable {
    pub(crate) memtable: Arc<dyn MemTable>,
    pub(crate) wal: Mutex<Wal>,
}

impl Immutable {
    pub(crate) fn new(memtable: Arc<dyn MemTable>, wal: Wal) -> Self {
        Self {
            memtable,
            wal: Mutex::new(wal),
        }
    }
}

struct WorkerShared {
    options: Arc<Options>,
    sst_dir: PathBuf,
    state: Arc<LsmState>,
    signal: Mutex<bool>,
    cond: Condvar,
    shutdown: AtomicBool,
}

/// Handle to the background compaction thread.
pub(crate) struct CompactionWorker {
    shared: Arc<WorkerShared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl CompactionWorker {
    /// Spawn the worker thread.
    pub(crate) fn start(
        options: Arc<Options>,
        sst_dir: PathBuf,
        state: Arc<LsmState>,
    ) -> Self {
        let shared = Arc::new(WorkerShared {
            options,
            sst_dir,
            state,
            signal: Mutex::new(false),
            cond: Condvar::new(),
            shutdown: AtomicBool::new(false),
        });

        let thread_shared = Arc::clone(&shared);
        let handle = std::thread::Builder::new()
            .name("siltdb-compaction".to_string())
            .spawn(move || background_loop(&thread_shared))
            .expect("failed to spawn compaction thread");

        Self {
            shared,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Wake the worker; a sealed memtable is waiting.
    pub(crate) fn notify(&self) {
        let mut signaled = self.shared.signal.lock();
        *signaled = true;
        self.shared.cond.notify_one();
    }

    /// Signal shutdown and wait for the worker to exit. An in-flight
    /// compaction completes first; still-pending sealed memtables are left
    /// for recovery to rebuild from their WALs.
    pub(crate) fn stop(&self) {
        self.shared.shutdown.store(true, Ordering::SeqCst);
        self.notify();

        if let Some(handle) = self.handle.lock().take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CompactionWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn background_loop(shared: &WorkerShared) {
    loop {
        {
            let mut signaled = shared.signal.lock();
            if !*signaled && !shared.shutdown.load(Ordering::SeqCst) {
                shared
                    .cond
                    .wait_for(&mut signaled, RESCAN_INTERVAL);
            }
            *signaled = false;
        }

        if shared.shutdown.load(Ordering::SeqCst) {
            return;
        }

        drain_sealed(shared);
    }
}

/// Compact sealed memtables oldest-first until the list is empty, an error
/// defers the rest to the next wakeup, or shutdown is requested.
fn drain_sealed(shared: &WorkerShared) {
    loop {
        let imm = shared.state.sealed.read().first().cloned();
        let Some(imm) = imm else { return };

        if let Err(e) = do_compact(&shared.options, &shared.sst_dir, &shared.state, &imm) {
            tracing::error!(error = %e, "compaction failed, sealed memtable kept for retry");
            return;
        }

        if shared.shutdown.load(Ordering::SeqCst) {
            return;
        }
    }
}

/// Convert one sealed memtable into a level-0 SST.
///
/// Ordering is load-bearing: the SST is written and its node installed
/// before the immutable leaves the sealed list, and the WAL is deleted
/// before that removal. A crash in between leaves either a replayable WAL
/// or an already-recovered SST, never neither.
pub(crate) fn do_compact(
    options: &Options,
    sst_dir: &std::path::Path,
    state: &LsmState,
    imm: &Arc<Immutable>,
) -> Result<()> {
    if !state
        .sealed
        .read()
        .iter()
        .any(|candidate| Arc::ptr_eq(candidate, imm))
    {
        // Already handled by an earlier pass.
        return Ok(());
    }

    let has_entries = !imm.memtable.is_empty();
    let seq = state.level_seq[0].fetch_add(1, Ordering::SeqCst);
    let path = sst_file_path(sst_dir, 0, seq);

    if has_entries {
        // The directory entry must be durable along with the file contents.
        let written = write_memtable(options, &path, &*imm.memtable)
            .and_then(|()| Ok(sync_dir(sst_dir)?));
        if let Err(e) = written {
            let _ = delete_file(&path);
            return Err(e);
        }
        if options.is_debug {
            tracing::debug!(path = %path.display(), "wrote level-0 table");
        }
    }

    if let Err(e) = imm.wal.lock().delete() {
        tracing::warn!(error = %e, "failed to delete compacted WAL");
    }

    if has_entries {
        let reader = SstReader::open(options, &path)?;
        let node = Node::new(0, seq, reader);
        // Snapshot-swap: the worker is the only levels writer.
        let mut levels = (**state.levels.load()).clone();
        levels[0].push(Arc::new(node));
        state.levels.store(Arc::new(levels));
    }

    state
        .sealed
        .write()
        .retain(|candidate| !Arc::ptr_eq(candidate, imm));

    Ok(())
}

/// Stream a memtable's entries into a new SST file.
fn write_memtable(options: &Options, path: &std::path::Path, memtable: &dyn MemTable) -> Result<()> {
    let mut writer = SstWriter::new(options, path)?;

    let mut failure = None;
    memtable.for_each_ref(&mut |key, value| {
        if let Err(e) = writer.add(key, value) {
            failure = Some(e);
            return false;
        }
        true
    });
    if let Some(e) = failure {
        return Err(e);
    }

    writer.flush()?;
    writer.close()
}
