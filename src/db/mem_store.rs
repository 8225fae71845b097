use log::warn;
use parking_lot::Mutex;

use crate::{
    db::{ReadOptions, Snapshot, SnapshotList, Store},
    iterator::BoxedIterator,
    memtable::MemTable,
    util::{Result, Slice},
};

/// In-memory ordered store.
///
/// Writes go to a multi-version [`MemTable`] under a monotonically
/// increasing sequence number; snapshots and iterators read at a fixed
/// sequence, so later writes stay invisible to them.
pub struct MemStore {
    mem: MemTable,
    /// Last sequence number handed out
    sequence: Mutex<u64>,
    snapshots: SnapshotList,
}

impl MemStore {
    pub fn new() -> Self {
        MemStore {
            mem: MemTable::new(),
            sequence: Mutex::new(0),
            snapshots: SnapshotList::new(),
        }
    }

    pub fn put(&self, key: Slice, value: Slice) {
        // Hold the sequence lock across the insert so a snapshot taken at
        // sequence N sees every write numbered <= N.
        let mut seq = self.sequence.lock();
        *seq += 1;
        self.mem.add(*seq, key, value);
    }

    pub fn delete(&self, key: Slice) {
        let mut seq = self.sequence.lock();
        *seq += 1;
        self.mem.delete(*seq, key);
    }

    /// Latest value of `key`.
    pub fn get(&self, key: &Slice) -> Option<Slice> {
        let seq = *self.sequence.lock();
        self.mem.get(key, seq).1
    }

    pub fn last_sequence(&self) -> u64 {
        *self.sequence.lock()
    }

    /// Number of snapshots handed out and not yet released.
    pub fn num_snapshots(&self) -> usize {
        self.snapshots.len()
    }

    pub fn approximate_memory_usage(&self) -> usize {
        self.mem.approximate_memory_usage()
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemStore {
    fn new_snapshot(&self) -> Snapshot {
        let seq = self.sequence.lock();
        self.snapshots.acquire(*seq)
    }

    fn release_snapshot(&self, snapshot: Snapshot) {
        let sequence = snapshot.sequence();
        if !self.snapshots.release(snapshot) {
            warn!("released unknown snapshot at sequence {sequence}");
        }
    }

    fn new_iterator(&self, _options: &ReadOptions, snapshot: &Snapshot) -> Result<BoxedIterator> {
        Ok(Box::new(self.mem.iter(snapshot.sequence())))
    }
}
