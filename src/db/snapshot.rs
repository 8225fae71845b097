use std::collections::BTreeMap;

use parking_lot::Mutex;

/// Snapshot provides a consistent point-in-time view of a store
///
/// A snapshot is a sequence number: readers pinned to it observe every write
/// with a sequence at or below it and nothing newer. Snapshots are not
/// `Clone`; each one is handed back to the store exactly once through
/// `Store::release_snapshot`.
#[derive(Debug)]
pub struct Snapshot {
    /// Sequence number at snapshot creation
    sequence: u64,
}

impl Snapshot {
    /// Create a new snapshot at the given sequence number
    pub fn new(sequence: u64) -> Self {
        Snapshot { sequence }
    }

    /// Get the snapshot's sequence number
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

/// Live snapshots of a store, counted per sequence number.
#[derive(Debug, Default)]
pub struct SnapshotList {
    live: Mutex<BTreeMap<u64, usize>>,
}

impl SnapshotList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, sequence: u64) -> Snapshot {
        *self.live.lock().entry(sequence).or_insert(0) += 1;
        Snapshot::new(sequence)
    }

    /// Returns false if no live snapshot exists at that sequence.
    pub fn release(&self, snapshot: Snapshot) -> bool {
        let mut live = self.live.lock();
        match live.get_mut(&snapshot.sequence) {
            Some(count) if *count > 1 => {
                *count -= 1;
                true
            },
            Some(_) => {
                live.remove(&snapshot.sequence);
                true
            },
            None => false,
        }
    }

    /// Number of snapshots not yet released.
    pub fn len(&self) -> usize {
        self.live.lock().values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.live.lock().is_empty()
    }

    /// Sequence of the oldest live snapshot.
    pub fn oldest(&self) -> Option<u64> {
        self.live.lock().keys().next().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_basic() {
        let snapshot = Snapshot::new(100);
        assert_eq!(snapshot.sequence(), 100);
    }

    #[test]
    fn test_snapshot_list_counts() {
        let list = SnapshotList::new();
        assert!(list.is_empty());

        let s1 = list.acquire(3);
        let s2 = list.acquire(3);
        let s3 = list.acquire(7);
        assert_eq!(list.len(), 3);
        assert_eq!(list.oldest(), Some(3));

        assert!(list.release(s1));
        assert_eq!(list.len(), 2);
        assert!(list.release(s2));
        assert_eq!(list.oldest(), Some(7));
        assert!(list.release(s3));
        assert!(list.is_empty());
    }

    #[test]
    fn test_snapshot_list_unknown_release() {
        let list = SnapshotList::new();
        assert!(!list.release(Snapshot::new(42)));
    }
}
