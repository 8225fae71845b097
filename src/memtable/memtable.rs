use std::{
    cmp::Ordering,
    ops::Bound,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering as AtomicOrdering},
    },
};

use crossbeam_skiplist::SkipMap;

use crate::{iterator::MemTableIterator, util::Slice};

/// Key of one version of a user key.
///
/// Versions of the same user key sort newest first, so a forward range scan
/// starting at `(key, seq)` lands on the newest version visible at `seq`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InternalKey {
    user_key: Slice,
    sequence: u64,
}

impl InternalKey {
    pub fn new(user_key: Slice, sequence: u64) -> Self {
        InternalKey { user_key, sequence }
    }

    /// Smallest internal key for `user_key`: sorts before all its versions.
    pub fn first_of(user_key: Slice) -> Self {
        InternalKey::new(user_key, u64::MAX)
    }

    /// Largest internal key for `user_key`: sorts after all its versions.
    pub fn last_of(user_key: Slice) -> Self {
        InternalKey::new(user_key, 0)
    }

    pub fn user_key(&self) -> &Slice {
        &self.user_key
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl PartialOrd for InternalKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for InternalKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.user_key
            .cmp(&other.user_key)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// Versioned entries; `None` marks a deletion.
pub(crate) type VersionMap = SkipMap<InternalKey, Option<Slice>>;

/// Multi-version, in-memory ordered table.
///
/// Every write carries a sequence number. Readers pass the sequence of their
/// snapshot and only observe versions written at or before it.
pub struct MemTable {
    table: Arc<VersionMap>,
    approximate_memory: Arc<AtomicUsize>,
}

impl MemTable {
    pub fn new() -> Self {
        MemTable {
            table: Arc::new(SkipMap::new()),
            approximate_memory: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn add(&self, sequence: u64, key: Slice, value: Slice) {
        let mem_usage = key.size() + value.size() + 8;
        self.approximate_memory
            .fetch_add(mem_usage, AtomicOrdering::Relaxed);

        self.table
            .insert(InternalKey::new(key, sequence), Some(value));
    }

    pub fn delete(&self, sequence: u64, key: Slice) {
        let mem_usage = key.size() + 8;
        self.approximate_memory
            .fetch_add(mem_usage, AtomicOrdering::Relaxed);

        self.table.insert(InternalKey::new(key, sequence), None);
    }

    /// Newest version of `key` visible at `sequence`.
    ///
    /// Returns `(found, value)`: `found` is true when some version exists,
    /// `value` is `None` when that version is a deletion.
    pub fn get(&self, key: &Slice, sequence: u64) -> (bool, Option<Slice>) {
        match visible_version(&self.table, key, sequence) {
            Some(value) => (true, value),
            None => (false, None),
        }
    }

    /// Iterator over the user keys visible at `sequence`.
    pub fn iter(&self, sequence: u64) -> MemTableIterator {
        MemTableIterator::new(Arc::clone(&self.table), sequence)
    }

    pub fn approximate_memory_usage(&self) -> usize {
        self.approximate_memory.load(AtomicOrdering::Relaxed)
    }

    /// Number of stored versions, deletions included.
    pub fn num_entries(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Default for MemTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Newest version of `key` with a sequence number `<= sequence`.
pub(crate) fn visible_version(
    table: &VersionMap,
    key: &Slice,
    sequence: u64,
) -> Option<Option<Slice>> {
    let range = (
        Bound::Included(InternalKey::new(key.clone(), sequence)),
        Bound::Included(InternalKey::last_of(key.clone())),
    );
    table
        .range(range)
        .next()
        .map(|entry| entry.value().clone())
}
