use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
};

use parking_lot::Mutex;

use crate::iterator::{IteratorId, RangeIterator};

/// Live range iterators of a [`crate::DB`], keyed by id.
///
/// The registry owns the iterators; an iterator removes itself when it
/// ends. Ids are handed out in increasing order starting at 1 and are
/// never reused, so any id at or below the last one issued and no longer
/// present belongs to an ended iterator.
#[derive(Default)]
pub struct IteratorRegistry {
    iterators: Mutex<HashMap<IteratorId, Arc<RangeIterator>>>,
    last_id: AtomicU32,
}

impl IteratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate_id(&self) -> IteratorId {
        self.last_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Whether `id` was ever handed out by [`IteratorRegistry::allocate_id`].
    pub fn was_issued(&self, id: IteratorId) -> bool {
        id != 0 && id <= self.last_id.load(Ordering::SeqCst)
    }

    pub fn register(&self, iterator: Arc<RangeIterator>) {
        self.iterators.lock().insert(iterator.id(), iterator);
    }

    pub fn deregister(&self, id: IteratorId) -> Option<Arc<RangeIterator>> {
        self.iterators.lock().remove(&id)
    }

    pub fn get(&self, id: IteratorId) -> Option<Arc<RangeIterator>> {
        self.iterators.lock().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.iterators.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.iterators.lock().is_empty()
    }

    /// Live iterators in id order.
    pub fn all(&self) -> Vec<Arc<RangeIterator>> {
        let mut all: Vec<_> = self.iterators.lock().values().cloned().collect();
        all.sort_by_key(|it| it.id());
        all
    }
}
