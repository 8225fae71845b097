use crate::{
    db::{ReadOptions, Snapshot},
    iterator::BoxedIterator,
    util::Result,
};

/// Ordered key-value engine consumed by range iterators.
///
/// Only the read side is part of the contract: snapshots and snapshot-pinned
/// iterator handles. How data gets into the engine is the engine's business.
///
/// # Thread Safety
///
/// A store is shared by every iterator of a [`crate::DB`] and by the worker
/// pool, so implementations must be `Send + Sync`. Iterator handles are
/// owned by exactly one range iterator and only need to be `Send`.
pub trait Store: Send + Sync {
    /// Pin the current state of the store.
    fn new_snapshot(&self) -> Snapshot;

    /// Unpin a snapshot obtained from [`Store::new_snapshot`].
    fn release_snapshot(&self, snapshot: Snapshot);

    /// Create an unpositioned iterator reading at `snapshot`.
    fn new_iterator(&self, options: &ReadOptions, snapshot: &Snapshot) -> Result<BoxedIterator>;
}
