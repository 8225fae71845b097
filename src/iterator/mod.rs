/// Iterator module for rucksiter
///
/// Two layers live here:
///
/// - The **store iterator** contract ([`Iterator`]): the seek/step/read
///   primitives an ordered key-value engine hands out, pinned to a snapshot.
///   [`MemTableIterator`] is the in-memory implementation.
/// - The **range iterator** built on top of it: option normalization
///   ([`RangeSpec`]), positioning and stepping ([`Cursor`]), watermark
///   batching ([`ReadBatcher`]), the advance/end state machine
///   ([`Lifecycle`]) and the id table of live iterators
///   ([`IteratorRegistry`]).
///
/// ```text
/// DB::next(id)
///     ↓
/// IteratorRegistry ── id → RangeIterator
///     ↓
/// Lifecycle (Idle → Advancing)
///     ↓
/// ReadBatcher ── Cursor ── RangeSpec
///                  ↓
///           store Iterator (snapshot)
/// ```
use crate::util::{Result, Slice};

/// Iterator trait for traversing key-value pairs of a store in sorted order
///
/// # Lifecycle
///
/// An iterator starts in an invalid state. Call one of the seek methods
/// to position it:
///
/// ```ignore
/// let mut iter = store.new_iterator(&ReadOptions::default(), &snapshot)?;
/// iter.seek_to_first()?;  // Position at first key
/// while iter.valid() {
///     println!("{:?}: {:?}", iter.key(), iter.value());
///     iter.next()?;
/// }
/// ```
///
/// # Error Handling
///
/// Positioning calls return `Result` for engines whose reads can fail.
/// Engines that record an error and merely invalidate the iterator report it
/// through [`Iterator::status`].
pub trait Iterator {
    /// Position at the first key in the source
    ///
    /// Returns Ok(true) if positioned, Ok(false) if source is empty
    fn seek_to_first(&mut self) -> Result<bool>;

    /// Position at the last key in the source
    ///
    /// Returns Ok(true) if positioned, Ok(false) if source is empty
    fn seek_to_last(&mut self) -> Result<bool>;

    /// Position at the first key >= target
    ///
    /// If no such key exists, iterator becomes invalid.
    fn seek(&mut self, target: &Slice) -> Result<bool>;

    /// Move to the next entry
    ///
    /// On an invalid iterator this is a no-op returning Ok(false).
    fn next(&mut self) -> Result<bool>;

    /// Move to the previous entry
    ///
    /// On an invalid iterator this is a no-op returning Ok(false).
    fn prev(&mut self) -> Result<bool>;

    /// Get current key
    ///
    /// Prerequisite: valid() == true
    fn key(&self) -> Slice;

    /// Get current value
    ///
    /// Prerequisite: valid() == true
    fn value(&self) -> Slice;

    /// Check if iterator is positioned at a valid entry
    fn valid(&self) -> bool;

    /// Error recorded by the engine, if any
    ///
    /// An invalid iterator with an ok status has simply run off the end of
    /// the data.
    fn status(&self) -> Result<()> {
        Ok(())
    }
}

/// Store iterator handed across worker threads.
pub type BoxedIterator = Box<dyn Iterator + Send>;

mod batch;
mod cursor;
mod lifecycle;
mod memtable_iterator;
mod range_iterator;
mod range_spec;
mod registry;

pub use batch::{Batch, Datum, Entry, ReadBatcher};
pub use cursor::Cursor;
pub use lifecycle::{EndDecision, Lifecycle, LifecycleState};
pub use memtable_iterator::MemTableIterator;
pub use range_iterator::{EndTicket, IteratorId, NextTicket, RangeIterator};
pub use range_spec::RangeSpec;
pub use registry::IteratorRegistry;
