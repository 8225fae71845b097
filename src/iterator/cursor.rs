use std::sync::Arc;

use log::trace;

use crate::{
    db::{ReadOptions, Snapshot, Store},
    iterator::{BoxedIterator, Entry, RangeSpec},
    util::{Result, Slice, Status},
};

/// Store iterator handle of a cursor.
///
/// ```text
/// Pending ──first read / seek──→ Materialized ──release──→ Released
///    └───────────────────release─────────────────────────────↑
/// ```
enum Handle {
    Pending,
    Materialized(BoxedIterator),
    Released,
}

/// Positioned reader over one range of a store.
///
/// The snapshot is taken when the cursor is built; the store iterator is
/// only opened on the first read or seek, and both are given back exactly
/// once by [`Cursor::release`] (or on drop).
pub struct Cursor {
    store: Arc<dyn Store>,
    range: RangeSpec,
    read_options: ReadOptions,
    snapshot: Option<Snapshot>,
    handle: Handle,
    /// Entries checked against the limit so far
    count: u64,
    /// Set by an explicit seek: the next read must not step first
    seeking: bool,
    /// Set once an entry was produced since the last explicit seek
    landed: bool,
    /// Target of the last explicit seek, kept until the next batch is done
    target: Option<Slice>,
}

impl Cursor {
    pub fn new(store: Arc<dyn Store>, range: RangeSpec, fill_cache: bool) -> Self {
        let snapshot = store.new_snapshot();
        Cursor {
            store,
            range,
            read_options: ReadOptions { fill_cache },
            snapshot: Some(snapshot),
            handle: Handle::Pending,
            count: 0,
            seeking: false,
            landed: false,
            target: None,
        }
    }

    pub fn range(&self) -> &RangeSpec {
        &self.range
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn landed(&self) -> bool {
        self.landed
    }

    pub fn is_materialized(&self) -> bool {
        matches!(self.handle, Handle::Materialized(_))
    }

    pub fn is_released(&self) -> bool {
        matches!(self.handle, Handle::Released)
    }

    pub fn target(&self) -> Option<&Slice> {
        self.target.as_ref()
    }

    pub(crate) fn mark_landed(&mut self) {
        self.landed = true;
    }

    pub(crate) fn release_target(&mut self) {
        self.target = None;
    }

    /// Open and position the store iterator if that has not happened yet.
    ///
    /// Returns true when this call opened it.
    fn materialize(&mut self) -> Result<bool> {
        if !matches!(self.handle, Handle::Pending) {
            return Ok(false);
        }
        let snapshot = self.snapshot.as_ref().ok_or_else(Status::already_ended)?;
        let mut iter = self.store.new_iterator(&self.read_options, snapshot)?;
        position_initial(&self.range, &mut iter)?;
        self.handle = Handle::Materialized(iter);
        Ok(true)
    }

    /// Produce the next entry of the range, or `None` once it is exhausted.
    ///
    /// Every call except the first one and the one right after an explicit
    /// seek steps the store iterator before looking at it.
    pub fn read(&mut self) -> Result<Option<Entry>> {
        let fresh = self.materialize()?;
        let iter = handle_mut(&mut self.handle)?;

        if !fresh && !self.seeking {
            if self.range.reverse() {
                iter.prev()?;
            } else {
                iter.next()?;
            }
        }
        self.seeking = false;

        if !iter.valid() {
            return Ok(None);
        }

        let key = iter.key();
        if !self.range.admits(&key, &mut self.count) {
            return Ok(None);
        }

        let value = self.range.values().then(|| iter.value());
        let key = self.range.keys().then_some(key);
        Ok(Some(Entry::new(key, value)))
    }

    /// Reposition at `target`.
    ///
    /// Lands on the nearest key at or beyond `target` in the direction of
    /// travel. A target outside the configured window parks the cursor past
    /// the end so the next read reports exhaustion. Returns true when the
    /// cursor was parked.
    pub fn seek(&mut self, target: Slice) -> Result<bool> {
        self.release_target();
        self.materialize()?;
        let iter = handle_mut(&mut self.handle)?;
        let reverse = self.range.reverse();

        iter.seek(&target)?;
        self.seeking = true;
        self.landed = false;

        let parked = if self.range.out_of_range(&target) {
            park(iter, reverse)?;
            true
        } else if iter.valid() {
            // The store lands on the first key >= target; going backward we
            // want the last key <= target.
            let key = iter.key();
            if reverse && key > target {
                iter.prev()?;
            } else if !reverse && key < target {
                iter.next()?;
            }
            false
        } else {
            if reverse {
                iter.seek_to_last()?;
            } else {
                iter.seek_to_first()?;
            }
            let overshot = iter.valid() && {
                let key = iter.key();
                (reverse && key > target) || (!reverse && key < target)
            };
            if overshot {
                park(iter, reverse)?;
            }
            overshot
        };

        trace!(
            "cursor seek to {target:?}: parked={parked} valid={}",
            iter.valid()
        );
        self.target = Some(target);
        Ok(parked)
    }

    /// Error recorded by the store iterator.
    pub fn status(&self) -> Result<()> {
        match &self.handle {
            Handle::Materialized(iter) => iter.status(),
            Handle::Pending | Handle::Released => Ok(()),
        }
    }

    /// Close the store iterator and give the snapshot back.
    ///
    /// Returns false if the cursor was already released.
    pub fn release(&mut self) -> bool {
        // The iterator reads through the snapshot, drop it first.
        self.handle = Handle::Released;
        self.target = None;
        match self.snapshot.take() {
            Some(snapshot) => {
                self.store.release_snapshot(snapshot);
                true
            },
            None => false,
        }
    }
}

impl Drop for Cursor {
    fn drop(&mut self) {
        self.release();
    }
}

fn handle_mut(handle: &mut Handle) -> Result<&mut BoxedIterator> {
    match handle {
        Handle::Materialized(iter) => Ok(iter),
        Handle::Pending | Handle::Released => Err(Status::already_ended()),
    }
}

/// First positioning of a freshly opened store iterator.
fn position_initial(range: &RangeSpec, iter: &mut BoxedIterator) -> Result<()> {
    let Some(start) = range.start() else {
        if range.reverse() {
            iter.seek_to_last()?;
        } else {
            iter.seek_to_first()?;
        }
        return Ok(());
    };

    iter.seek(start)?;

    if range.reverse() {
        if !iter.valid() {
            // past the last key, step back
            iter.seek_to_last()?;
        } else {
            let key = iter.key();
            let overshot = match (range.lt(), range.lte()) {
                (Some(lt), _) => key >= *lt,
                (None, Some(lte)) => key > *lte,
                (None, None) => key != *start,
            };
            if overshot {
                iter.prev()?;
            }
        }
    } else if iter.valid() && range.gt().is_some_and(|gt| iter.key() == *gt) {
        iter.next()?;
    }

    Ok(())
}

/// Leave the iterator invalid, just outside the data on the side of travel.
fn park(iter: &mut BoxedIterator, reverse: bool) -> Result<()> {
    if reverse {
        iter.seek_to_first()?;
        iter.prev()?;
    } else {
        iter.seek_to_last()?;
        iter.next()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemStore, RangeOptions};

    fn store_with(keys: &[&str]) -> Arc<MemStore> {
        let store = Arc::new(MemStore::new());
        for k in keys {
            store.put(Slice::from(*k), Slice::from(format!("v{k}")));
        }
        store
    }

    fn cursor(store: &Arc<MemStore>, options: RangeOptions) -> Cursor {
        let store: Arc<dyn Store> = store.clone();
        Cursor::new(store, RangeSpec::new(&options).unwrap(), false)
    }

    fn drain(cursor: &mut Cursor) -> Vec<String> {
        let mut keys = Vec::new();
        while let Some(entry) = cursor.read().unwrap() {
            keys.push(entry.key().unwrap().to_string());
        }
        keys
    }

    fn s(v: &str) -> Option<Slice> {
        Some(Slice::from(v))
    }

    #[test]
    fn test_cursor_is_lazy() {
        let store = store_with(&["a", "b"]);
        let mut c = cursor(&store, RangeOptions::default());
        assert!(!c.is_materialized());
        assert_eq!(store.num_snapshots(), 1);

        c.read().unwrap();
        assert!(c.is_materialized());
    }

    #[test]
    fn test_forward_and_reverse_full_scan() {
        let store = store_with(&["c", "a", "b"]);
        let mut c = cursor(&store, RangeOptions::default());
        assert_eq!(drain(&mut c), vec!["a", "b", "c"]);

        let mut c = cursor(
            &store,
            RangeOptions {
                reverse: true,
                ..Default::default()
            },
        );
        assert_eq!(drain(&mut c), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_forward_gt_skips_exact_match() {
        let store = store_with(&["a", "b", "c", "d", "e"]);
        let mut c = cursor(
            &store,
            RangeOptions {
                gt: s("b"),
                lt: s("e"),
                ..Default::default()
            },
        );
        assert_eq!(drain(&mut c), vec!["c", "d"]);
    }

    #[test]
    fn test_reverse_lt_steps_back_from_landing() {
        let store = store_with(&["a", "b", "c", "d", "e"]);
        let mut c = cursor(
            &store,
            RangeOptions {
                lt: s("d"),
                reverse: true,
                ..Default::default()
            },
        );
        assert_eq!(drain(&mut c), vec!["c", "b", "a"]);

        // Bound between keys.
        let mut c = cursor(
            &store,
            RangeOptions {
                lte: s("cc"),
                reverse: true,
                ..Default::default()
            },
        );
        assert_eq!(drain(&mut c), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_reverse_start_past_last_key() {
        let store = store_with(&["a", "b"]);
        let mut c = cursor(
            &store,
            RangeOptions {
                start: s("z"),
                reverse: true,
                ..Default::default()
            },
        );
        assert_eq!(drain(&mut c), vec!["b", "a"]);
    }

    #[test]
    fn test_reverse_start_between_keys() {
        // The store lands on "c", the first key above the start.
        let store = store_with(&["a", "b", "c"]);
        let mut c = cursor(
            &store,
            RangeOptions {
                start: s("bb"),
                reverse: true,
                ..Default::default()
            },
        );
        assert_eq!(drain(&mut c), vec!["b", "a"]);

        let mut c = cursor(
            &store,
            RangeOptions {
                start: s("bb"),
                end: s("b"),
                reverse: true,
                ..Default::default()
            },
        );
        assert_eq!(drain(&mut c), vec!["b"]);
    }

    #[test]
    fn test_read_after_exhaustion_stays_exhausted() {
        let store = store_with(&["a"]);
        let mut c = cursor(&store, RangeOptions::default());
        assert!(c.read().unwrap().is_some());
        assert!(c.read().unwrap().is_none());
        assert!(c.read().unwrap().is_none());
    }

    #[test]
    fn test_keys_and_values_flags() {
        let store = store_with(&["a"]);
        let mut c = cursor(
            &store,
            RangeOptions {
                keys: false,
                ..Default::default()
            },
        );
        let entry = c.read().unwrap().unwrap();
        assert_eq!(entry.key(), None);
        assert_eq!(entry.value(), Some(&Slice::from("va")));

        let mut c = cursor(
            &store,
            RangeOptions {
                values: false,
                ..Default::default()
            },
        );
        let entry = c.read().unwrap().unwrap();
        assert_eq!(entry.key(), Some(&Slice::from("a")));
        assert_eq!(entry.value(), None);
    }

    #[test]
    fn test_seek_inside_window() {
        let store = store_with(&["a", "c", "e", "g"]);
        let mut c = cursor(&store, RangeOptions::default());
        assert!(!c.seek(Slice::from("d")).unwrap());
        assert_eq!(c.target(), Some(&Slice::from("d")));
        assert_eq!(drain(&mut c), vec!["e", "g"]);

        let mut c = cursor(
            &store,
            RangeOptions {
                reverse: true,
                ..Default::default()
            },
        );
        assert!(!c.seek(Slice::from("d")).unwrap());
        assert_eq!(drain(&mut c), vec!["c", "a"]);
    }

    #[test]
    fn test_seek_exact_match_is_inclusive() {
        let store = store_with(&["a", "c", "e"]);
        let mut c = cursor(
            &store,
            RangeOptions {
                reverse: true,
                ..Default::default()
            },
        );
        c.seek(Slice::from("c")).unwrap();
        assert_eq!(drain(&mut c), vec!["c", "a"]);
    }

    #[test]
    fn test_seek_out_of_range_parks() {
        let store = store_with(&["a", "b", "c", "d", "e"]);
        let mut c = cursor(
            &store,
            RangeOptions {
                gte: s("b"),
                lte: s("d"),
                ..Default::default()
            },
        );
        assert!(c.seek(Slice::from("e")).unwrap());
        assert!(c.read().unwrap().is_none());

        let mut c = cursor(
            &store,
            RangeOptions {
                gte: s("b"),
                reverse: true,
                ..Default::default()
            },
        );
        assert!(c.seek(Slice::from("a")).unwrap());
        assert!(c.read().unwrap().is_none());
    }

    #[test]
    fn test_seek_beyond_data_edges() {
        let store = store_with(&["b", "c"]);

        // Forward past the last key: nothing left.
        let mut c = cursor(&store, RangeOptions::default());
        assert!(c.seek(Slice::from("z")).unwrap());
        assert!(c.read().unwrap().is_none());

        // Reverse past the last key: start from the last one.
        let mut c = cursor(
            &store,
            RangeOptions {
                reverse: true,
                ..Default::default()
            },
        );
        assert!(!c.seek(Slice::from("z")).unwrap());
        assert_eq!(drain(&mut c), vec!["c", "b"]);

        // Reverse before the first key: nothing left.
        let mut c = cursor(
            &store,
            RangeOptions {
                reverse: true,
                ..Default::default()
            },
        );
        c.seek(Slice::from("a")).unwrap();
        assert!(c.read().unwrap().is_none());
    }

    #[test]
    fn test_release_once() {
        let store = store_with(&["a"]);
        let mut c = cursor(&store, RangeOptions::default());
        c.read().unwrap();
        assert_eq!(store.num_snapshots(), 1);

        assert!(c.release());
        assert_eq!(store.num_snapshots(), 0);
        assert!(!c.release());
        assert!(c.is_released());
        assert!(c.read().unwrap_err().is_already_ended());
    }

    #[test]
    fn test_drop_releases_snapshot() {
        let store = store_with(&["a"]);
        {
            let _c = cursor(&store, RangeOptions::default());
            assert_eq!(store.num_snapshots(), 1);
        }
        assert_eq!(store.num_snapshots(), 0);
    }
}
