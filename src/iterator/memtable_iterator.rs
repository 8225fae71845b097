use std::{ops::Bound, sync::Arc};

use crate::{
    memtable::{
        InternalKey,
        memtable::{VersionMap, visible_version},
    },
    util::{Result, Slice},
};

/// Iterator for MemTable
///
/// Walks user keys in order, exposing for each one the newest version whose
/// sequence number is at or below the snapshot sequence. Keys whose visible
/// version is a deletion are skipped.
///
/// # Implementation Notes
///
/// The skiplist only supports range queries, so every step re-enters the map
/// with a bound derived from the current user key. Forward steps use the
/// newest-first version order directly; backward steps resolve the visible
/// version of each candidate key with a point lookup.
pub struct MemTableIterator {
    table: Arc<VersionMap>,
    sequence: u64,
    current: Option<(Slice, Slice)>,
}

impl MemTableIterator {
    pub(crate) fn new(table: Arc<VersionMap>, sequence: u64) -> Self {
        MemTableIterator {
            table,
            sequence,
            current: None,
        }
    }

    /// First visible entry at or after `from`.
    fn scan_forward(&self, from: Bound<InternalKey>) -> Option<(Slice, Slice)> {
        // User key whose visible version turned out to be a deletion.
        let mut deleted: Option<Slice> = None;

        for entry in self.table.range((from, Bound::Unbounded)) {
            let ikey = entry.key();
            if ikey.sequence() > self.sequence {
                continue;
            }
            if deleted.as_ref() == Some(ikey.user_key()) {
                continue;
            }
            match entry.value() {
                Some(value) => return Some((ikey.user_key().clone(), value.clone())),
                None => deleted = Some(ikey.user_key().clone()),
            }
        }
        None
    }

    /// Last visible entry before `to`.
    fn scan_backward(&self, to: Bound<InternalKey>) -> Option<(Slice, Slice)> {
        let mut checked: Option<Slice> = None;

        for entry in self.table.range((Bound::Unbounded, to)).rev() {
            let user_key = entry.key().user_key();
            if checked.as_ref() == Some(user_key) {
                continue;
            }
            checked = Some(user_key.clone());

            if let Some(Some(value)) = visible_version(&self.table, user_key, self.sequence) {
                return Some((user_key.clone(), value));
            }
        }
        None
    }

    fn land(&mut self, position: Option<(Slice, Slice)>) -> bool {
        self.current = position;
        self.current.is_some()
    }
}

impl crate::iterator::Iterator for MemTableIterator {
    fn seek_to_first(&mut self) -> Result<bool> {
        let position = self.scan_forward(Bound::Unbounded);
        Ok(self.land(position))
    }

    fn seek_to_last(&mut self) -> Result<bool> {
        let position = self.scan_backward(Bound::Unbounded);
        Ok(self.land(position))
    }

    fn seek(&mut self, target: &Slice) -> Result<bool> {
        let from = Bound::Included(InternalKey::first_of(target.clone()));
        let position = self.scan_forward(from);
        Ok(self.land(position))
    }

    fn next(&mut self) -> Result<bool> {
        let Some((key, _)) = self.current.take() else {
            return Ok(false);
        };
        let position = self.scan_forward(Bound::Excluded(InternalKey::last_of(key)));
        Ok(self.land(position))
    }

    fn prev(&mut self) -> Result<bool> {
        let Some((key, _)) = self.current.take() else {
            return Ok(false);
        };
        let position = self.scan_backward(Bound::Excluded(InternalKey::first_of(key)));
        Ok(self.land(position))
    }

    fn key(&self) -> Slice {
        self.current
            .as_ref()
            .map(|(key, _)| key.clone())
            .unwrap_or_else(Slice::empty)
    }

    fn value(&self) -> Slice {
        self.current
            .as_ref()
            .map(|(_, value)| value.clone())
            .unwrap_or_else(Slice::empty)
    }

    fn valid(&self) -> bool {
        self.current.is_some()
    }
}
