use log::trace;

use crate::{
    iterator::Cursor,
    util::{Result, Slice},
};

/// One produced entry. A side is absent when the range does not
/// deliver it (`keys: false` / `values: false`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    key: Option<Slice>,
    value: Option<Slice>,
}

/// Representation of a key or value handed to the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Datum {
    Buffer(Slice),
    Text(String),
}

impl Datum {
    fn from_slice(slice: &Slice, as_buffer: bool) -> Self {
        if as_buffer {
            Datum::Buffer(slice.clone())
        } else {
            Datum::Text(slice.to_string_lossy())
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Datum::Buffer(slice) => slice.data(),
            Datum::Text(text) => text.as_bytes(),
        }
    }
}

impl Entry {
    pub fn new(key: Option<Slice>, value: Option<Slice>) -> Self {
        Entry { key, value }
    }

    pub fn key(&self) -> Option<&Slice> {
        self.key.as_ref()
    }

    pub fn value(&self) -> Option<&Slice> {
        self.value.as_ref()
    }

    /// Bytes counted against the high water mark.
    pub fn size(&self) -> usize {
        self.key.as_ref().map_or(0, Slice::size) + self.value.as_ref().map_or(0, Slice::size)
    }

    pub fn key_datum(&self, as_buffer: bool) -> Option<Datum> {
        self.key.as_ref().map(|k| Datum::from_slice(k, as_buffer))
    }

    pub fn value_datum(&self, as_buffer: bool) -> Option<Datum> {
        self.value.as_ref().map(|v| Datum::from_slice(v, as_buffer))
    }

    pub fn into_parts(self) -> (Option<Slice>, Option<Slice>) {
        (self.key, self.value)
    }
}

/// Result of one advance.
///
/// `entries` are in iteration order. `done` is true when the range is
/// exhausted; a batch can be both non-empty and done.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Batch {
    entries: Vec<Entry>,
    done: bool,
}

impl Batch {
    pub fn new(entries: Vec<Entry>, done: bool) -> Self {
        Batch { entries, done }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn done(&self) -> bool {
        self.done
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys of the batch in iteration order, skipping absent ones.
    pub fn keys(&self) -> Vec<Slice> {
        self.entries.iter().filter_map(|e| e.key.clone()).collect()
    }

    /// Bytes counted against the high water mark.
    pub fn size(&self) -> usize {
        self.entries.iter().map(Entry::size).sum()
    }

    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }

    /// Entries reversed, for consumers that pop from the back of a
    /// flattened array.
    pub fn into_pop_order(self) -> Vec<Entry> {
        let mut entries = self.entries;
        entries.reverse();
        entries
    }
}

/// Pulls entries from a [`Cursor`] until a size threshold is crossed.
#[derive(Clone, Copy, Debug)]
pub struct ReadBatcher {
    high_water_mark: usize,
}

impl ReadBatcher {
    pub fn new(high_water_mark: usize) -> Self {
        ReadBatcher { high_water_mark }
    }

    pub fn high_water_mark(&self) -> usize {
        self.high_water_mark
    }

    /// Read the next batch.
    ///
    /// Entries are appended until their accumulated size exceeds the high
    /// water mark, so every batch holds at least one entry unless the range
    /// is exhausted. On exhaustion the store iterator status is checked and
    /// its error, if any, is returned instead of the batch. A not-found
    /// status only says the store ran out of data.
    pub fn next_batch(&self, cursor: &mut Cursor) -> Result<Batch> {
        let mut entries = Vec::new();
        let mut size = 0;

        loop {
            let Some(entry) = cursor.read()? else {
                match cursor.status() {
                    Err(e) if !e.is_not_found() => return Err(e),
                    _ => {},
                }
                trace!("batch of {} entries, {size} bytes, exhausted", entries.len());
                return Ok(Batch::new(entries, true));
            };

            cursor.mark_landed();
            size += entry.size();
            entries.push(entry);

            if size > self.high_water_mark {
                trace!("batch of {} entries, {size} bytes", entries.len());
                return Ok(Batch::new(entries, false));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        db::{MemStore, RangeOptions, Store},
        iterator::RangeSpec,
    };

    fn cursor_over(n: usize, options: RangeOptions) -> Cursor {
        let store = Arc::new(MemStore::new());
        for i in 0..n {
            store.put(
                Slice::from(format!("key{i:04}")),
                Slice::from(format!("value{i:04}")),
            );
        }
        let store: Arc<dyn Store> = store;
        Cursor::new(store, RangeSpec::new(&options).unwrap(), false)
    }

    #[test]
    fn test_batch_crosses_watermark() {
        // 7 + 9 = 16 bytes per entry
        let mut cursor = cursor_over(10, RangeOptions::default());
        let batcher = ReadBatcher::new(40);

        let batch = batcher.next_batch(&mut cursor).unwrap();
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.size(), 48);
        assert!(!batch.done());
        assert!(cursor.landed());

        let batch = batcher.next_batch(&mut cursor).unwrap();
        assert_eq!(batch.keys()[0], Slice::from("key0003"));
    }

    #[test]
    fn test_batch_zero_watermark_yields_single_entries() {
        let mut cursor = cursor_over(2, RangeOptions::default());
        let batcher = ReadBatcher::new(0);

        assert_eq!(batcher.next_batch(&mut cursor).unwrap().len(), 1);
        assert_eq!(batcher.next_batch(&mut cursor).unwrap().len(), 1);

        let last = batcher.next_batch(&mut cursor).unwrap();
        assert!(last.is_empty());
        assert!(last.done());
    }

    #[test]
    fn test_batch_done_with_entries() {
        let mut cursor = cursor_over(3, RangeOptions::default());
        let batch = ReadBatcher::new(1 << 20).next_batch(&mut cursor).unwrap();
        assert_eq!(batch.len(), 3);
        assert!(batch.done());
    }

    #[test]
    fn test_batch_size_counts_delivered_sides_only() {
        let mut cursor = cursor_over(
            1,
            RangeOptions {
                values: false,
                ..Default::default()
            },
        );
        let batch = ReadBatcher::new(1 << 20).next_batch(&mut cursor).unwrap();
        assert_eq!(batch.size(), 7);
    }

    #[test]
    fn test_pop_order_and_datum() {
        let batch = Batch::new(
            vec![
                Entry::new(Some(Slice::from("a")), Some(Slice::from("1"))),
                Entry::new(Some(Slice::from("b")), None),
            ],
            true,
        );
        let entries = batch.into_pop_order();
        assert_eq!(entries[0].key(), Some(&Slice::from("b")));

        assert_eq!(
            entries[1].key_datum(false),
            Some(Datum::Text("a".to_string()))
        );
        assert_eq!(
            entries[1].value_datum(true),
            Some(Datum::Buffer(Slice::from("1")))
        );
        assert_eq!(entries[0].value_datum(true), None);
    }
}
