pub mod db;
pub mod iterator;
pub mod memtable;
pub mod statistics;
pub mod util;

pub use db::{DB, DBOptions, MemStore, RangeOptions, ReadOptions, Snapshot, Store};
pub use iterator::{
    Batch, BoxedIterator, Datum, EndTicket, Entry, IteratorId, NextTicket, RangeIterator,
};
pub use statistics::Statistics;
pub use util::{Code, Result, Slice, Status};
