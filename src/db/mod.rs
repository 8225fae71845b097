#[allow(clippy::module_inception)]
pub mod db;
pub mod mem_store;
pub mod options;
pub mod snapshot;
pub mod store;

pub use db::DB;
pub use mem_store::MemStore;
pub use options::{DBOptions, DEFAULT_HIGH_WATER_MARK, RangeOptions, ReadOptions};
pub use snapshot::{Snapshot, SnapshotList};
pub use store::Store;
