use std::sync::Arc;

use log::{debug, info, warn};
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::{
    db::{DBOptions, RangeOptions, Store},
    iterator::{
        Batch, EndTicket, IteratorId, IteratorRegistry, NextTicket, RangeIterator, RangeSpec,
    },
    statistics::Statistics,
    util::{Result, Slice, Status},
};

/// Handle through which range iterators over a [`Store`] are created and
/// driven by id.
///
/// ```ignore
/// let store = Arc::new(MemStore::new());
/// let db = DB::open(store, DBOptions::default())?;
/// let id = db.create_iterator(RangeOptions::from_json(r#"{"gte": "a", "limit": 10}"#)?)?;
/// let batch = db.next_sync(id)?;
/// db.end_sync(id)?;
/// ```
pub struct DB {
    store: Arc<dyn Store>,
    /// Live iterators, keyed by id
    registry: Arc<IteratorRegistry>,
    /// Runs asynchronous advances and ends
    pool: Arc<ThreadPool>,
    options: DBOptions,
    /// Iterator statistics
    statistics: Arc<Statistics>,
}

impl DB {
    pub fn open(store: Arc<dyn Store>, options: DBOptions) -> Result<Self> {
        if options.worker_threads == 0 {
            return Err(Status::invalid_argument("worker_threads must be positive"));
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(options.worker_threads)
            .thread_name(|i| format!("rucksiter-worker-{i}"))
            .build()?;

        info!("opened DB with {} worker threads", options.worker_threads);

        Ok(DB {
            store,
            registry: Arc::new(IteratorRegistry::new()),
            pool: Arc::new(pool),
            options,
            statistics: Arc::new(Statistics::new()),
        })
    }

    pub fn options(&self) -> &DBOptions {
        &self.options
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    /// Create a range iterator and return its id.
    ///
    /// The iterator reads a snapshot taken now; later writes to the store
    /// are invisible to it.
    pub fn create_iterator(&self, options: RangeOptions) -> Result<IteratorId> {
        // No id is spent on options that do not describe a range.
        let range = RangeSpec::new(&options)?;
        let id = self.registry.allocate_id();
        let iterator = Arc::new(RangeIterator::new(
            id,
            self.store.clone(),
            range,
            &options,
            Arc::downgrade(&self.registry),
            self.pool.clone(),
            self.statistics.clone(),
        ));
        self.registry.register(iterator);
        self.statistics.record_iterator_created();

        debug!(
            "created iterator {id}: reverse={} limit={}",
            options.reverse, options.limit
        );
        Ok(id)
    }

    /// Live iterator with the given id.
    pub fn iterator(&self, id: IteratorId) -> Result<Arc<RangeIterator>> {
        match self.registry.get(id) {
            Some(iterator) => Ok(iterator),
            None if self.registry.was_issued(id) => Err(Status::already_ended()),
            None => Err(Status::invalid_argument(format!("unknown iterator id {id}"))),
        }
    }

    pub fn num_live_iterators(&self) -> usize {
        self.registry.len()
    }

    pub fn seek(&self, id: IteratorId, target: impl Into<Slice>) -> Result<()> {
        self.iterator(id)?.seek(target.into())
    }

    pub fn next_sync(&self, id: IteratorId) -> Result<Batch> {
        self.iterator(id)?.next_sync()
    }

    pub fn next(&self, id: IteratorId) -> Result<NextTicket> {
        self.iterator(id)?.next()
    }

    pub fn next_with<F>(&self, id: IteratorId, callback: F) -> Result<()>
    where
        F: FnOnce(Result<Batch>) + Send + 'static,
    {
        self.iterator(id)?.next_with(callback)
    }

    /// End an iterator on the caller's thread.
    ///
    /// Returns true only when the iterator was released by this call; an end
    /// requested during an advance runs after it and returns false.
    pub fn end_sync(&self, id: IteratorId) -> Result<bool> {
        match self.registry.get(id) {
            Some(iterator) => Ok(iterator.end_sync()),
            None if self.registry.was_issued(id) => Ok(false),
            None => Err(Status::invalid_argument(format!("unknown iterator id {id}"))),
        }
    }

    /// End an iterator on the worker pool.
    ///
    /// The ticket of an iterator that has already ended resolves to false.
    pub fn end(&self, id: IteratorId) -> Result<EndTicket> {
        match self.registry.get(id) {
            Some(iterator) => Ok(iterator.end()),
            None if self.registry.was_issued(id) => Ok(EndTicket::resolved(false)),
            None => Err(Status::invalid_argument(format!("unknown iterator id {id}"))),
        }
    }

    /// End every live iterator and wait until all of them are released.
    pub fn close(&self) -> Result<()> {
        let live = self.registry.all();
        if live.is_empty() {
            return Ok(());
        }

        debug!("closing {} live iterators", live.len());
        let tickets: Vec<_> = live.iter().map(|it| (it.id(), it.shutdown())).collect();
        for (id, ticket) in tickets {
            if let Err(e) = ticket.wait() {
                warn!("iterator {id} did not end cleanly: {e}");
                return Err(e);
            }
        }
        Ok(())
    }
}

impl Drop for DB {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("failed to close DB: {e}");
        }
    }
}
