use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{debug, trace, warn};
use parking_lot::Mutex;
use rayon::ThreadPool;

use crate::{
    db::{RangeOptions, Store},
    iterator::{
        Batch, Cursor, EndDecision, IteratorRegistry, Lifecycle, LifecycleState, RangeSpec,
        ReadBatcher,
    },
    statistics::Statistics,
    util::{Result, Slice, Status},
};

pub type IteratorId = u32;

/// Pending result of an asynchronous advance.
#[must_use]
pub struct NextTicket {
    rx: Receiver<Result<Batch>>,
}

impl NextTicket {
    /// Block until the batch is delivered.
    pub fn wait(self) -> Result<Batch> {
        self.rx
            .recv()
            .unwrap_or_else(|_| Err(Status::aborted("advance dropped without completing")))
    }

    /// Block for at most `timeout`; `None` if the batch is not ready yet.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<Batch>> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                Some(Err(Status::aborted("advance dropped without completing")))
            },
        }
    }
}

/// Pending result of an asynchronous end.
///
/// Resolves to true once this end released the iterator, false right away
/// if the iterator was already ended or an end was already scheduled.
#[must_use]
pub struct EndTicket {
    rx: Receiver<Result<bool>>,
}

impl EndTicket {
    /// Ticket that already holds its outcome.
    pub(crate) fn resolved(ended: bool) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let _ = tx.send(Ok(ended));
        EndTicket { rx }
    }

    pub fn wait(self) -> Result<bool> {
        self.rx
            .recv()
            .unwrap_or_else(|_| Err(Status::aborted("end dropped without completing")))
    }
}

/// A bounded, directional iterator over a store, advanced in batches.
///
/// # Concurrency
///
/// At most one advance is in flight at a time; a second one, or a seek,
/// issued meanwhile fails with `Busy`. An end requested during an advance
/// is deferred until that advance's batch has been delivered.
///
/// Lock order is `lifecycle` before `cursor`; the cursor lock is never held
/// while taking the lifecycle lock.
pub struct RangeIterator {
    id: IteratorId,
    lifecycle: Mutex<Lifecycle>,
    cursor: Mutex<Cursor>,
    batcher: ReadBatcher,
    key_as_buffer: bool,
    value_as_buffer: bool,
    registry: Weak<IteratorRegistry>,
    pool: Arc<ThreadPool>,
    statistics: Arc<Statistics>,
}

impl RangeIterator {
    /// Build an iterator over `range`, already validated from `options`.
    pub(crate) fn new(
        id: IteratorId,
        store: Arc<dyn Store>,
        range: RangeSpec,
        options: &RangeOptions,
        registry: Weak<IteratorRegistry>,
        pool: Arc<ThreadPool>,
        statistics: Arc<Statistics>,
    ) -> Self {
        let cursor = Cursor::new(store, range, options.fill_cache);

        RangeIterator {
            id,
            lifecycle: Mutex::new(Lifecycle::new()),
            cursor: Mutex::new(cursor),
            batcher: ReadBatcher::new(options.high_water_mark),
            key_as_buffer: options.key_as_buffer,
            value_as_buffer: options.value_as_buffer,
            registry,
            pool,
            statistics,
        }
    }

    pub fn id(&self) -> IteratorId {
        self.id
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.lock().state()
    }

    pub fn key_as_buffer(&self) -> bool {
        self.key_as_buffer
    }

    pub fn value_as_buffer(&self) -> bool {
        self.value_as_buffer
    }

    pub fn high_water_mark(&self) -> usize {
        self.batcher.high_water_mark()
    }

    /// Reposition the iterator at `target`.
    ///
    /// The next advance starts at the nearest key at or beyond `target` in
    /// the direction of travel, or is empty and done if `target` lies
    /// outside the iterator's range.
    pub fn seek(&self, target: Slice) -> Result<()> {
        // Held across the seek so no advance or end can start meanwhile.
        let lifecycle = self.lifecycle.lock();
        if let Err(e) = lifecycle.check_seek() {
            if e.is_busy() {
                self.statistics.record_busy();
            }
            return Err(e);
        }

        let parked = self.cursor.lock().seek(target).inspect_err(|e| {
            warn!("iterator {} seek failed: {e}", self.id);
            self.statistics.record_error();
        })?;
        self.statistics.record_seek(parked);
        Ok(())
    }

    /// Read the next batch on the caller's thread.
    pub fn next_sync(&self) -> Result<Batch> {
        self.begin_advance()?;
        let result = self.advance(false);

        let pending_end = self.lifecycle.lock().finish_advance();
        if pending_end {
            self.terminate(true);
        }
        result
    }

    /// Read the next batch on the worker pool.
    pub fn next(self: &Arc<Self>) -> Result<NextTicket> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.next_with(move |result| {
            // The ticket may have been dropped.
            let _ = tx.send(result);
        })?;
        Ok(NextTicket { rx })
    }

    /// Read the next batch on the worker pool and hand it to `callback`
    /// there.
    ///
    /// Fails synchronously, without calling `callback`, when the advance is
    /// not admitted.
    pub fn next_with<F>(self: &Arc<Self>, callback: F) -> Result<()>
    where
        F: FnOnce(Result<Batch>) + Send + 'static,
    {
        self.begin_advance()?;

        let this = Arc::clone(self);
        self.pool.spawn(move || {
            let result = this.advance(true);
            let pending_end = this.lifecycle.lock().finish_advance();
            callback(result);
            if pending_end {
                this.terminate(true);
            }
        });
        Ok(())
    }

    /// End the iterator on the caller's thread.
    ///
    /// Returns true only when this call released the iterator. During an
    /// in-flight advance the end is scheduled to run after it and false is
    /// returned.
    pub fn end_sync(&self) -> bool {
        let decision = self.lifecycle.lock().request_end(None);
        match decision {
            EndDecision::Now => {
                self.terminate(false);
                true
            },
            EndDecision::Deferred => {
                debug!("iterator {} end deferred until advance completes", self.id);
                false
            },
            EndDecision::AlreadyEnded => false,
        }
    }

    /// End the iterator on the worker pool.
    pub fn end(self: &Arc<Self>) -> EndTicket {
        self.end_with(false)
    }

    /// Like [`RangeIterator::end`], but if an end is already under way the
    /// ticket waits for it instead of resolving to false.
    pub(crate) fn shutdown(self: &Arc<Self>) -> EndTicket {
        self.end_with(true)
    }

    fn end_with(self: &Arc<Self>, join_pending: bool) -> EndTicket {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let mut lifecycle = self.lifecycle.lock();
        match lifecycle.request_end(Some(tx.clone())) {
            EndDecision::Now => {
                drop(lifecycle);
                let this = Arc::clone(self);
                self.pool.spawn(move || this.terminate(false));
            },
            EndDecision::Deferred => {
                debug!("iterator {} end deferred until advance completes", self.id);
            },
            EndDecision::AlreadyEnded => {
                if !(join_pending && lifecycle.join_end(tx.clone())) {
                    let _ = tx.send(Ok(false));
                }
            },
        }
        EndTicket { rx }
    }

    fn begin_advance(&self) -> Result<()> {
        self.lifecycle.lock().begin_advance().inspect_err(|e| {
            if e.is_busy() {
                self.statistics.record_busy();
            }
        })
    }

    fn advance(&self, is_async: bool) -> Result<Batch> {
        let result = {
            let mut cursor = self.cursor.lock();
            let result = self.batcher.next_batch(&mut cursor);
            cursor.release_target();
            result
        };

        match &result {
            Ok(batch) => {
                trace!(
                    "iterator {} advanced: {} entries, done={}",
                    self.id,
                    batch.len(),
                    batch.done()
                );
                self.statistics
                    .record_advance(is_async, batch.len() as u64, batch.size() as u64);
            },
            Err(e) => {
                warn!("iterator {} advance failed: {e}", self.id);
                self.statistics.record_error();
            },
        }
        result
    }

    /// Release the cursor, leave the registry and enter `Ended`, notifying
    /// end waiters.
    fn terminate(&self, deferred: bool) {
        self.cursor.lock().release();
        if let Some(registry) = self.registry.upgrade() {
            registry.deregister(self.id);
        }
        self.lifecycle.lock().mark_ended();
        self.statistics.record_iterator_ended(deferred);
        debug!("iterator {} ended (deferred={deferred})", self.id);
    }
}

#[cfg(test)]
mod tests {
    use rayon::ThreadPoolBuilder;

    use super::*;
    use crate::db::MemStore;

    struct Fixture {
        store: Arc<MemStore>,
        registry: Arc<IteratorRegistry>,
        pool: Arc<ThreadPool>,
        statistics: Arc<Statistics>,
    }

    impl Fixture {
        fn new(keys: &[&str]) -> Self {
            let store = Arc::new(MemStore::new());
            for k in keys {
                store.put(Slice::from(*k), Slice::from(*k));
            }
            Fixture {
                store,
                registry: Arc::new(IteratorRegistry::new()),
                pool: Arc::new(ThreadPoolBuilder::new().num_threads(2).build().unwrap()),
                statistics: Arc::new(Statistics::new()),
            }
        }

        fn iterator(&self, options: RangeOptions) -> Arc<RangeIterator> {
            let store: Arc<dyn Store> = self.store.clone();
            let it = Arc::new(RangeIterator::new(
                self.registry.allocate_id(),
                store,
                RangeSpec::new(&options).unwrap(),
                &options,
                Arc::downgrade(&self.registry),
                self.pool.clone(),
                self.statistics.clone(),
            ));
            self.registry.register(it.clone());
            it
        }
    }

    #[test]
    fn test_next_sync_and_end_sync() {
        let f = Fixture::new(&["a", "b", "c"]);
        let it = f.iterator(RangeOptions::default());

        let batch = it.next_sync().unwrap();
        assert_eq!(batch.len(), 3);
        assert!(batch.done());

        assert!(it.end_sync());
        assert!(!it.end_sync());
        assert_eq!(it.state(), LifecycleState::Ended);
        assert!(f.registry.is_empty());
        assert_eq!(f.store.num_snapshots(), 0);
        assert!(it.next_sync().unwrap_err().is_already_ended());
        assert!(it.seek(Slice::from("a")).unwrap_err().is_already_ended());
    }

    #[test]
    fn test_async_next() {
        let f = Fixture::new(&["a", "b"]);
        let it = f.iterator(RangeOptions {
            high_water_mark: 0,
            ..Default::default()
        });

        let batch = it.next().unwrap().wait().unwrap();
        assert_eq!(batch.keys(), vec![Slice::from("a")]);
        let batch = it.next().unwrap().wait().unwrap();
        assert_eq!(batch.keys(), vec![Slice::from("b")]);
        assert!(it.next().unwrap().wait().unwrap().done());

        assert!(it.end().wait().unwrap());
        assert!(!it.end().wait().unwrap());
    }

    #[test]
    fn test_end_during_advance_runs_after_delivery() {
        let f = Fixture::new(&["a", "b"]);
        let it = f.iterator(RangeOptions::default());

        // Stall the advance on the cursor lock so it stays in flight.
        let cursor = it.cursor.lock();

        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        let observed = it.clone();
        it.next_with(move |result| {
            done_tx.send((result, observed.state())).unwrap();
        })
        .unwrap();

        assert!(it.next_sync().unwrap_err().is_busy());
        assert!(it.seek(Slice::from("a")).unwrap_err().is_busy());

        let ticket = it.end();
        assert!(!it.end_sync());
        drop(cursor);

        let (result, state_at_delivery) = done_rx.recv().unwrap();
        assert_eq!(result.unwrap().len(), 2);
        assert_eq!(state_at_delivery, LifecycleState::EndPending);

        assert!(ticket.wait().unwrap());
        assert_eq!(it.state(), LifecycleState::Ended);
        assert_eq!(f.store.num_snapshots(), 0);
        assert_eq!(f.statistics.num_deferred_ends(), 1);
    }

    #[test]
    fn test_seek_then_next() {
        let f = Fixture::new(&["a", "b", "c", "d"]);
        let it = f.iterator(RangeOptions::default());
        it.seek(Slice::from("c")).unwrap();
        assert_eq!(
            it.next_sync().unwrap().keys(),
            vec![Slice::from("c"), Slice::from("d")]
        );
        assert_eq!(f.statistics.num_seeks(), 1);
    }
}
