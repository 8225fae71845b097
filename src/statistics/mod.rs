use std::sync::atomic::{AtomicU64, Ordering};

/// Iterator statistics of a [`crate::DB`]
///
/// Thread-safe counters for all iterator activity.
/// Uses atomic counters for lock-free updates.
#[derive(Debug, Default)]
pub struct Statistics {
    // Lifecycle
    pub num_iterators_created: AtomicU64,
    pub num_iterators_ended: AtomicU64,
    pub num_deferred_ends: AtomicU64,

    // Advances
    pub num_sync_advances: AtomicU64,
    pub num_async_advances: AtomicU64,
    pub num_busy_rejections: AtomicU64,
    pub entries_read: AtomicU64,
    pub bytes_read: AtomicU64,

    // Seeks
    pub num_seeks: AtomicU64,
    pub num_out_of_range_seeks: AtomicU64,

    // Error counts
    pub num_errors: AtomicU64,
}

impl Statistics {
    pub fn new() -> Self {
        Statistics::default()
    }

    #[inline]
    pub fn record_iterator_created(&self) {
        self.num_iterators_created.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_iterator_ended(&self, deferred: bool) {
        self.num_iterators_ended.fetch_add(1, Ordering::Relaxed);
        if deferred {
            self.num_deferred_ends.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_advance(&self, is_async: bool, entries: u64, bytes: u64) {
        if is_async {
            self.num_async_advances.fetch_add(1, Ordering::Relaxed);
        } else {
            self.num_sync_advances.fetch_add(1, Ordering::Relaxed);
        }
        self.entries_read.fetch_add(entries, Ordering::Relaxed);
        self.bytes_read.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_busy(&self) {
        self.num_busy_rejections.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_seek(&self, out_of_range: bool) {
        self.num_seeks.fetch_add(1, Ordering::Relaxed);
        if out_of_range {
            self.num_out_of_range_seeks.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_error(&self) {
        self.num_errors.fetch_add(1, Ordering::Relaxed);
    }

    // Getters (snapshot values)
    pub fn num_iterators_created(&self) -> u64 {
        self.num_iterators_created.load(Ordering::Relaxed)
    }

    pub fn num_iterators_ended(&self) -> u64 {
        self.num_iterators_ended.load(Ordering::Relaxed)
    }

    pub fn num_deferred_ends(&self) -> u64 {
        self.num_deferred_ends.load(Ordering::Relaxed)
    }

    pub fn num_advances(&self) -> u64 {
        self.num_sync_advances.load(Ordering::Relaxed)
            + self.num_async_advances.load(Ordering::Relaxed)
    }

    pub fn entries_read(&self) -> u64 {
        self.entries_read.load(Ordering::Relaxed)
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read.load(Ordering::Relaxed)
    }

    pub fn num_seeks(&self) -> u64 {
        self.num_seeks.load(Ordering::Relaxed)
    }

    pub fn num_errors(&self) -> u64 {
        self.num_errors.load(Ordering::Relaxed)
    }

    /// Iterators created and not yet ended.
    pub fn live_iterators(&self) -> u64 {
        self.num_iterators_created()
            .saturating_sub(self.num_iterators_ended())
    }

    pub fn avg_entries_per_advance(&self) -> f64 {
        let advances = self.num_advances() as f64;
        let entries = self.entries_read() as f64;
        if advances > 0.0 { entries / advances } else { 0.0 }
    }

    pub fn out_of_range_seek_ratio(&self) -> f64 {
        let seeks = self.num_seeks() as f64;
        let out = self.num_out_of_range_seeks.load(Ordering::Relaxed) as f64;
        if seeks > 0.0 { out / seeks } else { 0.0 }
    }

    /// Reset all statistics to zero
    pub fn reset(&self) {
        self.num_iterators_created.store(0, Ordering::Relaxed);
        self.num_iterators_ended.store(0, Ordering::Relaxed);
        self.num_deferred_ends.store(0, Ordering::Relaxed);
        self.num_sync_advances.store(0, Ordering::Relaxed);
        self.num_async_advances.store(0, Ordering::Relaxed);
        self.num_busy_rejections.store(0, Ordering::Relaxed);
        self.entries_read.store(0, Ordering::Relaxed);
        self.bytes_read.store(0, Ordering::Relaxed);
        self.num_seeks.store(0, Ordering::Relaxed);
        self.num_out_of_range_seeks.store(0, Ordering::Relaxed);
        self.num_errors.store(0, Ordering::Relaxed);
    }

    /// Get a formatted statistics report
    pub fn report(&self) -> String {
        format!(
            "Iterator Statistics:\n\
            \n\
            Lifecycle:\n\
            - Created:       {}\n\
            - Ended:         {}\n\
            - Deferred ends: {}\n\
            - Live:          {}\n\
            \n\
            Advances:\n\
            - Sync:          {}\n\
            - Async:         {}\n\
            - Busy:          {}\n\
            - Entries read:  {}\n\
            - Bytes read:    {} ({:.2} MB)\n\
            - Avg entries:   {:.2}\n\
            \n\
            Seeks:\n\
            - Total:         {}\n\
            - Out of range:  {} ({:.1}%)\n\
            \n\
            Errors:          {}",
            self.num_iterators_created(),
            self.num_iterators_ended(),
            self.num_deferred_ends(),
            self.live_iterators(),
            self.num_sync_advances.load(Ordering::Relaxed),
            self.num_async_advances.load(Ordering::Relaxed),
            self.num_busy_rejections.load(Ordering::Relaxed),
            self.entries_read(),
            self.bytes_read(),
            self.bytes_read() as f64 / 1024.0 / 1024.0,
            self.avg_entries_per_advance(),
            self.num_seeks(),
            self.num_out_of_range_seeks.load(Ordering::Relaxed),
            self.out_of_range_seek_ratio() * 100.0,
            self.num_errors(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistics_basic() {
        let stats = Statistics::new();

        stats.record_iterator_created();
        stats.record_iterator_created();
        stats.record_iterator_ended(false);
        stats.record_advance(false, 10, 300);
        stats.record_advance(true, 2, 50);

        assert_eq!(stats.num_iterators_created(), 2);
        assert_eq!(stats.live_iterators(), 1);
        assert_eq!(stats.num_advances(), 2);
        assert_eq!(stats.entries_read(), 12);
        assert_eq!(stats.bytes_read(), 350);
        assert_eq!(stats.avg_entries_per_advance(), 6.0);
    }

    #[test]
    fn test_deferred_ends() {
        let stats = Statistics::new();

        stats.record_iterator_ended(true);
        stats.record_iterator_ended(false);

        assert_eq!(stats.num_iterators_ended(), 2);
        assert_eq!(stats.num_deferred_ends(), 1);
    }

    #[test]
    fn test_out_of_range_seek_ratio() {
        let stats = Statistics::new();

        stats.record_seek(false);
        stats.record_seek(true);
        stats.record_seek(false);
        stats.record_seek(true);

        assert_eq!(stats.num_seeks(), 4);
        assert_eq!(stats.out_of_range_seek_ratio(), 0.5);
    }

    #[test]
    fn test_statistics_reset() {
        let stats = Statistics::new();

        stats.record_iterator_created();
        stats.record_advance(false, 1, 10);
        stats.record_error();

        assert!(stats.num_advances() > 0);

        stats.reset();

        assert_eq!(stats.num_iterators_created(), 0);
        assert_eq!(stats.num_advances(), 0);
        assert_eq!(stats.entries_read(), 0);
        assert_eq!(stats.bytes_read(), 0);
        assert_eq!(stats.num_errors(), 0);
    }

    #[test]
    fn test_statistics_report() {
        let stats = Statistics::new();

        stats.record_iterator_created();
        stats.record_advance(true, 4, 1024);
        stats.record_seek(true);
        stats.record_seek(false);

        let report = stats.report();
        assert!(report.contains("Created:       1"));
        assert!(report.contains("Entries read:  4"));
        assert!(report.contains("Out of range:  1 (50.0%)"));
    }
}
