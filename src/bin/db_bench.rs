use std::{
    io::{self, Write},
    sync::Arc,
    time::{Duration, Instant},
};

use rucksiter::{DB, DBOptions, MemStore, RangeOptions, Slice};

/// Benchmark configuration
struct BenchConfig {
    num_keys: usize,
    value_size: usize,
    high_water_mark: usize,
    worker_threads: usize,
    num_seeks: usize,
}

impl Default for BenchConfig {
    fn default() -> Self {
        BenchConfig {
            num_keys: 100_000,
            value_size: 100,
            high_water_mark: 16 * 1024,
            worker_threads: 4,
            num_seeks: 10_000,
        }
    }
}

/// Statistics for a benchmark run
struct BenchStats {
    duration: Duration,
    operations: usize,
    bytes: usize,
    latencies: Vec<Duration>,
}

impl BenchStats {
    fn new() -> Self {
        BenchStats {
            duration: Duration::ZERO,
            operations: 0,
            bytes: 0,
            latencies: Vec::new(),
        }
    }

    fn ops_per_sec(&self) -> f64 {
        self.operations as f64 / self.duration.as_secs_f64()
    }

    fn mb_per_sec(&self) -> f64 {
        (self.bytes as f64 / (1024.0 * 1024.0)) / self.duration.as_secs_f64()
    }

    fn avg_latency_us(&self) -> f64 {
        if self.latencies.is_empty() {
            return 0.0;
        }
        let sum: u128 = self.latencies.iter().map(|d| d.as_micros()).sum();
        sum as f64 / self.latencies.len() as f64
    }

    fn percentile_latency_us(&mut self, percentile: f64) -> f64 {
        if self.latencies.is_empty() {
            return 0.0;
        }
        self.latencies.sort();
        let idx = ((self.latencies.len() as f64 * percentile / 100.0) as usize)
            .min(self.latencies.len() - 1);
        self.latencies[idx].as_micros() as f64
    }

    fn print_summary(&mut self, name: &str) {
        println!("\n{}", "=".repeat(60));
        println!("Benchmark: {name}");
        println!("{}", "=".repeat(60));
        println!("Operations:     {:>12}", format_number(self.operations));
        println!("Duration:       {:>12.2} sec", self.duration.as_secs_f64());
        println!("Throughput:     {:>12.0} ops/sec", self.ops_per_sec());
        println!("Throughput:     {:>12.2} MB/sec", self.mb_per_sec());
        println!("\nLatency per batch/seek (microseconds):");
        println!("  Average:      {:>12.2}", self.avg_latency_us());
        println!("  P50:          {:>12.2}", self.percentile_latency_us(50.0));
        println!("  P95:          {:>12.2}", self.percentile_latency_us(95.0));
        println!("  P99:          {:>12.2}", self.percentile_latency_us(99.0));
        println!("{}", "=".repeat(60));
    }
}

fn format_number(n: usize) -> String {
    n.to_string()
        .as_bytes()
        .rchunks(3)
        .rev()
        .map(std::str::from_utf8)
        .collect::<Result<Vec<&str>, _>>()
        .unwrap()
        .join(",")
}

/// Progress indicator
struct ProgressBar {
    total: usize,
    current: usize,
    last_update: Instant,
}

impl ProgressBar {
    fn new(total: usize) -> Self {
        ProgressBar {
            total,
            current: 0,
            last_update: Instant::now(),
        }
    }

    fn update(&mut self, current: usize) {
        self.current = current;
        if self.last_update.elapsed() > Duration::from_millis(100) {
            self.display();
            self.last_update = Instant::now();
        }
    }

    fn finish(&mut self) {
        self.current = self.total;
        self.display();
        println!();
    }

    fn display(&self) {
        let percent = (self.current as f64 / self.total as f64 * 100.0) as usize;
        let bar_width = 40;
        let filled = (bar_width * self.current) / self.total;
        let bar = "=".repeat(filled) + &" ".repeat(bar_width - filled);
        print!(
            "\r[{}] {:>3}% ({}/{})",
            bar,
            percent,
            format_number(self.current),
            format_number(self.total)
        );
        io::stdout().flush().unwrap();
    }
}

/// Generate a value of specified size
fn generate_value(size: usize, seed: usize) -> Vec<u8> {
    let mut value = Vec::with_capacity(size);
    let mut x = seed;
    for _ in 0..size {
        x = x.wrapping_mul(1103515245).wrapping_add(12345);
        value.push((x >> 16) as u8);
    }
    value
}

fn key_of(i: usize) -> String {
    format!("key{i:08}")
}

/// Populate the store (not timed per operation)
fn fill(store: &MemStore, config: &BenchConfig) {
    println!(
        "\n🗂️  Filling store with {} keys...",
        format_number(config.num_keys)
    );
    let mut progress = ProgressBar::new(config.num_keys);
    for i in 0..config.num_keys {
        store.put(
            Slice::from(key_of(i)),
            Slice::from(generate_value(config.value_size, i)),
        );
        if i % 1000 == 0 {
            progress.update(i);
        }
    }
    progress.finish();
}

/// Drain one iterator with synchronous advances
fn drain_sync(db: &DB, options: RangeOptions, stats: &mut BenchStats) {
    let id = db.create_iterator(options).unwrap();
    loop {
        let op_start = Instant::now();
        let batch = db.next_sync(id).unwrap();
        stats.latencies.push(op_start.elapsed());

        stats.operations += batch.len();
        stats.bytes += batch.size();
        if batch.done() {
            break;
        }
    }
    db.end_sync(id).unwrap();
}

/// Full forward scan
fn bench_readseq(db: &DB, config: &BenchConfig) -> BenchStats {
    println!("\n📚 Running forward scan benchmark...");
    let mut stats = BenchStats::new();
    let start = Instant::now();
    drain_sync(
        db,
        RangeOptions {
            high_water_mark: config.high_water_mark,
            ..Default::default()
        },
        &mut stats,
    );
    stats.duration = start.elapsed();
    stats
}

/// Full reverse scan
fn bench_readreverse(db: &DB, config: &BenchConfig) -> BenchStats {
    println!("\n📚 Running reverse scan benchmark...");
    let mut stats = BenchStats::new();
    let start = Instant::now();
    drain_sync(
        db,
        RangeOptions {
            reverse: true,
            high_water_mark: config.high_water_mark,
            ..Default::default()
        },
        &mut stats,
    );
    stats.duration = start.elapsed();
    stats
}

/// Seek to pseudo-random targets, reading one small batch after each
fn bench_seekrandom(db: &DB, config: &BenchConfig) -> BenchStats {
    println!("\n🎯 Running random seek benchmark...");
    let mut stats = BenchStats::new();
    let mut progress = ProgressBar::new(config.num_seeks);
    let id = db
        .create_iterator(RangeOptions {
            high_water_mark: 0,
            ..Default::default()
        })
        .unwrap();

    // Use simple LCG for random-ish access pattern
    let mut x = 123456789u64;
    let start = Instant::now();
    for i in 0..config.num_seeks {
        x = x.wrapping_mul(1103515245).wrapping_add(12345);
        let target = key_of((x as usize) % config.num_keys);

        let op_start = Instant::now();
        db.seek(id, target.as_str()).unwrap();
        let batch = db.next_sync(id).unwrap();
        stats.latencies.push(op_start.elapsed());

        assert_eq!(batch.len(), 1, "seek to {target} found nothing");
        stats.operations += 1;
        stats.bytes += batch.size();

        if i % 1000 == 0 {
            progress.update(i);
        }
    }
    progress.finish();
    stats.duration = start.elapsed();
    db.end_sync(id).unwrap();
    stats
}

/// Disjoint bounded scans driven concurrently through the worker pool
fn bench_parallel_ranges(db: &DB, config: &BenchConfig) -> BenchStats {
    println!(
        "\n⚡ Running parallel range benchmark ({} workers)...",
        config.worker_threads
    );
    let mut stats = BenchStats::new();
    let parts = config.worker_threads * 2;
    let step = config.num_keys.div_ceil(parts);

    let start = Instant::now();
    let ids: Vec<_> = (0..parts)
        .map(|p| {
            db.create_iterator(RangeOptions {
                gte: Some(Slice::from(key_of(p * step))),
                lt: Some(Slice::from(key_of((p + 1) * step))),
                high_water_mark: config.high_water_mark,
                ..Default::default()
            })
            .unwrap()
        })
        .collect();

    let mut live = ids.clone();
    while !live.is_empty() {
        let op_start = Instant::now();
        let tickets: Vec<_> = live.iter().map(|id| (*id, db.next(*id).unwrap())).collect();
        live.clear();
        for (id, ticket) in tickets {
            let batch = ticket.wait().unwrap();
            stats.operations += batch.len();
            stats.bytes += batch.size();
            if !batch.done() {
                live.push(id);
            }
        }
        stats.latencies.push(op_start.elapsed());
    }
    stats.duration = start.elapsed();

    for id in ids {
        db.end_sync(id).unwrap();
    }
    stats
}

fn main() {
    env_logger::init();

    println!("\n🚀 rucksiter Benchmark Tool");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");

    let config = BenchConfig::default();

    println!("Configuration:");
    println!("  Keys:           {}", format_number(config.num_keys));
    println!("  Value size:     {} bytes", config.value_size);
    println!("  Batch size:     {} bytes", config.high_water_mark);
    println!("  Workers:        {}", config.worker_threads);

    let store = Arc::new(MemStore::new());
    fill(&store, &config);
    println!(
        "  Memory usage:   {:.2} MB",
        store.approximate_memory_usage() as f64 / (1024.0 * 1024.0)
    );

    let options = DBOptions {
        worker_threads: config.worker_threads,
    };
    let db = DB::open(store.clone(), options).unwrap();

    let mut seq_stats = bench_readseq(&db, &config);
    seq_stats.print_summary("Forward Scan (readseq)");

    let mut reverse_stats = bench_readreverse(&db, &config);
    reverse_stats.print_summary("Reverse Scan (readreverse)");

    let mut seek_stats = bench_seekrandom(&db, &config);
    seek_stats.print_summary("Random Seek (seekrandom)");

    let mut parallel_stats = bench_parallel_ranges(&db, &config);
    parallel_stats.print_summary("Parallel Bounded Scans (readparallel)");

    println!("\n📈 Iterator Statistics:");
    for line in db.statistics().report().lines() {
        println!("    {line}");
    }

    db.close().unwrap();
    println!(
        "\n  Live snapshots after close: {}",
        store.num_snapshots()
    );
    println!("\n✅ Benchmark completed!");
}
