use std::sync::Arc;

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use rucksiter::{DB, DBOptions, MemStore, RangeOptions, Slice};

fn setup_db(num_keys: usize, value_size: usize) -> DB {
    let store = Arc::new(MemStore::new());
    let value = vec![b'x'; value_size];
    for i in 0..num_keys {
        store.put(
            Slice::from(format!("key{i:010}")),
            Slice::from(value.as_slice()),
        );
    }
    DB::open(store, DBOptions::default()).unwrap()
}

fn drain(db: &DB, options: RangeOptions) -> usize {
    let id = db.create_iterator(options).unwrap();
    let mut count = 0;
    loop {
        let batch = db.next_sync(id).unwrap();
        count += batch.len();
        if batch.done() {
            break;
        }
    }
    db.end_sync(id).unwrap();
    count
}

fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan");
    let db = setup_db(10_000, 100);
    group.throughput(Throughput::Elements(10_000));

    group.bench_function("forward_10k", |b| {
        b.iter(|| black_box(drain(&db, RangeOptions::default())));
    });

    group.bench_function("reverse_10k", |b| {
        b.iter(|| {
            black_box(drain(
                &db,
                RangeOptions {
                    reverse: true,
                    ..Default::default()
                },
            ))
        });
    });

    group.bench_function("keys_only_10k", |b| {
        b.iter(|| {
            black_box(drain(
                &db,
                RangeOptions {
                    values: false,
                    ..Default::default()
                },
            ))
        });
    });

    group.finish();
}

fn bench_bounded_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("bounded_scan");
    let db = setup_db(100_000, 100);
    group.throughput(Throughput::Elements(1000));

    group.bench_function("gte_lt_1k", |b| {
        b.iter(|| {
            black_box(drain(
                &db,
                RangeOptions {
                    gte: Some(Slice::from("key0000050000")),
                    lt: Some(Slice::from("key0000051000")),
                    ..Default::default()
                },
            ))
        });
    });

    group.bench_function("limit_1k", |b| {
        b.iter(|| {
            black_box(drain(
                &db,
                RangeOptions {
                    start: Some(Slice::from("key0000050000")),
                    limit: 1000,
                    ..Default::default()
                },
            ))
        });
    });

    group.finish();
}

fn bench_high_water_mark(c: &mut Criterion) {
    let mut group = c.benchmark_group("high_water_mark");
    let db = setup_db(10_000, 100);
    group.throughput(Throughput::Elements(10_000));

    for hwm in [0usize, 1024, 16 * 1024, 256 * 1024] {
        group.bench_function(format!("hwm_{hwm}"), |b| {
            b.iter(|| {
                black_box(drain(
                    &db,
                    RangeOptions {
                        high_water_mark: hwm,
                        ..Default::default()
                    },
                ))
            });
        });
    }

    group.finish();
}

fn bench_seek(c: &mut Criterion) {
    let mut group = c.benchmark_group("seek");
    let db = setup_db(100_000, 100);
    group.throughput(Throughput::Elements(1));

    group.bench_function("seek_and_read_one", |b| {
        let id = db
            .create_iterator(RangeOptions {
                high_water_mark: 0,
                ..Default::default()
            })
            .unwrap();
        let mut i = 0u64;
        b.iter(|| {
            let target = format!("key{:010}", (i * 7919) % 100_000);
            db.seek(id, target.as_str()).unwrap();
            black_box(db.next_sync(id).unwrap());
            i += 1;
        });
        db.end_sync(id).unwrap();
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_scan,
    bench_bounded_scan,
    bench_high_water_mark,
    bench_seek
);
criterion_main!(benches);
