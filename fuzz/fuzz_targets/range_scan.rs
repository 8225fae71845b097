#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use rucksiter::{DB, DBOptions, MemStore, RangeOptions, Slice};

fn bound(data: &[u8], i: &mut usize) -> Option<Slice> {
    let len = (*data.get(*i)? as usize) % 4;
    *i += 1;
    let end = (*i + len).min(data.len());
    let key = Slice::from(&data[*i..end]);
    *i = end;
    Some(key)
}

// Fuzz target for range iteration.
// Random store contents, bounds, seeks, ends and watermarks; every yielded
// key must respect the bounds and arrive in the direction of travel.
fuzz_target!(|data: &[u8]| {
    if data.len() < 8 {
        return;
    }

    let store = Arc::new(MemStore::new());
    let flags = data[0];
    let num_keys = data[1] as usize % 64;
    let mut i = 2;
    for _ in 0..num_keys {
        let Some(key) = bound(data, &mut i) else { break };
        if key.is_empty() {
            continue;
        }
        if flags & 0x80 != 0 && key.size() == 1 {
            store.delete(key);
        } else {
            store.put(key.clone(), key);
        }
    }

    let db = match DB::open(store.clone(), DBOptions { worker_threads: 1 }) {
        Ok(db) => db,
        Err(_) => return,
    };

    let mut options = RangeOptions {
        reverse: flags & 1 != 0,
        high_water_mark: (flags as usize >> 1) % 8,
        limit: if flags & 0x40 != 0 { (flags % 16) as i64 } else { -1 },
        ..Default::default()
    };
    let lower = bound(data, &mut i);
    let upper = bound(data, &mut i);
    if flags & 0x02 != 0 {
        options.gte = lower;
    } else {
        options.gt = lower;
    }
    if flags & 0x04 != 0 {
        options.lte = upper;
    } else {
        options.lt = upper;
    }

    let Ok(id) = db.create_iterator(options.clone()) else {
        return;
    };

    let mut last: Option<Slice> = None;
    while i < data.len() {
        let op = data[i] % 4;
        i += 1;
        match op {
            0 => {
                if let Some(target) = bound(data, &mut i) {
                    db.seek(id, target).unwrap();
                    last = None;
                }
            },
            1 => {
                assert!(db.end_sync(id).unwrap());
                assert!(!db.end_sync(id).unwrap());
                assert_eq!(store.num_snapshots(), 0);
                return;
            },
            _ => {
                let batch = db.next_sync(id).unwrap();
                for key in batch.keys() {
                    if let Some(gt) = options.gt.as_ref().filter(|b| !b.is_empty()) {
                        assert!(&key > gt);
                    }
                    if let Some(gte) = options.gte.as_ref().filter(|b| !b.is_empty()) {
                        assert!(&key >= gte);
                    }
                    if let Some(lt) = options.lt.as_ref().filter(|b| !b.is_empty()) {
                        assert!(&key < lt);
                    }
                    if let Some(lte) = options.lte.as_ref().filter(|b| !b.is_empty()) {
                        assert!(&key <= lte);
                    }
                    if let Some(prev) = &last {
                        if options.reverse {
                            assert!(&key < prev);
                        } else {
                            assert!(&key > prev);
                        }
                    }
                    last = Some(key);
                }
                if batch.done() {
                    last = None;
                }
            },
        }
    }

    db.close().unwrap();
    assert_eq!(store.num_snapshots(), 0);
});
