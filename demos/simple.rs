use std::sync::Arc;

use rucksiter::{DB, DBOptions, MemStore, RangeOptions, Slice};

fn main() {
    println!("rucksiter Simple Example");

    let store = Arc::new(MemStore::new());
    for (name, age) in [("alice", "30"), ("bob", "25"), ("carol", "41"), ("dave", "35")] {
        store.put(Slice::from(format!("user:{name}")), Slice::from(age));
    }
    store.put(Slice::from("zzz:other"), Slice::from("-"));

    let db = DB::open(store.clone(), DBOptions::default()).expect("Failed to open DB");

    // All users, newest name first
    let options = RangeOptions::from_json(r#"{"gte": "user:", "lt": "user;", "reverse": true}"#)
        .expect("Invalid options");
    let id = db.create_iterator(options).expect("Failed to create iterator");

    // Writes after creation are not visible to the iterator
    store.delete(Slice::from("user:bob"));

    loop {
        let batch = db.next_sync(id).expect("Failed to read");
        for entry in batch.entries() {
            if let (Some(key), Some(value)) = (entry.key(), entry.value()) {
                println!("{key} = {value}");
            }
        }
        if batch.done() {
            break;
        }
    }
    db.end_sync(id).expect("Failed to end iterator");

    // Seek into the middle of a range, asynchronously
    let id = db
        .create_iterator(RangeOptions {
            gte: Some(Slice::from("user:")),
            lt: Some(Slice::from("user;")),
            ..Default::default()
        })
        .expect("Failed to create iterator");
    db.seek(id, "user:c").expect("Failed to seek");
    let batch = db
        .next(id)
        .expect("Failed to start read")
        .wait()
        .expect("Failed to read");
    println!("From user:c -> {:?}", batch.keys());

    db.close().expect("Failed to close DB");
    println!("{}", db.statistics().report());
}
