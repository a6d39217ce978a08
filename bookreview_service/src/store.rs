//! Entity store backends.
//!
//! One store owns books, reviews and user accounts together, because reviews
//! are constrained per (book, user) pair and listings join usernames in.
//! Every backend implements all three repository traits.

pub use in_memory_store::InMemoryStore;
pub use postgres_store::{PostgresStore, PostgresStoreConfig};

use std::time::UNIX_EPOCH;

mod in_memory_store;
mod postgres_store;

fn epoch_seconds() -> i64 {
    std::time::SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Failed to read system time")
        .as_secs() as i64
}
