//! End to end tests, run against an already started service.
//!
//! The target instance has to be seeded with the accounts the tests
//! authenticate as, for example:
//!
//! ```sh
//! SEED_USERS=alice:alice-token,bob:bob-token,carol:carol-token \
//!     USE_IN_MEMORY_DB=true cargo run
//! cargo test -p bookreview_tests --features system_tests
//! ```


#[cfg(all(test, feature = "load_tests"))]
mod load_test;
