//! Test infrastructure for the records store.
//!
//! Integration tests seed one SQLite database with a small, fixed
//! population and query it through the public API.

pub mod fixtures;

pub use fixtures::*;
