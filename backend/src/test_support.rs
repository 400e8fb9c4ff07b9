//! Test utilities for the backend crate.
//!
//! This module provides shared helpers for both unit tests (in `src/`) and
//! integration tests (in `tests/`). It is compiled for tests and when the
//! `test-support` feature is enabled.

pub mod clock;
pub mod memory_store;

pub use clock::MutableClock;
pub use memory_store::InMemoryStore;
