//! Shared test utilities for iam-janitor
//!
//! ## Modules
//!
//! - [`directory`]: in-memory directory service with fault injection
//! - [`time`]: fixed reference instants for deterministic staleness tests

pub mod directory;
pub mod time;

// Re-export commonly used items
pub use directory::{FakeDirectory, FakeKey, FakeUser};
pub use time::{day, epoch};
