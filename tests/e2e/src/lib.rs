//! End-to-end test support for Echoes
//!
//! - `harness`: journals backed by a temporary SQLite database
//! - `mocks`: test data factories and a reflection store that can go offline

pub mod harness;
pub mod mocks;

pub use harness::TestJournal;
pub use mocks::{FlakyStore, TestDataFactory, DEFAULT_USER};
