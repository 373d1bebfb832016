//! Test doubles and data factories

mod fixtures;
mod flaky_store;

pub use fixtures::{TestDataFactory, DEFAULT_USER};
pub use flaky_store::FlakyStore;
