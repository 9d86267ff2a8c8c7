//! Test doubles for code built on `formwork-core`
//!
//! Enabled for this crate's own tests and, for downstream crates, through the
//! `test-utils` feature.

pub mod mocks;

pub use mocks::{MockDataSource, MockDataSourceStats};
