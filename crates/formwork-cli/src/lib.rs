//! Formwork CLI library
//!
//! Command implementations behind the `formwork` binary, exposed so they can
//! be driven from integration tests without spawning a process.

pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;
