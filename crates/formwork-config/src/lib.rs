//! # Formwork Configuration Library
//!
//! Typed configuration for the Formwork rendering stack: logging, render
//! limits, undo history, registry policy, realtime presence, and the data
//! source the render context is wired to.
//!
//! ## Features
//!
//! - Multi-format support (TOML, YAML, JSON) chosen by file extension
//! - Every section has defaults, so partial files are valid
//! - Validation of values the runtime cannot work with
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use formwork_config::ConfigLoader;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::load_from_file("formwork.toml").await?;
//!     println!("undo history: {}", config.undo.max_history);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod components;
mod config;
mod loader;

pub use components::*;
pub use config::*;
pub use loader::*;
