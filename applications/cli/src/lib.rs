//! Shelf CLI library
//!
//! Configuration and error types for the `shelf-cli` binary, exposed so they
//! can be tested without a server.

pub mod config;
pub mod error;

pub use config::CliConfig;
pub use error::{CliError, Result};
