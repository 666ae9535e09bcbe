//! Cadence CLI Library
//!
//! Headless player: reads a queue file, drives a simulated backend through
//! the player service and prints every notification as a JSON line.
//!
//! This library exposes the command implementations for testing purposes.

pub mod commands;
pub mod config;
pub mod error;

pub use config::{BackendSettings, CliConfig};
pub use error::{CliError, Result};
