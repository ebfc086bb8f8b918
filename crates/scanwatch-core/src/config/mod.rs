//! Configuration module wiring for scanwatch.
//!
//! Keeps config types, I/O, and runtime adjustments in separate files.

mod config_io;
mod config_runtime;
mod config_types;

pub use config_io::ConfigError;
pub use config_runtime::ORIGIN_ENV;
pub use config_types::*;
