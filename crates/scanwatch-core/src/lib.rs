//! Shared types, render contract, and the progress client for scanwatch.

pub mod client;
pub mod config;
pub mod endpoint;
pub mod model;
pub mod render;
pub mod util;

pub use client::*;
pub use config::*;
pub use endpoint::*;
pub use model::*;
pub use render::*;
pub use util::log_snippet;
