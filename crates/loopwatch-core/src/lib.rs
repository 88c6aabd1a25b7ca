//! # loopwatch-core
//!
//! Core types, configuration, and error handling for the loopwatch
//! hot-reloading loop player.

pub mod config;
pub mod error;
pub mod types;

pub use config::{ConfigSource, OutputSettings, PlayerConfig};
pub use error::{Error, Result};
pub use types::*;
