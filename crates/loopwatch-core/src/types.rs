//! Core domain types for loopwatch.

pub mod time;

pub use time::{RemainingTime, SourceTimestamp};
