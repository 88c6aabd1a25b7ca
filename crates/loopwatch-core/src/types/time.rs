//! Time values shown on the status line.

use std::fmt;
use std::time::SystemTime;

use chrono::{DateTime, Local};

/// Time left in the current loop iteration, whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct RemainingTime(u64);

impl RemainingTime {
    pub const fn from_seconds(seconds: u64) -> Self {
        Self(seconds)
    }

    /// Whole seconds covered by `frames` at `sample_rate`, rounded down.
    ///
    /// Returns `None` for a zero sample rate.
    pub const fn from_frames(frames: u64, sample_rate: u32) -> Option<Self> {
        if sample_rate == 0 {
            return None;
        }
        Some(Self(frames / sample_rate as u64))
    }

    pub const fn minutes(&self) -> u64 {
        self.0 / 60
    }

    pub const fn seconds(&self) -> u64 {
        self.0 % 60
    }
}

impl fmt::Display for RemainingTime {
    /// Counts down, so it is rendered with a leading minus: `-MM:SS`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "-{:02}:{:02}", self.minutes(), self.seconds())
    }
}

/// Modification time of the loaded source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourceTimestamp(SystemTime);

impl SourceTimestamp {
    pub const fn new(time: SystemTime) -> Self {
        Self(time)
    }
}

impl From<SystemTime> for SourceTimestamp {
    fn from(time: SystemTime) -> Self {
        Self(time)
    }
}

impl fmt::Display for SourceTimestamp {
    /// Local time in `ctime` layout, e.g. `Wed Jun 30 21:49:08 1993`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let local: DateTime<Local> = self.0.into();
        write!(f, "{}", local.format("%a %b %e %H:%M:%S %Y"))
    }
}
