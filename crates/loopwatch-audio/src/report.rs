//! Read-only view of the play-head for the status display.

use std::fmt;
use std::path::PathBuf;

use loopwatch_core::{RemainingTime, SourceTimestamp};

use crate::engine::SharedPlaybackStatus;
use crate::watcher::WatchState;

/// Time left in the current loop iteration.
///
/// `None` when there is no audio (zero frames or zero sample rate).
pub fn remaining_time(frame_cursor: u64, frame_count: u64, sample_rate: u32) -> Option<RemainingTime> {
    if frame_count == 0 {
        return None;
    }
    let remaining_frames = frame_count - frame_cursor % frame_count;
    RemainingTime::from_frames(remaining_frames, sample_rate)
}

/// Everything the status display shows for one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionReport {
    pub path: Option<PathBuf>,
    pub remaining: Option<RemainingTime>,
    pub last_modified: Option<SourceTimestamp>,
    pub frame_count: u64,
    pub swap_count: u64,
}

impl PositionReport {
    pub const fn has_audio(&self) -> bool {
        self.remaining.is_some()
    }
}

impl fmt::Display for PositionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}", path.display())?,
            None => write!(f, "(no file)")?,
        }

        let Some(remaining) = self.remaining else {
            return write!(f, "\nno audio");
        };
        write!(f, "\n{remaining}")?;
        if let Some(modified) = self.last_modified {
            write!(f, "\n{modified}")?;
        }
        Ok(())
    }
}

/// Builds [`PositionReport`]s from the engine's published status.
pub struct PositionReporter {
    status: SharedPlaybackStatus,
}

impl PositionReporter {
    pub const fn new(status: SharedPlaybackStatus) -> Self {
        Self { status }
    }

    pub fn snapshot(&self, watch: &WatchState) -> PositionReport {
        let playback = self.status.snapshot();
        PositionReport {
            path: watch.path().map(PathBuf::from),
            remaining: remaining_time(
                playback.frame_cursor,
                playback.frame_count,
                playback.sample_rate,
            ),
            last_modified: watch.last_modification().map(SourceTimestamp::from),
            frame_count: playback.frame_count,
            swap_count: playback.swap_count,
        }
    }
}
