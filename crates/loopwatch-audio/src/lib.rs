//! # loopwatch-audio
//!
//! Loop playback of a single file that is hot-swapped whenever the file
//! changes on disk.
//!
//! Features:
//! - Whole-file symphonia decoding off the real-time path
//! - Lock-free single-slot hand-off from the watcher to the audio callback
//! - Allocation-free, lock-free render callback on a cpal output stream

pub mod buffer;
pub mod decode;
pub mod engine;
pub mod output;
pub mod report;
pub mod watcher;

pub use buffer::{shared_pending_slot, AudioBuffer, PendingSlot, SharedPendingSlot};
pub use decode::{Decode, SymphoniaDecoder};
pub use engine::{PlaybackEngine, PlaybackSnapshot, PlaybackStatus, SharedPlaybackStatus};
pub use output::{list_output_devices, AudioOutput};
pub use report::{remaining_time, PositionReport, PositionReporter};
pub use watcher::{modification_time, SourceWatcher, WatchOutcome, WatchState};
