//! Polls the source file and publishes freshly decoded audio on change.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use loopwatch_core::{Error, Result};
use tracing::{info, trace, warn};

use crate::buffer::{AudioBuffer, SharedPendingSlot};
use crate::decode::{Decode, SymphoniaDecoder};

/// What a single [`SourceWatcher::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// No path to watch.
    Idle,
    /// The previous publish has not been claimed by the render side yet.
    Pending,
    /// The file could not be stat'ed.
    Unavailable,
    /// Modification time matches the last accepted load.
    Unchanged,
    /// A new buffer was decoded and handed to the render side.
    Published {
        frames: u64,
        channels: u16,
        sample_rate: u32,
    },
    /// The file changed but did not decode; retried next tick.
    Failed,
}

/// Path being watched and the modification time of the last accepted load.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WatchState {
    path: Option<PathBuf>,
    last_modification: Option<SystemTime>,
}

impl WatchState {
    pub const fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            last_modification: None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Only advances after a successful decode and publish.
    pub const fn last_modification(&self) -> Option<SystemTime> {
        self.last_modification
    }
}

/// Non-real-time half of the player, driven once per application tick.
pub struct SourceWatcher<D = SymphoniaDecoder> {
    state: WatchState,
    slot: SharedPendingSlot,
    decoder: D,
}

impl SourceWatcher<SymphoniaDecoder> {
    /// Watch `path` (or nothing) and decode with symphonia.
    pub const fn new(path: Option<PathBuf>, slot: SharedPendingSlot) -> Self {
        Self::with_decoder(path, slot, SymphoniaDecoder::new())
    }
}

impl<D: Decode> SourceWatcher<D> {
    pub const fn with_decoder(path: Option<PathBuf>, slot: SharedPendingSlot, decoder: D) -> Self {
        Self {
            state: WatchState::new(path),
            slot,
            decoder,
        }
    }

    pub const fn state(&self) -> &WatchState {
        &self.state
    }

    /// Check the file once and reload it if it changed.
    ///
    /// Nothing is loaded while the slot still holds an unclaimed buffer.
    /// A failed decode leaves the stored modification time alone, so a file
    /// caught mid-write is retried on the next tick.
    pub fn tick(&mut self) -> WatchOutcome {
        let Some(path) = self.state.path.as_deref() else {
            return WatchOutcome::Idle;
        };

        if !self.slot.is_empty() {
            trace!("Previous buffer not yet claimed, skipping");
            return WatchOutcome::Pending;
        }

        let modified = match modification_time(path) {
            Ok(modified) => modified,
            Err(e) => {
                trace!("{e}");
                return WatchOutcome::Unavailable;
            }
        };

        if self.state.last_modification == Some(modified) {
            return WatchOutcome::Unchanged;
        }

        let mut buffer = AudioBuffer::load_with(&self.decoder, path);
        if buffer.is_empty() {
            buffer.dispose();
            warn!("Load of {} failed, will retry", path.display());
            return WatchOutcome::Failed;
        }

        let frames = buffer.frame_count();
        let channels = buffer.channel_count();
        let sample_rate = buffer.sample_rate();

        match self.slot.publish(buffer) {
            Ok(()) => {
                info!(
                    "Loaded {}: {channels} channels, {sample_rate} Hz, {frames} frames",
                    path.display()
                );
                self.state.last_modification = Some(modified);
                WatchOutcome::Published {
                    frames,
                    channels,
                    sample_rate,
                }
            }
            Err(mut rejected) => {
                // Slot filled by someone else between the check and the publish
                rejected.dispose();
                WatchOutcome::Pending
            }
        }
    }
}

/// Modification time of `path`.
pub fn modification_time(path: &Path) -> Result<SystemTime> {
    std::fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .map_err(|source| Error::Stat {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::buffer::shared_pending_slot;
    use crate::decode::write_f32_wav;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, UNIX_EPOCH};

    /// Decoder that replays canned results and counts calls.
    #[derive(Default)]
    struct ScriptedDecoder {
        results: Mutex<VecDeque<Result<AudioBuffer>>>,
        calls: AtomicUsize,
    }

    impl ScriptedDecoder {
        fn push_ok(&self, frames: usize) {
            let buffer = AudioBuffer::from_interleaved(1, 44_100, vec![0.5; frames]);
            self.results.lock().push_back(Ok(buffer));
        }

        fn push_err(&self) {
            self.results
                .lock()
                .push_back(Err(Error::AudioDecode("half-written".into())));
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Decode for &ScriptedDecoder {
        fn decode(&self, _path: &Path) -> Result<AudioBuffer> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.results
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(Error::AudioDecode("script exhausted".into())))
        }
    }

    fn set_mtime(path: &Path, secs: u64) -> SystemTime {
        let time = UNIX_EPOCH + Duration::from_secs(secs);
        std::fs::File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(time)
            .unwrap();
        time
    }

    #[test]
    fn test_no_path_is_idle() {
        let decoder = ScriptedDecoder::default();
        let mut watcher = SourceWatcher::with_decoder(None, shared_pending_slot(), &decoder);
        assert_eq!(watcher.tick(), WatchOutcome::Idle);
        assert_eq!(decoder.calls(), 0);
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let decoder = ScriptedDecoder::default();
        let slot = shared_pending_slot();
        let mut watcher =
            SourceWatcher::with_decoder(Some(dir.path().join("absent.wav")), slot.clone(), &decoder);

        assert_eq!(watcher.tick(), WatchOutcome::Unavailable);
        assert_eq!(watcher.tick(), WatchOutcome::Unavailable);
        assert_eq!(decoder.calls(), 0);
        assert!(slot.is_empty());
        assert_eq!(watcher.state().last_modification(), None);
    }

    #[test]
    fn test_publish_then_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loop.wav");
        std::fs::write(&path, b"x").unwrap();
        let mtime = set_mtime(&path, 1_000);

        let decoder = ScriptedDecoder::default();
        decoder.push_ok(8);
        let slot = shared_pending_slot();
        let mut watcher = SourceWatcher::with_decoder(Some(path.clone()), slot.clone(), &decoder);

        assert_eq!(
            watcher.tick(),
            WatchOutcome::Published {
                frames: 8,
                channels: 1,
                sample_rate: 44_100,
            }
        );
        assert_eq!(watcher.state().last_modification(), Some(mtime));
        assert_eq!(watcher.state().path(), Some(path.as_path()));

        assert_eq!(slot.take().unwrap().frame_count(), 8);
        assert_eq!(watcher.tick(), WatchOutcome::Unchanged);
        assert_eq!(decoder.calls(), 1);
    }

    #[test]
    fn test_unclaimed_buffer_blocks_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loop.wav");
        std::fs::write(&path, b"x").unwrap();
        set_mtime(&path, 1_000);

        let decoder = ScriptedDecoder::default();
        decoder.push_ok(4);
        decoder.push_ok(6);
        let slot = shared_pending_slot();
        let mut watcher = SourceWatcher::with_decoder(Some(path.clone()), slot.clone(), &decoder);

        assert!(matches!(watcher.tick(), WatchOutcome::Published { .. }));

        // File changes again before the render side picked up the first load
        let second = set_mtime(&path, 2_000);
        assert_eq!(watcher.tick(), WatchOutcome::Pending);
        assert_eq!(decoder.calls(), 1);

        assert_eq!(slot.take().unwrap().frame_count(), 4);
        assert!(matches!(
            watcher.tick(),
            WatchOutcome::Published { frames: 6, .. }
        ));
        assert_eq!(watcher.state().last_modification(), Some(second));
    }

    #[test]
    fn test_failed_decode_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loop.wav");
        std::fs::write(&path, b"x").unwrap();
        let mtime = set_mtime(&path, 5_000);

        let decoder = ScriptedDecoder::default();
        decoder.push_err();
        decoder.push_err();
        decoder.push_ok(3);
        let slot = shared_pending_slot();
        let mut watcher = SourceWatcher::with_decoder(Some(path), slot.clone(), &decoder);

        assert_eq!(watcher.tick(), WatchOutcome::Failed);
        assert_eq!(watcher.state().last_modification(), None);
        assert!(slot.is_empty());

        // Same, unchanged file: decoded again rather than given up on
        assert_eq!(watcher.tick(), WatchOutcome::Failed);
        assert_eq!(decoder.calls(), 2);
        assert_eq!(watcher.state().last_modification(), None);

        assert!(matches!(watcher.tick(), WatchOutcome::Published { frames: 3, .. }));
        assert_eq!(watcher.state().last_modification(), Some(mtime));
        assert_eq!(decoder.calls(), 3);
    }

    #[test]
    fn test_zero_frame_result_counts_as_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loop.wav");
        std::fs::write(&path, b"x").unwrap();

        let decoder = |_: &Path| -> Result<AudioBuffer> { Ok(AudioBuffer::empty()) };
        let slot = shared_pending_slot();
        let mut watcher = SourceWatcher::with_decoder(Some(path), slot.clone(), decoder);

        assert_eq!(watcher.tick(), WatchOutcome::Failed);
        assert!(slot.is_empty());
        assert_eq!(watcher.state().last_modification(), None);
    }

    #[test]
    fn test_hot_edit_with_real_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loop.wav");

        // Caught mid-write: header only
        std::fs::write(&path, b"RIFF").unwrap();
        set_mtime(&path, 10);

        let slot = shared_pending_slot();
        let mut watcher = SourceWatcher::new(Some(path.clone()), slot.clone());
        assert_eq!(watcher.tick(), WatchOutcome::Failed);

        write_f32_wav(&path, 1, 8_000, &[0.1, 0.2, 0.3]);
        let mtime = set_mtime(&path, 20);
        assert_eq!(
            watcher.tick(),
            WatchOutcome::Published {
                frames: 3,
                channels: 1,
                sample_rate: 8_000,
            }
        );
        assert_eq!(watcher.state().last_modification(), Some(mtime));
    }

    #[test]
    fn test_modification_time_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = modification_time(&dir.path().join("absent")).unwrap_err();
        assert!(err.is_recoverable());
    }
}
