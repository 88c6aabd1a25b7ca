//! Real-time loop playback with hot-swapping of the active buffer.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use crate::buffer::{AudioBuffer, SharedPendingSlot};

/// Play-head state published by the engine after every render call.
///
/// Written only from the audio callback, read from the tick loop. Fields are
/// individually atomic; a reader may see values from two adjacent calls,
/// which is fine for display.
#[derive(Debug, Default)]
pub struct PlaybackStatus {
    frame_cursor: AtomicU64,
    frame_count: AtomicU64,
    sample_rate: AtomicU32,
    swap_count: AtomicU64,
}

/// Plain copy of [`PlaybackStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackSnapshot {
    pub frame_cursor: u64,
    pub frame_count: u64,
    pub sample_rate: u32,
    pub swap_count: u64,
}

impl PlaybackStatus {
    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            frame_cursor: self.frame_cursor.load(Ordering::Relaxed),
            frame_count: self.frame_count.load(Ordering::Relaxed),
            sample_rate: self.sample_rate.load(Ordering::Relaxed),
            swap_count: self.swap_count.load(Ordering::Relaxed),
        }
    }

    fn store(&self, snapshot: PlaybackSnapshot) {
        self.frame_cursor
            .store(snapshot.frame_cursor, Ordering::Relaxed);
        self.frame_count.store(snapshot.frame_count, Ordering::Relaxed);
        self.sample_rate.store(snapshot.sample_rate, Ordering::Relaxed);
        self.swap_count.store(snapshot.swap_count, Ordering::Relaxed);
    }
}

/// Thread-safe reference to the published playback status.
pub type SharedPlaybackStatus = Arc<PlaybackStatus>;

/// Render side of the player. Lives inside the audio callback.
///
/// The engine exclusively owns the active buffer. New buffers arrive through
/// the pending slot and are swapped in at the start of a render call; the
/// displaced buffer is released right there, since nothing else can be
/// reading it.
pub struct PlaybackEngine {
    slot: SharedPendingSlot,
    active: AudioBuffer,
    /// Absolute index of the next frame, reduced modulo the active length.
    frame_cursor: u64,
    swap_count: u64,
    status: SharedPlaybackStatus,
}

impl PlaybackEngine {
    /// Create an engine that starts silent and picks up buffers from `slot`.
    pub fn new(slot: SharedPendingSlot) -> Self {
        Self {
            slot,
            active: AudioBuffer::empty(),
            frame_cursor: 0,
            swap_count: 0,
            status: Arc::new(PlaybackStatus::default()),
        }
    }

    /// Start the play-head at an absolute frame index.
    pub fn with_frame_cursor(mut self, frame_cursor: u64) -> Self {
        self.frame_cursor = frame_cursor;
        self.publish_status();
        self
    }

    /// Handle for reading the play-head from another thread.
    pub fn status(&self) -> SharedPlaybackStatus {
        Arc::clone(&self.status)
    }

    pub const fn active(&self) -> &AudioBuffer {
        &self.active
    }

    pub const fn frame_cursor(&self) -> u64 {
        self.frame_cursor
    }

    /// Offset into the active buffer of the next frame to render.
    pub const fn current_offset(&self) -> Option<u64> {
        match self.active.frame_count() {
            0 => None,
            frames => Some(self.frame_cursor % frames),
        }
    }

    /// Fill `output` with `channels`-interleaved looped audio.
    ///
    /// Never blocks and never allocates. Source channel 0 is written to every
    /// output channel. With no active audio the output is silence and the
    /// play-head stays put. A trailing partial frame is zeroed.
    pub fn render(&mut self, output: &mut [f32], channels: usize) {
        self.swap_pending();

        let frame_count = self.active.frame_count();
        if channels == 0 || frame_count == 0 {
            output.fill(0.0);
            self.publish_status();
            return;
        }

        let stride = usize::from(self.active.channel_count());
        let samples = self.active.samples();
        let mut cursor = self.frame_cursor;

        let mut frames = output.chunks_exact_mut(channels);
        for frame in &mut frames {
            let offset = (cursor % frame_count) as usize;
            frame.fill(samples[offset * stride]);
            // At u64::MAX, restart from the reduced offset so the loop stays seamless
            cursor = cursor.checked_add(1).unwrap_or(offset as u64 + 1);
        }
        frames.into_remainder().fill(0.0);

        self.frame_cursor = cursor;
        self.publish_status();
    }

    /// Install a waiting buffer, if any. Returns true when a swap happened.
    fn swap_pending(&mut self) -> bool {
        let Some(incoming) = self.slot.take() else {
            return false;
        };

        let mut retired = std::mem::replace(&mut self.active, incoming);
        retired.dispose();
        self.swap_count += 1;
        true
    }

    fn publish_status(&self) {
        self.status.store(PlaybackSnapshot {
            frame_cursor: self.frame_cursor,
            frame_count: self.active.frame_count(),
            sample_rate: self.active.sample_rate(),
            swap_count: self.swap_count,
        });
    }
}
