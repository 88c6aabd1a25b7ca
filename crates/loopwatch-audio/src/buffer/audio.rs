//! Fully decoded, interleaved audio owned by exactly one component at a time.

use std::path::Path;

use tracing::warn;

use crate::decode::{Decode, SymphoniaDecoder};

/// Decoded audio held entirely in memory.
///
/// A buffer with `frame_count == 0` is the canonical "no audio" value and
/// owns no sample storage. Buffers move between components and are never
/// cloned, so each one is released exactly once.
#[derive(Debug, Default, PartialEq)]
pub struct AudioBuffer {
    channel_count: u16,
    sample_rate: u32,
    frame_count: u64,
    samples: Box<[f32]>,
}

impl AudioBuffer {
    /// The empty buffer.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a buffer from interleaved samples.
    ///
    /// A trailing partial frame is dropped. Returns the empty buffer when
    /// there is no channel or no complete frame.
    pub fn from_interleaved(channel_count: u16, sample_rate: u32, mut samples: Vec<f32>) -> Self {
        let channels = usize::from(channel_count);
        if channels == 0 {
            return Self::empty();
        }

        let frames = samples.len() / channels;
        if frames == 0 {
            return Self::empty();
        }
        samples.truncate(frames * channels);

        Self {
            channel_count,
            sample_rate,
            frame_count: frames as u64,
            samples: samples.into_boxed_slice(),
        }
    }

    /// Decode `path` with the default decoder.
    ///
    /// Never fails loudly: any problem yields the empty buffer.
    pub fn load(path: &Path) -> Self {
        Self::load_with(&SymphoniaDecoder::new(), path)
    }

    /// Decode `path` with `decoder`, mapping every failure to the empty buffer.
    pub fn load_with<D: Decode + ?Sized>(decoder: &D, path: &Path) -> Self {
        match decoder.decode(path) {
            Ok(buffer) => buffer,
            Err(e) => {
                warn!("Failed to load {}: {e}", path.display());
                Self::empty()
            }
        }
    }

    /// Release the sample storage and reset to the empty state.
    ///
    /// Disposing an empty buffer is a no-op.
    pub fn dispose(&mut self) {
        *self = Self::empty();
    }

    pub const fn channel_count(&self) -> u16 {
        self.channel_count
    }

    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub const fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// All samples, interleaved by channel.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub const fn is_empty(&self) -> bool {
        self.frame_count == 0
    }
}
