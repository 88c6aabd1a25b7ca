//! Decoded audio and the lock-free hand-off used to reach the audio callback.

pub mod audio;
pub mod slot;

pub use audio::AudioBuffer;
pub use slot::{shared_pending_slot, PendingSlot, SharedPendingSlot};
