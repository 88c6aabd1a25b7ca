//! Single-slot hand-off of decoded audio to the render callback.
//!
//! One producer (the source watcher) publishes a buffer, one consumer (the
//! audio callback) takes it. Ownership moves through a single atomic pointer,
//! so the consumer never waits on a lock and never sees a partially written
//! buffer.

use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::Arc;

use super::AudioBuffer;

/// Lock-free single-producer, single-consumer slot holding at most one buffer.
///
/// The pointer is either null (empty) or a `Box<AudioBuffer>` leaked by
/// [`PendingSlot::publish`] and reclaimed by exactly one of
/// [`PendingSlot::take`], a failed publish, or `Drop`.
#[derive(Debug)]
pub struct PendingSlot {
    pending: AtomicPtr<AudioBuffer>,
}

impl PendingSlot {
    /// Create an empty slot.
    pub const fn new() -> Self {
        Self {
            pending: AtomicPtr::new(ptr::null_mut()),
        }
    }

    /// Check whether no buffer is waiting for pickup.
    pub fn is_empty(&self) -> bool {
        self.pending.load(Ordering::Acquire).is_null()
    }

    /// Hand `buffer` to the consumer.
    ///
    /// Only succeeds on an empty slot. An occupied slot is left untouched and
    /// the buffer is returned to the caller, so nothing is overwritten.
    /// Called from the producer thread.
    pub fn publish(&self, buffer: AudioBuffer) -> Result<(), AudioBuffer> {
        let raw = Box::into_raw(Box::new(buffer));

        // Release: the decoded samples happen-before the consumer's Acquire in `take`.
        match self
            .pending
            .compare_exchange(ptr::null_mut(), raw, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => Ok(()),
            Err(_) => {
                // SAFETY: `raw` was produced by `Box::into_raw` above and never stored.
                #[allow(unsafe_code)]
                let boxed = unsafe { Box::from_raw(raw) };
                Err(*boxed)
            }
        }
    }

    /// Take the waiting buffer, if any, leaving the slot empty.
    ///
    /// Never blocks. Called from the consumer (real-time) thread.
    pub fn take(&self) -> Option<AudioBuffer> {
        let raw = self.pending.swap(ptr::null_mut(), Ordering::AcqRel);
        if raw.is_null() {
            return None;
        }

        // SAFETY: non-null values only come from `publish`, and the swap above
        // removed this one from the slot, so we are its sole owner.
        #[allow(unsafe_code)]
        let boxed = unsafe { Box::from_raw(raw) };
        Some(*boxed)
    }
}

impl Default for PendingSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PendingSlot {
    fn drop(&mut self) {
        // Release a buffer that was published but never claimed
        drop(self.take());
    }
}

/// Thread-safe reference to a pending slot.
pub type SharedPendingSlot = Arc<PendingSlot>;

/// Create a new shared pending slot.
pub fn shared_pending_slot() -> SharedPendingSlot {
    Arc::new(PendingSlot::new())
}
