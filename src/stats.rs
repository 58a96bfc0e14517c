//! Side-channel counters for the capture pipeline.
//!
//! The producer callback runs on a hardware-owned thread and must never fail
//! outward, so everything that goes wrong there ends up here instead. All
//! counters are relaxed atomics: they are diagnostics, not synchronization.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters shared between the producer callback, the consumers and
/// whoever is monitoring the session.
#[derive(Debug, Default)]
pub struct CaptureStats {
    chunks_received: AtomicU64,
    bytes_received: AtomicU64,
    dropped_chunks: AtomicU64,
    frames_completed: AtomicU64,
    frames_superseded: AtomicU64,
    frames_discarded: AtomicU64,
    transmission_failures: AtomicU64,
    recycle_failures: AtomicU64,
    recycle_starved: AtomicU64,
    frames_retrieved: AtomicU64,
    callback_panics: AtomicU64,
}

/// Point-in-time copy of [`CaptureStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Raw chunks seen by the callback.
    pub chunks_received: u64,
    /// Bytes appended to frames.
    pub bytes_received: u64,
    /// Chunks dropped because the assembly buffer could not grow.
    pub dropped_chunks: u64,
    /// Frames published to consumers.
    pub frames_completed: u64,
    /// Published frames overwritten before any consumer read them.
    pub frames_superseded: u64,
    /// Frames completed after shutdown was requested and thrown away.
    pub frames_discarded: u64,
    /// Frames whose final chunk carried the transmission-failed flag.
    pub transmission_failures: u64,
    /// Chunks that could not be handed back to the hardware port.
    pub recycle_failures: u64,
    /// Recycle attempts that found no free chunk.
    pub recycle_starved: u64,
    /// Frames copied out by consumers.
    pub frames_retrieved: u64,
    /// Panics caught at the callback boundary.
    pub callback_panics: u64,
}

macro_rules! counter {
    (inc $inc:ident, $get:ident) => {
        #[inline]
        pub(crate) fn $inc(&self) {
            self.$get.fetch_add(1, Ordering::Relaxed);
        }

        counter!(get $get);
    };
    (add $add:ident, $get:ident) => {
        #[inline]
        pub(crate) fn $add(&self, n: u64) {
            self.$get.fetch_add(n, Ordering::Relaxed);
        }

        counter!(get $get);
    };
    (get $get:ident) => {
        #[doc = concat!("Current value of `", stringify!($get), "`.")]
        #[must_use]
        pub fn $get(&self) -> u64 {
            self.$get.load(Ordering::Relaxed)
        }
    };
}

impl CaptureStats {
    /// Fresh, zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    counter!(inc inc_chunks_received, chunks_received);
    counter!(add add_bytes_received, bytes_received);
    counter!(inc inc_dropped_chunks, dropped_chunks);
    counter!(inc inc_frames_completed, frames_completed);
    counter!(inc inc_frames_superseded, frames_superseded);
    counter!(inc inc_frames_discarded, frames_discarded);
    counter!(inc inc_transmission_failures, transmission_failures);
    counter!(inc inc_recycle_failures, recycle_failures);
    counter!(inc inc_recycle_starved, recycle_starved);
    counter!(inc inc_frames_retrieved, frames_retrieved);
    counter!(inc inc_callback_panics, callback_panics);

    /// Copy all counters.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            chunks_received: self.chunks_received(),
            bytes_received: self.bytes_received(),
            dropped_chunks: self.dropped_chunks(),
            frames_completed: self.frames_completed(),
            frames_superseded: self.frames_superseded(),
            frames_discarded: self.frames_discarded(),
            transmission_failures: self.transmission_failures(),
            recycle_failures: self.recycle_failures(),
            recycle_starved: self.recycle_starved(),
            frames_retrieved: self.frames_retrieved(),
            callback_panics: self.callback_panics(),
        }
    }
}
