//! Frame exchange: the synchronization core between producer and consumers.
//!
//! One mutex and one condition variable guard the last completed frame and
//! three pieces of control state:
//!
//! - `ready`: the completed slot holds a full frame nobody has read yet
//! - `finishing`: shutdown was requested (monotonic, never reset)
//! - `waiting`: number of [`FrameGuard`]s alive, i.e. threads that hold or are
//!   blocked waiting for the lock through this exchange
//!
//! # State Machine
//!
//! ```text
//!            publish()                      request_shutdown()
//!   Idle ---------------> HasFrame   Idle/HasFrame ----------------> Closed
//!     ^                      |                                (absorbing)
//!     +---- retrieve_frame --+
//! ```
//!
//! # Drain Protocol
//!
//! `request_shutdown()` sets `finishing`, wakes every waiter, then blocks until
//! `waiting` drops to zero. Each woken waiter observes `finishing`, returns
//! `Closed`, and decrements `waiting` when its guard is dropped. Only after the
//! drain completes may the owner release the frame buffers, so no consumer can
//! be mid-copy out of a buffer that is being freed.
//!
//! # Locking Across Calls
//!
//! The guard returned by [`FrameExchange::lock`] is the lock. Holding a single
//! guard across `frame_size()` and `retrieve_frame()` guarantees that the size
//! used to allocate the destination belongs to the frame that is copied:
//!
//! ```
//! use rust_vidcap::exchange::{FrameExchange, Retrieval};
//! use rust_vidcap::stats::CaptureStats;
//! use std::sync::Arc;
//!
//! let (mut writing, completed) = vidcap_pool::split(0, Default::default(), None).unwrap();
//! let exchange = FrameExchange::new(completed, Arc::new(CaptureStats::new()));
//!
//! writing.try_append(b"pixels").unwrap();
//! exchange.publish(&mut writing, Default::default());
//!
//! let mut guard = exchange.lock();
//! let mut frame = vec![0u8; guard.frame_size()];
//! let result = guard.retrieve_frame(&mut frame).unwrap();
//! drop(guard);
//!
//! assert!(matches!(result, Retrieval::Frame(info) if info.len == 6));
//! assert_eq!(frame, b"pixels");
//! ```

use crate::error::VidcapError;
use crate::stats::CaptureStats;
use parking_lot::{Condvar, Mutex, MutexGuard};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, trace};
use vidcap_pool::{ReadSlot, WriteSlot};

/// Result of waiting for a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// A complete, unread frame is available.
    FrameReady,
    /// The session is shutting down or already stopped.
    Closed,
}

/// How the producer finished a frame.
///
/// A frame carries one status. `TransmissionFailed` takes precedence: a frame
/// that lost chunks and then ended with a failed transmission is reported as
/// `TransmissionFailed`, and the dropped chunks show up only in
/// `CaptureStats::dropped_chunks`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameStatus {
    /// Ended by a normal frame-end chunk.
    #[default]
    Complete,
    /// Ended by a chunk flagged as a failed transmission. The bytes are
    /// delivered as received and may be partial or corrupt.
    TransmissionFailed,
    /// At least one chunk of this frame was dropped because the assembly
    /// buffer could not grow.
    Incomplete,
}

/// Metadata of a retrieved frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    /// Bytes copied.
    pub len: usize,
    /// Publication sequence number (1-based, gaps mean superseded frames).
    pub sequence: u64,
    /// How the frame ended.
    pub status: FrameStatus,
}

/// Result of [`FrameGuard::retrieve_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retrieval {
    /// A frame was copied out and the ready flag cleared.
    Frame(FrameInfo),
    /// The session closed; nothing was copied.
    Closed,
}

/// Result of [`FrameExchange::publish`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Publish {
    /// The frame is now the completed frame.
    Published {
        /// Sequence number assigned to the frame.
        sequence: u64,
        /// An unread frame was overwritten.
        superseded: bool,
    },
    /// Shutdown was already requested; the frame was thrown away.
    Discarded,
}

struct ExchangeState {
    completed: ReadSlot,
    ready: bool,
    finishing: bool,
    waiting: usize,
    sequence: u64,
    status: FrameStatus,
}

/// Mutex + condition variable around the completed frame slot.
pub struct FrameExchange {
    state: Mutex<ExchangeState>,
    cond: Condvar,
    stats: Arc<CaptureStats>,
}

impl std::fmt::Debug for FrameExchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("FrameExchange")
            .field("ready", &state.ready)
            .field("finishing", &state.finishing)
            .field("waiting", &state.waiting)
            .field("sequence", &state.sequence)
            .field("completed_size", &state.completed.size())
            .finish()
    }
}

impl FrameExchange {
    /// Create an exchange around the read half of a slot pair.
    #[must_use]
    pub fn new(completed: ReadSlot, stats: Arc<CaptureStats>) -> Self {
        Self {
            state: Mutex::new(ExchangeState {
                completed,
                ready: false,
                finishing: false,
                waiting: 0,
                sequence: 0,
                status: FrameStatus::Complete,
            }),
            cond: Condvar::new(),
            stats,
        }
    }

    /// Acquire the lock and register as a waiter.
    ///
    /// Blocks until the lock is available. The returned guard must be dropped
    /// (or [`release`](FrameGuard::release)d) on every path, otherwise
    /// [`request_shutdown`](Self::request_shutdown) never returns.
    pub fn lock(&self) -> FrameGuard<'_> {
        let mut state = self.state.lock();
        state.waiting += 1;
        FrameGuard {
            exchange: self,
            state,
        }
    }

    /// Swap the producer's finished frame in and raise `ready`.
    ///
    /// Called from the producer context only. Bounded time: one lock, one
    /// pointer swap, one broadcast. After shutdown was requested the frame is
    /// discarded and `ready` stays false.
    pub fn publish(&self, writing: &mut WriteSlot, status: FrameStatus) -> Publish {
        let mut state = self.state.lock();

        if state.finishing {
            writing.reset();
            self.stats.inc_frames_discarded();
            trace!("frame discarded: exchange is closing");
            return Publish::Discarded;
        }

        let superseded = state.ready;
        writing.swap_with(&mut state.completed);
        state.ready = true;
        state.sequence += 1;
        state.status = status;
        let sequence = state.sequence;

        self.stats.inc_frames_completed();
        if superseded {
            self.stats.inc_frames_superseded();
        }
        trace!(
            sequence,
            size = state.completed.size(),
            ?status,
            superseded,
            "frame published"
        );

        self.cond.notify_all();
        Publish::Published {
            sequence,
            superseded,
        }
    }

    /// Close the exchange and wait for every guard to be dropped.
    ///
    /// Wakes all blocked waiters (they observe `Closed`), then blocks until the
    /// waiter count reaches zero. Calling this while the current thread holds a
    /// [`FrameGuard`] of the same exchange deadlocks.
    pub fn request_shutdown(&self) {
        let mut state = self.state.lock();
        if !state.finishing {
            info!(waiting = state.waiting, "frame exchange closing");
        }
        state.finishing = true;
        state.ready = false;
        self.cond.notify_all();

        while state.waiting > 0 {
            debug!(waiting = state.waiting, "draining frame waiters");
            self.cond.wait(&mut state);
        }
        debug!("frame exchange drained");
    }

    /// Free the completed frame's memory. Only meaningful after
    /// [`request_shutdown`](Self::request_shutdown).
    pub fn release_buffers(&self) {
        let mut state = self.state.lock();
        debug_assert!(state.finishing, "release_buffers before shutdown");
        state.completed.release();
    }

    /// True once shutdown has been requested.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().finishing
    }

    /// Number of live guards.
    #[must_use]
    pub fn waiting(&self) -> usize {
        self.state.lock().waiting
    }

    /// Non-blocking check for an unread frame.
    #[must_use]
    pub fn has_frame(&self) -> bool {
        let state = self.state.lock();
        state.ready && !state.finishing
    }

    /// Capacity currently held by the completed slot.
    #[must_use]
    pub fn completed_capacity(&self) -> usize {
        self.state.lock().completed.capacity()
    }
}

/// Scoped lock on a [`FrameExchange`].
///
/// Dropping the guard decrements the waiter count, broadcasts on the
/// condition variable (a pending shutdown may be waiting for the count to
/// reach zero) and unlocks.
#[must_use = "dropping the guard releases the frame lock immediately"]
pub struct FrameGuard<'a> {
    exchange: &'a FrameExchange,
    state: MutexGuard<'a, ExchangeState>,
}

impl FrameGuard<'_> {
    /// Block until a frame is ready or the exchange closes.
    ///
    /// The lock is released while blocked and re-acquired on wake.
    pub fn wait_for_frame(&mut self) -> WaitOutcome {
        while !self.state.ready && !self.state.finishing {
            self.exchange.cond.wait(&mut self.state);
        }
        if self.state.finishing {
            WaitOutcome::Closed
        } else {
            WaitOutcome::FrameReady
        }
    }

    /// Wait for a frame and return its size without consuming it.
    ///
    /// Returns 0 when the exchange closed. A transmission-failed frame can
    /// also be 0 bytes long; use [`wait_for_frame`](Self::wait_for_frame) or
    /// [`frame_info`](Self::frame_info) to tell the two apart.
    pub fn frame_size(&mut self) -> usize {
        match self.wait_for_frame() {
            WaitOutcome::FrameReady => self.state.completed.size(),
            WaitOutcome::Closed => 0,
        }
    }

    /// Wait for a frame and return its metadata without consuming it.
    pub fn frame_info(&mut self) -> Option<FrameInfo> {
        match self.wait_for_frame() {
            WaitOutcome::FrameReady => Some(self.current_info()),
            WaitOutcome::Closed => None,
        }
    }

    /// Wait for a frame, copy it into `dst` and clear `ready`.
    ///
    /// `dst` must be at least [`frame_size`](Self::frame_size) bytes. A shorter
    /// buffer is rejected with [`VidcapError::BufferTooSmall`] and the frame
    /// stays available.
    pub fn retrieve_frame(&mut self, dst: &mut [u8]) -> Result<Retrieval, VidcapError> {
        if self.wait_for_frame() == WaitOutcome::Closed {
            return Ok(Retrieval::Closed);
        }

        let needed = self.state.completed.size();
        if dst.len() < needed {
            return Err(VidcapError::BufferTooSmall {
                needed,
                available: dst.len(),
            });
        }

        self.state.completed.buffer().copy_to(dst);
        Ok(Retrieval::Frame(self.consume()))
    }

    /// Wait for a frame and copy it into `dst`, resizing it to fit.
    pub fn retrieve_into(&mut self, dst: &mut Vec<u8>) -> Retrieval {
        if self.wait_for_frame() == WaitOutcome::Closed {
            return Retrieval::Closed;
        }

        dst.clear();
        dst.extend_from_slice(self.state.completed.buffer().as_slice());
        Retrieval::Frame(self.consume())
    }

    /// Non-blocking: is there an unread frame right now?
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state.ready && !self.state.finishing
    }

    /// Non-blocking: has shutdown been requested?
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.finishing
    }

    /// Explicit release, equivalent to dropping the guard.
    pub fn release(self) {}

    fn current_info(&self) -> FrameInfo {
        FrameInfo {
            len: self.state.completed.size(),
            sequence: self.state.sequence,
            status: self.state.status,
        }
    }

    fn consume(&mut self) -> FrameInfo {
        let info = self.current_info();
        // Broadcast happens when the guard is dropped.
        self.state.ready = false;
        self.exchange.stats.inc_frames_retrieved();
        trace!(sequence = info.sequence, len = info.len, "frame retrieved");
        info
    }
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        self.state.waiting -= 1;
        self.exchange.cond.notify_all();
    }
}
