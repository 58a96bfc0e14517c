//! Growable frame buffers for assembling camera frames chunk by chunk.
//!
//! This crate provides the two storage primitives used by the capture
//! pipeline, where a frame arrives as an unknown number of raw chunks and
//! must be copied somewhere before the hardware reuses the chunk memory:
//!
//! - [`FrameBuffer`]: an owned byte store with a logical size and a physical
//!   capacity that only ever grows
//! - [`WriteSlot`] / [`ReadSlot`]: the two halves of a double buffer, created
//!   together by [`split`] and exchanged in O(1) when a frame completes
//!
//! # Growth Model
//!
//! A buffer is reused for every frame of a session. `reset()` drops the
//! logical size to zero but keeps the allocation, so once a session has seen
//! its largest frame no further allocation happens:
//!
//! ```text
//! frame 1: 3 chunks -> grow, grow, grow   capacity = 921_600
//! frame 2: 3 chunks -> (no allocation)    capacity = 921_600
//! frame 3: smaller  -> (no allocation)    capacity = 921_600  (never shrinks)
//! ```
//!
//! Allocation failures are reported as [`BufferError`] values rather than
//! aborting the process, because the caller is usually a hardware callback
//! thread that must keep running.
//!
//! # Example
//!
//! ```
//! use vidcap_pool::{FrameBuffer, GrowthPolicy};
//!
//! let mut buf = FrameBuffer::new().with_policy(GrowthPolicy::Exact);
//! buf.try_append(b"first chunk ").unwrap();
//! buf.try_append(b"second chunk").unwrap();
//! assert_eq!(buf.size(), 24);
//!
//! let cap = buf.capacity();
//! buf.reset();
//! assert_eq!(buf.size(), 0);
//! assert_eq!(buf.capacity(), cap);
//! ```

pub mod slots;

pub use slots::{split, ReadSlot, WriteSlot};

use std::collections::TryReserveError;
use thiserror::Error;
use tracing::trace;

/// Errors raised while growing a [`FrameBuffer`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    /// The allocator refused to grow the buffer.
    #[error("cannot allocate memory: growing frame buffer from {capacity} to {requested} bytes failed ({source})")]
    OutOfMemory {
        /// Capacity before the failed growth.
        capacity: usize,
        /// Capacity that was requested.
        requested: usize,
        /// Underlying reservation error.
        #[source]
        source: TryReserveError,
    },

    /// Growing would exceed the configured hard limit.
    #[error("frame buffer limit exceeded: {requested} bytes requested, limit is {limit}")]
    LimitExceeded {
        /// Capacity that was requested.
        requested: usize,
        /// Configured maximum.
        limit: usize,
    },

    /// `size + additional` does not fit in `usize`.
    #[error("frame buffer size overflow: {size} + {additional}")]
    SizeOverflow {
        /// Current logical size.
        size: usize,
        /// Bytes that were to be appended.
        additional: usize,
    },
}

/// How a [`FrameBuffer`] extends its capacity when a chunk does not fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GrowthPolicy {
    /// Grow to exactly `size + additional`. Cheapest in memory, and after the
    /// first frame of a session no further growth happens anyway.
    #[default]
    Exact,
    /// Amortized growth (at least doubling). Fewer reallocations while the
    /// first frames of variable-size streams are assembled.
    Doubling,
}

/// Owned, monotonically growing byte store.
///
/// Invariant: `size() <= capacity()`. Capacity never decreases for the
/// lifetime of the buffer; callers reusing a buffer across frames rely on it.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    data: Vec<u8>,
    policy: GrowthPolicy,
    limit: Option<usize>,
}

impl FrameBuffer {
    /// Create an empty buffer with no allocation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer with at least `capacity` bytes pre-allocated.
    pub fn with_capacity(capacity: usize) -> Result<Self, BufferError> {
        let mut buf = Self::new();
        buf.ensure_capacity(capacity)?;
        Ok(buf)
    }

    /// Set the growth policy.
    #[must_use]
    pub fn with_policy(mut self, policy: GrowthPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Refuse to grow beyond `max_bytes`.
    #[must_use]
    pub fn with_limit(mut self, max_bytes: usize) -> Self {
        self.limit = Some(max_bytes);
        self
    }

    /// Bytes currently holding valid data.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Bytes allocated.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// True when no valid data is held.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The growth policy in effect.
    #[must_use]
    pub fn policy(&self) -> GrowthPolicy {
        self.policy
    }

    /// The configured hard limit, if any.
    #[must_use]
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Valid data as a slice.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Guarantee `capacity() >= size() + additional`, preserving existing bytes.
    ///
    /// Never shrinks. On failure the buffer is left untouched.
    pub fn ensure_capacity(&mut self, additional: usize) -> Result<(), BufferError> {
        let size = self.data.len();
        let required = size
            .checked_add(additional)
            .ok_or(BufferError::SizeOverflow { size, additional })?;
        let capacity = self.data.capacity();
        if required <= capacity {
            return Ok(());
        }

        if let Some(limit) = self.limit {
            if required > limit {
                return Err(BufferError::LimitExceeded {
                    requested: required,
                    limit,
                });
            }
        }

        let result = match self.policy {
            GrowthPolicy::Exact => self.data.try_reserve_exact(additional),
            GrowthPolicy::Doubling => {
                // Cap the amortized growth at the limit so a limited buffer can
                // still reach exactly `limit` bytes.
                let target = match self.limit {
                    Some(limit) => required.max(capacity.saturating_mul(2)).min(limit),
                    None => required.max(capacity.saturating_mul(2)),
                };
                self.data.try_reserve_exact(target - size)
            }
        };

        result.map_err(|source| BufferError::OutOfMemory {
            capacity,
            requested: required,
            source,
        })?;

        trace!(
            old_capacity = capacity,
            new_capacity = self.data.capacity(),
            size,
            "FrameBuffer grown"
        );
        Ok(())
    }

    /// Copy `data` to the end of the buffer.
    ///
    /// Requires a prior successful [`ensure_capacity`](Self::ensure_capacity)
    /// covering `data.len()`; this keeps the copy itself allocation-free.
    #[inline]
    pub fn append(&mut self, data: &[u8]) {
        debug_assert!(
            self.data.len() + data.len() <= self.data.capacity(),
            "append of {} bytes without ensure_capacity (size {}, capacity {})",
            data.len(),
            self.data.len(),
            self.data.capacity()
        );
        self.data.extend_from_slice(data);
    }

    /// `ensure_capacity` followed by `append`.
    pub fn try_append(&mut self, data: &[u8]) -> Result<(), BufferError> {
        self.ensure_capacity(data.len())?;
        self.append(data);
        Ok(())
    }

    /// Drop the logical contents, keeping the allocation for the next frame.
    #[inline]
    pub fn reset(&mut self) {
        self.data.clear();
    }

    /// Copy the valid data into the front of `dst`, returning the byte count.
    ///
    /// # Panics
    ///
    /// Panics if `dst` is shorter than `size()`.
    pub fn copy_to(&self, dst: &mut [u8]) -> usize {
        let len = self.data.len();
        assert!(
            dst.len() >= len,
            "copy_to: destination ({}) smaller than frame ({})",
            dst.len(),
            len
        );
        dst[..len].copy_from_slice(&self.data);
        len
    }

    /// Release the allocation entirely. Used at teardown only; normal reuse
    /// goes through [`reset`](Self::reset).
    pub fn release(&mut self) {
        self.data = Vec::new();
    }
}
