//! Write/read slot pair for double-buffered frame assembly.
//!
//! The producer appends chunks into a [`WriteSlot`] it owns outright, so the
//! append path never takes a lock. The [`ReadSlot`] holds the last completed
//! frame and is meant to live behind the consumer-facing lock. When a frame
//! completes, the producer takes that lock and calls
//! [`WriteSlot::swap_with`], which exchanges the two allocations without
//! copying any pixel data.
//!
//! ```text
//!            producer context                 |   under the session lock
//!  chunk -> WriteSlot [####......]            |   ReadSlot [##########]
//!  end   -> swap_with ------------------------+-> ReadSlot [####]   (new frame)
//!           WriteSlot [..........] (reset)    |
//! ```

use crate::{BufferError, FrameBuffer, GrowthPolicy};

/// Create a matched pair of slots.
///
/// Both buffers share the same policy and limit, and each gets `prealloc`
/// bytes up front so that steady-state capture of frames up to that size
/// never allocates.
pub fn split(
    prealloc: usize,
    policy: GrowthPolicy,
    limit: Option<usize>,
) -> Result<(WriteSlot, ReadSlot), BufferError> {
    let make = || -> Result<FrameBuffer, BufferError> {
        let mut buf = FrameBuffer::new().with_policy(policy);
        if let Some(limit) = limit {
            buf = buf.with_limit(limit);
        }
        buf.ensure_capacity(prealloc)?;
        Ok(buf)
    };

    Ok((WriteSlot { buf: make()? }, ReadSlot { buf: make()? }))
}

/// The "being written" half of the pair. Owned by the producer context only.
#[derive(Debug)]
pub struct WriteSlot {
    buf: FrameBuffer,
}

impl WriteSlot {
    /// Append a chunk, growing if needed. On error nothing is appended.
    #[inline]
    pub fn try_append(&mut self, chunk: &[u8]) -> Result<(), BufferError> {
        self.buf.try_append(chunk)
    }

    /// Bytes assembled so far for the frame in progress.
    #[must_use]
    pub fn size(&self) -> usize {
        self.buf.size()
    }

    /// Allocated bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// Discard the frame in progress.
    pub fn reset(&mut self) {
        self.buf.reset();
    }

    /// Exchange roles with the completed slot in O(1).
    ///
    /// After the call `completed` holds the frame that was being written and
    /// `self` holds the previous completed allocation, reset to size 0.
    pub fn swap_with(&mut self, completed: &mut ReadSlot) {
        std::mem::swap(&mut self.buf, &mut completed.buf);
        self.buf.reset();
    }

    /// Free the allocation.
    pub fn release(&mut self) {
        self.buf.release();
    }
}

/// The "last completed" half of the pair.
#[derive(Debug)]
pub struct ReadSlot {
    buf: FrameBuffer,
}

impl ReadSlot {
    /// The completed frame.
    #[must_use]
    pub fn buffer(&self) -> &FrameBuffer {
        &self.buf
    }

    /// Size of the completed frame.
    #[must_use]
    pub fn size(&self) -> usize {
        self.buf.size()
    }

    /// Allocated bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// Free the allocation.
    pub fn release(&mut self) {
        self.buf.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_preallocates_both() {
        let (w, r) = split(4096, GrowthPolicy::Exact, None).unwrap();
        assert!(w.capacity() >= 4096);
        assert!(r.capacity() >= 4096);
        assert_eq!(w.size(), 0);
        assert_eq!(r.size(), 0);
    }

    #[test]
    fn test_split_over_limit_fails() {
        let err = split(200, GrowthPolicy::Exact, Some(100)).unwrap_err();
        assert!(matches!(err, BufferError::LimitExceeded { .. }));
    }

    #[test]
    fn test_swap_moves_frame_without_copy() {
        let (mut w, mut r) = split(0, GrowthPolicy::Exact, None).unwrap();
        w.try_append(b"frame-one").unwrap();
        let ptr = w.buf.as_slice().as_ptr();

        w.swap_with(&mut r);

        assert_eq!(r.buffer().as_slice(), b"frame-one");
        assert_eq!(r.buffer().as_slice().as_ptr(), ptr);
        assert_eq!(w.size(), 0);
    }

    #[test]
    fn test_repeated_swaps_alternate_allocations() {
        let (mut w, mut r) = split(0, GrowthPolicy::Exact, None).unwrap();

        w.try_append(&[1u8; 32]).unwrap();
        w.swap_with(&mut r);
        w.try_append(&[2u8; 16]).unwrap();
        w.swap_with(&mut r);

        assert_eq!(r.size(), 16);
        assert!(r.buffer().as_slice().iter().all(|&b| b == 2));
        // The writing side got the 32-byte allocation back and kept it.
        assert!(w.capacity() >= 32);
        assert_eq!(w.size(), 0);
    }
}
