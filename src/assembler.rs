//! Producer callback: reassembles raw chunks into frames.
//!
//! Runs in the backend's delivery context. For every chunk:
//!
//! 1. Append the bytes to the writing slot, growing it to exactly fit.
//!    If the slot cannot grow the chunk is dropped, counted, and the frame in
//!    progress is marked [`FrameStatus::Incomplete`].
//! 2. On frame end (normal or transmission failure), publish the writing
//!    slot through the [`FrameExchange`].
//! 3. If the port is still enabled, hand one free raw chunk back to it.
//!
//! Nothing here returns an error or panics outward. Failures are logged and
//! counted in [`CaptureStats`].

use crate::exchange::{FrameExchange, FrameStatus, Publish};
use crate::hardware::{ChunkCallback, ChunkFlag, ChunkPort};
use crate::stats::CaptureStats;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{error, trace, warn};
use vidcap_pool::WriteSlot;

/// Frame assembly state owned by the producer context.
#[derive(Debug)]
pub struct FrameAssembler {
    writing: WriteSlot,
    exchange: Arc<FrameExchange>,
    stats: Arc<CaptureStats>,
    incomplete: bool,
}

impl FrameAssembler {
    /// Take ownership of the writing slot.
    #[must_use]
    pub fn new(writing: WriteSlot, exchange: Arc<FrameExchange>, stats: Arc<CaptureStats>) -> Self {
        Self {
            writing,
            exchange,
            stats,
            incomplete: false,
        }
    }

    /// Bytes of the frame currently being assembled.
    #[must_use]
    pub fn pending_bytes(&self) -> usize {
        self.writing.size()
    }

    /// Handle one raw chunk.
    pub fn on_chunk(&mut self, chunk: &[u8], flag: ChunkFlag, port: &dyn ChunkPort) {
        self.stats.inc_chunks_received();

        if !chunk.is_empty() {
            match self.writing.try_append(chunk) {
                Ok(()) => self.stats.add_bytes_received(chunk.len() as u64),
                Err(e) => {
                    self.stats.inc_dropped_chunks();
                    self.incomplete = true;
                    warn!(
                        error = %e,
                        chunk_len = chunk.len(),
                        assembled = self.writing.size(),
                        "dropping chunk: frame buffer cannot grow"
                    );
                }
            }
        }

        if flag.ends_frame() {
            self.finish_frame(flag);
        }

        self.recycle(port);
    }

    fn finish_frame(&mut self, flag: ChunkFlag) {
        let status = if flag == ChunkFlag::TransmissionFailed {
            self.stats.inc_transmission_failures();
            warn!(size = self.writing.size(), "frame transmission failed");
            FrameStatus::TransmissionFailed
        } else if self.incomplete {
            FrameStatus::Incomplete
        } else {
            FrameStatus::Complete
        };
        self.incomplete = false;

        match self.exchange.publish(&mut self.writing, status) {
            Publish::Published { sequence, .. } => trace!(sequence, ?status, "frame complete"),
            Publish::Discarded => trace!("frame dropped during shutdown"),
        }
    }

    fn recycle(&self, port: &dyn ChunkPort) {
        if !port.is_enabled() {
            return;
        }
        match port.try_get_free_chunk() {
            Some(slot) => {
                if let Err(e) = port.send_chunk(slot) {
                    self.stats.inc_recycle_failures();
                    warn!(error = %e, slot = slot.0, "unable to return a chunk to the port");
                }
            }
            None => {
                self.stats.inc_recycle_starved();
                trace!("no free chunk to recycle");
            }
        }
    }

    /// Box the assembler into the callback registered with the backend.
    ///
    /// A panic inside `on_chunk` is caught and counted; the frame in progress
    /// is discarded so the next frame starts clean.
    #[must_use]
    pub fn into_callback(mut self) -> ChunkCallback {
        Box::new(move |chunk: &[u8], flag: ChunkFlag, port: &dyn ChunkPort| {
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                self.on_chunk(chunk, flag, port);
            }));
            if result.is_err() {
                self.stats.inc_callback_panics();
                self.writing.reset();
                self.incomplete = false;
                error!("panic in frame callback; frame in progress discarded");
            }
        })
    }
}
