//! Consumer loop as an iterator.
//!
//! Each step locks the exchange, waits for a frame, sizes a fresh buffer,
//! copies the frame out and unlocks. The iterator ends when the session
//! closes.

use crate::exchange::{FrameExchange, FrameStatus, Retrieval};
use crate::format::PixelFormat;
use crate::session::FrameGeometry;
use bytes::Bytes;
use std::sync::Arc;
use tracing::{trace, warn};

/// One frame copied out of the exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFrame {
    /// Publication sequence number.
    pub sequence: u64,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel format.
    pub format: PixelFormat,
    /// How the producer finished the frame.
    pub status: FrameStatus,
    /// Frame bytes.
    pub data: Bytes,
}

impl CapturedFrame {
    /// Byte length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True for zero-length frames (possible after a transmission failure).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Color model label.
    #[must_use]
    pub fn color_model(&self) -> &'static str {
        self.format.color_model()
    }

    /// Frame ended normally with every chunk present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status == FrameStatus::Complete
    }
}

/// Blocking iterator over the frames of a session.
#[derive(Debug, Clone)]
pub struct FrameStream {
    exchange: Arc<FrameExchange>,
    geometry: FrameGeometry,
}

impl FrameStream {
    pub(crate) fn new(exchange: Arc<FrameExchange>, geometry: FrameGeometry) -> Self {
        Self { exchange, geometry }
    }
}

impl Iterator for FrameStream {
    type Item = CapturedFrame;

    fn next(&mut self) -> Option<Self::Item> {
        let mut guard = self.exchange.lock();
        let size = guard.frame_size();
        if guard.is_closed() {
            return None;
        }

        let mut data = vec![0u8; size];
        let result = guard.retrieve_frame(&mut data);
        drop(guard);

        match result {
            Ok(Retrieval::Frame(info)) => {
                trace!(sequence = info.sequence, len = info.len, "frame streamed");
                Some(CapturedFrame {
                    sequence: info.sequence,
                    width: self.geometry.width,
                    height: self.geometry.height,
                    format: self.geometry.format,
                    status: info.status,
                    data: Bytes::from(data),
                })
            }
            Ok(Retrieval::Closed) => None,
            Err(e) => {
                warn!(error = %e, "frame retrieval failed");
                None
            }
        }
    }
}
