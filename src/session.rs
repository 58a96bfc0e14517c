//! Capture session lifecycle.
//!
//! A [`CaptureSession`] owns one backend, the frame exchange and the
//! counters. Start-up runs the steps in a fixed order and rolls back
//! everything acquired so far if any of them fails:
//!
//! ```text
//! validate -> init-once -> allocate slots -> create_camera
//!          -> enable_port(callback) -> create_pool -> set_capture(true)
//! ```
//!
//! Teardown is the reverse, with the consumer drain first:
//!
//! ```text
//! request_shutdown (drain waiters) -> set_capture(false)
//!          -> backend.release() (callback dropped) -> release_buffers
//! ```
//!
//! `stop` consumes the session. Dropping a session that was never stopped
//! runs the same teardown.

use crate::assembler::FrameAssembler;
use crate::config::CaptureConfig;
use crate::error::{AppResult, VidcapError};
use crate::exchange::{FrameExchange, FrameGuard};
use crate::format::PixelFormat;
use crate::hardware::{self, CaptureBackend, StartStep, StreamRequest};
use crate::stats::{CaptureStats, StatsSnapshot};
use crate::stream::FrameStream;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Frame geometry shared by readers and streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeometry {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel format.
    pub format: PixelFormat,
}

/// A running capture.
pub struct CaptureSession<B: CaptureBackend> {
    backend: B,
    exchange: Arc<FrameExchange>,
    stats: Arc<CaptureStats>,
    config: CaptureConfig,
    stopped: bool,
}

impl<B: CaptureBackend> std::fmt::Debug for CaptureSession<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("backend", &self.backend.name())
            .field("exchange", &self.exchange)
            .field("stopped", &self.stopped)
            .finish()
    }
}

impl<B: CaptureBackend + 'static> CaptureSession<B> {
    /// Bring up a capture session on `backend`.
    ///
    /// On error every step that had already succeeded is undone through
    /// [`CaptureBackend::release`] before returning, and the error names the
    /// first step that failed.
    pub fn start(config: CaptureConfig, mut backend: B) -> AppResult<Self> {
        config.validate()?;
        hardware::initialize::<B>();

        let stats = Arc::new(CaptureStats::new());
        match bring_up(&config, &mut backend, &stats) {
            Ok(exchange) => {
                info!(
                    backend = backend.name(),
                    width = config.width,
                    height = config.height,
                    format = %config.format,
                    "capture session started"
                );
                Ok(Self {
                    backend,
                    exchange,
                    stats,
                    config,
                    stopped: false,
                })
            }
            Err(e) => {
                error!(backend = backend.name(), error = %e, "capture start-up failed");
                backend.release();
                Err(e)
            }
        }
    }
}

fn bring_up<B: CaptureBackend>(
    config: &CaptureConfig,
    backend: &mut B,
    stats: &Arc<CaptureStats>,
) -> AppResult<Arc<FrameExchange>> {
    let (writing, completed) = vidcap_pool::split(
        config.initial_capacity,
        config.growth.into(),
        Some(config.max_frame_bytes),
    )
    .map_err(|e| VidcapError::Startup {
        step: StartStep::AllocateBuffers,
        message: e.to_string(),
    })?;
    let exchange = Arc::new(FrameExchange::new(completed, Arc::clone(stats)));

    let request = StreamRequest {
        width: config.width,
        height: config.height,
        format: config.format,
        camera_num: config.camera_num,
        preview_frames: config.preview_frames,
    };
    backend.create_camera(&request)?;
    debug!("camera created");

    let assembler = FrameAssembler::new(writing, Arc::clone(&exchange), Arc::clone(stats));
    backend.enable_port(assembler.into_callback())?;
    debug!("video port enabled");

    backend.create_pool()?;
    debug!("chunk pool created");

    backend.set_capture(true)?;
    Ok(exchange)
}

impl<B: CaptureBackend> CaptureSession<B> {
    /// Lock the exchange on the current thread.
    pub fn lock(&self) -> FrameGuard<'_> {
        self.exchange.lock()
    }

    /// Handle for consumers on other threads.
    #[must_use]
    pub fn reader(&self) -> FrameReader {
        FrameReader {
            exchange: Arc::clone(&self.exchange),
            stats: Arc::clone(&self.stats),
            geometry: self.geometry(),
        }
    }

    /// Iterator over frames, ending when the session stops.
    #[must_use]
    pub fn frames(&self) -> FrameStream {
        FrameStream::new(Arc::clone(&self.exchange), self.geometry())
    }

    /// Live counters.
    #[must_use]
    pub fn stats(&self) -> &CaptureStats {
        &self.stats
    }

    /// The configuration the session was started with.
    #[must_use]
    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// The backend, e.g. to reach a mock probe.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Resolution and format of delivered frames.
    #[must_use]
    pub fn geometry(&self) -> FrameGeometry {
        FrameGeometry {
            width: self.config.width,
            height: self.config.height,
            format: self.config.format,
        }
    }

    /// Stop capturing and free every resource.
    ///
    /// Blocks until all consumers waiting on this session have observed the
    /// shutdown. Must not be called while the current thread holds a guard
    /// obtained through a [`FrameReader`].
    pub fn stop(mut self) -> StatsSnapshot {
        self.teardown();
        self.stats.snapshot()
    }

    fn teardown(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        info!(backend = self.backend.name(), "stopping capture session");

        self.exchange.request_shutdown();
        if let Err(e) = self.backend.set_capture(false) {
            warn!(error = %e, "failed to stop capture cleanly");
        }
        self.backend.release();
        self.exchange.release_buffers();

        let stats = self.stats.snapshot();
        info!(
            frames_completed = stats.frames_completed,
            frames_retrieved = stats.frames_retrieved,
            dropped_chunks = stats.dropped_chunks,
            "capture session stopped"
        );
    }
}

impl<B: CaptureBackend> Drop for CaptureSession<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Cloneable consumer handle. Stays valid after the session stops; every
/// wait then reports `Closed`.
#[derive(Debug, Clone)]
pub struct FrameReader {
    exchange: Arc<FrameExchange>,
    stats: Arc<CaptureStats>,
    geometry: FrameGeometry,
}

impl FrameReader {
    /// Lock the exchange.
    pub fn lock(&self) -> FrameGuard<'_> {
        self.exchange.lock()
    }

    /// Iterator over frames.
    #[must_use]
    pub fn frames(&self) -> FrameStream {
        FrameStream::new(Arc::clone(&self.exchange), self.geometry)
    }

    /// True once the session has begun shutting down.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.exchange.is_closed()
    }

    /// Live counters.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Resolution and format of delivered frames.
    #[must_use]
    pub fn geometry(&self) -> FrameGeometry {
        self.geometry
    }
}
