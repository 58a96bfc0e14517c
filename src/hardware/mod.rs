//! Hardware seam.
//!
//! The camera stack is an external collaborator. This module defines the
//! narrow surface the capture session needs from it:
//!
//! - [`CaptureBackend`]: the start-up steps (create, enable port, create
//!   pool, start capture) and a reverse-order `release`
//! - [`ChunkPort`]: what the producer callback may do with the port while
//!   handling a chunk (check it is enabled, recycle a free raw chunk)
//! - [`initialize`]: process-wide one-time subsystem initialization
//!
//! Format and resolution negotiation stay inside the backend. The session
//! only hands over a [`StreamRequest`].

pub mod mock;
pub mod pattern;

use crate::error::{ErrorCode, VidcapError};
use crate::format::PixelFormat;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::any::TypeId;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;
use tracing::info;

pub use mock::{MockBackend, MockMode, MockPayload, MockProbe};

/// Start-up steps, in the order the session performs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartStep {
    /// Pre-allocating the assembly and completed frame buffers.
    AllocateBuffers,
    /// Creating the camera component.
    CreateCamera,
    /// Selecting which physical camera to use.
    SelectCamera,
    /// Applying the camera configuration.
    ConfigureCamera,
    /// Committing the output format.
    CommitFormat,
    /// Enabling the camera component.
    EnableCamera,
    /// Creating the raw chunk pool.
    CreatePool,
    /// Enabling the video output port and registering the callback.
    EnableVideoPort,
    /// Handing a raw chunk to the port.
    SendBuffer,
    /// Switching capture on.
    StartCapture,
}

impl StartStep {
    /// Numeric code reported when this step fails.
    #[must_use]
    pub fn error_code(self) -> ErrorCode {
        match self {
            StartStep::AllocateBuffers => ErrorCode::NoMemory,
            StartStep::CreateCamera => ErrorCode::CannotCreateCamera,
            StartStep::SelectCamera => ErrorCode::CannotSetCamera,
            StartStep::ConfigureCamera => ErrorCode::CannotSetCameraConfig,
            StartStep::CommitFormat => ErrorCode::CannotCommitFormat,
            StartStep::EnableCamera => ErrorCode::CannotEnableCamera,
            StartStep::CreatePool => ErrorCode::CannotCreatePool,
            StartStep::EnableVideoPort => ErrorCode::CannotEnableVideoPort,
            StartStep::SendBuffer => ErrorCode::CannotSendBuffer,
            StartStep::StartCapture => ErrorCode::CannotStartCapture,
        }
    }

    /// Short snake_case name, used in logs and config.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StartStep::AllocateBuffers => "allocate_buffers",
            StartStep::CreateCamera => "create_camera",
            StartStep::SelectCamera => "select_camera",
            StartStep::ConfigureCamera => "configure_camera",
            StartStep::CommitFormat => "commit_format",
            StartStep::EnableCamera => "enable_camera",
            StartStep::CreatePool => "create_pool",
            StartStep::EnableVideoPort => "enable_video_port",
            StartStep::SendBuffer => "send_buffer",
            StartStep::StartCapture => "start_capture",
        }
    }
}

impl fmt::Display for StartStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed backend operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{step}: {message}")]
pub struct BackendError {
    /// Which step failed.
    pub step: StartStep,
    /// Backend-specific detail.
    pub message: String,
}

impl BackendError {
    /// Convenience constructor.
    pub fn new(step: StartStep, message: impl Into<String>) -> Self {
        Self {
            step,
            message: message.into(),
        }
    }
}

impl From<BackendError> for VidcapError {
    fn from(err: BackendError) -> Self {
        VidcapError::Startup {
            step: err.step,
            message: err.message,
        }
    }
}

/// Marker carried by a raw chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChunkFlag {
    /// Middle of a frame.
    #[default]
    None,
    /// Last chunk of a frame.
    FrameEnd,
    /// Last chunk of a frame whose transmission failed.
    TransmissionFailed,
}

impl ChunkFlag {
    /// Does this chunk end the frame in progress?
    #[must_use]
    pub fn ends_frame(self) -> bool {
        !matches!(self, ChunkFlag::None)
    }
}

/// Opaque handle to one raw chunk owned by the backend's pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkSlot(pub usize);

/// The port operations the producer callback may use.
pub trait ChunkPort {
    /// Is the output port still enabled?
    fn is_enabled(&self) -> bool;

    /// Take a free raw chunk from the pool, if any.
    fn try_get_free_chunk(&self) -> Option<ChunkSlot>;

    /// Hand a raw chunk back to the port for filling.
    fn send_chunk(&self, slot: ChunkSlot) -> Result<(), BackendError>;
}

/// The callback a backend invokes for every raw chunk.
///
/// Runs on the backend's thread. It must not block indefinitely and must not
/// panic (the session's callback catches panics itself).
pub type ChunkCallback = Box<dyn FnMut(&[u8], ChunkFlag, &dyn ChunkPort) + Send>;

/// What the session asks the backend to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamRequest {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Output pixel format.
    pub format: PixelFormat,
    /// Which physical camera.
    pub camera_num: u32,
    /// Frames the camera keeps internally for preview/video.
    pub preview_frames: u32,
}

/// A camera stack the session can drive.
///
/// Every method except `release` is called once, in declaration order, during
/// [`CaptureSession::start`](crate::session::CaptureSession::start). `release`
/// undoes whatever was acquired, in reverse order, and must be safe to call
/// after a partial start-up and more than once.
pub trait CaptureBackend: Send {
    /// Process-wide initialization of the underlying subsystem.
    ///
    /// Called at most once per backend type per process, via [`initialize`].
    fn initialize_subsystem()
    where
        Self: Sized,
    {
    }

    /// Human-readable backend name.
    fn name(&self) -> &str;

    /// Create, select, configure and enable the camera, committing the format.
    fn create_camera(&mut self, request: &StreamRequest) -> Result<(), BackendError>;

    /// Enable the video output port, registering `callback` for its chunks.
    fn enable_port(&mut self, callback: ChunkCallback) -> Result<(), BackendError>;

    /// Create the raw chunk pool and hand every chunk to the port.
    fn create_pool(&mut self) -> Result<(), BackendError>;

    /// Switch capture on or off.
    fn set_capture(&mut self, enabled: bool) -> Result<(), BackendError>;

    /// Undo everything acquired so far. Once this returns the callback will
    /// not be invoked again and has been dropped.
    fn release(&mut self);
}

static INITIALIZED: OnceCell<parking_lot::Mutex<HashSet<TypeId>>> = OnceCell::new();

/// Run `B::initialize_subsystem` once per process.
///
/// Returns true if this call performed the initialization.
pub fn initialize<B: CaptureBackend + 'static>() -> bool {
    let registry = INITIALIZED.get_or_init(|| parking_lot::Mutex::new(HashSet::new()));
    let mut done = registry.lock();
    if done.insert(TypeId::of::<B>()) {
        B::initialize_subsystem();
        info!(backend = std::any::type_name::<B>(), "capture subsystem initialized");
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static INIT_CALLS: AtomicUsize = AtomicUsize::new(0);

    struct CountingBackend;

    impl CaptureBackend for CountingBackend {
        fn initialize_subsystem() {
            INIT_CALLS.fetch_add(1, Ordering::SeqCst);
        }
        fn name(&self) -> &str {
            "counting"
        }
        fn create_camera(&mut self, _: &StreamRequest) -> Result<(), BackendError> {
            Ok(())
        }
        fn enable_port(&mut self, _: ChunkCallback) -> Result<(), BackendError> {
            Ok(())
        }
        fn create_pool(&mut self) -> Result<(), BackendError> {
            Ok(())
        }
        fn set_capture(&mut self, _: bool) -> Result<(), BackendError> {
            Ok(())
        }
        fn release(&mut self) {}
    }

    #[test]
    fn test_initialize_runs_once() {
        let first = initialize::<CountingBackend>();
        let second = initialize::<CountingBackend>();
        assert!(first);
        assert!(!second);
        assert_eq!(INIT_CALLS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_step_codes() {
        assert_eq!(StartStep::AllocateBuffers.error_code(), ErrorCode::NoMemory);
        assert_eq!(
            StartStep::StartCapture.error_code(),
            ErrorCode::CannotStartCapture
        );
        assert_eq!(StartStep::EnableVideoPort.to_string(), "enable_video_port");
    }

    #[test]
    fn test_backend_error_into_startup() {
        let err: VidcapError = BackendError::new(StartStep::CreatePool, "no pool").into();
        assert!(matches!(
            err,
            VidcapError::Startup {
                step: StartStep::CreatePool,
                ..
            }
        ));
        assert_eq!(err.code(), ErrorCode::CannotCreatePool);
    }

    #[test]
    fn test_chunk_flag_ends_frame() {
        assert!(!ChunkFlag::None.ends_frame());
        assert!(ChunkFlag::FrameEnd.ends_frame());
        assert!(ChunkFlag::TransmissionFailed.ends_frame());
    }
}
