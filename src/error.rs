//! Error types for the capture pipeline.
//!
//! `VidcapError` is the single error type returned by fallible operations in
//! this crate. It deliberately does not cover everything that can go wrong:
//!
//! - **Startup failures** (`Startup`, `NoMemory`) are returned by
//!   `CaptureSession::start` after every partially acquired resource has been
//!   released again. They name the first step that failed.
//! - **Producer-context failures** (allocation failure while a frame is being
//!   assembled, chunk recycling failures) are never returned at all. They are
//!   absorbed on the hardware thread, counted in `CaptureStats`, and logged.
//! - **Session closed** is not an error. Consumers blocked in a wait receive
//!   `WaitOutcome::Closed` / `Retrieval::Closed` as an ordinary value.
//!
//! Every variant maps onto a stable numeric [`ErrorCode`] so that the codes can
//! be surfaced unchanged to non-Rust callers.

use crate::hardware::StartStep;
use thiserror::Error;
use vidcap_pool::BufferError;

/// Convenience alias for results using the crate error type.
pub type AppResult<T> = std::result::Result<T, VidcapError>;

/// Primary error type.
#[derive(Error, Debug)]
pub enum VidcapError {
    /// Configuration file or environment could not be parsed.
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// Configuration parsed but is semantically invalid.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// Frame buffers could not be allocated.
    #[error("cannot allocate memory: {0}")]
    NoMemory(#[from] BufferError),

    /// A hardware start-up step failed. All earlier steps were undone.
    #[error("{} ({step}): {message}", .step.error_code().message())]
    Startup {
        /// The first step that failed.
        step: StartStep,
        /// Backend-specific detail.
        message: String,
    },

    /// Destination passed to `retrieve_frame` is shorter than the frame.
    #[error("Destination buffer too small: frame is {needed} bytes, buffer is {available} bytes")]
    BufferTooSmall {
        /// Frame size.
        needed: usize,
        /// Destination length.
        available: usize,
    },

    /// Width or height beyond [`MAX_FRAME_DIMENSION`](crate::limits::MAX_FRAME_DIMENSION).
    #[error("Frame dimensions {width}x{height} exceed maximum {max_dimension} per dimension")]
    FrameDimensionsTooLarge {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
        /// Maximum per dimension.
        max_dimension: u32,
    },

    /// Arithmetic overflow while computing a size.
    #[error("Size overflow while computing {context}")]
    SizeOverflow {
        /// What was being computed.
        context: &'static str,
    },

    /// Frame byte size beyond the configured maximum.
    #[error("Frame size {bytes} bytes exceeds maximum {max_bytes} bytes")]
    FrameTooLarge {
        /// Computed frame size.
        bytes: usize,
        /// Maximum allowed.
        max_bytes: usize,
    },

    /// Pixel format name not in the format table.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Resolution not in the supported list.
    #[error("unsupported frame size: {width}x{height}")]
    UnsupportedFrameSize {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
}

impl From<figment::Error> for VidcapError {
    fn from(err: figment::Error) -> Self {
        VidcapError::Config(Box::new(err))
    }
}

impl VidcapError {
    /// Stable numeric code for this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            VidcapError::NoMemory(_) => ErrorCode::NoMemory,
            VidcapError::Startup { step, .. } => step.error_code(),
            VidcapError::Config(_)
            | VidcapError::Configuration(_)
            | VidcapError::BufferTooSmall { .. }
            | VidcapError::FrameDimensionsTooLarge { .. }
            | VidcapError::SizeOverflow { .. }
            | VidcapError::FrameTooLarge { .. }
            | VidcapError::UnsupportedFormat(_)
            | VidcapError::UnsupportedFrameSize { .. } => ErrorCode::InvalidArgument,
        }
    }
}

/// Numeric result codes, compatible with the camera's C-level interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    /// No error.
    Success = 0,
    /// Allocation failed.
    NoMemory = 1,
    /// Lock primitives could not be created.
    CannotInitMutex = 2,
    /// Camera component could not be created.
    CannotCreateCamera = 3,
    /// Camera could not be selected.
    CannotSetCamera = 4,
    /// Camera configuration rejected.
    CannotSetCameraConfig = 5,
    /// Output format rejected.
    CannotCommitFormat = 6,
    /// Camera component could not be enabled.
    CannotEnableCamera = 7,
    /// Raw chunk pool could not be created.
    CannotCreatePool = 8,
    /// Video output port could not be enabled.
    CannotEnableVideoPort = 9,
    /// A raw chunk could not be handed to the port.
    CannotSendBuffer = 10,
    /// Capture could not be switched on.
    CannotStartCapture = 11,
    /// Session is closed. Reserved for non-Rust callers; Rust consumers see
    /// `Retrieval::Closed` instead.
    CameraDestroyed = 12,
    /// Caller-supplied argument or configuration rejected.
    InvalidArgument = 13,
}

impl ErrorCode {
    /// Human-readable message for the code.
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            ErrorCode::Success => "no error",
            ErrorCode::NoMemory => "cannot allocate memory",
            ErrorCode::CannotInitMutex => "cannot init mutex",
            ErrorCode::CannotCreateCamera => "cannot create camera object",
            ErrorCode::CannotSetCamera => "cannot select a target camera",
            ErrorCode::CannotSetCameraConfig => "cannot configure camera",
            ErrorCode::CannotCommitFormat => "cannot commit camera format",
            ErrorCode::CannotEnableCamera => "cannot enable camera",
            ErrorCode::CannotCreatePool => "cannot create a pool of buffers",
            ErrorCode::CannotEnableVideoPort => "cannot enable video port of the camera",
            ErrorCode::CannotSendBuffer => "cannot send buffer to video port",
            ErrorCode::CannotStartCapture => "cannot start capture",
            ErrorCode::CameraDestroyed => "camera has already been destroyed",
            ErrorCode::InvalidArgument => "invalid argument",
        }
    }

    /// Raw numeric value.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_error_names_step() {
        let err = VidcapError::Startup {
            step: StartStep::CommitFormat,
            message: "encoding rejected".into(),
        };
        assert_eq!(err.code(), ErrorCode::CannotCommitFormat);
        let text = err.to_string();
        assert!(text.contains("cannot commit camera format"), "{text}");
        assert!(text.contains("encoding rejected"), "{text}");
    }

    #[test]
    fn test_buffer_error_converts_to_no_memory() {
        let err: VidcapError = BufferError::LimitExceeded {
            requested: 10,
            limit: 5,
        }
        .into();
        assert_eq!(err.code(), ErrorCode::NoMemory);
    }

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(ErrorCode::Success.as_i32(), 0);
        assert_eq!(ErrorCode::CannotStartCapture.as_i32(), 11);
        assert_eq!(ErrorCode::CameraDestroyed.as_i32(), 12);
        assert_eq!(
            ErrorCode::CameraDestroyed.message(),
            "camera has already been destroyed"
        );
    }
}
