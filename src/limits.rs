//! Shared hard limits to prevent unbounded allocations.
//!
//! This module centralizes:
//! - Frame size limits (bytes and dimensions)
//! - The resolutions the camera path is validated for
//! - Defaults for the raw chunk pool handed to the hardware
//!
//! Using centralized constants keeps the configuration layer, the session
//! start-up path and the mock backend consistent with each other.

use crate::error::VidcapError;

// =============================================================================
// Size Limits
// =============================================================================

/// Maximum allowed frame payload in bytes (default: 64MB).
///
/// Also used as the hard growth limit of the assembly buffers, so a producer
/// that never sends a frame-end cannot grow memory without bound.
pub const MAX_FRAME_BYTES: usize = 64 * 1024 * 1024;

/// Maximum supported width/height for frames.
pub const MAX_FRAME_DIMENSION: u32 = 8_192;

/// Resolutions the camera is validated for.
pub const SUPPORTED_RESOLUTIONS: &[(u32, u32)] = &[(640, 480), (320, 240)];

// =============================================================================
// Hardware defaults
// =============================================================================

/// Default number of raw chunks circulating between hardware and callback.
pub const DEFAULT_CHUNK_SLOTS: usize = 3;

/// Default number of preview/video frames the camera keeps internally.
pub const DEFAULT_PREVIEW_FRAMES: u32 = 3;

/// Validated frame sizing information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSize {
    /// Pixel count.
    pub pixels: usize,
    /// Byte count.
    pub bytes: usize,
}

/// Validate frame dimensions and calculate pixel/byte sizes safely.
pub fn validate_frame_size(
    width: u32,
    height: u32,
    bytes_per_pixel: usize,
) -> Result<FrameSize, VidcapError> {
    validate_frame_size_with_limit(width, height, bytes_per_pixel, MAX_FRAME_BYTES)
}

/// Like [`validate_frame_size`] with a caller-supplied byte limit.
pub fn validate_frame_size_with_limit(
    width: u32,
    height: u32,
    bytes_per_pixel: usize,
    max_bytes: usize,
) -> Result<FrameSize, VidcapError> {
    if width > MAX_FRAME_DIMENSION || height > MAX_FRAME_DIMENSION {
        return Err(VidcapError::FrameDimensionsTooLarge {
            width,
            height,
            max_dimension: MAX_FRAME_DIMENSION,
        });
    }

    let pixels = (width as usize)
        .checked_mul(height as usize)
        .ok_or(VidcapError::SizeOverflow {
            context: "frame pixel count",
        })?;

    let bytes = pixels
        .checked_mul(bytes_per_pixel)
        .ok_or(VidcapError::SizeOverflow {
            context: "frame byte size",
        })?;

    if bytes > max_bytes {
        return Err(VidcapError::FrameTooLarge {
            bytes,
            max_bytes,
        });
    }

    Ok(FrameSize { pixels, bytes })
}

/// Check a resolution against [`SUPPORTED_RESOLUTIONS`].
pub fn validate_resolution(width: u32, height: u32) -> Result<(), VidcapError> {
    if SUPPORTED_RESOLUTIONS.contains(&(width, height)) {
        Ok(())
    } else {
        Err(VidcapError::UnsupportedFrameSize { width, height })
    }
}
