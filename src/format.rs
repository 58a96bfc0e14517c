//! Output pixel formats.
//!
//! The format table is static: the hardware layer decides how each format is
//! encoded on the wire (the camera's "RGB" is BGR byte order and vice versa),
//! this crate only carries the caller's choice through to the backend and
//! into frame metadata.

use crate::error::VidcapError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pixel format requested from the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// 24-bit, red first.
    Rgb,
    /// 24-bit, blue first.
    #[default]
    Bgr,
}

/// Every format the crate accepts, in table order.
pub const SUPPORTED_FORMATS: &[PixelFormat] = &[PixelFormat::Rgb, PixelFormat::Bgr];

impl PixelFormat {
    /// Bytes per pixel of the packed format.
    #[must_use]
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb | PixelFormat::Bgr => 3,
        }
    }

    /// Lowercase name used in configuration and frame metadata.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PixelFormat::Rgb => "rgb",
            PixelFormat::Bgr => "bgr",
        }
    }

    /// Color model label attached to captured frames.
    #[must_use]
    pub fn color_model(self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PixelFormat {
    type Err = VidcapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SUPPORTED_FORMATS
            .iter()
            .copied()
            .find(|f| f.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| VidcapError::UnsupportedFormat(s.to_string()))
    }
}
