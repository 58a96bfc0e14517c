//! Configuration using Figment
//!
//! Layers, lowest priority first:
//! 1. Built-in defaults ([`VidcapConfig::default`])
//! 2. A TOML file (`config/vidcap.toml` unless a path is given)
//! 3. Environment variables prefixed with `VIDCAP_`, `__` separating levels
//!
//! # Example
//! ```no_run
//! use rust_vidcap::config::VidcapConfig;
//!
//! // VIDCAP_CAPTURE__FORMAT=rgb overrides capture.format from the file
//! let config = VidcapConfig::load()?;
//! config.validate()?;
//! println!("{}x{}", config.capture.width, config.capture.height);
//! # Ok::<(), rust_vidcap::error::VidcapError>(())
//! ```

use crate::error::{AppResult, VidcapError};
use crate::format::PixelFormat;
use crate::hardware::{MockMode, StartStep};
use crate::limits::{self, DEFAULT_CHUNK_SLOTS, DEFAULT_PREVIEW_FRAMES, MAX_FRAME_BYTES};
use crate::logging::LogFormat;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use vidcap_pool::GrowthPolicy;

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "config/vidcap.toml";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "VIDCAP_";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VidcapConfig {
    /// Application settings
    pub application: ApplicationConfig,
    /// Capture session settings
    pub capture: CaptureConfig,
    /// Simulated camera settings
    pub mock: MockSettings,
}

/// Application-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Application name
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log output format
    pub log_format: LogFormat,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: "vidcap".to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
        }
    }
}

/// Growth strategy of the frame assembly buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Growth {
    /// Grow to exactly the size needed.
    #[default]
    Exact,
    /// At least double on each growth.
    Doubling,
}

impl From<Growth> for GrowthPolicy {
    fn from(g: Growth) -> Self {
        match g {
            Growth::Exact => GrowthPolicy::Exact,
            Growth::Doubling => GrowthPolicy::Doubling,
        }
    }
}

/// Capture session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Output pixel format
    pub format: PixelFormat,
    /// Physical camera index
    pub camera_num: u32,
    /// Frames the camera keeps for preview/video
    pub preview_frames: u32,
    /// Assembly buffer growth strategy
    pub growth: Growth,
    /// Bytes pre-allocated per frame buffer at start (0 = grow on demand)
    pub initial_capacity: usize,
    /// Hard limit on a single frame's size
    pub max_frame_bytes: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            format: PixelFormat::default(),
            camera_num: 0,
            preview_frames: DEFAULT_PREVIEW_FRAMES,
            growth: Growth::default(),
            initial_capacity: 0,
            max_frame_bytes: MAX_FRAME_BYTES,
        }
    }
}

impl CaptureConfig {
    /// Expected bytes per frame for the configured resolution and format.
    pub fn frame_bytes(&self) -> AppResult<usize> {
        limits::validate_frame_size_with_limit(
            self.width,
            self.height,
            self.format.bytes_per_pixel(),
            self.max_frame_bytes,
        )
        .map(|size| size.bytes)
    }

    /// Check resolution, format and limits.
    pub fn validate(&self) -> AppResult<()> {
        limits::validate_resolution(self.width, self.height)?;
        if self.max_frame_bytes == 0 || self.max_frame_bytes > MAX_FRAME_BYTES {
            return Err(VidcapError::Configuration(format!(
                "max_frame_bytes must be 1..={MAX_FRAME_BYTES}, got {}",
                self.max_frame_bytes
            )));
        }
        if self.initial_capacity > self.max_frame_bytes {
            return Err(VidcapError::Configuration(format!(
                "initial_capacity {} exceeds max_frame_bytes {}",
                self.initial_capacity, self.max_frame_bytes
            )));
        }
        self.frame_bytes()?;
        Ok(())
    }
}

/// Simulated camera configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockSettings {
    /// Frame pacing
    pub mode: MockMode,
    /// Frames per second in realistic mode
    pub fps: f64,
    /// Bytes per raw chunk
    pub chunk_size: usize,
    /// Raw chunk headers in the pool
    pub chunk_slots: usize,
    /// End every Nth frame with a transmission failure
    pub transmission_failure_every: Option<u64>,
    /// Stop after this many frames
    pub frame_limit: Option<u64>,
    /// Inject a start-up failure at this step
    pub fail_at: Option<StartStep>,
}

impl Default for MockSettings {
    fn default() -> Self {
        Self {
            mode: MockMode::Realistic,
            fps: 30.0,
            chunk_size: 64 * 1024,
            chunk_slots: DEFAULT_CHUNK_SLOTS,
            transmission_failure_every: None,
            frame_limit: None,
            fail_at: None,
        }
    }
}

impl VidcapConfig {
    /// Load from the default file path and the environment.
    pub fn load() -> AppResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load from a specific file path and the environment.
    ///
    /// A missing file is not an error; defaults and environment still apply.
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        Ok(Self::figment(path.as_ref()).extract()?)
    }

    /// The provider stack used by [`load_from`](Self::load_from).
    #[must_use]
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(VidcapConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> AppResult<()> {
        crate::logging::parse_log_level(&self.application.log_level)?;
        self.capture.validate()?;

        if self.mock.chunk_size == 0 {
            return Err(VidcapError::Configuration(
                "mock.chunk_size must be greater than 0".into(),
            ));
        }
        if self.mock.chunk_slots == 0 {
            return Err(VidcapError::Configuration(
                "mock.chunk_slots must be greater than 0".into(),
            ));
        }
        if !self.mock.fps.is_finite() || self.mock.fps <= 0.0 {
            return Err(VidcapError::Configuration(format!(
                "mock.fps must be a positive number, got {}",
                self.mock.fps
            )));
        }
        if self.mock.transmission_failure_every == Some(0) {
            return Err(VidcapError::Configuration(
                "mock.transmission_failure_every must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> AppResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| VidcapError::Configuration(format!("cannot render config: {e}")))
    }
}
