//! # Rust Vidcap Core Library
//!
//! Delivers a continuous stream of camera frames from an asynchronous
//! hardware producer to any number of polling consumers.
//!
//! The camera hands over frames as raw chunks on its own thread. A
//! [`FrameAssembler`](assembler::FrameAssembler) appends them into a
//! producer-owned buffer and, when a frame ends, swaps it into the
//! [`FrameExchange`](exchange::FrameExchange). Consumers lock the exchange,
//! wait for a frame, size a destination and copy it out. Shutdown wakes every
//! waiter and drains them before any buffer is freed.
//!
//! ```text
//!  camera thread                         consumer threads
//!  ─────────────                         ────────────────
//!  chunk ─> FrameAssembler               reader.lock()
//!           WriteSlot.append               wait_for_frame / frame_size
//!  end   ─> exchange.publish ──swap──>    retrieve_frame(&mut dst)
//!           recycle chunk to port        (guard dropped)
//! ```
//!
//! ## Crate Structure
//!
//! - **`exchange`**: mutex + condition variable around the completed frame,
//!   with the ready/finishing/waiting protocol and the shutdown drain.
//! - **`assembler`**: the producer callback.
//! - **`session`**: start-up, reader handles and ordered teardown.
//! - **`stream`**: the consumer loop as an `Iterator` of owned frames.
//! - **`hardware`**: the backend seam and a thread-driven mock camera.
//! - **`config`** / **`logging`**: figment configuration and tracing setup.
//! - **`error`**, **`limits`**, **`format`**, **`stats`**: shared types.
//!
//! ## Example
//!
//! ```no_run
//! use rust_vidcap::config::CaptureConfig;
//! use rust_vidcap::hardware::MockBackend;
//! use rust_vidcap::session::CaptureSession;
//!
//! # fn main() -> Result<(), rust_vidcap::error::VidcapError> {
//! let session = CaptureSession::start(CaptureConfig::default(), MockBackend::new())?;
//! for frame in session.frames().take(10) {
//!     println!("frame {} ({} bytes)", frame.sequence, frame.len());
//! }
//! let stats = session.stop();
//! println!("{} frames completed", stats.frames_completed);
//! # Ok(())
//! # }
//! ```

pub mod assembler;
pub mod config;
pub mod error;
pub mod exchange;
pub mod format;
pub mod hardware;
pub mod limits;
pub mod logging;
pub mod session;
pub mod stats;
pub mod stream;

pub use error::{AppResult, ErrorCode, VidcapError};
pub use exchange::{FrameExchange, FrameGuard, FrameInfo, FrameStatus, Retrieval, WaitOutcome};
pub use session::{CaptureSession, FrameReader};
pub use stream::{CapturedFrame, FrameStream};
