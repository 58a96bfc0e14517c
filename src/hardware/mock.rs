//! Simulated camera backend.
//!
//! Models the camera stack's delivery loop on a dedicated thread:
//!
//! - a pool of `chunk_slots` raw chunk headers, split between a free list
//!   and the port's in-flight queue (both `crossbeam_queue::SegQueue`)
//! - the capture thread takes an in-flight header, releases it back to the
//!   free list and invokes the callback with the chunk bytes, exactly as the
//!   camera stack releases a header before the callback recycles one
//! - if the callback never recycles, the in-flight queue runs dry and the
//!   thread stalls (counted as starvation) until capture is switched off
//!
//! # Modes
//!
//! - **Instant**: frames back to back, for unit tests
//! - **Realistic**: frames paced at `fps`
//!
//! # Fault injection
//!
//! Any [`StartStep`] can be made to fail, every Nth frame can end with a
//! transmission failure, and a frame limit makes the stream finite.
//! [`MockProbe`] exposes what happened from the outside.

use super::pattern;
use super::{
    BackendError, CaptureBackend, ChunkCallback, ChunkFlag, ChunkPort, ChunkSlot, StartStep,
    StreamRequest,
};
use crate::config::MockSettings;
use crossbeam_queue::SegQueue;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

static SUBSYSTEM_INITS: AtomicUsize = AtomicUsize::new(0);

/// Frame pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MockMode {
    /// No delays.
    #[default]
    Instant,
    /// One frame every `1 / fps` seconds.
    Realistic,
}

/// What the capture thread delivers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockPayload {
    /// Generated test-pattern frames split into chunks.
    Pattern {
        /// Bytes per chunk.
        chunk_size: usize,
        /// Frame length; `None` derives it from the stream request.
        frame_len: Option<usize>,
    },
    /// Exactly these chunks, once, in order.
    Script(Vec<(Vec<u8>, ChunkFlag)>),
}

impl Default for MockPayload {
    fn default() -> Self {
        MockPayload::Pattern {
            chunk_size: 64 * 1024,
            frame_len: None,
        }
    }
}

/// Hardware resources the mock tracks for ordered teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockResource {
    /// Camera component.
    Camera,
    /// Video output port (holds the callback).
    Port,
    /// Raw chunk pool.
    Pool,
    /// Running capture thread.
    Capture,
}

/// Acquire/release log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockEvent {
    /// Resource acquired.
    Acquired(MockResource),
    /// Resource released.
    Released(MockResource),
}

#[derive(Debug, Default)]
struct ProbeState {
    chunks_delivered: AtomicU64,
    frames_delivered: AtomicU64,
    starved: AtomicU64,
    finished: AtomicBool,
    events: Mutex<Vec<MockEvent>>,
}

/// Observer handle for a [`MockBackend`]. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct MockProbe {
    inner: Arc<ProbeState>,
}

impl MockProbe {
    /// Chunks handed to the callback.
    #[must_use]
    pub fn chunks_delivered(&self) -> u64 {
        self.inner.chunks_delivered.load(Ordering::Acquire)
    }

    /// Frame-ending chunks handed to the callback.
    #[must_use]
    pub fn frames_delivered(&self) -> u64 {
        self.inner.frames_delivered.load(Ordering::Acquire)
    }

    /// Times the capture thread found no in-flight chunk.
    #[must_use]
    pub fn starved(&self) -> u64 {
        self.inner.starved.load(Ordering::Relaxed)
    }

    /// The payload ran out (script consumed or frame limit reached).
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.inner.finished.load(Ordering::Acquire)
    }

    /// The video port is currently enabled.
    #[must_use]
    pub fn port_enabled(&self) -> bool {
        self.inner
            .events
            .lock()
            .iter()
            .rev()
            .find_map(|e| match e {
                MockEvent::Acquired(MockResource::Port) => Some(true),
                MockEvent::Released(MockResource::Port) => Some(false),
                _ => None,
            })
            .unwrap_or(false)
    }

    /// Copy of the acquire/release log.
    #[must_use]
    pub fn events(&self) -> Vec<MockEvent> {
        self.inner.events.lock().clone()
    }

    /// Release entries only, in the order they happened.
    #[must_use]
    pub fn releases(&self) -> Vec<MockResource> {
        self.inner
            .events
            .lock()
            .iter()
            .filter_map(|e| match e {
                MockEvent::Released(r) => Some(*r),
                MockEvent::Acquired(_) => None,
            })
            .collect()
    }

    /// Poll until the payload is exhausted. Returns false on timeout.
    pub fn wait_finished(&self, timeout: Duration) -> bool {
        self.wait_until(timeout, |p| p.is_finished())
    }

    /// Poll until at least `n` frames were delivered. Returns false on timeout.
    pub fn wait_for_frames(&self, n: u64, timeout: Duration) -> bool {
        self.wait_until(timeout, |p| p.frames_delivered() >= n)
    }

    fn wait_until(&self, timeout: Duration, done: impl Fn(&Self) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while !done(self) {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
        true
    }

    fn record(&self, event: MockEvent) {
        self.inner.events.lock().push(event);
    }
}

/// Port side of the chunk pool.
#[derive(Debug, Default)]
struct MockPort {
    enabled: AtomicBool,
    free: SegQueue<ChunkSlot>,
    in_flight: SegQueue<ChunkSlot>,
}

impl MockPort {
    fn clear(&self) {
        while self.free.pop().is_some() {}
        while self.in_flight.pop().is_some() {}
    }
}

impl ChunkPort for MockPort {
    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    fn try_get_free_chunk(&self) -> Option<ChunkSlot> {
        self.free.pop()
    }

    fn send_chunk(&self, slot: ChunkSlot) -> Result<(), BackendError> {
        if !self.is_enabled() {
            self.free.push(slot);
            return Err(BackendError::new(StartStep::SendBuffer, "port is disabled"));
        }
        self.in_flight.push(slot);
        Ok(())
    }
}

/// Where the next chunks come from. Survives capture stop/start.
#[derive(Debug)]
enum ChunkSource {
    Pattern {
        frame_len: usize,
        chunk_size: usize,
        next_frame: u64,
        fail_every: Option<u64>,
        limit: Option<u64>,
    },
    Script {
        chunks: Vec<(Vec<u8>, ChunkFlag)>,
        pos: usize,
    },
}

impl ChunkSource {
    /// Next batch of chunks: one whole frame for patterns, one chunk for
    /// scripts. `None` when exhausted.
    fn next_batch(&mut self) -> Option<Vec<(Vec<u8>, ChunkFlag)>> {
        match self {
            ChunkSource::Pattern {
                frame_len,
                chunk_size,
                next_frame,
                fail_every,
                limit,
            } => {
                if limit.is_some_and(|limit| *next_frame >= limit) {
                    return None;
                }
                let number = *next_frame;
                *next_frame += 1;

                let end_flag = match fail_every {
                    Some(n) if *n > 0 && (number + 1) % *n == 0 => ChunkFlag::TransmissionFailed,
                    _ => ChunkFlag::FrameEnd,
                };

                let frame = pattern::generate_frame(*frame_len, number);
                if frame.is_empty() {
                    return Some(vec![(Vec::new(), end_flag)]);
                }
                let mut chunks: Vec<_> = frame
                    .chunks((*chunk_size).max(1))
                    .map(|c| (c.to_vec(), ChunkFlag::None))
                    .collect();
                if let Some(last) = chunks.last_mut() {
                    last.1 = end_flag;
                }
                Some(chunks)
            }
            ChunkSource::Script { chunks, pos } => {
                let chunk = chunks.get(*pos)?.clone();
                *pos += 1;
                Some(vec![chunk])
            }
        }
    }
}

/// State moved onto the capture thread and handed back on join.
struct Producer {
    callback: ChunkCallback,
    source: ChunkSource,
}

struct Pacing {
    mode: MockMode,
    frame_interval: Duration,
}

/// Thread-driven simulated camera.
pub struct MockBackend {
    mode: MockMode,
    fps: f64,
    payload: MockPayload,
    fail_at: Option<StartStep>,
    transmission_failure_every: Option<u64>,
    frame_limit: Option<u64>,
    chunk_slots: usize,

    probe: MockProbe,
    port: Arc<MockPort>,
    running: Arc<AtomicBool>,

    camera: bool,
    pool: bool,
    producer: Option<Producer>,
    source: Option<ChunkSource>,
    callback: Option<ChunkCallback>,
    worker: Option<JoinHandle<Producer>>,
}

impl std::fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBackend")
            .field("mode", &self.mode)
            .field("fps", &self.fps)
            .field("fail_at", &self.fail_at)
            .field("camera", &self.camera)
            .field("port_enabled", &self.port.is_enabled())
            .field("pool", &self.pool)
            .field("capturing", &self.worker.is_some())
            .finish()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Instant mode, pattern payload, three chunk slots, no faults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            mode: MockMode::Instant,
            fps: 30.0,
            payload: MockPayload::default(),
            fail_at: None,
            transmission_failure_every: None,
            frame_limit: None,
            chunk_slots: crate::limits::DEFAULT_CHUNK_SLOTS,
            probe: MockProbe::default(),
            port: Arc::new(MockPort::default()),
            running: Arc::new(AtomicBool::new(false)),
            camera: false,
            pool: false,
            producer: None,
            source: None,
            callback: None,
            worker: None,
        }
    }

    /// Build from the `[mock]` configuration section.
    #[must_use]
    pub fn from_settings(settings: &MockSettings) -> Self {
        let mut backend = Self::new()
            .with_mode(settings.mode)
            .with_fps(settings.fps)
            .with_chunk_slots(settings.chunk_slots)
            .with_payload(MockPayload::Pattern {
                chunk_size: settings.chunk_size,
                frame_len: None,
            });
        backend.transmission_failure_every = settings.transmission_failure_every;
        backend.frame_limit = settings.frame_limit;
        backend.fail_at = settings.fail_at;
        backend
    }

    /// Set frame pacing.
    #[must_use]
    pub fn with_mode(mut self, mode: MockMode) -> Self {
        self.mode = mode;
        self
    }

    /// Frame rate for [`MockMode::Realistic`].
    #[must_use]
    pub fn with_fps(mut self, fps: f64) -> Self {
        self.fps = fps;
        self
    }

    /// Replace the payload.
    #[must_use]
    pub fn with_payload(mut self, payload: MockPayload) -> Self {
        self.payload = payload;
        self
    }

    /// Deliver exactly these chunks, then finish.
    #[must_use]
    pub fn with_script(self, chunks: Vec<(Vec<u8>, ChunkFlag)>) -> Self {
        self.with_payload(MockPayload::Script(chunks))
    }

    /// Make `step` fail during start-up.
    #[must_use]
    pub fn fail_at(mut self, step: StartStep) -> Self {
        self.fail_at = Some(step);
        self
    }

    /// End every `n`th pattern frame with a transmission failure.
    #[must_use]
    pub fn with_transmission_failure_every(mut self, n: u64) -> Self {
        self.transmission_failure_every = Some(n);
        self
    }

    /// Stop after `n` pattern frames.
    #[must_use]
    pub fn with_frame_limit(mut self, n: u64) -> Self {
        self.frame_limit = Some(n);
        self
    }

    /// Number of raw chunk headers in the pool.
    #[must_use]
    pub fn with_chunk_slots(mut self, n: usize) -> Self {
        self.chunk_slots = n;
        self
    }

    /// Observer handle.
    #[must_use]
    pub fn probe(&self) -> MockProbe {
        self.probe.clone()
    }

    /// How many times the mock subsystem was initialized in this process.
    #[must_use]
    pub fn subsystem_init_count() -> usize {
        SUBSYSTEM_INITS.load(Ordering::SeqCst)
    }

    fn check(&self, step: StartStep) -> Result<(), BackendError> {
        if self.fail_at == Some(step) {
            warn!(%step, "injected start-up failure");
            return Err(BackendError::new(step, "injected failure"));
        }
        Ok(())
    }

    fn stop_capture(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        self.running.store(false, Ordering::Release);
        match worker.join() {
            Ok(producer) => self.producer = Some(producer),
            Err(_) => warn!("mock capture thread panicked"),
        }
        self.probe.record(MockEvent::Released(MockResource::Capture));
        debug!("mock capture stopped");
    }
}

impl CaptureBackend for MockBackend {
    fn initialize_subsystem() {
        SUBSYSTEM_INITS.fetch_add(1, Ordering::SeqCst);
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn create_camera(&mut self, request: &StreamRequest) -> Result<(), BackendError> {
        self.check(StartStep::CreateCamera)?;
        self.camera = true;
        self.probe.record(MockEvent::Acquired(MockResource::Camera));

        self.check(StartStep::SelectCamera)?;
        self.check(StartStep::ConfigureCamera)?;
        self.check(StartStep::CommitFormat)?;
        self.check(StartStep::EnableCamera)?;

        let frame_bytes = request.width as usize
            * request.height as usize
            * request.format.bytes_per_pixel();
        self.source = Some(match &self.payload {
            MockPayload::Pattern {
                chunk_size,
                frame_len,
            } => ChunkSource::Pattern {
                frame_len: frame_len.unwrap_or(frame_bytes),
                chunk_size: *chunk_size,
                next_frame: 0,
                fail_every: self.transmission_failure_every,
                limit: self.frame_limit,
            },
            MockPayload::Script(chunks) => ChunkSource::Script {
                chunks: chunks.clone(),
                pos: 0,
            },
        });

        debug!(
            width = request.width,
            height = request.height,
            format = %request.format,
            camera = request.camera_num,
            "mock camera created"
        );
        Ok(())
    }

    fn enable_port(&mut self, callback: ChunkCallback) -> Result<(), BackendError> {
        self.check(StartStep::EnableVideoPort)?;
        self.callback = Some(callback);
        self.port.enabled.store(true, Ordering::Release);
        self.probe.record(MockEvent::Acquired(MockResource::Port));
        Ok(())
    }

    fn create_pool(&mut self) -> Result<(), BackendError> {
        self.check(StartStep::CreatePool)?;
        self.pool = true;
        self.probe.record(MockEvent::Acquired(MockResource::Pool));

        for i in 0..self.chunk_slots {
            self.check(StartStep::SendBuffer)?;
            self.port.send_chunk(ChunkSlot(i))?;
        }
        debug!(slots = self.chunk_slots, "mock chunk pool created");
        Ok(())
    }

    fn set_capture(&mut self, enabled: bool) -> Result<(), BackendError> {
        if !enabled {
            self.stop_capture();
            return Ok(());
        }
        if self.worker.is_some() {
            return Ok(());
        }
        self.check(StartStep::StartCapture)?;

        let producer = match self.producer.take() {
            Some(p) => p,
            None => {
                let (Some(callback), Some(source)) = (self.callback.take(), self.source.take())
                else {
                    return Err(BackendError::new(
                        StartStep::StartCapture,
                        "camera and port must be set up first",
                    ));
                };
                Producer { callback, source }
            }
        };

        let pacing = Pacing {
            mode: self.mode,
            frame_interval: if self.fps > 0.0 {
                Duration::from_secs_f64(1.0 / self.fps)
            } else {
                Duration::ZERO
            },
        };
        let port = Arc::clone(&self.port);
        let probe = self.probe.clone();
        let running = Arc::clone(&self.running);
        running.store(true, Ordering::Release);

        let handle = thread::Builder::new()
            .name("mock-capture".into())
            .spawn(move || capture_loop(producer, port, probe, running, pacing))
            .map_err(|e| BackendError::new(StartStep::StartCapture, e.to_string()))?;

        self.worker = Some(handle);
        self.probe.record(MockEvent::Acquired(MockResource::Capture));
        info!(mode = ?self.mode, fps = self.fps, "mock capture started");
        Ok(())
    }

    fn release(&mut self) {
        self.stop_capture();

        if std::mem::take(&mut self.pool) {
            self.port.clear();
            self.probe.record(MockEvent::Released(MockResource::Pool));
        }

        if self.port.enabled.swap(false, Ordering::AcqRel) {
            self.probe.record(MockEvent::Released(MockResource::Port));
        }
        // Dropping the callback drops the assembler and its writing buffer.
        self.producer = None;
        self.callback = None;
        if std::mem::take(&mut self.camera) {
            self.source = None;
            self.probe.record(MockEvent::Released(MockResource::Camera));
        }
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.release();
    }
}

fn capture_loop(
    mut producer: Producer,
    port: Arc<MockPort>,
    probe: MockProbe,
    running: Arc<AtomicBool>,
    pacing: Pacing,
) -> Producer {
    let mut next_deadline = Instant::now();

    'outer: while running.load(Ordering::Acquire) {
        let Some(batch) = producer.source.next_batch() else {
            probe.inner.finished.store(true, Ordering::Release);
            debug!("mock payload exhausted");
            break;
        };

        for (chunk, flag) in batch {
            if !deliver(&mut producer, &port, &probe, &running, &chunk, flag) {
                break 'outer;
            }
        }

        if pacing.mode == MockMode::Realistic && !pacing.frame_interval.is_zero() {
            next_deadline += pacing.frame_interval;
            while running.load(Ordering::Acquire) {
                let now = Instant::now();
                if now >= next_deadline {
                    break;
                }
                thread::sleep((next_deadline - now).min(Duration::from_millis(10)));
            }
        }
    }

    producer
}

/// Hand one chunk to the callback. Returns false if capture was switched off
/// while waiting for an in-flight header.
fn deliver(
    producer: &mut Producer,
    port: &MockPort,
    probe: &MockProbe,
    running: &AtomicBool,
    chunk: &[u8],
    flag: ChunkFlag,
) -> bool {
    let slot = loop {
        if let Some(slot) = port.in_flight.pop() {
            break slot;
        }
        if !running.load(Ordering::Acquire) {
            return false;
        }
        probe.inner.starved.fetch_add(1, Ordering::Relaxed);
        thread::sleep(Duration::from_micros(200));
    };

    port.free.push(slot);
    (producer.callback)(chunk, flag, port);

    probe.inner.chunks_delivered.fetch_add(1, Ordering::Release);
    if flag.ends_frame() {
        probe.inner.frames_delivered.fetch_add(1, Ordering::Release);
    }
    trace!(slot = slot.0, len = chunk.len(), ?flag, "mock chunk delivered");
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::PixelFormat;
    use std::sync::mpsc;

    fn request() -> StreamRequest {
        StreamRequest {
            width: 4,
            height: 2,
            format: PixelFormat::Rgb,
            camera_num: 0,
            preview_frames: 3,
        }
    }

    /// Callback that records every chunk and always recycles.
    fn recording_callback(tx: mpsc::Sender<(Vec<u8>, ChunkFlag)>) -> ChunkCallback {
        Box::new(move |chunk: &[u8], flag: ChunkFlag, port: &dyn ChunkPort| {
            let _ = tx.send((chunk.to_vec(), flag));
            if port.is_enabled() {
                if let Some(slot) = port.try_get_free_chunk() {
                    let _ = port.send_chunk(slot);
                }
            }
        })
    }

    fn start(mut backend: MockBackend, tx: mpsc::Sender<(Vec<u8>, ChunkFlag)>) -> MockBackend {
        backend.create_camera(&request()).unwrap();
        backend.enable_port(recording_callback(tx)).unwrap();
        backend.create_pool().unwrap();
        backend.set_capture(true).unwrap();
        backend
    }

    #[test]
    fn test_script_delivered_in_order() {
        let (tx, rx) = mpsc::channel();
        let script = vec![
            (b"ab".to_vec(), ChunkFlag::None),
            (b"cd".to_vec(), ChunkFlag::FrameEnd),
        ];
        let backend = start(MockBackend::new().with_script(script.clone()), tx);
        let probe = backend.probe();

        assert!(probe.wait_finished(Duration::from_secs(5)));
        let received: Vec<_> = rx.try_iter().collect();
        assert_eq!(received, script);
        assert_eq!(probe.frames_delivered(), 1);
    }

    #[test]
    fn test_pattern_frames_are_chunked() {
        let (tx, rx) = mpsc::channel();
        let backend = MockBackend::new()
            .with_payload(MockPayload::Pattern {
                chunk_size: 10,
                frame_len: None,
            })
            .with_frame_limit(2);
        let backend = start(backend, tx);
        assert!(backend.probe().wait_finished(Duration::from_secs(5)));

        let received: Vec<_> = rx.try_iter().collect();
        // 4x2 RGB = 24 bytes = 10 + 10 + 4, twice.
        assert_eq!(received.len(), 6);
        assert_eq!(received[2].1, ChunkFlag::FrameEnd);
        let frame: Vec<u8> = received[..3].iter().flat_map(|c| c.0.clone()).collect();
        assert!(pattern::is_intact_frame(&frame));
        assert_eq!(pattern::frame_number_of(&frame), Some(0));
    }

    #[test]
    fn test_transmission_failure_every_nth() {
        let (tx, rx) = mpsc::channel();
        let backend = MockBackend::new()
            .with_transmission_failure_every(2)
            .with_frame_limit(4);
        let backend = start(backend, tx);
        assert!(backend.probe().wait_finished(Duration::from_secs(5)));

        let flags: Vec<_> = rx.try_iter().map(|(_, f)| f).collect();
        assert_eq!(
            flags,
            vec![
                ChunkFlag::FrameEnd,
                ChunkFlag::TransmissionFailed,
                ChunkFlag::FrameEnd,
                ChunkFlag::TransmissionFailed
            ]
        );
    }

    #[test]
    fn test_release_is_reverse_order_and_idempotent() {
        let (tx, _rx) = mpsc::channel();
        let mut backend = start(MockBackend::new().with_frame_limit(1), tx);
        assert!(backend.probe().port_enabled());
        backend.release();
        backend.release();
        assert!(!backend.probe().port_enabled());

        assert_eq!(
            backend.probe().releases(),
            vec![
                MockResource::Capture,
                MockResource::Pool,
                MockResource::Port,
                MockResource::Camera
            ]
        );
    }

    #[test]
    fn test_injected_failure_releases_partial_state() {
        let mut backend = MockBackend::new().fail_at(StartStep::CommitFormat);
        let err = backend.create_camera(&request()).unwrap_err();
        assert_eq!(err.step, StartStep::CommitFormat);

        backend.release();
        assert_eq!(
            backend.probe().events(),
            vec![
                MockEvent::Acquired(MockResource::Camera),
                MockEvent::Released(MockResource::Camera)
            ]
        );
    }

    #[test]
    fn test_no_recycle_starves() {
        let mut backend = MockBackend::new().with_chunk_slots(1);
        backend.create_camera(&request()).unwrap();
        backend
            .enable_port(Box::new(|_: &[u8], _: ChunkFlag, _: &dyn ChunkPort| {}))
            .unwrap();
        backend.create_pool().unwrap();
        backend.set_capture(true).unwrap();

        let probe = backend.probe();
        assert!(probe.wait_for_frames(1, Duration::from_secs(5)));
        thread::sleep(Duration::from_millis(20));
        assert_eq!(probe.chunks_delivered(), 1);
        assert!(probe.starved() > 0);

        backend.release();
    }

    #[test]
    fn test_send_on_disabled_port_fails() {
        let port = MockPort::default();
        let err = port.send_chunk(ChunkSlot(0)).unwrap_err();
        assert_eq!(err.step, StartStep::SendBuffer);
        assert_eq!(port.try_get_free_chunk(), Some(ChunkSlot(0)));
    }
}
