//! Integration tests for capture session start-up and teardown on the mock
//! backend.

use rust_vidcap::config::CaptureConfig;
use rust_vidcap::error::{ErrorCode, VidcapError};
use rust_vidcap::exchange::{FrameStatus, Retrieval};
use rust_vidcap::format::PixelFormat;
use rust_vidcap::hardware::mock::{MockEvent, MockResource};
use rust_vidcap::hardware::{pattern, ChunkFlag, MockBackend, StartStep};
use rust_vidcap::session::CaptureSession;
use std::time::Duration;

fn config() -> CaptureConfig {
    CaptureConfig {
        width: 320,
        height: 240,
        ..Default::default()
    }
}

fn start_failing_at(step: StartStep) -> (VidcapError, Vec<MockEvent>) {
    let backend = MockBackend::new().fail_at(step);
    let probe = backend.probe();
    let err = CaptureSession::start(config(), backend).unwrap_err();
    (err, probe.events())
}

#[test]
fn test_each_failed_step_is_reported() {
    let steps = [
        (StartStep::CreateCamera, ErrorCode::CannotCreateCamera),
        (StartStep::SelectCamera, ErrorCode::CannotSetCamera),
        (StartStep::ConfigureCamera, ErrorCode::CannotSetCameraConfig),
        (StartStep::CommitFormat, ErrorCode::CannotCommitFormat),
        (StartStep::EnableCamera, ErrorCode::CannotEnableCamera),
        (StartStep::EnableVideoPort, ErrorCode::CannotEnableVideoPort),
        (StartStep::CreatePool, ErrorCode::CannotCreatePool),
        (StartStep::SendBuffer, ErrorCode::CannotSendBuffer),
        (StartStep::StartCapture, ErrorCode::CannotStartCapture),
    ];

    for (step, code) in steps {
        let (err, _) = start_failing_at(step);
        assert!(
            matches!(err, VidcapError::Startup { step: s, .. } if s == step),
            "{step}: {err}"
        );
        assert_eq!(err.code(), code);
    }
}

#[test]
fn test_failure_before_camera_acquires_nothing() {
    let (_, events) = start_failing_at(StartStep::CreateCamera);
    assert!(events.is_empty());
}

#[test]
fn test_failure_at_pool_releases_in_reverse_order() {
    let (_, events) = start_failing_at(StartStep::CreatePool);
    assert_eq!(
        events,
        vec![
            MockEvent::Acquired(MockResource::Camera),
            MockEvent::Acquired(MockResource::Port),
            MockEvent::Released(MockResource::Port),
            MockEvent::Released(MockResource::Camera),
        ]
    );
}

#[test]
fn test_failure_at_start_capture_releases_everything() {
    let (_, events) = start_failing_at(StartStep::StartCapture);
    assert_eq!(
        events,
        vec![
            MockEvent::Acquired(MockResource::Camera),
            MockEvent::Acquired(MockResource::Port),
            MockEvent::Acquired(MockResource::Pool),
            MockEvent::Released(MockResource::Pool),
            MockEvent::Released(MockResource::Port),
            MockEvent::Released(MockResource::Camera),
        ]
    );
}

#[test]
fn test_unsupported_resolution_never_touches_backend() {
    let backend = MockBackend::new();
    let probe = backend.probe();
    let config = CaptureConfig {
        width: 1280,
        height: 720,
        ..Default::default()
    };
    let err = CaptureSession::start(config, backend).unwrap_err();
    assert!(matches!(
        err,
        VidcapError::UnsupportedFrameSize {
            width: 1280,
            height: 720
        }
    ));
    assert!(probe.events().is_empty());
}

#[test]
fn test_stop_tears_down_in_reverse_order() {
    let backend = MockBackend::new().with_frame_limit(2);
    let probe = backend.probe();
    let session = CaptureSession::start(config(), backend).unwrap();
    assert!(probe.wait_finished(Duration::from_secs(5)));
    session.stop();

    assert_eq!(
        probe.releases(),
        vec![
            MockResource::Capture,
            MockResource::Pool,
            MockResource::Port,
            MockResource::Camera
        ]
    );
}

#[test]
fn test_subsystem_initialized_once_across_sessions() {
    for _ in 0..3 {
        let session = CaptureSession::start(config(), MockBackend::new().with_frame_limit(1))
            .unwrap();
        session.stop();
    }
    assert_eq!(MockBackend::subsystem_init_count(), 1);
}

#[test]
fn test_frames_carry_geometry_and_pattern() {
    let backend = MockBackend::new().with_frame_limit(1);
    let probe = backend.probe();
    let session = CaptureSession::start(
        CaptureConfig {
            format: PixelFormat::Rgb,
            ..config()
        },
        backend,
    )
    .unwrap();
    assert!(probe.wait_finished(Duration::from_secs(5)));

    let frame = session.frames().next().unwrap();
    assert_eq!((frame.width, frame.height), (320, 240));
    assert_eq!(frame.format, PixelFormat::Rgb);
    assert_eq!(frame.len(), 320 * 240 * 3);
    assert!(pattern::is_intact_frame(&frame.data));
    session.stop();
}

#[test]
fn test_transmission_failures_are_labelled() {
    let script = vec![
        (vec![1u8; 10], ChunkFlag::None),
        (vec![2u8; 5], ChunkFlag::TransmissionFailed),
    ];
    let backend = MockBackend::new().with_script(script);
    let probe = backend.probe();
    let session = CaptureSession::start(config(), backend).unwrap();
    assert!(probe.wait_finished(Duration::from_secs(5)));

    let mut guard = session.lock();
    let mut dst = Vec::new();
    let result = guard.retrieve_into(&mut dst);
    drop(guard);

    assert!(matches!(
        result,
        Retrieval::Frame(info) if info.len == 15 && info.status == FrameStatus::TransmissionFailed
    ));
    let stats = session.stop();
    assert_eq!(stats.transmission_failures, 1);
}

#[test]
fn test_frame_limit_below_resolution_rejected() {
    let backend = MockBackend::new();
    let probe = backend.probe();
    let session = CaptureSession::start(
        CaptureConfig {
            max_frame_bytes: 1000,
            ..config()
        },
        backend,
    );
    assert!(matches!(session, Err(VidcapError::FrameTooLarge { .. })));
    assert!(probe.events().is_empty());
}

#[test]
fn test_oversized_frame_is_incomplete_not_fatal() {
    let script = vec![
        (vec![1u8; 200_000], ChunkFlag::None),
        (vec![2u8; 200_000], ChunkFlag::None),
        (vec![3u8; 10], ChunkFlag::FrameEnd),
    ];
    let backend = MockBackend::new().with_script(script);
    let probe = backend.probe();
    let session = CaptureSession::start(
        CaptureConfig {
            max_frame_bytes: 320 * 240 * 3,
            ..config()
        },
        backend,
    )
    .unwrap();
    assert!(probe.wait_finished(Duration::from_secs(5)));

    let frame = session.frames().next().unwrap();
    assert_eq!(frame.status, FrameStatus::Incomplete);
    assert_eq!(frame.len(), 200_010);
    assert_eq!(frame.data[0], 1);
    assert_eq!(frame.data[200_000], 3);

    let stats = session.stop();
    assert_eq!(stats.dropped_chunks, 1);
    assert_eq!(stats.frames_completed, 1);
}
