//! Integration tests for configuration loading.

use rust_vidcap::config::VidcapConfig;
use rust_vidcap::format::PixelFormat;
use rust_vidcap::hardware::{MockBackend, MockMode};
use rust_vidcap::logging;
use rust_vidcap::session::CaptureSession;
use serial_test::serial;
use std::io::Write;
use std::path::PathBuf;

fn shipped_config() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config/vidcap.toml")
}

#[test]
#[serial]
fn test_shipped_config_is_valid() {
    let config = VidcapConfig::load_from(shipped_config()).unwrap();
    config.validate().unwrap();

    assert_eq!(config.capture.width, 640);
    assert_eq!(config.capture.height, 480);
    assert_eq!(config.capture.format, PixelFormat::Bgr);
    assert_eq!(config.capture.initial_capacity, 921_600);
    assert_eq!(config.mock.mode, MockMode::Realistic);
    assert!(logging::LoggingConfig::from_config(&config).is_ok());
}

#[test]
#[serial]
fn test_config_drives_a_session() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[capture]
width = 320
height = 240
format = "rgb"

[mock]
mode = "instant"
frame_limit = 2
chunk_size = 1000
"#
    )
    .unwrap();

    let config = VidcapConfig::load_from(file.path()).unwrap();
    config.validate().unwrap();

    let backend = MockBackend::from_settings(&config.mock);
    let probe = backend.probe();
    let session = CaptureSession::start(config.capture.clone(), backend).unwrap();
    assert!(probe.wait_finished(std::time::Duration::from_secs(5)));

    // 230_400 bytes in 1000-byte chunks, twice.
    assert_eq!(probe.chunks_delivered(), 2 * 231);
    let frame = session.frames().next().unwrap();
    assert_eq!(frame.format, PixelFormat::Rgb);
    assert_eq!(frame.len(), 230_400);
    session.stop();
}

#[test]
#[serial]
fn test_env_selects_injected_failure() {
    std::env::set_var("VIDCAP_MOCK__FAIL_AT", "start_capture");
    let result = VidcapConfig::load_from(shipped_config());
    std::env::remove_var("VIDCAP_MOCK__FAIL_AT");

    let config = result.unwrap();
    let backend = MockBackend::from_settings(&config.mock);
    let err = CaptureSession::start(config.capture, backend).unwrap_err();
    assert_eq!(err.code(), rust_vidcap::ErrorCode::CannotStartCapture);
}
