//! Tests of the Linux backend that need no watchdog hardware.
//!
//! Ordinary files accept `open`, `write` and `close` but answer every
//! watchdog ioctl with `ENOTTY`, which exercises the real syscall paths,
//! including the write fallback of `keep_alive`.

#![cfg(target_os = "linux")]

use watchdogdev::prelude::*;

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[test]
fn test_open_missing_node_is_not_found() {
    let result = WatchdogDevice::open("/nonexistent/watchdog-test-node");
    assert!(matches!(result, Err(WatchdogError::NotFound { .. })));
}

#[test]
fn test_ioctl_on_regular_file_is_not_supported() -> TestResult {
    let file = tempfile::NamedTempFile::new()?;
    let mut watchdog = WatchdogDevice::open(file.path())?;

    assert!(watchdog.as_raw_fd().is_some());
    assert!(matches!(
        watchdog.get_support(),
        Err(WatchdogError::NotSupported { .. })
    ));
    assert!(watchdog.support().is_none());
    assert!(matches!(
        watchdog.get_temperature(),
        Err(WatchdogError::NotSupported { .. })
    ));
    Ok(())
}

#[test]
fn test_keep_alive_falls_back_to_ping_byte() -> TestResult {
    let file = tempfile::NamedTempFile::new()?;
    let mut watchdog = WatchdogDevice::open(file.path())?;

    watchdog.keep_alive()?;
    watchdog.keep_alive()?;
    watchdog.magic_close()?;
    assert_eq!(std::fs::read(file.path())?, [0, 0, b'V']);
    Ok(())
}

#[test]
fn test_get_options_has_no_linux_ioctl() -> TestResult {
    let file = tempfile::NamedTempFile::new()?;
    let mut watchdog = WatchdogDevice::open(file.path())?;
    let err = match watchdog.get_options() {
        Err(err) => err,
        Ok(bits) => return Err(format!("expected NotSupported, got {bits:#x}").into()),
    };
    assert!(err.is_not_supported());
    Ok(())
}

#[test]
fn test_magic_close_writes_v_as_last_byte() -> TestResult {
    let file = tempfile::NamedTempFile::new()?;
    let mut watchdog = WatchdogDevice::open(file.path())?;

    watchdog.write(b"ping")?;
    watchdog.magic_close()?;
    assert!(watchdog.is_closed());
    assert_eq!(watchdog.as_raw_fd(), None);

    let contents = std::fs::read(file.path())?;
    assert_eq!(contents.last(), Some(&b'V'));
    assert_eq!(contents, b"pingV");

    let result = watchdog.keep_alive();
    assert!(matches!(result, Err(WatchdogError::Io { .. })));
    Ok(())
}

#[test]
fn test_close_twice_on_real_descriptor() -> TestResult {
    let file = tempfile::NamedTempFile::new()?;
    let mut watchdog = WatchdogDevice::open(file.path())?;
    watchdog.close();
    watchdog.close();
    assert!(watchdog.is_closed());
    assert!(std::fs::read(file.path())?.is_empty());
    Ok(())
}

#[test]
fn test_directory_open_is_io_error() {
    let result = WatchdogDevice::open("/");
    assert!(matches!(
        result,
        Err(WatchdogError::Io {
            operation: "open",
            ..
        })
    ));
}

/// Drives a real watchdog; run as root on a disposable machine with
/// `WATCHDOGDEV_TEST_DEVICE=/dev/watchdog0 cargo test -- --ignored`.
#[test]
#[ignore = "needs a real watchdog device and root"]
fn test_real_device_roundtrip() -> TestResult {
    let Some(path) = std::env::var_os("WATCHDOGDEV_TEST_DEVICE") else {
        return Ok(());
    };
    let mut watchdog = WatchdogDevice::open(path)?;
    let support = watchdog.get_support()?;
    watchdog.keep_alive()?;

    if support.supports(WatchdogOptions::SETTIMEOUT) {
        let original = watchdog.get_timeout()?;
        let applied = watchdog.set_timeout(original)?;
        assert_eq!(watchdog.get_timeout()?, applied);
    }
    match watchdog.get_time_left() {
        Ok(_) => {}
        Err(err) if err.is_not_supported() => {}
        Err(err) => return Err(err.into()),
    }
    watchdog.magic_close()?;
    Ok(())
}
