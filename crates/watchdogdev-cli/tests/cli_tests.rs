//! Integration tests for the wdctl binary
//!
//! No watchdog hardware is needed: missing paths exercise the open error
//! mapping and ordinary files stand in for a device node that rejects every
//! ioctl but accepts writes, which is enough to observe pings and the magic
//! close.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::error::Error;
use std::fs;
use tempfile::NamedTempFile;

type TestResult = Result<(), Box<dyn Error>>;

const MISSING_DEVICE: &str = "/nonexistent/watchdogdev-cli/watchdog";

fn wdctl() -> Result<Command, Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("wdctl")?;
    cmd.env_remove("WDCTL_DEVICE").env("NO_COLOR", "1");
    Ok(cmd)
}

mod usage {
    use super::*;

    #[test]
    fn help_lists_subcommands() -> TestResult {
        wdctl()?
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("boot-status"))
            .stdout(predicate::str::contains("set-options"))
            .stdout(predicate::str::contains("--leave-armed"));
        Ok(())
    }

    #[test]
    fn set_options_without_a_word_is_a_usage_error() -> TestResult {
        wdctl()?.arg("set-options").assert().code(2);
        Ok(())
    }

    #[test]
    fn completion_does_not_open_the_device() -> TestResult {
        wdctl()?
            .args(["--device", MISSING_DEVICE, "completion", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("wdctl"));
        Ok(())
    }
}

mod open_errors {
    use super::*;

    #[test]
    fn missing_device_exits_with_not_found_code() -> TestResult {
        wdctl()?
            .args(["--device", MISSING_DEVICE, "info"])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("watchdog device not found"));
        Ok(())
    }

    #[test]
    fn device_path_comes_from_environment() -> TestResult {
        wdctl()?
            .env("WDCTL_DEVICE", MISSING_DEVICE)
            .arg("status")
            .assert()
            .code(3)
            .stderr(predicate::str::contains(MISSING_DEVICE));
        Ok(())
    }

    #[test]
    fn json_error_names_the_variant() -> TestResult {
        let output = wdctl()?
            .args(["--json", "--device", MISSING_DEVICE, "ping"])
            .output()?;
        assert_eq!(output.status.code(), Some(3));

        let value: Value = serde_json::from_slice(&output.stdout)?;
        assert_eq!(value.get("success"), Some(&Value::Bool(false)));
        let error = value.get("error").ok_or("missing error object")?;
        assert_eq!(error.get("type"), Some(&Value::from("NotFound")));
        assert_eq!(error.get("errno"), Some(&Value::from(2)));
        Ok(())
    }
}

mod regular_file {
    use super::*;

    #[test]
    fn ioctl_on_non_watchdog_exits_with_not_supported_code() -> TestResult {
        let file = NamedTempFile::new()?;
        wdctl()?
            .arg("--device")
            .arg(file.path())
            .arg("timeout")
            .assert()
            .code(6)
            .stderr(predicate::str::contains("Failed to read timeout"));
        Ok(())
    }

    #[test]
    fn failed_command_still_magic_closes() -> TestResult {
        let file = NamedTempFile::new()?;
        wdctl()?
            .arg("--device")
            .arg(file.path())
            .arg("temp")
            .assert()
            .code(6);
        assert_eq!(fs::read(file.path())?, b"V");
        Ok(())
    }

    #[test]
    fn ping_without_keepalive_ioctl_writes_ping_byte() -> TestResult {
        let file = NamedTempFile::new()?;
        wdctl()?
            .arg("--device")
            .arg(file.path())
            .arg("ping")
            .assert()
            .success()
            .stdout(predicate::str::contains("ping"));
        assert_eq!(fs::read(file.path())?, [0, b'V']);
        Ok(())
    }

    #[test]
    fn leave_armed_skips_magic_close() -> TestResult {
        let file = NamedTempFile::new()?;
        wdctl()?
            .arg("--device")
            .arg(file.path())
            .args(["--leave-armed", "ping"])
            .assert()
            .success();
        assert_eq!(fs::read(file.path())?, [0]);
        Ok(())
    }

    #[test]
    fn disarm_writes_magic_character_once() -> TestResult {
        let file = NamedTempFile::new()?;
        wdctl()?
            .arg("--device")
            .arg(file.path())
            .arg("disarm")
            .assert()
            .success()
            .stdout(predicate::str::contains("disarm"));
        assert_eq!(fs::read(file.path())?, b"V");
        Ok(())
    }

    #[test]
    fn disarm_json_reports_success() -> TestResult {
        let file = NamedTempFile::new()?;
        let output = wdctl()?
            .arg("--json")
            .arg("--device")
            .arg(file.path())
            .arg("disarm")
            .output()?;
        assert!(output.status.success());

        let value: Value = serde_json::from_slice(&output.stdout)?;
        assert_eq!(value.get("success"), Some(&Value::Bool(true)));
        assert_eq!(value.get("action"), Some(&Value::from("disarm")));
        Ok(())
    }
}
