//! Configuration for opening a watchdog device.

use crate::error::{WatchdogError, WatchdogResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Device node used when none is configured.
pub const DEFAULT_DEVICE_PATH: &str = "/dev/watchdog";

/// What [`WatchdogDevice::reopen`](crate::WatchdogDevice::reopen) does when
/// the instance still owns an open handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReopenPolicy {
    /// Fail with [`WatchdogError::AlreadyOpen`].
    #[default]
    Reject,
    /// Close the current handle (without the magic character, so the timer
    /// stays armed) and open a fresh one.
    Replace,
}

/// Watchdog device configuration.
///
/// Deserializes with defaults for missing fields, so it can be embedded in a
/// larger configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    /// Device node path.
    pub path: PathBuf,

    /// Behavior of `reopen()` on an open instance.
    pub reopen: ReopenPolicy,

    /// Timeout to apply right after opening, in seconds.
    ///
    /// `None` keeps whatever the driver currently uses.
    pub timeout_secs: Option<u32>,

    /// Pretimeout to apply right after opening, in seconds. Zero disables it.
    pub pretimeout_secs: Option<u32>,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DEVICE_PATH),
            reopen: ReopenPolicy::default(),
            timeout_secs: None,
            pretimeout_secs: None,
        }
    }
}

impl WatchdogConfig {
    /// Configuration for `path` with everything else at its default.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Create a configuration builder.
    #[must_use]
    pub fn builder() -> WatchdogConfigBuilder {
        WatchdogConfigBuilder::default()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is empty, the timeout is zero, or the
    /// pretimeout is not shorter than the timeout.
    pub fn validate(&self) -> WatchdogResult<()> {
        if self.path.as_os_str().is_empty() {
            return Err(WatchdogError::invalid_configuration(
                "device path must not be empty",
            ));
        }
        if self.timeout_secs == Some(0) {
            return Err(WatchdogError::invalid_configuration(
                "timeout_secs must be positive",
            ));
        }
        if let (Some(timeout), Some(pretimeout)) = (self.timeout_secs, self.pretimeout_secs)
            && pretimeout != 0
            && pretimeout >= timeout
        {
            return Err(WatchdogError::invalid_configuration(
                "pretimeout_secs must be shorter than timeout_secs",
            ));
        }
        Ok(())
    }
}

/// Builder for `WatchdogConfig`.
#[derive(Debug, Default)]
pub struct WatchdogConfigBuilder {
    config: WatchdogConfig,
}

impl WatchdogConfigBuilder {
    /// Set the device node path.
    #[must_use]
    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.config.path = path.as_ref().to_path_buf();
        self
    }

    /// Set the reopen policy.
    #[must_use]
    pub fn reopen(mut self, policy: ReopenPolicy) -> Self {
        self.config.reopen = policy;
        self
    }

    /// Set the timeout applied after opening.
    #[must_use]
    pub fn timeout_secs(mut self, secs: u32) -> Self {
        self.config.timeout_secs = Some(secs);
        self
    }

    /// Set the pretimeout applied after opening.
    #[must_use]
    pub fn pretimeout_secs(mut self, secs: u32) -> Self {
        self.config.pretimeout_secs = Some(secs);
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> WatchdogResult<WatchdogConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WatchdogConfig::default();
        assert_eq!(config.path, Path::new("/dev/watchdog"));
        assert_eq!(config.reopen, ReopenPolicy::Reject);
        assert_eq!(config.timeout_secs, None);
        assert_eq!(config.pretimeout_secs, None);
    }

    #[test]
    fn test_config_validation() {
        let config = WatchdogConfig::builder().timeout_secs(0).build();
        assert!(matches!(
            config,
            Err(WatchdogError::InvalidConfiguration(_))
        ));

        let config = WatchdogConfig::builder()
            .timeout_secs(30)
            .pretimeout_secs(30)
            .build();
        assert!(matches!(
            config,
            Err(WatchdogError::InvalidConfiguration(_))
        ));

        let config = WatchdogConfig::builder().path("").build();
        assert!(matches!(
            config,
            Err(WatchdogError::InvalidConfiguration(_))
        ));

        let config = WatchdogConfig::builder()
            .timeout_secs(30)
            .pretimeout_secs(0)
            .build();
        assert!(matches!(config, Ok(_)));
    }

    #[test]
    fn test_config_builder() -> Result<(), WatchdogError> {
        let config = WatchdogConfig::builder()
            .path("/dev/watchdog1")
            .reopen(ReopenPolicy::Replace)
            .timeout_secs(45)
            .pretimeout_secs(10)
            .build()?;
        assert_eq!(config.path, Path::new("/dev/watchdog1"));
        assert_eq!(config.reopen, ReopenPolicy::Replace);
        assert_eq!(config.timeout_secs, Some(45));
        assert_eq!(config.pretimeout_secs, Some(10));
        Ok(())
    }

    #[test]
    fn test_pretimeout_alone_is_not_checked_against_driver_timeout() {
        let config = WatchdogConfig {
            pretimeout_secs: Some(120),
            ..WatchdogConfig::default()
        };
        assert!(matches!(config.validate(), Ok(())));
    }

    #[test]
    fn test_config_from_partial_json() -> Result<(), Box<dyn std::error::Error>> {
        let config: WatchdogConfig =
            serde_json::from_str(r#"{ "path": "/dev/watchdog0", "reopen": "replace", "timeout_secs": 20 }"#)?;
        assert_eq!(config.path, Path::new("/dev/watchdog0"));
        assert_eq!(config.reopen, ReopenPolicy::Replace);
        assert_eq!(config.timeout_secs, Some(20));
        assert_eq!(config.pretimeout_secs, None);
        config.validate()?;
        Ok(())
    }
}
