//! Error types for watchdog device operations.
//!
//! Every failure is surfaced as a [`WatchdogError`]. Nothing is retried
//! internally: a silent retry could hide a missed ping or a failed disarm.
//!
//! The taxonomy separates "this driver does not implement the command"
//! ([`WatchdogError::NotSupported`]) from every other syscall failure
//! ([`WatchdogError::Io`]), so a caller can drop an optional feature for good
//! instead of looping on it.

use std::io;
use std::path::{Path, PathBuf};

/// Errors that can occur while opening or driving a watchdog device.
#[derive(Debug, thiserror::Error)]
pub enum WatchdogError {
    /// The device node does not exist (or has no driver behind it).
    #[error("watchdog device not found: {}", path.display())]
    NotFound {
        /// Path that was opened.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// Insufficient privilege to open the device node.
    #[error("permission denied opening watchdog device {}", path.display())]
    PermissionDenied {
        /// Path that was opened.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// Another handle holds the device exclusively.
    #[error("watchdog device {} is busy", path.display())]
    DeviceBusy {
        /// Path that was opened.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// The instance already owns an open handle and the reopen policy rejects
    /// replacing it.
    #[error("watchdog device {} is already open on this instance", path.display())]
    AlreadyOpen {
        /// Path of the open handle.
        path: PathBuf,
    },

    /// Invalid configuration.
    #[error("invalid watchdog configuration: {0}")]
    InvalidConfiguration(String),

    /// The command is part of the watchdog API but this driver does not
    /// implement it.
    #[error("{operation} is not supported by this watchdog driver")]
    NotSupported {
        /// Name of the operation that was attempted.
        operation: &'static str,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// Any other syscall-level failure.
    #[error("{operation} failed: {source}")]
    Io {
        /// Name of the operation that was attempted.
        operation: &'static str,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
}

impl WatchdogError {
    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Classify an error returned by `open(2)` on `path`.
    #[must_use]
    pub fn from_open(path: &Path, source: io::Error) -> Self {
        let path = path.to_path_buf();
        match source.raw_os_error() {
            Some(libc::ENOENT | libc::ENODEV | libc::ENXIO) => Self::NotFound { path, source },
            Some(libc::EACCES | libc::EPERM) => Self::PermissionDenied { path, source },
            Some(libc::EBUSY) => Self::DeviceBusy { path, source },
            Some(_) => Self::Io {
                operation: "open",
                source,
            },
            None => match source.kind() {
                io::ErrorKind::NotFound => Self::NotFound { path, source },
                io::ErrorKind::PermissionDenied => Self::PermissionDenied { path, source },
                io::ErrorKind::ResourceBusy => Self::DeviceBusy { path, source },
                _ => Self::Io {
                    operation: "open",
                    source,
                },
            },
        }
    }

    /// Classify an error returned by an ioctl, write or close on an open
    /// handle.
    #[must_use]
    pub fn from_operation(operation: &'static str, source: io::Error) -> Self {
        if is_unsupported_errno(source.raw_os_error()) {
            Self::NotSupported { operation, source }
        } else {
            Self::Io { operation, source }
        }
    }

    /// Error for an operation attempted after the handle was closed.
    #[must_use]
    pub fn closed(operation: &'static str) -> Self {
        Self::Io {
            operation,
            source: io::Error::from_raw_os_error(libc::EBADF),
        }
    }

    /// Whether the driver reported the command as unimplemented.
    #[must_use]
    pub fn is_not_supported(&self) -> bool {
        matches!(self, Self::NotSupported { .. })
    }

    /// The raw OS error code, when the failure came from a syscall.
    #[must_use]
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::NotFound { source, .. }
            | Self::PermissionDenied { source, .. }
            | Self::DeviceBusy { source, .. }
            | Self::NotSupported { source, .. }
            | Self::Io { source, .. } => source.raw_os_error(),
            Self::AlreadyOpen { .. } | Self::InvalidConfiguration(_) => None,
        }
    }
}

/// ENOTTY is what the watchdog core answers for an ioctl the driver has no
/// handler for; EOPNOTSUPP for optional features such as time-left.
fn is_unsupported_errno(errno: Option<i32>) -> bool {
    matches!(
        errno,
        Some(libc::ENOTTY | libc::EOPNOTSUPP | libc::ENOSYS)
    )
}

/// A specialized `Result` type for watchdog operations.
pub type WatchdogResult<T> = Result<T, WatchdogError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn os(errno: i32) -> io::Error {
        io::Error::from_raw_os_error(errno)
    }

    #[test]
    fn test_open_errno_classification() {
        let path = Path::new("/dev/watchdog");
        assert!(matches!(
            WatchdogError::from_open(path, os(libc::ENOENT)),
            WatchdogError::NotFound { .. }
        ));
        assert!(matches!(
            WatchdogError::from_open(path, os(libc::ENODEV)),
            WatchdogError::NotFound { .. }
        ));
        assert!(matches!(
            WatchdogError::from_open(path, os(libc::EACCES)),
            WatchdogError::PermissionDenied { .. }
        ));
        assert!(matches!(
            WatchdogError::from_open(path, os(libc::EPERM)),
            WatchdogError::PermissionDenied { .. }
        ));
        assert!(matches!(
            WatchdogError::from_open(path, os(libc::EBUSY)),
            WatchdogError::DeviceBusy { .. }
        ));
        assert!(matches!(
            WatchdogError::from_open(path, os(libc::EIO)),
            WatchdogError::Io {
                operation: "open",
                ..
            }
        ));
    }

    #[test]
    fn test_operation_errno_classification() {
        assert!(WatchdogError::from_operation("WDIOC_GETTEMP", os(libc::ENOTTY)).is_not_supported());
        assert!(
            WatchdogError::from_operation("WDIOC_GETTIMELEFT", os(libc::EOPNOTSUPP))
                .is_not_supported()
        );
        assert!(!WatchdogError::from_operation("WDIOC_SETTIMEOUT", os(libc::EINVAL))
            .is_not_supported());
        assert!(!WatchdogError::from_operation("WDIOC_KEEPALIVE", os(libc::EIO)).is_not_supported());
    }

    #[test]
    fn test_closed_carries_ebadf() {
        let err = WatchdogError::closed("WDIOC_KEEPALIVE");
        assert!(matches!(err, WatchdogError::Io { .. }));
        assert_eq!(err.raw_os_error(), Some(libc::EBADF));
    }

    #[test]
    fn test_already_open_has_no_errno() {
        let err = WatchdogError::AlreadyOpen {
            path: PathBuf::from("/dev/watchdog0"),
        };
        assert_eq!(err.raw_os_error(), None);
        assert_eq!(
            err.to_string(),
            "watchdog device /dev/watchdog0 is already open on this instance"
        );
    }
}
