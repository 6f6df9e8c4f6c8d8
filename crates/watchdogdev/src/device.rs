//! The watchdog control object.
//!
//! A [`WatchdogDevice`] owns one open watchdog descriptor and exposes every
//! command of the Linux watchdog API as a method.
//!
//! # State Machine
//!
//! ```text
//! [Unopened] ──open()──► [Armed]
//! [Armed] ──keep_alive() / set_timeout() / set_options() / set_pretimeout()──► [Armed]
//! [Armed] ──close()────────► [Closed]            timer state is driver-defined
//! [Armed] ──magic_close()──► [Disarmed, Closed]  driver asked to stop the timer
//! [Armed] ──timeout elapses without a ping──► [Fired]  handled by the kernel
//! ```
//!
//! `Closed` is terminal for the instance's current handle. Every operation on
//! a closed instance fails with [`WatchdogError::Io`] carrying `EBADF`, except
//! `close()` and `magic_close()` which are no-ops.
//!
//! # Threading
//!
//! Every operation takes `&mut self` and issues one blocking syscall. An
//! instance shared between threads must be serialized by the caller (for
//! example behind a mutex); no locking happens here.

use crate::config::{DEFAULT_DEVICE_PATH, ReopenPolicy, WatchdogConfig};
use crate::driver::{WatchdogDriver, WatchdogHandle};
use crate::error::{WatchdogError, WatchdogResult};
use crate::flags::{CardOptions, WatchdogOptions};
use crate::ioctl::{Command, MAGIC_CLOSE_BYTE, PING_BYTE, WatchdogInfo};
use crate::linux::LinuxDriver;
use serde::{Deserialize, Serialize};
use std::io;
use std::os::fd::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

/// Snapshot of `WDIOC_GETSUPPORT`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportInfo {
    /// Capability flags the driver supports.
    pub options: WatchdogOptions,
    /// Driver-defined firmware version.
    pub firmware_version: u32,
    /// Driver or board name.
    pub identity: String,
}

impl SupportInfo {
    /// Whether every flag in `flags` is advertised.
    #[must_use]
    pub fn supports(&self, flags: WatchdogOptions) -> bool {
        self.options.contains(flags)
    }
}

impl From<WatchdogInfo> for SupportInfo {
    fn from(info: WatchdogInfo) -> Self {
        Self {
            options: WatchdogOptions::from_raw(info.options),
            firmware_version: info.firmware_version,
            identity: info.identity_string(),
        }
    }
}

/// One open handle to a watchdog device node.
///
/// Opening arms the timer. From then on the caller must call
/// [`keep_alive`](Self::keep_alive) (or [`write`](Self::write)) more often
/// than the timeout, or the watchdog fires. Use
/// [`magic_close`](Self::magic_close) to stop the timer; dropping the
/// instance performs a plain [`close`](Self::close), which leaves the timer
/// running on most drivers.
#[derive(Debug)]
pub struct WatchdogDevice<D: WatchdogDriver = LinuxDriver> {
    driver: D,
    path: PathBuf,
    reopen: ReopenPolicy,
    handle: Option<D::Handle>,
    support: Option<SupportInfo>,
}

impl WatchdogDevice<LinuxDriver> {
    /// Open a watchdog device node.
    ///
    /// # Errors
    ///
    /// [`WatchdogError::NotFound`], [`WatchdogError::PermissionDenied`],
    /// [`WatchdogError::DeviceBusy`] or [`WatchdogError::Io`].
    pub fn open(path: impl AsRef<Path>) -> WatchdogResult<Self> {
        Self::open_with(LinuxDriver, path)
    }

    /// Open `/dev/watchdog`.
    ///
    /// # Errors
    ///
    /// As [`open`](Self::open).
    pub fn open_default() -> WatchdogResult<Self> {
        Self::open(DEFAULT_DEVICE_PATH)
    }

    /// Open the configured device and apply the configured timeouts.
    ///
    /// # Errors
    ///
    /// As [`open_config_with`](Self::open_config_with).
    pub fn open_config(config: &WatchdogConfig) -> WatchdogResult<Self> {
        Self::open_config_with(LinuxDriver, config)
    }

    /// Raw descriptor of the open handle, `None` once closed.
    #[must_use]
    pub fn as_raw_fd(&self) -> Option<RawFd> {
        self.handle.as_ref().map(AsRawFd::as_raw_fd)
    }
}

impl<D: WatchdogDriver> WatchdogDevice<D> {
    /// Open `path` through `driver`.
    ///
    /// # Errors
    ///
    /// [`WatchdogError::NotFound`], [`WatchdogError::PermissionDenied`],
    /// [`WatchdogError::DeviceBusy`] or [`WatchdogError::Io`].
    pub fn open_with(driver: D, path: impl AsRef<Path>) -> WatchdogResult<Self> {
        let path = path.as_ref().to_path_buf();
        let handle = open_handle(&driver, &path)?;
        Ok(Self {
            driver,
            path,
            reopen: ReopenPolicy::default(),
            handle: Some(handle),
            support: None,
        })
    }

    /// Open the configured device through `driver`, then apply the
    /// configured timeout and pretimeout.
    ///
    /// If applying them fails the freshly armed handle is magic-closed
    /// before the error is returned, since the caller never gets a chance
    /// to ping it.
    ///
    /// # Errors
    ///
    /// [`WatchdogError::InvalidConfiguration`], any open error, or the
    /// error from `set_timeout` / `set_pretimeout`.
    pub fn open_config_with(driver: D, config: &WatchdogConfig) -> WatchdogResult<Self> {
        config.validate()?;
        let mut device = Self::open_with(driver, &config.path)?;
        device.reopen = config.reopen;

        if let Err(err) = device.apply_config(config) {
            warn!(
                path = %device.path.display(),
                error = %err,
                "failed to configure watchdog, disarming"
            );
            if let Err(close_err) = device.magic_close() {
                warn!(error = %close_err, "magic close after failed configuration failed");
            }
            return Err(err);
        }
        Ok(device)
    }

    fn apply_config(&mut self, config: &WatchdogConfig) -> WatchdogResult<()> {
        if let Some(timeout) = config.timeout_secs {
            self.set_timeout(timeout)?;
        }
        if let Some(pretimeout) = config.pretimeout_secs {
            self.set_pretimeout(pretimeout)?;
        }
        Ok(())
    }

    /// Open the device node again.
    ///
    /// On a closed instance this opens a new handle. On an open instance the
    /// [`ReopenPolicy`] decides: `Reject` fails, `Replace` plain-closes the
    /// current handle first. The previous support snapshot is discarded.
    ///
    /// # Errors
    ///
    /// [`WatchdogError::AlreadyOpen`] under `Reject`, or any open error.
    pub fn reopen(&mut self) -> WatchdogResult<()> {
        if self.handle.is_some() {
            match self.reopen {
                ReopenPolicy::Reject => {
                    return Err(WatchdogError::AlreadyOpen {
                        path: self.path.clone(),
                    });
                }
                ReopenPolicy::Replace => self.close(),
            }
        }
        self.support = None;
        self.handle = Some(open_handle(&self.driver, &self.path)?);
        Ok(())
    }

    /// Set the policy used by [`reopen`](Self::reopen).
    pub fn set_reopen_policy(&mut self, policy: ReopenPolicy) {
        self.reopen = policy;
    }

    /// Device node path this instance was opened with.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the handle has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.handle.is_none()
    }

    /// Last snapshot taken by [`get_support`](Self::get_support).
    #[must_use]
    pub fn support(&self) -> Option<&SupportInfo> {
        self.support.as_ref()
    }

    /// Supported options from the last snapshot.
    #[must_use]
    pub fn options(&self) -> Option<WatchdogOptions> {
        self.support.as_ref().map(|s| s.options)
    }

    /// Firmware version from the last snapshot.
    #[must_use]
    pub fn firmware_version(&self) -> Option<u32> {
        self.support.as_ref().map(|s| s.firmware_version)
    }

    /// Identity from the last snapshot.
    #[must_use]
    pub fn identity(&self) -> Option<&str> {
        self.support.as_ref().map(|s| s.identity.as_str())
    }

    fn handle(&mut self, operation: &'static str) -> WatchdogResult<&mut D::Handle> {
        self.handle
            .as_mut()
            .ok_or_else(|| WatchdogError::closed(operation))
    }

    fn ioctl(&mut self, command: Command, value: i32) -> WatchdogResult<i32> {
        self.handle(command.name())?
            .ioctl(command, value)
            .map_err(|e| WatchdogError::from_operation(command.name(), e))
    }

    fn ioctl_secs(&mut self, command: Command, value: i32) -> WatchdogResult<u32> {
        let raw = self.ioctl(command, value)?;
        secs_from_raw(command.name(), raw)
    }

    /// Ping the watchdog, restarting the countdown.
    ///
    /// Uses `WDIOC_KEEPALIVE`. Drivers that do not advertise `KEEPALIVEPING`
    /// answer that ioctl with `EOPNOTSUPP`; they are pinged with a one-byte
    /// write instead, which every watchdog driver accepts. The byte is not
    /// `V`, so a pending magic close is cancelled.
    ///
    /// # Errors
    ///
    /// [`WatchdogError::Io`] if the driver could not be reached.
    pub fn keep_alive(&mut self) -> WatchdogResult<()> {
        match self.ioctl(Command::KeepAlive, 0) {
            Ok(_) => {}
            Err(err) if err.is_not_supported() => {
                trace!(path = %self.path.display(), "no WDIOC_KEEPALIVE, pinging by write");
                let written = self
                    .handle("keep-alive write")?
                    .write(&[PING_BYTE])
                    .map_err(|e| WatchdogError::Io {
                        operation: "keep-alive write",
                        source: e,
                    })?;
                if written != 1 {
                    return Err(WatchdogError::Io {
                        operation: "keep-alive write",
                        source: io::Error::from(io::ErrorKind::WriteZero),
                    });
                }
            }
            Err(err) => return Err(err),
        }
        trace!(path = %self.path.display(), "watchdog keep-alive");
        Ok(())
    }

    /// Query driver identification (`WDIOC_GETSUPPORT`).
    ///
    /// Always re-queries the driver and replaces the stored snapshot.
    ///
    /// # Errors
    ///
    /// [`WatchdogError::NotSupported`] or [`WatchdogError::Io`].
    pub fn get_support(&mut self) -> WatchdogResult<SupportInfo> {
        let info = self
            .handle("WDIOC_GETSUPPORT")?
            .get_support()
            .map_err(|e| WatchdogError::from_operation("WDIOC_GETSUPPORT", e))?;
        let support = SupportInfo::from(info);
        debug!(
            path = %self.path.display(),
            identity = %support.identity,
            options = format_args!("{:#06x}", support.options.bits()),
            firmware_version = support.firmware_version,
            "watchdog support info"
        );
        self.support = Some(support.clone());
        Ok(support)
    }

    /// Conditions currently asserted (`WDIOC_GETSTATUS`).
    ///
    /// # Errors
    ///
    /// [`WatchdogError::NotSupported`] or [`WatchdogError::Io`].
    pub fn get_status(&mut self) -> WatchdogResult<WatchdogOptions> {
        let raw = self.ioctl(Command::GetStatus, 0)?;
        Ok(WatchdogOptions::from_raw(u32::from_ne_bytes(raw.to_ne_bytes())))
    }

    /// Conditions that caused the last reboot (`WDIOC_GETBOOTSTATUS`).
    ///
    /// # Errors
    ///
    /// [`WatchdogError::NotSupported`] or [`WatchdogError::Io`].
    pub fn get_boot_status(&mut self) -> WatchdogResult<WatchdogOptions> {
        let raw = self.ioctl(Command::GetBootStatus, 0)?;
        Ok(WatchdogOptions::from_raw(u32::from_ne_bytes(raw.to_ne_bytes())))
    }

    /// Raw temperature reading (`WDIOC_GETTEMP`), in driver-defined units.
    ///
    /// # Errors
    ///
    /// [`WatchdogError::NotSupported`] when the device has no sensor.
    pub fn get_temperature(&mut self) -> WatchdogResult<i32> {
        self.ioctl(Command::GetTemperature, 0)
    }

    /// Current timeout in seconds (`WDIOC_GETTIMEOUT`).
    ///
    /// # Errors
    ///
    /// [`WatchdogError::NotSupported`] or [`WatchdogError::Io`].
    pub fn get_timeout(&mut self) -> WatchdogResult<u32> {
        self.ioctl_secs(Command::GetTimeout, 0)
    }

    /// Set the timeout (`WDIOC_SETTIMEOUT`) and return the value the driver
    /// actually applied, which may be clamped or rounded.
    ///
    /// `secs` should be positive. Zero is passed to the driver unchanged;
    /// the watchdog core rejects it with `EINVAL`, surfaced as
    /// [`WatchdogError::Io`]. [`WatchdogConfig::validate`] refuses a zero
    /// timeout before anything is opened.
    ///
    /// # Errors
    ///
    /// [`WatchdogError::NotSupported`] if the timeout is fixed, otherwise
    /// [`WatchdogError::Io`] (for example `EINVAL` for an out-of-range value).
    pub fn set_timeout(&mut self, secs: u32) -> WatchdogResult<u32> {
        let value = secs_to_raw("WDIOC_SETTIMEOUT", secs)?;
        let applied = self.ioctl_secs(Command::SetTimeout, value)?;
        if applied == secs {
            debug!(path = %self.path.display(), timeout = applied, "watchdog timeout set");
        } else {
            warn!(
                path = %self.path.display(),
                requested = secs,
                applied,
                "watchdog driver adjusted the requested timeout"
            );
        }
        Ok(applied)
    }

    /// Current pretimeout in seconds (`WDIOC_GETPRETIMEOUT`).
    ///
    /// # Errors
    ///
    /// [`WatchdogError::NotSupported`] when the driver has no pretimeout.
    pub fn get_pretimeout(&mut self) -> WatchdogResult<u32> {
        self.ioctl_secs(Command::GetPretimeout, 0)
    }

    /// Set the pretimeout (`WDIOC_SETPRETIMEOUT`); zero disables it.
    ///
    /// The driver does not write the applied value back, so it is read with
    /// `WDIOC_GETPRETIMEOUT` and returned.
    ///
    /// # Errors
    ///
    /// [`WatchdogError::NotSupported`] when the driver has no pretimeout,
    /// [`WatchdogError::Io`] if the value is rejected.
    pub fn set_pretimeout(&mut self, secs: u32) -> WatchdogResult<u32> {
        let value = secs_to_raw("WDIOC_SETPRETIMEOUT", secs)?;
        self.ioctl(Command::SetPretimeout, value)?;
        let applied = self.get_pretimeout()?;
        debug!(
            path = %self.path.display(),
            requested = secs,
            applied,
            "watchdog pretimeout set"
        );
        Ok(applied)
    }

    /// Seconds before the watchdog fires (`WDIOC_GETTIMELEFT`).
    ///
    /// Many drivers cannot report this; treat
    /// [`WatchdogError::NotSupported`] as a normal outcome.
    ///
    /// # Errors
    ///
    /// [`WatchdogError::NotSupported`] or [`WatchdogError::Io`].
    pub fn get_time_left(&mut self) -> WatchdogResult<u32> {
        self.ioctl_secs(Command::GetTimeLeft, 0)
    }

    /// Transmit a raw options word (`WDIOC_SETOPTIONS`) unchanged.
    ///
    /// # Errors
    ///
    /// [`WatchdogError::NotSupported`] or [`WatchdogError::Io`]; validating
    /// the bits is the driver's job.
    pub fn set_options(&mut self, bits: u32) -> WatchdogResult<()> {
        self.ioctl(Command::SetOptions, i32::from_ne_bytes(bits.to_ne_bytes()))?;
        debug!(
            path = %self.path.display(),
            options = format_args!("{bits:#x}"),
            "watchdog options set"
        );
        Ok(())
    }

    /// Typed form of [`set_options`](Self::set_options).
    ///
    /// # Errors
    ///
    /// As [`set_options`](Self::set_options).
    pub fn set_card_options(&mut self, options: CardOptions) -> WatchdogResult<()> {
        self.set_options(options.bits())
    }

    /// Read back the options word.
    ///
    /// Linux has no ioctl for this, so the Linux backend always answers
    /// [`WatchdogError::NotSupported`]; backends that keep the word return it
    /// exactly as it was set.
    ///
    /// # Errors
    ///
    /// [`WatchdogError::NotSupported`] or [`WatchdogError::Io`].
    pub fn get_options(&mut self) -> WatchdogResult<u32> {
        self.handle("get options")?
            .get_options()
            .map_err(|e| WatchdogError::from_operation("get options", e))
    }

    /// Raw write to the device. Any non-empty write pings the watchdog; a
    /// trailing `V` primes the magic close.
    ///
    /// # Errors
    ///
    /// [`WatchdogError::Io`] on a failed write.
    pub fn write(&mut self, data: &[u8]) -> WatchdogResult<usize> {
        self.handle("write")?
            .write(data)
            .map_err(|e| WatchdogError::from_operation("write", e))
    }

    /// Write the magic character `V` and close the handle immediately, asking
    /// the driver to stop the timer.
    ///
    /// If the write fails the handle stays open (and armed) so the caller can
    /// keep pinging or retry. On an already closed instance this is a no-op.
    /// Drivers built with `nowayout` ignore the request.
    ///
    /// # Errors
    ///
    /// [`WatchdogError::Io`] if the write or the close fails.
    pub fn magic_close(&mut self) -> WatchdogResult<()> {
        let Some(handle) = self.handle.as_mut() else {
            return Ok(());
        };

        if let Some(support) = &self.support
            && !support.supports(WatchdogOptions::MAGICCLOSE)
        {
            warn!(
                path = %self.path.display(),
                identity = %support.identity,
                "driver does not advertise MAGICCLOSE, disarm on close is driver-specific"
            );
        }

        let written = handle
            .write(&[MAGIC_CLOSE_BYTE])
            .map_err(|e| WatchdogError::from_operation("magic close write", e))?;
        if written != 1 {
            return Err(WatchdogError::Io {
                operation: "magic close write",
                source: io::Error::from(io::ErrorKind::WriteZero),
            });
        }

        if let Some(handle) = self.handle.take() {
            handle
                .close()
                .map_err(|e| WatchdogError::from_operation("close", e))?;
        }
        debug!(path = %self.path.display(), "watchdog magic close");
        Ok(())
    }

    /// Close the handle without the magic character.
    ///
    /// The timer usually stays armed afterwards. Calling this on a closed
    /// instance does nothing. Errors from `close(2)` are logged, the
    /// descriptor is released regardless.
    pub fn close(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        warn!(
            path = %self.path.display(),
            "closing watchdog without magic close, timer may stay armed"
        );
        if let Err(err) = handle.close() {
            warn!(path = %self.path.display(), error = %err, "watchdog close failed");
        }
    }
}

impl<D: WatchdogDriver> Drop for WatchdogDevice<D> {
    fn drop(&mut self) {
        self.close();
    }
}

fn open_handle<D: WatchdogDriver>(driver: &D, path: &Path) -> WatchdogResult<D::Handle> {
    let handle = driver
        .open(path)
        .map_err(|e| WatchdogError::from_open(path, e))?;
    debug!(path = %path.display(), "watchdog opened, timer armed");
    Ok(handle)
}

fn secs_to_raw(operation: &'static str, secs: u32) -> WatchdogResult<i32> {
    i32::try_from(secs).ok().ok_or_else(|| WatchdogError::Io {
        operation,
        source: io::Error::from_raw_os_error(libc::EINVAL),
    })
}

fn secs_from_raw(operation: &'static str, raw: i32) -> WatchdogResult<u32> {
    u32::try_from(raw).ok().ok_or_else(|| WatchdogError::Io {
        operation,
        source: io::Error::new(
            io::ErrorKind::InvalidData,
            format!("driver returned negative seconds: {raw}"),
        ),
    })
}
