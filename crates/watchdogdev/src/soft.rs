//! In-process watchdog driver model.
//!
//! `SoftDriver` stands in for the kernel so the control object can be
//! exercised without hardware or root. It follows the watchdog core's rules
//! for the parts the control object depends on:
//!
//! - opening arms the timer and a second open answers `EBUSY`;
//! - every non-empty write pings, and the handle may disarm on close only if
//!   the last byte written was `V` (drivers that do not advertise
//!   `MAGICCLOSE` disarm on any close; `nowayout` never disarms);
//! - optional commands answer `EOPNOTSUPP`/`ENOTTY` when the simulated
//!   hardware lacks them, including `WDIOC_KEEPALIVE` without
//!   `KEEPALIVEPING`;
//! - `WDIOC_SETTIMEOUT` clamps to the configured range, pings, and writes
//!   the applied value back.
//!
//! Every syscall a handle receives is appended to an event log that tests can
//! inspect through [`SoftDevice::events`].

use crate::driver::{WatchdogDriver, WatchdogHandle};
use crate::flags::{CardOptions, WatchdogOptions};
use crate::ioctl::{Command, MAGIC_CLOSE_BYTE, WatchdogInfo};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A syscall observed by a simulated device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoftEvent {
    /// The device node was opened.
    Open,
    /// `WDIOC_GETSUPPORT`.
    GetSupport,
    /// An integer ioctl with the argument it was given.
    Ioctl(Command, i32),
    /// Read-back of the options word.
    GetOptions,
    /// Bytes handed to `write(2)`.
    Write(Vec<u8>),
    /// The handle was closed.
    Close {
        /// Whether the close stopped the timer.
        disarmed: bool,
    },
}

/// Static description of a simulated watchdog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftDeviceConfig {
    /// Reported by `WDIOC_GETSUPPORT`.
    pub identity: String,
    /// Reported by `WDIOC_GETSUPPORT`.
    pub firmware_version: u32,
    /// Capability flags. `SETTIMEOUT` and `PRETIMEOUT` gate the matching
    /// commands.
    pub options: WatchdogOptions,
    /// Timeout in effect right after open, in seconds.
    pub timeout_secs: u32,
    /// Smallest timeout the hardware accepts; lower requests are clamped up.
    pub min_timeout_secs: u32,
    /// Largest timeout the hardware accepts; higher requests are clamped down.
    pub max_timeout_secs: u32,
    /// `WDIOC_GETTEMP` answer, `None` if there is no sensor.
    pub temperature: Option<i32>,
    /// Whether `WDIOC_GETTIMELEFT` is implemented.
    pub time_left: bool,
    /// Live `WDIOC_GETSTATUS` conditions.
    pub status: WatchdogOptions,
    /// `WDIOC_GETBOOTSTATUS` answer.
    pub boot_status: WatchdogOptions,
    /// Once armed the timer cannot be stopped.
    pub nowayout: bool,
    /// Opening requires privileges the caller lacks.
    pub restricted: bool,
}

impl Default for SoftDeviceConfig {
    fn default() -> Self {
        Self {
            identity: "Software Watchdog".to_owned(),
            firmware_version: 0,
            options: WatchdogOptions::SETTIMEOUT
                | WatchdogOptions::MAGICCLOSE
                | WatchdogOptions::KEEPALIVEPING,
            timeout_secs: 60,
            min_timeout_secs: 1,
            max_timeout_secs: 65535,
            temperature: None,
            time_left: true,
            status: WatchdogOptions::empty(),
            boot_status: WatchdogOptions::empty(),
            nowayout: false,
            restricted: false,
        }
    }
}

impl SoftDeviceConfig {
    /// Set the capability flags.
    #[must_use]
    pub fn with_options(mut self, options: WatchdogOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the initial timeout.
    #[must_use]
    pub fn with_timeout(mut self, secs: u32) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set the range the hardware clamps timeouts into.
    #[must_use]
    pub fn with_timeout_range(mut self, min_secs: u32, max_secs: u32) -> Self {
        self.min_timeout_secs = min_secs;
        self.max_timeout_secs = max_secs;
        self
    }

    /// Give the device a temperature sensor.
    #[must_use]
    pub fn with_temperature(mut self, raw: i32) -> Self {
        self.temperature = Some(raw);
        self
    }

    /// Enable or disable `WDIOC_GETTIMELEFT`.
    #[must_use]
    pub fn with_time_left(mut self, supported: bool) -> Self {
        self.time_left = supported;
        self
    }

    /// Set the live status and boot status words.
    #[must_use]
    pub fn with_status(mut self, status: WatchdogOptions, boot_status: WatchdogOptions) -> Self {
        self.status = status;
        self.boot_status = boot_status;
        self
    }

    /// Make the timer impossible to stop once armed.
    #[must_use]
    pub fn with_nowayout(mut self, nowayout: bool) -> Self {
        self.nowayout = nowayout;
        self
    }

    /// Make opening fail with `EACCES`.
    #[must_use]
    pub fn with_restricted(mut self, restricted: bool) -> Self {
        self.restricted = restricted;
        self
    }

    /// Set the identity string.
    #[must_use]
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = identity.into();
        self
    }
}

#[derive(Debug)]
struct SoftState {
    config: SoftDeviceConfig,
    open: bool,
    armed: bool,
    expect_close: bool,
    pinged_since_status: bool,
    last_ping: Instant,
    timeout_secs: u32,
    pretimeout_secs: u32,
    options_word: Option<u32>,
    events: Vec<SoftEvent>,
}

impl SoftState {
    fn new(config: SoftDeviceConfig) -> Self {
        Self {
            timeout_secs: config.timeout_secs,
            config,
            open: false,
            armed: false,
            expect_close: false,
            pinged_since_status: false,
            last_ping: Instant::now(),
            pretimeout_secs: 0,
            options_word: None,
            events: Vec::new(),
        }
    }

    fn ping(&mut self) {
        self.last_ping = Instant::now();
        self.pinged_since_status = true;
    }

    fn start(&mut self) {
        self.armed = true;
        self.ping();
    }

    fn stop(&mut self) -> io::Result<()> {
        if self.armed && self.config.nowayout {
            return Err(errno(libc::EBUSY));
        }
        self.armed = false;
        Ok(())
    }

    fn has(&self, flag: WatchdogOptions) -> bool {
        self.config.options.contains(flag)
    }

    fn time_left_secs(&self) -> u32 {
        let elapsed = self.last_ping.elapsed().as_secs();
        let elapsed = u32::try_from(elapsed).unwrap_or(u32::MAX);
        self.timeout_secs.saturating_sub(elapsed)
    }

    fn fired(&self) -> bool {
        self.armed && self.last_ping.elapsed() >= Duration::from_secs(u64::from(self.timeout_secs))
    }

    fn ioctl(&mut self, command: Command, value: i32) -> io::Result<i32> {
        match command {
            Command::GetStatus => {
                let mut status = self.config.status;
                if self.pinged_since_status && self.has(WatchdogOptions::KEEPALIVEPING) {
                    status |= WatchdogOptions::KEEPALIVEPING;
                }
                self.pinged_since_status = false;
                Ok(as_int(status.bits()))
            }
            Command::GetBootStatus => Ok(as_int(self.config.boot_status.bits())),
            Command::GetTemperature => self.config.temperature.ok_or_else(|| errno(libc::ENOTTY)),
            Command::SetOptions => {
                let word = u32::from_ne_bytes(value.to_ne_bytes());
                let card = CardOptions::from_bits_retain(word);
                if card.contains(CardOptions::DISABLECARD) {
                    self.stop()?;
                }
                if card.contains(CardOptions::ENABLECARD) {
                    self.start();
                }
                self.options_word = Some(word);
                Ok(value)
            }
            Command::KeepAlive => {
                if !self.has(WatchdogOptions::KEEPALIVEPING) {
                    return Err(errno(libc::EOPNOTSUPP));
                }
                self.ping();
                Ok(value)
            }
            Command::SetTimeout => {
                if !self.has(WatchdogOptions::SETTIMEOUT) {
                    return Err(errno(libc::EOPNOTSUPP));
                }
                let requested = u32::try_from(value)
                    .ok()
                    .filter(|&secs| secs > 0)
                    .ok_or_else(|| errno(libc::EINVAL))?;
                let min = self.config.min_timeout_secs.max(1);
                let max = self.config.max_timeout_secs.max(min);
                self.timeout_secs = requested.clamp(min, max);
                if self.pretimeout_secs >= self.timeout_secs {
                    self.pretimeout_secs = 0;
                }
                self.ping();
                Ok(as_int(self.timeout_secs))
            }
            Command::GetTimeout => {
                if self.timeout_secs == 0 {
                    return Err(errno(libc::EOPNOTSUPP));
                }
                Ok(as_int(self.timeout_secs))
            }
            Command::SetPretimeout => {
                if !self.has(WatchdogOptions::PRETIMEOUT) {
                    return Err(errno(libc::EOPNOTSUPP));
                }
                let requested = u32::try_from(value)
                    .ok()
                    .ok_or_else(|| errno(libc::EINVAL))?;
                if requested != 0 && requested >= self.timeout_secs {
                    return Err(errno(libc::EINVAL));
                }
                self.pretimeout_secs = requested;
                Ok(value)
            }
            Command::GetPretimeout => {
                if !self.has(WatchdogOptions::PRETIMEOUT) {
                    return Err(errno(libc::EOPNOTSUPP));
                }
                Ok(as_int(self.pretimeout_secs))
            }
            Command::GetTimeLeft => {
                if !self.config.time_left {
                    return Err(errno(libc::EOPNOTSUPP));
                }
                Ok(as_int(self.time_left_secs()))
            }
        }
    }

    fn release(&mut self) -> bool {
        let allowed = self.expect_close || !self.has(WatchdogOptions::MAGICCLOSE);
        let disarmed = self.armed && allowed && self.stop().is_ok();
        if self.armed && !disarmed {
            tracing::warn!(
                identity = %self.config.identity,
                "soft watchdog closed unexpectedly, timer keeps running"
            );
        }
        self.open = false;
        self.expect_close = false;
        self.events.push(SoftEvent::Close { disarmed });
        disarmed
    }
}

fn errno(code: i32) -> io::Error {
    io::Error::from_raw_os_error(code)
}

fn as_int(value: u32) -> i32 {
    i32::from_ne_bytes(value.to_ne_bytes())
}

/// Shared view of one simulated watchdog.
///
/// Clones observe the same device, so a test can keep one while the
/// [`SoftDriver`] hands handles to the code under test.
#[derive(Debug, Clone)]
pub struct SoftDevice {
    state: Arc<Mutex<SoftState>>,
}

impl Default for SoftDevice {
    fn default() -> Self {
        Self::new(SoftDeviceConfig::default())
    }
}

impl SoftDevice {
    /// Create a device from its description. It starts closed and disarmed.
    #[must_use]
    pub fn new(config: SoftDeviceConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(SoftState::new(config))),
        }
    }

    /// Whether the timer is running.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.state.lock().armed
    }

    /// Whether a handle is currently open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state.lock().open
    }

    /// Whether the timer is armed and its timeout has elapsed since the
    /// last ping.
    #[must_use]
    pub fn has_fired(&self) -> bool {
        self.state.lock().fired()
    }

    /// Timeout currently applied, in seconds.
    #[must_use]
    pub fn timeout_secs(&self) -> u32 {
        self.state.lock().timeout_secs
    }

    /// Pretimeout currently applied, in seconds.
    #[must_use]
    pub fn pretimeout_secs(&self) -> u32 {
        self.state.lock().pretimeout_secs
    }

    /// Last options word accepted by `WDIOC_SETOPTIONS`.
    #[must_use]
    pub fn options_word(&self) -> Option<u32> {
        self.state.lock().options_word
    }

    /// Every syscall observed so far, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<SoftEvent> {
        self.state.lock().events.clone()
    }

    /// Forget the recorded events.
    pub fn clear_events(&self) {
        self.state.lock().events.clear();
    }

    fn open(&self) -> io::Result<SoftHandle> {
        let mut state = self.state.lock();
        if state.config.restricted {
            return Err(errno(libc::EACCES));
        }
        if state.open {
            return Err(errno(libc::EBUSY));
        }
        state.open = true;
        state.expect_close = false;
        state.start();
        state.events.push(SoftEvent::Open);
        Ok(SoftHandle {
            state: Arc::clone(&self.state),
            closed: false,
        })
    }
}

/// Opens simulated devices registered by path.
#[derive(Debug, Clone, Default)]
pub struct SoftDriver {
    devices: HashMap<PathBuf, SoftDevice>,
}

impl SoftDriver {
    /// A driver with no device nodes; every open answers `ENOENT`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `device` under `path`.
    #[must_use]
    pub fn with_device(mut self, path: impl AsRef<Path>, device: &SoftDevice) -> Self {
        self.devices
            .insert(path.as_ref().to_path_buf(), device.clone());
        self
    }

    /// The device registered under `path`.
    #[must_use]
    pub fn device(&self, path: impl AsRef<Path>) -> Option<&SoftDevice> {
        self.devices.get(path.as_ref())
    }
}

impl WatchdogDriver for SoftDriver {
    type Handle = SoftHandle;

    fn open(&self, path: &Path) -> io::Result<SoftHandle> {
        self.devices
            .get(path)
            .ok_or_else(|| errno(libc::ENOENT))?
            .open()
    }
}

/// An open handle on a [`SoftDevice`].
#[derive(Debug)]
pub struct SoftHandle {
    state: Arc<Mutex<SoftState>>,
    closed: bool,
}

impl WatchdogHandle for SoftHandle {
    fn get_support(&mut self) -> io::Result<WatchdogInfo> {
        let mut state = self.state.lock();
        state.events.push(SoftEvent::GetSupport);
        Ok(WatchdogInfo::new(
            state.config.options.bits(),
            state.config.firmware_version,
            &state.config.identity,
        ))
    }

    fn ioctl(&mut self, command: Command, value: i32) -> io::Result<i32> {
        let mut state = self.state.lock();
        state.events.push(SoftEvent::Ioctl(command, value));
        state.ioctl(command, value)
    }

    fn get_options(&mut self) -> io::Result<u32> {
        let mut state = self.state.lock();
        state.events.push(SoftEvent::GetOptions);
        state.options_word.ok_or_else(|| errno(libc::ENODATA))
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        state.events.push(SoftEvent::Write(data.to_vec()));
        if let Some(&last) = data.last() {
            state.expect_close = last == MAGIC_CLOSE_BYTE;
            state.ping();
        }
        Ok(data.len())
    }

    fn close(mut self) -> io::Result<()> {
        self.closed = true;
        self.state.lock().release();
        Ok(())
    }
}

impl Drop for SoftHandle {
    fn drop(&mut self) {
        if !self.closed {
            self.closed = true;
            self.state.lock().release();
        }
    }
}
