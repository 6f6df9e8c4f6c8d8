//! # watchdogdev
//!
//! Typed control API for the Linux watchdog device (`/dev/watchdog*`).
//!
//! A [`WatchdogDevice`] owns one open descriptor and maps each method to one
//! command of the kernel watchdog API:
//!
//! | Method | Kernel command |
//! |--------|----------------|
//! | `keep_alive` | `WDIOC_KEEPALIVE`, or a one-byte write if unsupported |
//! | `get_support` | `WDIOC_GETSUPPORT` |
//! | `get_status` / `get_boot_status` | `WDIOC_GETSTATUS` / `WDIOC_GETBOOTSTATUS` |
//! | `get_temperature` | `WDIOC_GETTEMP` |
//! | `get_timeout` / `set_timeout` | `WDIOC_GETTIMEOUT` / `WDIOC_SETTIMEOUT` |
//! | `get_pretimeout` / `set_pretimeout` | `WDIOC_GETPRETIMEOUT` / `WDIOC_SETPRETIMEOUT` |
//! | `get_time_left` | `WDIOC_GETTIMELEFT` |
//! | `set_options` | `WDIOC_SETOPTIONS` |
//! | `magic_close` | `write("V")` then `close` |
//!
//! ## Arming
//!
//! Opening the device arms the timer. Ping it with
//! [`keep_alive`](WatchdogDevice::keep_alive) more often than the timeout.
//! Only [`magic_close`](WatchdogDevice::magic_close) asks the driver to stop
//! the timer; a plain close (or drop) usually leaves it running.
//!
//! ## Optional features
//!
//! Commands the driver does not implement fail with
//! [`WatchdogError::NotSupported`], distinct from
//! [`WatchdogError::Io`]. Nothing is retried internally.
//!
//! ## Example
//!
//! ```rust
//! use watchdogdev::prelude::*;
//!
//! # fn main() -> Result<(), WatchdogError> {
//! // A simulated device; use `WatchdogDevice::open("/dev/watchdog")` for hardware.
//! let device = SoftDevice::new(SoftDeviceConfig::default().with_timeout(60));
//! let driver = SoftDriver::new().with_device("/dev/watchdog", &device);
//!
//! let mut watchdog = WatchdogDevice::open_with(driver, "/dev/watchdog")?;
//! assert_eq!(watchdog.set_timeout(30)?, 30);
//! watchdog.keep_alive()?;
//! watchdog.magic_close()?;
//! assert!(!device.is_armed());
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs, missing_debug_implementations)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;
pub mod device;
pub mod driver;
pub mod error;
pub mod flags;
pub mod ioctl;
pub mod linux;
pub mod prelude;
pub mod soft;

pub use config::{DEFAULT_DEVICE_PATH, ReopenPolicy, WatchdogConfig};
pub use device::{SupportInfo, WatchdogDevice};
pub use driver::{WatchdogDriver, WatchdogHandle};
pub use error::{WatchdogError, WatchdogResult};
pub use flags::{CardOptions, WatchdogOptions};
pub use linux::{LinuxDriver, LinuxHandle};
pub use soft::{SoftDevice, SoftDeviceConfig, SoftDriver, SoftEvent, SoftHandle};
