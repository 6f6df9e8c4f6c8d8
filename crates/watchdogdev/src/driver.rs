//! Driver seam between [`WatchdogDevice`](crate::WatchdogDevice) and the
//! syscalls it issues.
//!
//! A [`WatchdogDriver`] opens device nodes; the [`WatchdogHandle`] it returns
//! owns one descriptor and performs the primitives the watchdog API is built
//! from: ioctl, write and close.
//!
//! [`LinuxDriver`](crate::LinuxDriver) talks to the kernel.
//! [`SoftDriver`](crate::SoftDriver) models a kernel driver in-process for
//! tests and dry runs.

use crate::ioctl::{Command, WatchdogInfo};
use std::io;
use std::path::Path;

/// Opens watchdog device nodes.
pub trait WatchdogDriver {
    /// Handle type produced by [`open`](Self::open).
    type Handle: WatchdogHandle;

    /// Open `path` for reading and writing.
    ///
    /// On a real watchdog a successful open arms the timer.
    ///
    /// # Errors
    ///
    /// Returns the OS error from `open(2)` unchanged; classification into
    /// [`WatchdogError`](crate::WatchdogError) happens in the caller.
    fn open(&self, path: &Path) -> io::Result<Self::Handle>;
}

/// One exclusively owned, open watchdog descriptor.
///
/// Dropping a handle must close it without writing anything.
pub trait WatchdogHandle: core::fmt::Debug {
    /// `WDIOC_GETSUPPORT`.
    ///
    /// # Errors
    ///
    /// Returns the OS error reported by the driver.
    fn get_support(&mut self) -> io::Result<WatchdogInfo>;

    /// Issue an integer-argument ioctl.
    ///
    /// `value` is the argument handed to the driver; the return value is the
    /// `int` as the driver left it after the call.
    ///
    /// # Errors
    ///
    /// Returns the OS error reported by the driver.
    fn ioctl(&mut self, command: Command, value: i32) -> io::Result<i32>;

    /// Read back the last options word.
    ///
    /// The Linux API has no such ioctl, so the default answers `ENOTTY`.
    ///
    /// # Errors
    ///
    /// Returns `ENOTTY` unless the backend can read the word back.
    fn get_options(&mut self) -> io::Result<u32> {
        Err(io::Error::from_raw_os_error(libc::ENOTTY))
    }

    /// Raw `write(2)`.
    ///
    /// # Errors
    ///
    /// Returns the OS error reported by the driver.
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Close the descriptor.
    ///
    /// # Errors
    ///
    /// Returns the error from `close(2)`. The descriptor is released either
    /// way.
    fn close(self) -> io::Result<()>
    where
        Self: Sized;
}
