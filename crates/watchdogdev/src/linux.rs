//! Linux backend: `/dev/watchdog*` through `open(2)`, `ioctl(2)`,
//! `write(2)` and `close(2)`.

#![expect(
    unsafe_code,
    reason = "watchdog ioctls and close(2) have no safe std wrapper"
)]

use crate::driver::{WatchdogDriver, WatchdogHandle};
use crate::ioctl::{Command, WDIOC_GETSUPPORT, WatchdogInfo};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, IntoRawFd, RawFd};
use std::path::Path;

/// Opens real watchdog character devices.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinuxDriver;

impl WatchdogDriver for LinuxDriver {
    type Handle = LinuxHandle;

    fn open(&self, path: &Path) -> io::Result<LinuxHandle> {
        // std opens with O_CLOEXEC.
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(LinuxHandle { file })
    }
}

/// An open watchdog descriptor.
#[derive(Debug)]
pub struct LinuxHandle {
    file: File,
}

impl LinuxHandle {
    fn ioctl_ptr<T>(&self, request: u32, arg: *mut T) -> io::Result<()> {
        // SAFETY: `request` is one of the watchdog request codes, whose size
        // field matches `T`, and `arg` points to a live, writable `T` owned by
        // the caller for the duration of the call.
        let rc = unsafe { libc::ioctl(self.file.as_raw_fd(), request as _, arg) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

impl WatchdogHandle for LinuxHandle {
    fn get_support(&mut self) -> io::Result<WatchdogInfo> {
        let mut info = WatchdogInfo::default();
        self.ioctl_ptr(WDIOC_GETSUPPORT, &raw mut info)?;
        Ok(info)
    }

    fn ioctl(&mut self, command: Command, value: i32) -> io::Result<i32> {
        let mut arg: libc::c_int = value;
        self.ioctl_ptr(command.request(), &raw mut arg)?;
        Ok(arg)
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.file.write(data)
    }

    fn close(self) -> io::Result<()> {
        let fd = self.file.into_raw_fd();
        // SAFETY: ownership of `fd` was just released by `File`; it is closed
        // exactly once here.
        let rc = unsafe { libc::close(fd) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

impl AsRawFd for LinuxHandle {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

impl AsFd for LinuxHandle {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}
