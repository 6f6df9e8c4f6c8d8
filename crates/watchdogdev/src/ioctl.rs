//! Kernel ABI for the watchdog character device.
//!
//! Request codes and the `watchdog_info` layout come from
//! `include/uapi/linux/watchdog.h`. They are fixed by the kernel and must
//! stay bit-exact.

use static_assertions::const_assert_eq;

/// ioctl type byte shared by every watchdog command.
pub const WATCHDOG_IOCTL_BASE: u8 = b'W';

/// Length of the `identity` field of `struct watchdog_info`.
pub const IDENTITY_LEN: usize = 32;

/// Byte that, written last before close, asks the driver to disarm.
pub const MAGIC_CLOSE_BYTE: u8 = b'V';

/// Byte written to ping a driver that has no `WDIOC_KEEPALIVE`.
pub const PING_BYTE: u8 = 0;

const IOC_NRBITS: u32 = 8;
const IOC_TYPEBITS: u32 = 8;
const IOC_SIZEBITS: u32 = 14;
const IOC_NRSHIFT: u32 = 0;
const IOC_TYPESHIFT: u32 = IOC_NRSHIFT + IOC_NRBITS;
const IOC_SIZESHIFT: u32 = IOC_TYPESHIFT + IOC_TYPEBITS;
const IOC_DIRSHIFT: u32 = IOC_SIZESHIFT + IOC_SIZEBITS;
const IOC_WRITE: u32 = 1;
const IOC_READ: u32 = 2;

const fn ioctl_code(direction: u32, nr: u8, size: usize) -> u32 {
    (direction << IOC_DIRSHIFT)
        | ((WATCHDOG_IOCTL_BASE as u32) << IOC_TYPESHIFT)
        | ((nr as u32) << IOC_NRSHIFT)
        | ((size as u32) << IOC_SIZESHIFT)
}

const fn ior<T>(nr: u8) -> u32 {
    ioctl_code(IOC_READ, nr, size_of::<T>())
}

const fn iowr<T>(nr: u8) -> u32 {
    ioctl_code(IOC_READ | IOC_WRITE, nr, size_of::<T>())
}

/// Raw `struct watchdog_info` as filled in by `WDIOC_GETSUPPORT`.
///
/// | Offset | Size | Field              |
/// |--------|------|--------------------|
/// | 0      | 4    | `options`          |
/// | 4      | 4    | `firmware_version` |
/// | 8      | 32   | `identity`         |
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchdogInfo {
    /// Options the card/driver supports.
    pub options: u32,
    /// Firmware version of the card.
    pub firmware_version: u32,
    /// Identity of the board, NUL-terminated.
    pub identity: [u8; IDENTITY_LEN],
}

const_assert_eq!(size_of::<WatchdogInfo>(), 40);

impl Default for WatchdogInfo {
    fn default() -> Self {
        Self {
            options: 0,
            firmware_version: 0,
            identity: [0u8; IDENTITY_LEN],
        }
    }
}

impl WatchdogInfo {
    /// Build a struct the way a driver would fill it; `identity` is cut to
    /// fit and always left NUL-terminated.
    #[must_use]
    pub fn new(options: u32, firmware_version: u32, identity: &str) -> Self {
        let mut info = Self {
            options,
            firmware_version,
            ..Self::default()
        };
        let bytes = identity.as_bytes();
        let len = bytes.len().min(IDENTITY_LEN - 1);
        for (dst, src) in info.identity.iter_mut().zip(bytes.iter().take(len)) {
            *dst = *src;
        }
        info
    }

    /// Identity decoded up to the first NUL, lossy on invalid UTF-8.
    #[must_use]
    pub fn identity_string(&self) -> String {
        let end = self
            .identity
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(IDENTITY_LEN);
        let bytes = self.identity.get(..end).unwrap_or(&self.identity);
        String::from_utf8_lossy(bytes).into_owned()
    }
}

/// Integer-argument watchdog commands.
///
/// Every command passes a pointer to one `int`. Setters read it, getters
/// fill it, and `SetTimeout` does both: the driver writes back the timeout
/// it actually applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// `WDIOC_GETSTATUS`
    GetStatus,
    /// `WDIOC_GETBOOTSTATUS`
    GetBootStatus,
    /// `WDIOC_GETTEMP`
    GetTemperature,
    /// `WDIOC_SETOPTIONS`
    SetOptions,
    /// `WDIOC_KEEPALIVE`
    KeepAlive,
    /// `WDIOC_SETTIMEOUT`
    SetTimeout,
    /// `WDIOC_GETTIMEOUT`
    GetTimeout,
    /// `WDIOC_SETPRETIMEOUT`
    SetPretimeout,
    /// `WDIOC_GETPRETIMEOUT`
    GetPretimeout,
    /// `WDIOC_GETTIMELEFT`
    GetTimeLeft,
}

/// `WDIOC_GETSUPPORT`
pub const WDIOC_GETSUPPORT: u32 = ior::<WatchdogInfo>(0);
/// `WDIOC_GETSTATUS`
pub const WDIOC_GETSTATUS: u32 = ior::<i32>(1);
/// `WDIOC_GETBOOTSTATUS`
pub const WDIOC_GETBOOTSTATUS: u32 = ior::<i32>(2);
/// `WDIOC_GETTEMP`
pub const WDIOC_GETTEMP: u32 = ior::<i32>(3);
/// `WDIOC_SETOPTIONS`
pub const WDIOC_SETOPTIONS: u32 = ior::<i32>(4);
/// `WDIOC_KEEPALIVE`
pub const WDIOC_KEEPALIVE: u32 = ior::<i32>(5);
/// `WDIOC_SETTIMEOUT`
pub const WDIOC_SETTIMEOUT: u32 = iowr::<i32>(6);
/// `WDIOC_GETTIMEOUT`
pub const WDIOC_GETTIMEOUT: u32 = ior::<i32>(7);
/// `WDIOC_SETPRETIMEOUT`
pub const WDIOC_SETPRETIMEOUT: u32 = iowr::<i32>(8);
/// `WDIOC_GETPRETIMEOUT`
pub const WDIOC_GETPRETIMEOUT: u32 = ior::<i32>(9);
/// `WDIOC_GETTIMELEFT`
pub const WDIOC_GETTIMELEFT: u32 = ior::<i32>(10);

impl Command {
    /// Every integer command, in request-number order.
    pub const ALL: [Self; 10] = [
        Self::GetStatus,
        Self::GetBootStatus,
        Self::GetTemperature,
        Self::SetOptions,
        Self::KeepAlive,
        Self::SetTimeout,
        Self::GetTimeout,
        Self::SetPretimeout,
        Self::GetPretimeout,
        Self::GetTimeLeft,
    ];

    /// The ioctl request code.
    #[must_use]
    pub const fn request(self) -> u32 {
        match self {
            Self::GetStatus => WDIOC_GETSTATUS,
            Self::GetBootStatus => WDIOC_GETBOOTSTATUS,
            Self::GetTemperature => WDIOC_GETTEMP,
            Self::SetOptions => WDIOC_SETOPTIONS,
            Self::KeepAlive => WDIOC_KEEPALIVE,
            Self::SetTimeout => WDIOC_SETTIMEOUT,
            Self::GetTimeout => WDIOC_GETTIMEOUT,
            Self::SetPretimeout => WDIOC_SETPRETIMEOUT,
            Self::GetPretimeout => WDIOC_GETPRETIMEOUT,
            Self::GetTimeLeft => WDIOC_GETTIMELEFT,
        }
    }

    /// Kernel name of the command.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::GetStatus => "WDIOC_GETSTATUS",
            Self::GetBootStatus => "WDIOC_GETBOOTSTATUS",
            Self::GetTemperature => "WDIOC_GETTEMP",
            Self::SetOptions => "WDIOC_SETOPTIONS",
            Self::KeepAlive => "WDIOC_KEEPALIVE",
            Self::SetTimeout => "WDIOC_SETTIMEOUT",
            Self::GetTimeout => "WDIOC_GETTIMEOUT",
            Self::SetPretimeout => "WDIOC_SETPRETIMEOUT",
            Self::GetPretimeout => "WDIOC_GETPRETIMEOUT",
            Self::GetTimeLeft => "WDIOC_GETTIMELEFT",
        }
    }
}

impl core::fmt::Display for Command {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_codes_match_kernel() {
        assert_eq!(WDIOC_GETSUPPORT, 0x8028_5700);
        assert_eq!(WDIOC_GETSTATUS, 0x8004_5701);
        assert_eq!(WDIOC_GETBOOTSTATUS, 0x8004_5702);
        assert_eq!(WDIOC_GETTEMP, 0x8004_5703);
        assert_eq!(WDIOC_SETOPTIONS, 0x8004_5704);
        assert_eq!(WDIOC_KEEPALIVE, 0x8004_5705);
        assert_eq!(WDIOC_SETTIMEOUT, 0xC004_5706);
        assert_eq!(WDIOC_GETTIMEOUT, 0x8004_5707);
        assert_eq!(WDIOC_SETPRETIMEOUT, 0xC004_5708);
        assert_eq!(WDIOC_GETPRETIMEOUT, 0x8004_5709);
        assert_eq!(WDIOC_GETTIMELEFT, 0x8004_570A);
    }

    #[test]
    fn test_command_table_is_ordered_by_request_number() {
        let numbers: Vec<u32> = Command::ALL.iter().map(|c| c.request() & 0xFF).collect();
        assert_eq!(numbers, (1..=10).collect::<Vec<u32>>());
    }

    #[test]
    fn test_identity_stops_at_nul() {
        let info = WatchdogInfo::new(0, 0, "Software Watchdog");
        assert_eq!(info.identity_string(), "Software Watchdog");
    }

    #[test]
    fn test_identity_is_truncated_and_terminated() {
        let long = "x".repeat(64);
        let info = WatchdogInfo::new(0, 0, &long);
        assert_eq!(info.identity_string().len(), IDENTITY_LEN - 1);
        assert_eq!(info.identity.last(), Some(&0));
    }

    #[test]
    fn test_identity_without_terminator_uses_full_field() {
        let info = WatchdogInfo {
            identity: [b'a'; IDENTITY_LEN],
            ..WatchdogInfo::default()
        };
        assert_eq!(info.identity_string(), "a".repeat(IDENTITY_LEN));
    }
}
