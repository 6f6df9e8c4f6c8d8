//! Typed capability, status and set-options bit flags.
//!
//! Bit positions mirror `<linux/watchdog.h>` exactly. Values read from the
//! kernel are converted with `from_bits_retain`, so bits this crate has no
//! name for survive a round trip untouched.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// `WDIOF_*` flags.
    ///
    /// In [`SupportInfo::options`](crate::SupportInfo) a set bit means the
    /// driver *supports* the feature. In the words returned by
    /// `get_status()` and `get_boot_status()` the same bit means the
    /// condition is *asserted* (or caused the last reboot).
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct WatchdogOptions: u32 {
        /// Reset due to CPU overheat.
        const OVERHEAT      = 0x0001;
        /// A fan monitored by the card has failed.
        const FANFAULT      = 0x0002;
        /// External relay 1.
        const EXTERN1       = 0x0004;
        /// External relay 2.
        const EXTERN2       = 0x0008;
        /// Power bad / under-voltage.
        const POWERUNDER    = 0x0010;
        /// The card previously reset the CPU.
        const CARDRESET     = 0x0020;
        /// Power over-voltage.
        const POWEROVER     = 0x0040;
        /// The timeout can be set and read.
        const SETTIMEOUT    = 0x0080;
        /// The driver honours the magic close character.
        const MAGICCLOSE    = 0x0100;
        /// A pretimeout can be set and read.
        const PRETIMEOUT    = 0x0200;
        /// Expiry raises a management alarm instead of a reboot.
        const ALARMONLY     = 0x0400;
        /// The watchdog saw a keep-alive ping since it was last queried.
        const KEEPALIVEPING = 0x8000;
    }
}

bitflags! {
    /// `WDIOS_*` values for `WDIOC_SETOPTIONS`.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct CardOptions: u32 {
        /// Turn the watchdog timer off.
        const DISABLECARD = 0x0001;
        /// Turn the watchdog timer on.
        const ENABLECARD  = 0x0002;
        /// Kernel panic on temperature trip.
        const TEMPPANIC   = 0x0004;
    }
}

/// `WDIOF_UNKNOWN`: unknown flag error.
pub const WDIOF_UNKNOWN: i32 = -1;

/// `WDIOS_UNKNOWN`: unknown status error.
pub const WDIOS_UNKNOWN: i32 = -1;

impl WatchdogOptions {
    /// Interpret a raw word from the kernel, keeping unnamed bits.
    #[must_use]
    pub const fn from_raw(bits: u32) -> Self {
        Self::from_bits_retain(bits)
    }

    /// Bits set in this word that have no named constant.
    #[must_use]
    pub const fn unknown_bits(self) -> u32 {
        self.bits() & !Self::all().bits()
    }

    /// Named flags in this word with their kernel names, in bit order.
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        self.iter_names().map(|(name, _)| name)
    }
}
