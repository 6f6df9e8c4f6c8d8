//! Prelude for watchdogdev.
//!
//! This module re-exports the most commonly used types for convenient importing.

pub use crate::config::{ReopenPolicy, WatchdogConfig, WatchdogConfigBuilder};
pub use crate::device::{SupportInfo, WatchdogDevice};
pub use crate::driver::{WatchdogDriver, WatchdogHandle};
pub use crate::error::{WatchdogError, WatchdogResult};
pub use crate::flags::{CardOptions, WatchdogOptions};
pub use crate::linux::LinuxDriver;
pub use crate::soft::{SoftDevice, SoftDeviceConfig, SoftDriver, SoftEvent};
