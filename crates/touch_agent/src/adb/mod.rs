//! ADB (Android Debug Bridge) glue
//!
//! This module provides:
//! - `connection`: device listing, connect/disconnect, online checks
//! - `shell`: the long-lived `adb shell` process used as an event channel

mod connection;
mod shell;

pub use connection::{parse_devices, AdbConnection, ConnectionType, DeviceInfo, DEFAULT_SERIAL};
pub use shell::ShellChannel;
