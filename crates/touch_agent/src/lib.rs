//! touch_agent: raw key and multi-touch injection for Android devices
//!
//! Symbolic identifiers (`"left"`, `"a"`, `"bag"`) are turned into
//! `sendevent` lines and written, in order, into a persistent `adb shell`:
//! - `protocol`: input event numbering and the injected protocol table
//! - `layout`: coordinate table binding touch identifiers to screen positions
//! - `channel`: the line-oriented event channel abstraction
//! - `controller`: press state and event sequencing
//! - `adb`: device discovery and the `adb shell` channel
//!
//! # Example
//!
//! ```no_run
//! use touch_agent::{AdbConnection, ControllerConfig, InputController, DEFAULT_SERIAL};
//!
//! #[tokio::main]
//! async fn main() -> touch_agent::Result<()> {
//!     let adb = AdbConnection::new();
//!     adb.ensure_online(DEFAULT_SERIAL).await?;
//!
//!     let shell = adb.open_shell(DEFAULT_SERIAL).await?;
//!     let mut controller = InputController::open(shell, ControllerConfig::default())?;
//!
//!     let result = controller.tap("a", None, None).await;
//!     controller.shutdown().await;
//!     result
//! }
//! ```

// Core modules
pub mod error;

// Configuration module
pub mod config;

// Protocol and layout tables
pub mod layout;
pub mod protocol;

// Event delivery
pub mod adb;
pub mod channel;

// Core functionality
pub mod controller;

// Re-export commonly used types and functions
pub use error::{Result, TouchError};

pub use config::{InputTimingConfig, ShellTimingConfig, TimingConfig, TIMING_CONFIG};

pub use layout::{canonical_identifier, CoordinateTable};
pub use protocol::{
    CodeBook, EventCode, EventType, KeyboardKey, ProtocolTable, RawEvent, EVENT_CODES, EVENT_TYPES,
};

pub use adb::{
    parse_devices, AdbConnection, ConnectionType, DeviceInfo, ShellChannel, DEFAULT_SERIAL,
};
pub use channel::{EventChannel, MemoryChannel, WriterChannel};

pub use controller::{ControllerConfig, InputController, DEFAULT_INPUT_DEVICE};
