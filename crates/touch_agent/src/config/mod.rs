//! Configuration module for touch_agent
//!
//! Only timing lives here; the protocol and coordinate tables are handed to
//! the controller explicitly through `ControllerConfig`.

mod timing;

pub use timing::{InputTimingConfig, ShellTimingConfig, TimingConfig, TIMING_CONFIG};
