//! Timing configuration for input operations

use lazy_static::lazy_static;
use std::env;

fn env_secs(name: &str, default: f64) -> f64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|v: &f64| v.is_finite() && *v >= 0.0)
        .unwrap_or(default)
}

/// Delays used by taps and drags, in seconds
#[derive(Debug, Clone)]
pub struct InputTimingConfig {
    /// How long a tapped identifier stays down
    pub tap_hold: f64,
    /// Pause after a tap is released
    pub tap_settle: f64,
    /// Pause after a swipe is issued
    pub drag_settle: f64,
}

impl Default for InputTimingConfig {
    fn default() -> Self {
        Self {
            tap_hold: env_secs("TOUCH_AGENT_TAP_HOLD", 0.01),
            tap_settle: env_secs("TOUCH_AGENT_TAP_SETTLE", 0.02),
            drag_settle: env_secs("TOUCH_AGENT_DRAG_SETTLE", 0.02),
        }
    }
}

/// Timing for the adb shell process
#[derive(Debug, Clone)]
pub struct ShellTimingConfig {
    /// Time allowed for `adb shell` to exit after stdin closes
    pub close_timeout: f64,
    /// Time allowed for one-shot adb commands (`devices`, `connect`)
    pub command_timeout: f64,
}

impl Default for ShellTimingConfig {
    fn default() -> Self {
        Self {
            close_timeout: env_secs("TOUCH_AGENT_SHELL_CLOSE_TIMEOUT", 2.0),
            command_timeout: env_secs("TOUCH_AGENT_COMMAND_TIMEOUT", 10.0),
        }
    }
}

/// Master timing configuration
#[derive(Debug, Clone, Default)]
pub struct TimingConfig {
    pub input: InputTimingConfig,
    pub shell: ShellTimingConfig,
}

lazy_static! {
    /// Global timing configuration instance
    pub static ref TIMING_CONFIG: TimingConfig = TimingConfig::default();
}
