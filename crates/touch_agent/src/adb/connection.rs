//! ADB device discovery and connection management

use std::process::Output;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

use super::shell::ShellChannel;
use crate::config::TIMING_CONFIG;
use crate::error::{Result, TouchError};

/// Default serial of the emulator the original automation targeted
pub const DEFAULT_SERIAL: &str = "127.0.0.1:21503";

/// Type of ADB connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionType {
    Usb,
    Emulator,
    Remote,
}

/// Information about a connected device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub device_id: String,
    pub status: String,
    pub connection_type: ConnectionType,
    pub model: Option<String>,
}

impl DeviceInfo {
    pub fn is_online(&self) -> bool {
        self.status == "device"
    }
}

/// Parse the output of `adb devices -l`
pub fn parse_devices(stdout: &str) -> Vec<DeviceInfo> {
    let mut devices = Vec::new();

    for line in stdout.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("List of devices") || line.starts_with('*') {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 2 {
            continue;
        }

        let device_id = parts[0].to_string();
        let connection_type = if device_id.contains(':') {
            ConnectionType::Remote
        } else if device_id.starts_with("emulator-") {
            ConnectionType::Emulator
        } else {
            ConnectionType::Usb
        };

        let model = parts[2..]
            .iter()
            .find_map(|part| part.strip_prefix("model:"))
            .map(|m| m.to_string());

        devices.push(DeviceInfo {
            device_id,
            status: parts[1].to_string(),
            connection_type,
            model,
        });
    }

    devices
}

/// Manages ADB connections to Android devices
#[derive(Debug, Clone)]
pub struct AdbConnection {
    adb_path: String,
}

impl AdbConnection {
    /// Create a new ADB connection manager
    pub fn new() -> Self {
        Self {
            adb_path: "adb".to_string(),
        }
    }

    /// Create a new ADB connection manager with custom ADB path
    pub fn with_path(adb_path: impl Into<String>) -> Self {
        Self {
            adb_path: adb_path.into(),
        }
    }

    pub fn adb_path(&self) -> &str {
        &self.adb_path
    }

    async fn run(&self, args: &[&str]) -> Result<Output> {
        let timeout = TIMING_CONFIG.shell.command_timeout;
        debug!("Running {} {}", self.adb_path, args.join(" "));

        tokio::time::timeout(
            Duration::from_secs_f64(timeout),
            Command::new(&self.adb_path).args(args).output(),
        )
        .await
        .map_err(|_| {
            TouchError::Timeout(format!("adb {} timed out after {}s", args.join(" "), timeout))
        })?
        .map_err(TouchError::Io)
    }

    /// Connect to a remote device via TCP/IP
    pub async fn connect(&self, address: &str) -> Result<String> {
        let address = if address.contains(':') {
            address.to_string()
        } else {
            format!("{}:5555", address)
        };

        let output = self.run(&["connect", &address]).await?;
        let combined = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );

        let lower = combined.to_lowercase();
        if lower.contains("already connected") {
            Ok(format!("Already connected to {}", address))
        } else if lower.contains("connected to") {
            info!("Connected to {}", address);
            Ok(format!("Connected to {}", address))
        } else {
            Err(TouchError::CommandFailed(combined.trim().to_string()))
        }
    }

    /// Disconnect from a remote device, or from all of them
    pub async fn disconnect(&self, address: Option<&str>) -> Result<String> {
        let mut args = vec!["disconnect"];
        if let Some(addr) = address {
            args.push(addr);
        }

        let output = self.run(&args).await?;
        let combined = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );

        let result = combined.trim();
        Ok(if result.is_empty() {
            "Disconnected".to_string()
        } else {
            result.to_string()
        })
    }

    /// List all known devices
    pub async fn list_devices(&self) -> Result<Vec<DeviceInfo>> {
        let output = self.run(&["devices", "-l"]).await?;
        Ok(parse_devices(&String::from_utf8_lossy(&output.stdout)))
    }

    /// Refuse to continue when the adb server reports an offline device or
    /// the requested one is missing
    pub async fn ensure_online(&self, device_id: &str) -> Result<()> {
        check_online(&self.list_devices().await?, device_id)
    }

    /// Open a persistent `adb -s <serial> shell` to write events into
    pub async fn open_shell(&self, serial: &str) -> Result<ShellChannel> {
        ShellChannel::spawn(&self.adb_path, serial).await
    }
}

impl Default for AdbConnection {
    fn default() -> Self {
        Self::new()
    }
}

fn check_online(devices: &[DeviceInfo], device_id: &str) -> Result<()> {
    if let Some(offline) = devices.iter().find(|d| d.status == "offline") {
        return Err(TouchError::DeviceOffline(offline.device_id.clone()));
    }

    if devices.iter().any(|d| d.device_id == device_id && d.is_online()) {
        Ok(())
    } else {
        Err(TouchError::DeviceNotFound(device_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEVICES: &str = "List of devices attached\n\
        127.0.0.1:21503        device product:SM-G977N model:SM_G977N device:beyond1q transport_id:1\n\
        emulator-5554          offline transport_id:2\n\
        R58M12ABCDE            unauthorized usb:1-1 transport_id:3\n\n";

    #[test]
    fn test_parse_devices() {
        let devices = parse_devices(DEVICES);
        assert_eq!(devices.len(), 3);

        assert_eq!(devices[0].device_id, "127.0.0.1:21503");
        assert_eq!(devices[0].connection_type, ConnectionType::Remote);
        assert_eq!(devices[0].model.as_deref(), Some("SM_G977N"));
        assert!(devices[0].is_online());

        assert_eq!(devices[1].connection_type, ConnectionType::Emulator);
        assert_eq!(devices[1].status, "offline");
        assert_eq!(devices[2].connection_type, ConnectionType::Usb);
        assert!(!devices[2].is_online());
    }

    #[test]
    fn test_parse_devices_skips_daemon_noise() {
        let stdout = "* daemon not running; starting now at tcp:5037\n\
            * daemon started successfully\n\
            List of devices attached\n";
        assert!(parse_devices(stdout).is_empty());
    }

    #[test]
    fn test_check_online() {
        let devices = parse_devices(DEVICES);
        assert!(matches!(
            check_online(&devices, "127.0.0.1:21503"),
            Err(TouchError::DeviceOffline(id)) if id == "emulator-5554"
        ));

        let online: Vec<DeviceInfo> = devices.into_iter().filter(|d| d.status != "offline").collect();
        assert!(check_online(&online, "127.0.0.1:21503").is_ok());
        assert!(matches!(
            check_online(&online, "R58M12ABCDE"),
            Err(TouchError::DeviceNotFound(_))
        ));
    }
}
