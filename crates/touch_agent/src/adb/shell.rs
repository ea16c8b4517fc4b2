//! Persistent `adb shell` process used as the event channel

use futures::future::BoxFuture;
use futures::FutureExt;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, ChildStdin, Command};
use tracing::{debug, info, warn};

use crate::channel::{EventChannel, WriterChannel};
use crate::config::TIMING_CONFIG;
use crate::error::{Result, TouchError};

/// An `adb -s <serial> shell` child whose stdin receives one command per line
pub struct ShellChannel {
    serial: String,
    child: Child,
    stdin: WriterChannel<ChildStdin>,
}

impl ShellChannel {
    /// Spawn the shell. Output is discarded; nothing reads it back.
    pub async fn spawn(adb_path: &str, serial: &str) -> Result<Self> {
        let mut child = Command::new(adb_path)
            .arg("-s")
            .arg(serial)
            .arg("shell")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(TouchError::Io)?;

        let stdin = child.stdin.take().ok_or_else(|| {
            TouchError::ChannelUnavailable("adb shell stdin was not captured".to_string())
        })?;

        info!("Opened adb shell on {}", serial);

        Ok(Self {
            serial: serial.to_string(),
            child,
            stdin: WriterChannel::new(stdin),
        })
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }
}

impl EventChannel for ShellChannel {
    fn send_line<'a>(&'a mut self, line: &'a str) -> BoxFuture<'a, Result<()>> {
        self.stdin.send_line(line)
    }

    fn close(&mut self) -> BoxFuture<'_, Result<()>> {
        async move {
            // EOF on stdin makes the remote shell exit
            if let Err(e) = self.stdin.close().await {
                debug!("Closing adb shell stdin: {}", e);
            }

            let timeout = TIMING_CONFIG.shell.close_timeout;
            match tokio::time::timeout(Duration::from_secs_f64(timeout), self.child.wait()).await {
                Ok(Ok(status)) => {
                    info!("adb shell on {} exited with {}", self.serial, status);
                    Ok(())
                }
                Ok(Err(e)) => Err(TouchError::Io(e)),
                Err(_) => {
                    warn!("adb shell on {} did not exit after {}s, killing", self.serial, timeout);
                    self.child.kill().await.map_err(TouchError::Io)
                }
            }
        }
        .boxed()
    }
}
