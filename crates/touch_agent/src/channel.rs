//! Event channel: the line-oriented, write-only link to the device shell

use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::{Result, TouchError};

/// Ordered, flushed delivery of text lines to the device's shell.
///
/// `send_line` must not return before the line (with its trailing newline)
/// has been flushed, so that lines reach the device in the order they were
/// sent. Once closed, every further write fails with `ChannelUnavailable`.
pub trait EventChannel: Send {
    fn send_line<'a>(&'a mut self, line: &'a str) -> BoxFuture<'a, Result<()>>;

    fn close(&mut self) -> BoxFuture<'_, Result<()>>;
}

impl<C: EventChannel + ?Sized> EventChannel for Box<C> {
    fn send_line<'a>(&'a mut self, line: &'a str) -> BoxFuture<'a, Result<()>> {
        (**self).send_line(line)
    }

    fn close(&mut self) -> BoxFuture<'_, Result<()>> {
        (**self).close()
    }
}

/// Channel over any tokio writer (child stdin, stdout for dry runs, ...)
pub struct WriterChannel<W> {
    writer: Option<W>,
}

impl<W> WriterChannel<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer: Some(writer),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.writer.is_none()
    }
}

impl<W> EventChannel for WriterChannel<W>
where
    W: AsyncWrite + Unpin + Send,
{
    fn send_line<'a>(&'a mut self, line: &'a str) -> BoxFuture<'a, Result<()>> {
        async move {
            let writer = self
                .writer
                .as_mut()
                .ok_or_else(|| TouchError::ChannelUnavailable("channel closed".to_string()))?;

            let mut buf = String::with_capacity(line.len() + 1);
            buf.push_str(line);
            buf.push('\n');

            writer
                .write_all(buf.as_bytes())
                .await
                .map_err(TouchError::channel)?;
            writer.flush().await.map_err(TouchError::channel)?;
            Ok(())
        }
        .boxed()
    }

    fn close(&mut self) -> BoxFuture<'_, Result<()>> {
        async move {
            if let Some(mut writer) = self.writer.take() {
                writer.shutdown().await.map_err(TouchError::channel)?;
            }
            Ok(())
        }
        .boxed()
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    lines: Vec<String>,
    closed: bool,
    close_calls: usize,
    fail_after: Option<usize>,
}

/// In-memory channel that records every line; clones share the same record
#[derive(Debug, Clone, Default)]
pub struct MemoryChannel {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// All lines written so far
    pub fn lines(&self) -> Vec<String> {
        self.state().lines.clone()
    }

    /// Drain the recorded lines
    pub fn take_lines(&self) -> Vec<String> {
        std::mem::take(&mut self.state().lines)
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    /// Number of times `close` was invoked
    pub fn close_calls(&self) -> usize {
        self.state().close_calls
    }

    /// Accept `n` more lines, then fail every write. `None` clears the limit.
    pub fn fail_after(&self, n: Option<usize>) {
        self.state().fail_after = n;
    }
}

impl EventChannel for MemoryChannel {
    fn send_line<'a>(&'a mut self, line: &'a str) -> BoxFuture<'a, Result<()>> {
        let result = {
            let mut state = self.state();
            match state.fail_after {
                _ if state.closed => Err(TouchError::ChannelUnavailable(
                    "channel closed".to_string(),
                )),
                Some(0) => Err(TouchError::ChannelUnavailable("broken pipe".to_string())),
                remaining => {
                    state.fail_after = remaining.map(|n| n - 1);
                    state.lines.push(line.to_string());
                    Ok(())
                }
            }
        };
        futures::future::ready(result).boxed()
    }

    fn close(&mut self) -> BoxFuture<'_, Result<()>> {
        let mut state = self.state();
        state.close_calls += 1;
        state.closed = true;
        futures::future::ready(Ok(())).boxed()
    }
}
