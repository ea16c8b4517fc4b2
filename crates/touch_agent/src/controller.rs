//! Input controller: press state and raw event sequencing
//!
//! Keyboard-style identifiers become a single key event followed by a
//! `SYN_REPORT`. Touch identifiers are reported with the type-A multi-touch
//! protocol: every change to the set of held touch points re-sends the whole
//! frame, one `ABS_MT_PRESSURE`/`ABS_MT_POSITION_X`/`ABS_MT_POSITION_Y`
//! triple plus `SYN_MT_REPORT` per point, closed by a single `SYN_REPORT`.
//! `BTN_TOUCH` brackets the period during which at least one point is held.
//!
//! ```text
//! press A         BTN_TOUCH 1, [A], SYN_REPORT
//! press S         [A], [S], SYN_REPORT
//! release A       [S], SYN_REPORT
//! release S       BTN_TOUCH 0, SYN_REPORT
//! ```
//!
//! The controller takes `&mut self` for every operation, so callers sharing
//! it between tasks must put it behind a single lock (for example
//! `tokio::sync::Mutex`) covering both the state change and the write.

use futures::future::BoxFuture;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::channel::EventChannel;
use crate::config::TIMING_CONFIG;
use crate::error::{Result, TouchError};
use crate::layout::{canonical_identifier, CoordinateTable};
use crate::protocol::{CodeBook, EventCode, KeyboardKey, ProtocolTable, RawEvent};

/// Input device node of the emulator's multi-touch screen
pub const DEFAULT_INPUT_DEVICE: &str = "/dev/input/event6";

/// Everything the controller needs besides its channel
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub device_path: String,
    pub protocol: ProtocolTable,
    pub layout: CoordinateTable,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            device_path: DEFAULT_INPUT_DEVICE.to_string(),
            protocol: ProtocolTable::default(),
            layout: CoordinateTable::legacy(),
        }
    }
}

impl ControllerConfig {
    /// Create a config for the given touch layout with default protocol codes
    pub fn new(layout: CoordinateTable) -> Self {
        Self {
            layout,
            ..Self::default()
        }
    }

    /// Set the input device node events are written to
    pub fn with_device_path(mut self, device_path: impl Into<String>) -> Self {
        self.device_path = device_path.into();
        self
    }

    /// Replace the protocol code table
    pub fn with_protocol(mut self, protocol: ProtocolTable) -> Self {
        self.protocol = protocol;
        self
    }

    /// Check the whole configuration and resolve the protocol codes
    pub fn validate(&self) -> Result<CodeBook> {
        if self.device_path.trim().is_empty() || self.device_path.contains(char::is_whitespace) {
            return Err(TouchError::InvalidConfig(format!(
                "invalid input device path: {:?}",
                self.device_path
            )));
        }

        let codes = self.protocol.resolve()?;

        for (name, _) in self.layout.iter() {
            if KeyboardKey::from_identifier(name).is_some() {
                return Err(TouchError::InvalidConfig(format!(
                    "touch identifier {} shadows a keyboard key",
                    name
                )));
            }
        }

        Ok(codes)
    }
}

/// What an identifier resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Key(KeyboardKey),
    Touch(String, (i32, i32)),
}

/// Owns press state and the event channel for one device
pub struct InputController<C: EventChannel> {
    channel: C,
    device_path: String,
    codes: CodeBook,
    layout: CoordinateTable,
    down_keys: Vec<KeyboardKey>,
    /// Held touch points in press order, with their coordinates
    down_touches: Vec<(String, (i32, i32))>,
    closed: bool,
}

impl<C: EventChannel> InputController<C> {
    /// Take ownership of an already-open channel. Configuration errors are
    /// reported here rather than on first use.
    pub fn open(channel: C, config: ControllerConfig) -> Result<Self> {
        let codes = config.validate()?;

        info!(
            "Input controller opened on {} with {} touch points",
            config.device_path,
            config.layout.len()
        );

        Ok(Self {
            channel,
            device_path: config.device_path,
            codes,
            layout: config.layout,
            down_keys: Vec::new(),
            down_touches: Vec::new(),
            closed: false,
        })
    }

    /// Open a controller, run `body` with it, and shut it down afterwards
    /// whether or not `body` succeeded.
    ///
    /// ```no_run
    /// use futures::FutureExt;
    /// use touch_agent::{ControllerConfig, InputController, MemoryChannel};
    ///
    /// # async fn run() -> touch_agent::Result<()> {
    /// InputController::with_controller(MemoryChannel::new(), ControllerConfig::default(), |ctrl| {
    ///     async move { ctrl.tap("a", None, None).await }.boxed()
    /// })
    /// .await
    /// # }
    /// ```
    pub async fn with_controller<T, F>(mut channel: C, config: ControllerConfig, body: F) -> Result<T>
    where
        F: for<'a> FnOnce(&'a mut InputController<C>) -> BoxFuture<'a, Result<T>>,
    {
        if let Err(e) = config.validate() {
            if let Err(close_err) = channel.close().await {
                warn!("Failed to close channel after config error: {}", close_err);
            }
            return Err(e);
        }

        let mut controller = Self::open(channel, config)?;
        let result = body(&mut controller).await;
        controller.shutdown().await;
        result
    }

    /// Press an identifier and keep it held
    pub async fn press_down(&mut self, identifier: &str) -> Result<()> {
        self.ensure_open()?;

        match self.resolve(identifier)? {
            Target::Key(key) => {
                if self.down_keys.contains(&key) {
                    return Ok(());
                }
                let events = [
                    self.codes.event(key.code(), 1),
                    self.codes.event(EventCode::SynReport, 0),
                ];
                // Held before the first write, so shutdown still releases it
                // if this future is dropped mid-write.
                self.down_keys.push(key);
                if let Err(e) = self.emit(&events).await {
                    self.down_keys.retain(|k| *k != key);
                    return Err(e);
                }
            }
            Target::Touch(name, xy) => {
                if self.touch_index(&name).is_some() {
                    return Ok(());
                }

                let mut next = self.down_touches.clone();
                next.push((name, xy));

                let mut events = Vec::with_capacity(next.len() * 4 + 2);
                if self.down_touches.is_empty() {
                    events.push(self.codes.event(EventCode::BtnTouch, 1));
                }
                events.extend(self.touch_burst(&next));

                let previous = std::mem::replace(&mut self.down_touches, next);
                if let Err(e) = self.emit(&events).await {
                    self.down_touches = previous;
                    return Err(e);
                }
            }
        }

        Ok(())
    }

    /// Release a held identifier; releasing something not held does nothing
    pub async fn release_up(&mut self, identifier: &str) -> Result<()> {
        self.ensure_open()?;

        match self.resolve(identifier)? {
            Target::Key(key) => {
                let Some(pos) = self.down_keys.iter().position(|k| *k == key) else {
                    return Ok(());
                };
                let events = [
                    self.codes.event(key.code(), 0),
                    self.codes.event(EventCode::SynReport, 0),
                ];
                self.emit(&events).await?;
                self.down_keys.remove(pos);
            }
            Target::Touch(name, _) => {
                let Some(pos) = self.touch_index(&name) else {
                    return Ok(());
                };

                let mut next = self.down_touches.clone();
                next.remove(pos);

                let mut events = self.touch_burst(&next);
                if next.is_empty() {
                    events.push(self.codes.event(EventCode::BtnTouch, 0));
                    events.push(self.codes.event(EventCode::SynReport, 0));
                }

                self.emit(&events).await?;
                self.down_touches = next;
            }
        }

        Ok(())
    }

    /// Press, hold for `hold` seconds, release, then wait `settle` seconds.
    /// Defaults come from `TIMING_CONFIG`.
    pub async fn tap(&mut self, identifier: &str, hold: Option<f64>, settle: Option<f64>) -> Result<()> {
        let hold = hold.unwrap_or(TIMING_CONFIG.input.tap_hold);
        let settle = settle.unwrap_or(TIMING_CONFIG.input.tap_settle);

        self.press_down(identifier).await?;
        sleep_secs(hold).await;
        self.release_up(identifier).await?;
        sleep_secs(settle).await;
        Ok(())
    }

    /// Ask the device's gesture facility for a swipe between two points.
    ///
    /// This goes through `input swipe` rather than raw events and does not
    /// touch the press state.
    pub async fn drag(&mut self, start: (i32, i32), end: (i32, i32), settle: Option<f64>) -> Result<()> {
        self.ensure_open()?;
        let settle = settle.unwrap_or(TIMING_CONFIG.input.drag_settle);

        let line = format!("input swipe {} {} {} {}", start.0, start.1, end.0, end.1);
        debug!("-> {}", line);
        self.channel.send_line(&line).await?;

        sleep_secs(settle).await;
        Ok(())
    }

    /// Swipe between two touch identifiers of the layout
    pub async fn drag_between(&mut self, from: &str, to: &str, settle: Option<f64>) -> Result<()> {
        let start = self.coordinates(from)?;
        let end = self.coordinates(to)?;
        self.drag(start, end, settle).await
    }

    /// Release every held key and touch point through the normal paths
    pub async fn release_all(&mut self) -> Result<()> {
        let keys: Vec<KeyboardKey> = self.down_keys.clone();
        for key in keys {
            self.release_up(key.name()).await?;
        }

        let touches: Vec<String> = self.down_touches.iter().map(|(n, _)| n.clone()).collect();
        for name in touches {
            self.release_up(&name).await?;
        }
        Ok(())
    }

    /// Release everything and close the channel.
    ///
    /// Runs at most once; later calls return immediately. Never fails: write
    /// and close errors are logged and dropped.
    pub async fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        for key in std::mem::take(&mut self.down_keys) {
            let events = [
                self.codes.event(key.code(), 0),
                self.codes.event(EventCode::SynReport, 0),
            ];
            if let Err(e) = self.emit(&events).await {
                warn!("Failed to release {} during shutdown: {}", key, e);
            }
        }

        self.down_touches.clear();
        let events = [
            self.codes.event(EventCode::BtnTouch, 0),
            self.codes.event(EventCode::SynReport, 0),
        ];
        if let Err(e) = self.emit(&events).await {
            warn!("Failed to end touch contact during shutdown: {}", e);
        }
        if let Err(e) = self.channel.close().await {
            warn!("Failed to close event channel: {}", e);
        }

        info!("Input controller shut down");
    }

    /// Keyboard keys currently held, in press order
    pub fn down_keys(&self) -> &[KeyboardKey] {
        &self.down_keys
    }

    /// Touch identifiers currently held, in press order
    pub fn down_touches(&self) -> impl Iterator<Item = &str> {
        self.down_touches.iter().map(|(name, _)| name.as_str())
    }

    pub fn is_down(&self, identifier: &str) -> bool {
        let name = canonical_identifier(identifier);
        match KeyboardKey::from_identifier(&name) {
            Some(key) => self.down_keys.contains(&key),
            None => self.touch_index(&name).is_some(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn layout(&self) -> &CoordinateTable {
        &self.layout
    }

    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(TouchError::ChannelUnavailable(
                "controller already shut down".to_string(),
            ));
        }
        Ok(())
    }

    fn resolve(&self, identifier: &str) -> Result<Target> {
        let name = canonical_identifier(identifier);
        if let Some(key) = KeyboardKey::from_identifier(&name) {
            return Ok(Target::Key(key));
        }
        match self.layout.get(&name) {
            Some(xy) => Ok(Target::Touch(name, xy)),
            None => Err(TouchError::UnmappedIdentifier(name)),
        }
    }

    fn coordinates(&self, identifier: &str) -> Result<(i32, i32)> {
        let name = canonical_identifier(identifier);
        self.layout
            .get(&name)
            .ok_or(TouchError::UnmappedIdentifier(name))
    }

    fn touch_index(&self, name: &str) -> Option<usize> {
        self.down_touches.iter().position(|(n, _)| n == name)
    }

    /// Full multi-touch frame for `touches`; empty when nothing is held
    fn touch_burst(&self, touches: &[(String, (i32, i32))]) -> Vec<RawEvent> {
        let mut events = Vec::with_capacity(touches.len() * 4 + 1);
        for (_, (x, y)) in touches {
            events.push(self.codes.event(EventCode::AbsMtPressure, 1));
            events.push(self.codes.event(EventCode::AbsMtPositionX, *x));
            events.push(self.codes.event(EventCode::AbsMtPositionY, *y));
            events.push(self.codes.event(EventCode::SynMtReport, 0));
        }
        if !touches.is_empty() {
            events.push(self.codes.event(EventCode::SynReport, 0));
        }
        events
    }

    async fn emit(&mut self, events: &[RawEvent]) -> Result<()> {
        for event in events {
            let line = event.to_command(&self.device_path);
            debug!("-> {}", line);
            self.channel.send_line(&line).await?;
        }
        Ok(())
    }
}

impl<C: EventChannel> Drop for InputController<C> {
    fn drop(&mut self) {
        if !self.closed {
            warn!(
                "Input controller dropped without shutdown ({} keys, {} touches held)",
                self.down_keys.len(),
                self.down_touches.len()
            );
        }
    }
}

async fn sleep_secs(secs: f64) {
    if secs > 0.0 {
        tokio::time::sleep(Duration::from_secs_f64(secs)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MemoryChannel;
    use futures::FutureExt;
    use std::sync::{Arc, Mutex};

    const DEV: &str = "/dev/input/event6";

    fn line(ty: u16, code: u16, value: i32) -> String {
        format!("sendevent {} {} {} {}", DEV, ty, code, value)
    }

    fn syn() -> String {
        line(0, 0x0, 0)
    }

    fn mt_report() -> String {
        line(0, 0x2, 0)
    }

    fn btn_touch(value: i32) -> String {
        line(1, 0x14a, value)
    }

    fn point(x: i32, y: i32) -> Vec<String> {
        vec![line(3, 0x3a, 1), line(3, 0x35, x), line(3, 0x36, y), mt_report()]
    }

    fn test_layout() -> CoordinateTable {
        CoordinateTable::from_entries([
            ("a", (952, 665)),
            ("s", (949, 566)),
            ("bag", (100, 200)),
        ])
        .unwrap()
    }

    fn open() -> (InputController<MemoryChannel>, MemoryChannel) {
        let channel = MemoryChannel::new();
        let handle = channel.clone();
        let controller = InputController::open(channel, ControllerConfig::new(test_layout())).unwrap();
        (controller, handle)
    }

    fn count(lines: &[String], wanted: &str) -> usize {
        lines.iter().filter(|l| l.as_str() == wanted).count()
    }

    #[tokio::test]
    async fn test_key_press_and_release() {
        let (mut ctrl, handle) = open();

        ctrl.press_down("left").await.unwrap();
        assert_eq!(handle.take_lines(), vec![line(1, 0x69, 1), syn()]);
        assert_eq!(ctrl.down_keys(), &[KeyboardKey::Left]);

        ctrl.release_up("LEFT").await.unwrap();
        assert_eq!(handle.take_lines(), vec![line(1, 0x69, 0), syn()]);
        assert!(ctrl.down_keys().is_empty());

        ctrl.shutdown().await;
    }

    #[tokio::test]
    async fn test_press_and_release_are_idempotent() {
        let (mut ctrl, handle) = open();

        ctrl.press_down("a").await.unwrap();
        let first = handle.take_lines();
        ctrl.press_down("A").await.unwrap();
        assert!(handle.take_lines().is_empty());
        assert_eq!(first.len(), 6);

        ctrl.press_down("esc").await.unwrap();
        handle.take_lines();
        ctrl.press_down("esc").await.unwrap();
        assert!(handle.take_lines().is_empty());

        ctrl.release_up("s").await.unwrap();
        ctrl.release_up("up").await.unwrap();
        assert!(handle.take_lines().is_empty());

        ctrl.shutdown().await;
    }

    #[tokio::test]
    async fn test_multi_touch_frames() {
        let (mut ctrl, handle) = open();

        ctrl.press_down("a").await.unwrap();
        let mut expected = vec![btn_touch(1)];
        expected.extend(point(952, 665));
        expected.push(syn());
        assert_eq!(handle.take_lines(), expected);

        ctrl.press_down("s").await.unwrap();
        let mut expected = point(952, 665);
        expected.extend(point(949, 566));
        expected.push(syn());
        assert_eq!(handle.take_lines(), expected);

        ctrl.release_up("a").await.unwrap();
        let mut expected = point(949, 566);
        expected.push(syn());
        assert_eq!(handle.take_lines(), expected);
        assert_eq!(ctrl.down_touches().collect::<Vec<_>>(), vec!["S"]);

        ctrl.shutdown().await;
    }

    #[tokio::test]
    async fn test_last_touch_release_ends_contact() {
        let (mut ctrl, handle) = open();

        ctrl.press_down("a").await.unwrap();
        handle.take_lines();
        ctrl.release_up("a").await.unwrap();

        assert_eq!(handle.take_lines(), vec![btn_touch(0), syn()]);
        assert!(!ctrl.is_down("a"));

        ctrl.shutdown().await;
    }

    #[tokio::test]
    async fn test_unmapped_identifier_writes_nothing() {
        let (mut ctrl, handle) = open();

        let err = ctrl.press_down("nonexistent-touch").await.unwrap_err();
        assert!(matches!(err, TouchError::UnmappedIdentifier(ref id) if id == "NONEXISTENT-TOUCH"));
        assert!(matches!(
            ctrl.release_up("nope").await,
            Err(TouchError::UnmappedIdentifier(_))
        ));
        assert!(handle.lines().is_empty());

        ctrl.shutdown().await;
    }

    #[tokio::test]
    async fn test_contact_edges_follow_set_transitions() {
        let (mut ctrl, handle) = open();
        let ids = ["a", "s", "bag"];
        let mut seed: u32 = 0x2545_f491;
        let mut begins = 0;
        let mut ends = 0;

        for _ in 0..200 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let id = ids[(seed >> 16) as usize % ids.len()];
            let was_empty = ctrl.down_touches().next().is_none();

            if (seed >> 8) & 1 == 0 {
                ctrl.press_down(id).await.unwrap();
                if was_empty {
                    begins += 1;
                }
            } else {
                ctrl.release_up(id).await.unwrap();
                if !was_empty && ctrl.down_touches().next().is_none() {
                    ends += 1;
                }
            }
        }

        let lines = handle.take_lines();
        assert!(begins > 0 && ends > 0);
        assert_eq!(count(&lines, &btn_touch(1)), begins);
        assert_eq!(count(&lines, &btn_touch(0)), ends);

        ctrl.shutdown().await;
    }

    #[tokio::test]
    async fn test_burst_size_grows_with_held_points() {
        let (mut ctrl, handle) = open();

        ctrl.press_down("a").await.unwrap();
        // contact begin precedes the first frame
        assert_eq!(handle.take_lines().len(), 1 + 4 + 1);

        ctrl.press_down("s").await.unwrap();
        assert_eq!(handle.take_lines().len(), 4 * 2 + 1);

        ctrl.press_down("bag").await.unwrap();
        let lines = handle.take_lines();
        assert_eq!(lines.len(), 4 * 3 + 1);
        assert_eq!(count(&lines, &mt_report()), 3);
        assert_eq!(lines.last(), Some(&syn()));

        ctrl.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_releases_everything_once() {
        let (mut ctrl, handle) = open();

        ctrl.press_down("up").await.unwrap();
        ctrl.press_down("right").await.unwrap();
        ctrl.press_down("a").await.unwrap();
        ctrl.press_down("bag").await.unwrap();
        handle.take_lines();

        ctrl.shutdown().await;

        assert_eq!(
            handle.take_lines(),
            vec![
                line(1, 0x67, 0),
                syn(),
                line(1, 0x6a, 0),
                syn(),
                btn_touch(0),
                syn(),
            ]
        );
        assert!(ctrl.down_keys().is_empty());
        assert!(ctrl.down_touches().next().is_none());
        assert!(handle.is_closed());
        assert_eq!(handle.close_calls(), 1);

        ctrl.shutdown().await;
        assert!(handle.lines().is_empty());
        assert_eq!(handle.close_calls(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_swallows_channel_failure() {
        let (mut ctrl, handle) = open();
        ctrl.press_down("down").await.unwrap();
        handle.fail_after(Some(0));

        ctrl.shutdown().await;

        assert!(ctrl.is_closed());
        assert!(ctrl.down_keys().is_empty());
        assert_eq!(handle.close_calls(), 1);
    }

    /// Records lines; can hang forever on one write or fail one write
    #[derive(Clone, Default)]
    struct ScriptedChannel {
        lines: Arc<Mutex<Vec<String>>>,
        attempts: Arc<Mutex<usize>>,
        stall_at: Option<usize>,
        fail_at: Option<usize>,
    }

    impl ScriptedChannel {
        fn lines(&self) -> Vec<String> {
            self.lines.lock().unwrap().clone()
        }
    }

    impl EventChannel for ScriptedChannel {
        fn send_line<'a>(&'a mut self, line: &'a str) -> BoxFuture<'a, Result<()>> {
            let attempt = {
                let mut attempts = self.attempts.lock().unwrap();
                *attempts += 1;
                *attempts - 1
            };
            if self.stall_at == Some(attempt) {
                return futures::future::pending().boxed();
            }
            if self.fail_at == Some(attempt) {
                return futures::future::ready(Err(TouchError::ChannelUnavailable(
                    "broken pipe".to_string(),
                )))
                .boxed();
            }
            self.lines.lock().unwrap().push(line.to_string());
            futures::future::ready(Ok(())).boxed()
        }

        fn close(&mut self) -> BoxFuture<'_, Result<()>> {
            futures::future::ready(Ok(())).boxed()
        }
    }

    fn open_scripted(channel: ScriptedChannel) -> InputController<ScriptedChannel> {
        InputController::open(channel, ControllerConfig::new(test_layout())).unwrap()
    }

    #[tokio::test]
    async fn test_interrupted_key_press_is_released_on_shutdown() {
        // second write (the SYN_REPORT after key-down) never completes
        let channel = ScriptedChannel {
            stall_at: Some(1),
            ..Default::default()
        };
        let mut ctrl = open_scripted(channel.clone());

        let interrupted =
            tokio::time::timeout(Duration::from_millis(20), ctrl.press_down("left")).await;
        assert!(interrupted.is_err());
        assert!(ctrl.is_down("left"));

        ctrl.shutdown().await;

        let lines = channel.lines();
        assert_eq!(count(&lines, &line(1, 0x69, 1)), 1);
        assert_eq!(count(&lines, &line(1, 0x69, 0)), 1);
        assert_eq!(&lines[lines.len() - 2..], &[btn_touch(0), syn()]);
    }

    #[tokio::test]
    async fn test_interrupted_touch_press_ends_contact_on_shutdown() {
        let channel = ScriptedChannel {
            stall_at: Some(2),
            ..Default::default()
        };
        let mut ctrl = open_scripted(channel.clone());

        let interrupted =
            tokio::time::timeout(Duration::from_millis(20), ctrl.press_down("a")).await;
        assert!(interrupted.is_err());

        ctrl.shutdown().await;

        let lines = channel.lines();
        assert_eq!(lines.first(), Some(&btn_touch(1)));
        assert_eq!(&lines[lines.len() - 2..], &[btn_touch(0), syn()]);
        assert!(ctrl.down_touches().next().is_none());
    }

    #[tokio::test]
    async fn test_shutdown_keeps_releasing_after_a_failed_write() {
        // writes 0..=3 press UP and DOWN; write 4 is the first key-up
        let channel = ScriptedChannel {
            fail_at: Some(4),
            ..Default::default()
        };
        let mut ctrl = open_scripted(channel.clone());
        ctrl.press_down("up").await.unwrap();
        ctrl.press_down("down").await.unwrap();

        ctrl.shutdown().await;

        let lines = channel.lines();
        assert_eq!(count(&lines, &line(1, 0x67, 0)), 0);
        assert_eq!(
            &lines[4..],
            &[line(1, 0x6c, 0), syn(), btn_touch(0), syn()]
        );
        assert!(ctrl.down_keys().is_empty());
    }

    #[tokio::test]
    async fn test_failed_write_leaves_state_untouched() {
        let (mut ctrl, handle) = open();
        handle.fail_after(Some(2));

        let err = ctrl.press_down("a").await.unwrap_err();
        assert!(matches!(err, TouchError::ChannelUnavailable(_)));
        assert!(!ctrl.is_down("a"));

        handle.fail_after(None);
        handle.take_lines();
        ctrl.press_down("a").await.unwrap();
        assert_eq!(handle.take_lines().first(), Some(&btn_touch(1)));

        handle.fail_after(Some(0));
        assert!(ctrl.release_up("a").await.is_err());
        assert!(ctrl.is_down("a"));

        handle.fail_after(None);
        ctrl.shutdown().await;
    }

    #[tokio::test]
    async fn test_operations_after_shutdown_fail() {
        let (mut ctrl, _handle) = open();
        ctrl.shutdown().await;

        assert!(matches!(
            ctrl.press_down("a").await,
            Err(TouchError::ChannelUnavailable(_))
        ));
        assert!(matches!(
            ctrl.drag((0, 0), (1, 1), Some(0.0)).await,
            Err(TouchError::ChannelUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_tap_presses_then_releases() {
        let (mut ctrl, handle) = open();

        ctrl.tap("right", Some(0.0), Some(0.0)).await.unwrap();
        assert_eq!(
            handle.take_lines(),
            vec![line(1, 0x6a, 1), syn(), line(1, 0x6a, 0), syn()]
        );

        ctrl.tap("bag", Some(0.0), Some(0.0)).await.unwrap();
        let lines = handle.take_lines();
        assert_eq!(lines.first(), Some(&btn_touch(1)));
        assert_eq!(&lines[lines.len() - 2..], &[btn_touch(0), syn()]);
        assert!(!ctrl.is_down("bag"));

        ctrl.shutdown().await;
    }

    #[tokio::test]
    async fn test_drag_sends_swipe_line() {
        let (mut ctrl, handle) = open();

        ctrl.drag((10, 20), (30, 40), Some(0.0)).await.unwrap();
        ctrl.drag_between("a", "BAG", Some(0.0)).await.unwrap();
        assert_eq!(
            handle.take_lines(),
            vec![
                "input swipe 10 20 30 40".to_string(),
                "input swipe 952 665 100 200".to_string(),
            ]
        );

        assert!(matches!(
            ctrl.drag_between("left", "a", Some(0.0)).await,
            Err(TouchError::UnmappedIdentifier(_))
        ));
        assert!(handle.lines().is_empty());

        ctrl.shutdown().await;
    }

    #[tokio::test]
    async fn test_release_all() {
        let (mut ctrl, handle) = open();
        ctrl.press_down("esc").await.unwrap();
        ctrl.press_down("a").await.unwrap();
        ctrl.press_down("s").await.unwrap();

        ctrl.release_all().await.unwrap();
        assert!(ctrl.down_keys().is_empty());
        assert!(ctrl.down_touches().next().is_none());
        let lines = handle.lines();
        assert_eq!(count(&lines, &line(1, 0x01, 0)), 1);
        assert_eq!(&lines[lines.len() - 2..], &[btn_touch(0), syn()]);

        ctrl.shutdown().await;
    }

    #[test]
    fn test_open_rejects_bad_config() {
        let shadowing = CoordinateTable::from_entries([("up", (1, 1))]).unwrap();
        let result = InputController::open(MemoryChannel::new(), ControllerConfig::new(shadowing));
        assert!(matches!(result, Err(TouchError::InvalidConfig(_))));

        let config = ControllerConfig::new(test_layout()).with_device_path("");
        let result = InputController::open(MemoryChannel::new(), config);
        assert!(matches!(result, Err(TouchError::InvalidConfig(_))));
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(ControllerConfig::default().validate().is_ok());
    }

    #[tokio::test]
    async fn test_with_controller_always_shuts_down() {
        let channel = MemoryChannel::new();
        let handle = channel.clone();

        let result: Result<()> =
            InputController::with_controller(channel, ControllerConfig::new(test_layout()), |ctrl| {
                async move {
                    ctrl.press_down("a").await?;
                    ctrl.press_down("missing").await
                }
                .boxed()
            })
            .await;

        assert!(matches!(result, Err(TouchError::UnmappedIdentifier(_))));
        assert!(handle.is_closed());
        let lines = handle.lines();
        assert_eq!(&lines[lines.len() - 2..], &[btn_touch(0), syn()]);
    }

    #[tokio::test]
    async fn test_with_controller_closes_channel_on_bad_config() {
        let channel = MemoryChannel::new();
        let handle = channel.clone();
        let config = ControllerConfig::new(test_layout()).with_device_path(" ");

        let result: Result<()> =
            InputController::with_controller(channel, config, |_ctrl| async { Ok(()) }.boxed()).await;

        assert!(matches!(result, Err(TouchError::InvalidConfig(_))));
        assert!(handle.is_closed());
        assert!(handle.lines().is_empty());
    }
}
