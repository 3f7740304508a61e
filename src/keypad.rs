//! The keypad context and its event loop
//!
//! [`Keypad`] owns everything the event loop touches: keymap, layer stack,
//! disambiguation state, per-key pressed state, output devices and the
//! event source. There is exactly one owner, so no locking is involved;
//! a running [`UserCallable`](crate::UserCallable) borrows the whole
//! context mutably and the loop waits for it.
//!
//! ```text
//!         ┌──────── tick (1ms) ────────┐
//!         ▼                            │
//!  maintain devices ─▶ drain events ─▶ recheck pending
//!                        │
//!                        ▼
//!                 engine ─▶ dispatcher ─▶ devices
//! ```

use std::future::Future;
use std::time::Duration;

use futures::future::{self, BoxFuture};
use keypad_hid::{write_text, DeviceProvider};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::devices::DeviceSet;
use crate::dispatch::{ActiveAction, Resolved};
use crate::engine::{DanceStreak, Pending};
use crate::event::{EventSource, KeyEvent};
use crate::keymap::Keymap;
use crate::layer::{LayerError, LayerId, LayerStack};
use crate::watchdog::{self, Watchdog};

/// Default event loop period
pub const DEFAULT_TICK: Duration = Duration::from_millis(1);

pub struct Keypad {
    pub(crate) keymap: Keymap,
    pub(crate) layers: LayerStack,
    pub(crate) pending: Option<Pending>,
    pub(crate) dance_streak: Option<DanceStreak>,
    pub(crate) key_states: Vec<Option<ActiveAction>>,
    pub(crate) devices: DeviceSet,
    events: Box<dyn EventSource>,
    started: Instant,
}

/// Extra work run next to the event loop
pub struct RunOptions {
    tick: Duration,
    watchdog: Option<WatchdogSetup>,
    tasks: Vec<BoxFuture<'static, ()>>,
}

struct WatchdogSetup {
    watchdog: Box<dyn Watchdog>,
    timeout: Duration,
    interval: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            tick: DEFAULT_TICK,
            watchdog: None,
            tasks: Vec::new(),
        }
    }
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Event loop period
    pub fn tick(mut self, tick: Duration) -> Self {
        self.tick = tick.max(Duration::from_millis(1));
        self
    }

    /// Feed `watchdog` every `interval` while running
    pub fn watchdog(mut self, watchdog: Box<dyn Watchdog>, timeout: Duration, interval: Duration) -> Self {
        self.watchdog = Some(WatchdogSetup {
            watchdog,
            timeout,
            interval: interval.max(Duration::from_millis(1)),
        });
        self
    }

    /// Background task polled alongside the event loop
    pub fn task(mut self, task: impl Future<Output = ()> + Send + 'static) -> Self {
        self.tasks.push(Box::pin(task));
        self
    }
}

impl Keypad {
    pub fn new(
        keymap: Keymap,
        events: impl EventSource + 'static,
        provider: impl DeviceProvider + 'static,
    ) -> Self {
        let layers = LayerStack::new(
            keymap.default_layer().clone(),
            keymap.layer_ids().cloned(),
        );
        let key_states = vec![None; keymap.key_count()];
        Self {
            keymap,
            layers,
            pending: None,
            dance_streak: None,
            key_states,
            devices: DeviceSet::new(provider),
            events: Box::new(events),
            started: Instant::now(),
        }
    }

    pub fn keymap(&self) -> &Keymap {
        &self.keymap
    }

    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }

    /// Milliseconds since the keypad was created
    pub fn now_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// Key whose press is still being disambiguated
    pub fn pending_key(&self) -> Option<usize> {
        self.pending.as_ref().map(|p| p.key_index)
    }

    /// What the last press of `key_index` left held
    pub fn key_state(&self, key_index: usize) -> Option<&ActiveAction> {
        self.key_states.get(key_index)?.as_ref()
    }

    pub fn devices(&self) -> &DeviceSet {
        &self.devices
    }

    pub fn devices_mut(&mut self) -> &mut DeviceSet {
        &mut self.devices
    }

    // --- Layers ---

    /// Push `layer`; unknown layers are logged and ignored
    pub fn push_layer(&mut self, layer: LayerId) {
        if let Err(e) = self.layers.push(layer) {
            warn!("Cannot switch layer: {}", e);
        }
    }

    /// Remove the first occurrence of `layer`
    pub fn pop_layer(&mut self, layer: &LayerId) {
        if !self.layers.pop(layer) {
            debug!("Layer {} was not on the stack", layer);
        }
    }

    /// Change the default layer; the stack is reset to it
    pub fn set_default_layer(&mut self, layer: LayerId) -> Result<(), LayerError> {
        self.layers.set_default(layer)
    }

    // --- Events ---

    /// Next raw key event, bypassing the engine
    pub fn next_event(&mut self) -> Option<KeyEvent> {
        self.events.try_next()
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    /// Release all output and drop queued key events
    pub fn release_and_clear_events(&mut self) {
        self.devices.release_all();
        self.events.clear();
    }

    /// Forget all pending and held-key state and go back to the default layer
    pub(crate) fn reset_engine(&mut self) {
        self.layers.reset();
        self.key_states.iter_mut().for_each(|state| *state = None);
        self.pending = None;
        self.dance_streak = None;
    }

    // --- Direct device access for callables ---

    pub fn press_key(&mut self, code: u8) {
        self.devices.with_keyboard("press", |kb| kb.press(code));
    }

    pub fn release_key(&mut self, code: u8) {
        self.devices.with_keyboard("release", |kb| kb.release(code));
    }

    /// Press and release `code`
    pub fn tap_key(&mut self, code: u8) {
        self.press_key(code);
        self.release_key(code);
    }

    /// Press every key in `codes`, then release them all
    pub fn send_keys(&mut self, codes: &[u8]) {
        for &code in codes {
            self.press_key(code);
        }
        self.devices.with_keyboard("release_all", |kb| kb.release_all());
    }

    pub fn send_text(&mut self, text: &str) {
        self.devices.with_keyboard("write_text", |kb| write_text(kb, text));
    }

    pub fn press_mouse(&mut self, buttons: u8) {
        self.devices.with_mouse("press", |m| m.press(buttons));
    }

    pub fn release_mouse(&mut self, buttons: u8) {
        self.devices.with_mouse("release", |m| m.release(buttons));
    }

    pub fn move_mouse(&mut self, x: i8, y: i8, wheel: i8) {
        self.devices.with_mouse("move", |m| m.move_by(x, y, wheel));
    }

    pub fn press_consumer(&mut self, code: u16) {
        self.devices.with_consumer("press", |cc| cc.press(code));
    }

    pub fn release_consumer(&mut self) {
        self.devices.with_consumer("release", |cc| cc.release());
    }

    pub fn release_all(&mut self) {
        self.devices.release_all();
    }

    /// Press then release `action` as if a key mapped to it was tapped
    pub async fn tap_action(&mut self, key_index: usize, action: impl Into<Resolved>) {
        self.trigger_press(key_index, action).await;
        self.trigger_release(key_index).await;
    }

    // --- Event loop ---

    /// One pass of the event loop: device upkeep, every queued event, then
    /// a time-driven recheck of the pending key.
    pub async fn tick(&mut self) {
        self.devices.maintain(self.now_ms());
        while let Some(event) = self.events.try_next() {
            let now = self.now_ms();
            self.handle_event(event, now).await;
        }
        let now = self.now_ms();
        self.check_pending(now).await;
    }

    async fn event_loop(&mut self, period: Duration) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    /// Run the event loop, watchdog and background tasks until `shutdown`
    /// completes. All output is released before the keypad is handed back.
    pub async fn run_until(mut self, shutdown: impl Future<Output = ()>, options: RunOptions) -> Self {
        let RunOptions {
            tick,
            watchdog,
            tasks,
        } = options;

        info!(
            "Keypad running: {} keys, default layer {}",
            self.keymap.key_count(),
            self.layers.default_layer()
        );

        let watchdog = async move {
            match watchdog {
                Some(setup) => watchdog::feed_forever(setup.watchdog, setup.timeout, setup.interval).await,
                None => future::pending::<()>().await,
            }
        };
        let tasks = async move {
            if !tasks.is_empty() {
                info!("Running {} background task(s)", tasks.len());
                future::join_all(tasks).await;
                debug!("Background tasks finished");
            }
            future::pending::<()>().await
        };

        tokio::select! {
            _ = self.event_loop(tick) => {}
            _ = watchdog => {}
            _ = tasks => {}
            _ = shutdown => info!("Keypad stopping"),
        }

        self.devices.release_all();
        self
    }
}
