//! Output device handles and their upkeep
//!
//! Handles are opened lazily through a [`DeviceProvider`] and dropped when
//! the link goes away. Every device call goes through a helper that logs
//! and swallows failures: a missing mouse must never stop the keyboard.

use std::time::Duration;

use keypad_hid::{ConsumerOutput, DeviceProvider, HidError, KeyboardOutput, MouseOutput};
use tracing::{debug, info, warn};

/// Recheck interval while the link is down or a device failed to open
pub const RECHECK_DISCONNECTED: Duration = Duration::from_secs(1);
/// Recheck interval once all three devices are up
pub const RECHECK_HEALTHY: Duration = Duration::from_secs(5);

pub struct DeviceSet {
    provider: Box<dyn DeviceProvider>,
    keyboard: Option<Box<dyn KeyboardOutput>>,
    mouse: Option<Box<dyn MouseOutput>>,
    consumer: Option<Box<dyn ConsumerOutput>>,
    next_check_ms: u64,
}

/// Log a failed device call
fn report(device: &str, op: &str, result: Result<(), HidError>) -> Result<(), HidError> {
    if let Err(e) = &result {
        debug!("{} {} failed: {}", device, op, e);
    }
    result
}

impl DeviceSet {
    /// Wrap `provider` and try opening everything once
    pub fn new(provider: impl DeviceProvider + 'static) -> Self {
        let mut devices = Self {
            provider: Box::new(provider),
            keyboard: None,
            mouse: None,
            consumer: None,
            next_check_ms: 0,
        };
        devices.maintain(0);
        devices
    }

    /// Periodic upkeep, called from the event loop with the keypad clock
    pub fn maintain(&mut self, now_ms: u64) {
        if now_ms < self.next_check_ms {
            return;
        }
        let wait = self.reload();
        self.next_check_ms = now_ms + wait.as_millis() as u64;
    }

    /// One upkeep pass; returns how long until the next one is due.
    ///
    /// Drops all handles while the link is down, otherwise opens whichever
    /// handles are missing.
    pub fn reload(&mut self) -> Duration {
        if !self.provider.is_connected() {
            if self.any_loaded() {
                info!("USB disconnected, dropping HID devices");
            }
            self.unload();
            return RECHECK_DISCONNECTED;
        }
        if self.is_ready() {
            return RECHECK_HEALTHY;
        }

        if self.keyboard.is_none() {
            match self.provider.open_keyboard() {
                Ok(kb) => {
                    debug!("Keyboard HID device loaded");
                    self.keyboard = Some(kb);
                }
                Err(e) => warn!("Keyboard HID device unavailable: {}", e),
            }
        }
        if self.mouse.is_none() {
            match self.provider.open_mouse() {
                Ok(mouse) => {
                    debug!("Mouse HID device loaded");
                    self.mouse = Some(mouse);
                }
                Err(e) => debug!("Mouse HID device unavailable: {}", e),
            }
        }
        if self.consumer.is_none() {
            match self.provider.open_consumer() {
                Ok(cc) => {
                    debug!("Consumer control HID device loaded");
                    self.consumer = Some(cc);
                }
                Err(e) => debug!("Consumer control HID device unavailable: {}", e),
            }
        }

        if self.is_ready() {
            info!("HID devices ready");
            RECHECK_HEALTHY
        } else {
            RECHECK_DISCONNECTED
        }
    }

    /// All three devices are open
    pub fn is_ready(&self) -> bool {
        self.keyboard.is_some() && self.mouse.is_some() && self.consumer.is_some()
    }

    fn any_loaded(&self) -> bool {
        self.keyboard.is_some() || self.mouse.is_some() || self.consumer.is_some()
    }

    fn unload(&mut self) {
        self.keyboard = None;
        self.mouse = None;
        self.consumer = None;
    }

    /// A handle that reported a lost link is dropped and reopened on the
    /// next upkeep pass, which is brought forward.
    fn after_call(&mut self, result: Result<(), HidError>, drop_handle: impl FnOnce(&mut Self)) -> bool {
        match result {
            Ok(()) => true,
            Err(HidError::Disconnected) => {
                drop_handle(self);
                self.next_check_ms = 0;
                false
            }
            Err(_) => false,
        }
    }

    /// Run `f` against the keyboard; false if it is missing or the call failed
    pub fn with_keyboard(
        &mut self,
        op: &str,
        f: impl FnOnce(&mut dyn KeyboardOutput) -> Result<(), HidError>,
    ) -> bool {
        let Some(kb) = self.keyboard.as_mut() else {
            debug!("keyboard {} skipped: device not loaded", op);
            return false;
        };
        let result = report("keyboard", op, f(&mut **kb));
        self.after_call(result, |d| d.keyboard = None)
    }

    /// Run `f` against the mouse; false if it is missing or the call failed
    pub fn with_mouse(
        &mut self,
        op: &str,
        f: impl FnOnce(&mut dyn MouseOutput) -> Result<(), HidError>,
    ) -> bool {
        let Some(mouse) = self.mouse.as_mut() else {
            debug!("mouse {} skipped: device not loaded", op);
            return false;
        };
        let result = report("mouse", op, f(&mut **mouse));
        self.after_call(result, |d| d.mouse = None)
    }

    /// Run `f` against consumer control; false if it is missing or the call failed
    pub fn with_consumer(
        &mut self,
        op: &str,
        f: impl FnOnce(&mut dyn ConsumerOutput) -> Result<(), HidError>,
    ) -> bool {
        let Some(cc) = self.consumer.as_mut() else {
            debug!("consumer {} skipped: device not loaded", op);
            return false;
        };
        let result = report("consumer", op, f(&mut **cc));
        self.after_call(result, |d| d.consumer = None)
    }

    /// Release everything on every device
    pub fn release_all(&mut self) {
        self.with_keyboard("release_all", |kb| kb.release_all());
        self.with_consumer("release", |cc| cc.release());
        self.with_mouse("release_all", |m| m.release_all());
    }
}
