//! Recording output devices
//!
//! Device handles that log high-level calls instead of writing reports.
//! Every handle created from one [`Recorder`] appends to the same shared
//! log, so a test can assert on the exact interleaving of keyboard, mouse
//! and consumer activity.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::HidError;
use crate::{ConsumerOutput, DeviceProvider, KeyboardOutput, MouseOutput};

/// One call observed on a recording device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputEvent {
    KeyPress(u8),
    KeyRelease(u8),
    KeyReleaseAll,
    MousePress(u8),
    MouseRelease(u8),
    MouseReleaseAll,
    MouseMove { x: i8, y: i8, wheel: i8 },
    ConsumerPress(u16),
    ConsumerRelease,
}

#[derive(Default)]
struct Shared {
    log: Mutex<Vec<OutputEvent>>,
    /// Cleared to simulate an unplugged cable; calls then fail
    disconnected: AtomicBool,
}

/// Shared log plus link state for recording devices
#[derive(Clone, Default)]
pub struct Recorder {
    shared: Arc<Shared>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keyboard(&self) -> RecordingKeyboard {
        RecordingKeyboard(self.clone())
    }

    pub fn mouse(&self) -> RecordingMouse {
        RecordingMouse(self.clone())
    }

    pub fn consumer(&self) -> RecordingConsumer {
        RecordingConsumer(self.clone())
    }

    /// Snapshot of everything recorded so far
    pub fn events(&self) -> Vec<OutputEvent> {
        self.shared.log.lock().clone()
    }

    /// Drain the log
    pub fn take(&self) -> Vec<OutputEvent> {
        std::mem::take(&mut *self.shared.log.lock())
    }

    pub fn clear(&self) {
        self.shared.log.lock().clear();
    }

    /// Keyboard codes pressed, in order
    pub fn key_presses(&self) -> Vec<u8> {
        self.shared
            .log
            .lock()
            .iter()
            .filter_map(|e| match e {
                OutputEvent::KeyPress(code) => Some(*code),
                _ => None,
            })
            .collect()
    }

    pub fn set_connected(&self, connected: bool) {
        self.shared.disconnected.store(!connected, Ordering::SeqCst);
    }

    pub fn is_connected(&self) -> bool {
        !self.shared.disconnected.load(Ordering::SeqCst)
    }

    fn record(&self, event: OutputEvent) -> Result<(), HidError> {
        if !self.is_connected() {
            return Err(HidError::Disconnected);
        }
        self.shared.log.lock().push(event);
        Ok(())
    }
}

pub struct RecordingKeyboard(Recorder);

impl KeyboardOutput for RecordingKeyboard {
    fn press(&mut self, code: u8) -> Result<(), HidError> {
        self.0.record(OutputEvent::KeyPress(code))
    }

    fn release(&mut self, code: u8) -> Result<(), HidError> {
        self.0.record(OutputEvent::KeyRelease(code))
    }

    fn release_all(&mut self) -> Result<(), HidError> {
        self.0.record(OutputEvent::KeyReleaseAll)
    }
}

pub struct RecordingMouse(Recorder);

impl MouseOutput for RecordingMouse {
    fn press(&mut self, buttons: u8) -> Result<(), HidError> {
        self.0.record(OutputEvent::MousePress(buttons))
    }

    fn release(&mut self, buttons: u8) -> Result<(), HidError> {
        self.0.record(OutputEvent::MouseRelease(buttons))
    }

    fn release_all(&mut self) -> Result<(), HidError> {
        self.0.record(OutputEvent::MouseReleaseAll)
    }

    fn move_by(&mut self, x: i8, y: i8, wheel: i8) -> Result<(), HidError> {
        self.0.record(OutputEvent::MouseMove { x, y, wheel })
    }
}

pub struct RecordingConsumer(Recorder);

impl ConsumerOutput for RecordingConsumer {
    fn press(&mut self, code: u16) -> Result<(), HidError> {
        self.0.record(OutputEvent::ConsumerPress(code))
    }

    fn release(&mut self) -> Result<(), HidError> {
        self.0.record(OutputEvent::ConsumerRelease)
    }
}

/// [`DeviceProvider`] handing out recording devices
#[derive(Clone, Default)]
pub struct RecorderProvider {
    recorder: Recorder,
    opened: Arc<AtomicUsize>,
}

impl RecorderProvider {
    pub fn new(recorder: Recorder) -> Self {
        Self {
            recorder,
            opened: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    /// How many device handles have been opened so far
    pub fn open_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), HidError> {
        if !self.recorder.is_connected() {
            return Err(HidError::Disconnected);
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl DeviceProvider for RecorderProvider {
    fn is_connected(&self) -> bool {
        self.recorder.is_connected()
    }

    fn open_keyboard(&mut self) -> Result<Box<dyn KeyboardOutput>, HidError> {
        self.check()?;
        Ok(Box::new(self.recorder.keyboard()))
    }

    fn open_mouse(&mut self) -> Result<Box<dyn MouseOutput>, HidError> {
        self.check()?;
        Ok(Box::new(self.recorder.mouse()))
    }

    fn open_consumer(&mut self) -> Result<Box<dyn ConsumerOutput>, HidError> {
        self.check()?;
        Ok(Box::new(self.recorder.consumer()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_share_one_log() {
        let recorder = Recorder::new();
        let mut kb = recorder.keyboard();
        let mut cc = recorder.consumer();
        kb.press(0x04).unwrap();
        cc.press(0xCD).unwrap();
        kb.release(0x04).unwrap();
        assert_eq!(
            recorder.take(),
            vec![
                OutputEvent::KeyPress(0x04),
                OutputEvent::ConsumerPress(0xCD),
                OutputEvent::KeyRelease(0x04),
            ]
        );
        assert!(recorder.events().is_empty());
    }

    #[test]
    fn disconnected_devices_fail_without_recording() {
        let recorder = Recorder::new();
        let mut provider = RecorderProvider::new(recorder.clone());
        let mut kb = provider.open_keyboard().unwrap();
        recorder.set_connected(false);
        assert!(matches!(kb.press(0x04), Err(HidError::Disconnected)));
        assert!(provider.open_mouse().is_err());
        assert!(recorder.events().is_empty());
        assert_eq!(provider.open_count(), 1);
    }
}
