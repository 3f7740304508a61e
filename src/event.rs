//! Key events and where they come from
//!
//! ```text
//! [MatrixScanner] --push--> [EventSender] ==mpsc==> [ChannelSource] --try_next--> [Keypad]
//! ```
//!
//! The keypad only sees the [`EventSource`] end. Bursts of presses are
//! absorbed by the bounded queue; when it is full new events are dropped
//! and the scanner retries the transition on its next scan.

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

/// Default queue depth between scanner and keypad
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// A key changed state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub key_index: usize,
    pub pressed: bool,
}

impl KeyEvent {
    pub fn press(key_index: usize) -> Self {
        Self {
            key_index,
            pressed: true,
        }
    }

    pub fn release(key_index: usize) -> Self {
        Self {
            key_index,
            pressed: false,
        }
    }
}

/// Non-blocking queue of key events
pub trait EventSource: Send {
    /// Next queued event, if any
    fn try_next(&mut self) -> Option<KeyEvent>;

    /// Discard everything queued
    fn clear(&mut self);
}

/// Bounded event queue
pub fn channel(capacity: usize) -> (EventSender, ChannelSource) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (EventSender { tx }, ChannelSource { rx })
}

/// Producer half of [`channel`]
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::Sender<KeyEvent>,
}

impl EventSender {
    /// Queue `event` without waiting; returns false if it was dropped
    pub fn push(&self, event: KeyEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                warn!("Event queue full, dropping {:?}", event);
                false
            }
            Err(TrySendError::Closed(event)) => {
                debug!("Event queue closed, dropping {:?}", event);
                false
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half of [`channel`]
#[derive(Debug)]
pub struct ChannelSource {
    rx: mpsc::Receiver<KeyEvent>,
}

impl EventSource for ChannelSource {
    fn try_next(&mut self) -> Option<KeyEvent> {
        self.rx.try_recv().ok()
    }

    fn clear(&mut self) {
        while self.rx.try_recv().is_ok() {}
    }
}

/// Turns sampled key levels into press/release transitions
#[derive(Debug)]
pub struct MatrixScanner {
    sender: EventSender,
    active_high: bool,
    pressed: Vec<bool>,
}

impl MatrixScanner {
    /// `active_high` selects which level means "pressed"
    pub fn new(sender: EventSender, key_count: usize, active_high: bool) -> Self {
        Self {
            sender,
            active_high,
            pressed: vec![false; key_count],
        }
    }

    /// Level a key reads when pressed
    pub fn pressed_level(&self) -> bool {
        self.active_high
    }

    /// Compare one sample per key against the last state and queue the
    /// differences. Returns how many events were queued.
    ///
    /// A transition whose event is dropped is not recorded, so the next scan
    /// reports it again.
    pub fn scan(&mut self, levels: &[bool]) -> usize {
        if levels.len() != self.pressed.len() {
            warn!(
                "Scan returned {} levels for {} keys",
                levels.len(),
                self.pressed.len()
            );
        }
        let mut queued = 0;
        for (key_index, (&level, state)) in levels.iter().zip(self.pressed.iter_mut()).enumerate() {
            let pressed = level == self.active_high;
            if pressed == *state {
                continue;
            }
            let event = KeyEvent { key_index, pressed };
            if self.sender.push(event) {
                *state = pressed;
                queued += 1;
            }
        }
        queued
    }

    /// Keys currently seen as pressed
    pub fn pressed_keys(&self) -> impl Iterator<Item = usize> + '_ {
        self.pressed
            .iter()
            .enumerate()
            .filter_map(|(i, &p)| p.then_some(i))
    }
}
