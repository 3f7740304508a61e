//! Turning resolved actions into device output
//!
//! A press runs the action and, for actions that stay down while the key
//! is held, records what it pressed against the key index. The matching
//! release undoes exactly that recorded state, so a layer switch between
//! press and release cannot leave a key stuck.

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use keypad_hid::write_text;
use tracing::{debug, error, warn};

use crate::action::KeyAction;
use crate::callable::UserCallable;
use crate::keypad::Keypad;
use crate::layer::LayerId;

/// Hold outcome of a composite: an optional layer switch plus an optional
/// action, both in effect until the key is released.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayerAction {
    pub layer: Option<LayerId>,
    pub action: Option<KeyAction>,
}

/// Output of disambiguation, ready to dispatch
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Action(KeyAction),
    Layered(LayerAction),
}

impl From<KeyAction> for Resolved {
    fn from(action: KeyAction) -> Self {
        Resolved::Action(action)
    }
}

impl From<LayerAction> for Resolved {
    fn from(action: LayerAction) -> Self {
        Resolved::Layered(action)
    }
}

/// What a held key currently has pressed
#[derive(Debug, Clone, PartialEq)]
pub enum ActiveAction {
    Key(u8),
    Mouse(u8),
    Consumer(u16),
    Layer {
        layer: Option<LayerId>,
        inner: Option<Box<ActiveAction>>,
    },
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

impl Keypad {
    /// Dispatch the press half of `action` for `key_index`.
    ///
    /// Whatever stays pressed is recorded so that [`Keypad::trigger_release`]
    /// can undo it. Pushing an unknown layer is logged and skipped; the
    /// inner action still runs.
    pub async fn trigger_press(&mut self, key_index: usize, action: impl Into<Resolved>) {
        let state = match action.into() {
            Resolved::Action(action) => self.press_action(&action).await,
            Resolved::Layered(LayerAction { layer, action }) => {
                if let Some(layer) = &layer {
                    debug!("Switching to layer {}", layer);
                    self.push_layer(layer.clone());
                }
                let inner = match &action {
                    Some(action) => self.press_action(action).await,
                    None => None,
                };
                Some(ActiveAction::Layer {
                    layer,
                    inner: inner.map(Box::new),
                })
            }
        };
        self.set_key_state(key_index, state);
    }

    /// Undo whatever the last press of `key_index` left pressed
    pub async fn trigger_release(&mut self, key_index: usize) {
        let state = self.key_states.get_mut(key_index).and_then(Option::take);
        if let Some(state) = state {
            self.release_active(state);
        }
    }

    /// Press `action` once; returns what is left held.
    ///
    /// Boxed because sequences and callables dispatch recursively.
    pub fn press_action<'a>(&'a mut self, action: &'a KeyAction) -> BoxFuture<'a, Option<ActiveAction>> {
        async move {
            match action {
                KeyAction::None => None,
                KeyAction::RawKey(code) => {
                    let code = *code;
                    debug!("Triggering raw keycode 0x{:02X}", code);
                    self.devices.with_keyboard("press", |kb| kb.press(code));
                    Some(ActiveAction::Key(code))
                }
                KeyAction::Text(text) => {
                    debug!("Typing text {:?}", text);
                    self.devices.release_all();
                    self.devices.with_keyboard("write_text", |kb| write_text(kb, text));
                    None
                }
                KeyAction::MouseButton(buttons) => {
                    let buttons = *buttons;
                    debug!("Triggering mouse button 0x{:02X}", buttons);
                    self.devices.with_mouse("press", |m| m.press(buttons));
                    Some(ActiveAction::Mouse(buttons))
                }
                KeyAction::ConsumerCode(code) => {
                    let code = *code;
                    debug!("Triggering consumer code 0x{:02X}", code);
                    self.devices.with_consumer("press", |cc| cc.press(code));
                    Some(ActiveAction::Consumer(code))
                }
                KeyAction::Sequence(list) => {
                    for item in list.actions() {
                        self.press_action(item).await;
                        self.release_action(item);
                        pause(list.delay()).await;
                    }
                    None
                }
                KeyAction::Combination(list) => {
                    for item in list.actions() {
                        self.press_action(item).await;
                    }
                    pause(list.delay()).await;
                    for item in list.actions() {
                        self.release_action(item);
                    }
                    None
                }
                KeyAction::TapDance(_) | KeyAction::Composite(_) => {
                    warn!("{} action cannot be dispatched directly, ignoring", action.kind_name());
                    None
                }
                KeyAction::UserCallable(callable) => {
                    self.run_callable(callable.clone()).await;
                    None
                }
            }
        }
        .boxed()
    }

    /// Release half of a stateful action; everything else has nothing to undo
    pub fn release_action(&mut self, action: &KeyAction) {
        match action {
            KeyAction::RawKey(code) => {
                let code = *code;
                self.devices.with_keyboard("release", |kb| kb.release(code));
            }
            KeyAction::MouseButton(buttons) => {
                let buttons = *buttons;
                self.devices.with_mouse("release", |m| m.release(buttons));
            }
            KeyAction::ConsumerCode(_) => {
                self.devices.with_consumer("release", |cc| cc.release());
            }
            _ => {}
        }
    }

    fn release_active(&mut self, state: ActiveAction) {
        match state {
            ActiveAction::Key(code) => self.release_action(&KeyAction::RawKey(code)),
            ActiveAction::Mouse(buttons) => self.release_action(&KeyAction::MouseButton(buttons)),
            ActiveAction::Consumer(code) => self.release_action(&KeyAction::ConsumerCode(code)),
            ActiveAction::Layer { layer, inner } => {
                if let Some(layer) = layer {
                    debug!("Leaving layer {}", layer);
                    self.pop_layer(&layer);
                }
                if let Some(inner) = inner {
                    self.release_active(*inner);
                }
            }
        }
    }

    fn set_key_state(&mut self, key_index: usize, state: Option<ActiveAction>) {
        match self.key_states.get_mut(key_index) {
            Some(slot) => *slot = state,
            None => warn!("No state slot for key {}", key_index),
        }
    }

    /// Run a callable with exclusive use of the keypad.
    ///
    /// Output is released and queued events are discarded before and after
    /// the call. Afterwards the layer stack, every key's recorded state and
    /// any disambiguation in progress are reset. Errors and panics are
    /// logged and do not reach the event loop.
    pub(crate) async fn run_callable(&mut self, callable: UserCallable) {
        debug!("Calling {}", callable.name());
        self.release_and_clear_events();

        let result = AssertUnwindSafe(callable.invoke(self)).catch_unwind().await;
        match result {
            Ok(Ok(())) => debug!("{} returned", callable.name()),
            Ok(Err(e)) => error!("{} failed: {:#}", callable.name(), e),
            Err(_) => error!("{} panicked", callable.name()),
        }

        self.release_and_clear_events();
        self.reset_engine();
    }
}
