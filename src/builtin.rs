//! Callables shipped with the keypad

use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::callable::{CallableRegistry, UserAction, UserCallable};
use crate::keypad::Keypad;

/// Nudges the mouse in a small square until any key is pressed.
///
/// Keeps the host awake. The key press that stops it is consumed.
#[derive(Debug, Clone)]
pub struct Jiggle {
    pub step: i8,
    pub interval: Duration,
}

impl Default for Jiggle {
    fn default() -> Self {
        Self {
            step: 4,
            interval: Duration::from_millis(500),
        }
    }
}

#[async_trait]
impl UserAction for Jiggle {
    async fn call(&self, keypad: &mut Keypad) -> anyhow::Result<()> {
        info!("Mouse jiggle started, press any key to stop");
        let s = self.step;
        let pattern = [(s, 0), (0, s), (-s, 0), (0, -s)];
        let mut moves = 0usize;
        loop {
            tokio::time::sleep(self.interval).await;
            while let Some(event) = keypad.next_event() {
                if event.pressed {
                    info!("Mouse jiggle stopped after {} moves", moves);
                    return Ok(());
                }
            }
            let (x, y) = pattern[moves % pattern.len()];
            keypad.move_mouse(x, y, 0);
            moves += 1;
        }
    }
}

/// Register every built-in callable
pub fn register_builtins(registry: &mut CallableRegistry) {
    registry.register(UserCallable::new("jiggle", Jiggle::default()));
}
