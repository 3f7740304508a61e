//! Tap / hold / tap-dance disambiguation
//!
//! At most one key is *pending* at a time: its press mapped to a composite
//! or tap-dance and the engine has not yet decided what it means. Three
//! things can settle it:
//!
//! ```text
//!   another key is pressed   → Trigger::NewPress(k)
//!   the pending key is released → Trigger::Release
//!   time passes              → Trigger::Tick
//! ```
//!
//! The decision logic is kept in pure functions ([`decide_composite`],
//! [`decide_tap_dance`]) that take the elapsed time explicitly; the
//! [`Keypad`] methods below only apply their outcome.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::action::{CompositeAction, KeyAction, TapDance};
use crate::dispatch::{LayerAction, Resolved};
use crate::event::KeyEvent;
use crate::keypad::Keypad;

/// What prompted a look at the pending key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Time-driven recheck
    Tick,
    /// Another (or the same) key was pressed
    NewPress(usize),
    /// The pending key was released
    Release,
}

/// Result of a composite decision
#[derive(Debug, Clone, PartialEq)]
pub enum CompositeOutcome {
    /// Not decided yet
    Wait,
    /// Decided on nothing; stop tracking the key
    Discard,
    /// Press now, release when the key is released
    Press(Resolved),
    /// Press and release immediately
    Click(Option<KeyAction>),
}

fn hold_outcome(composite: &CompositeAction) -> Resolved {
    Resolved::Layered(LayerAction {
        layer: composite.layer().cloned(),
        action: composite.hold().cloned(),
    })
}

/// Decide a pending composite `elapsed_ms` after its press
pub fn decide_composite(composite: &CompositeAction, elapsed_ms: u64, trigger: Trigger) -> CompositeOutcome {
    let tap_term = composite.tap_term_ms();
    let hold_term = composite.hold_term_ms();
    let long_hold_start = composite.long_hold_start_ms();

    match trigger {
        Trigger::NewPress(_) => {
            if elapsed_ms < tap_term && composite.tap_preferred() {
                match composite.tap() {
                    Some(tap) => CompositeOutcome::Press(Resolved::Action(tap.clone())),
                    None => CompositeOutcome::Press(hold_outcome(composite)),
                }
            } else if elapsed_ms < hold_term {
                CompositeOutcome::Press(hold_outcome(composite))
            } else if elapsed_ms < long_hold_start {
                CompositeOutcome::Discard
            } else {
                // Long hold keeps waiting for its own threshold
                CompositeOutcome::Wait
            }
        }
        Trigger::Release => {
            if elapsed_ms < tap_term {
                CompositeOutcome::Click(composite.tap().cloned())
            } else if elapsed_ms < hold_term {
                CompositeOutcome::Click(composite.hold().cloned())
            } else {
                CompositeOutcome::Discard
            }
        }
        Trigger::Tick => {
            if composite.long_hold().is_none() && elapsed_ms > tap_term {
                CompositeOutcome::Press(hold_outcome(composite))
            } else if elapsed_ms > long_hold_start {
                match composite.long_hold() {
                    Some(long) => CompositeOutcome::Press(Resolved::Action(long.clone())),
                    None => CompositeOutcome::Discard,
                }
            } else {
                CompositeOutcome::Wait
            }
        }
    }
}

/// Decide a pending tap-dance.
///
/// Returns the selected action once the dance is over: another key was
/// pressed, or the tap window since the last tap has passed.
pub fn decide_tap_dance<'a>(
    dance: &'a TapDance,
    taps: usize,
    key_index: usize,
    elapsed_ms: u64,
    trigger: Trigger,
) -> Option<&'a KeyAction> {
    let over = match trigger {
        Trigger::NewPress(other) if other != key_index => true,
        _ => elapsed_ms > dance.tap_term_ms(),
    };
    over.then(|| dance.action(taps))
}

#[derive(Debug, Clone)]
pub(crate) enum PendingKind {
    Composite(Arc<CompositeAction>),
    TapDance {
        dance: Arc<TapDance>,
        /// Zero-based tap counter
        taps: usize,
        /// Whether the key is still down
        held: bool,
    },
}

/// The key whose meaning is still undecided
#[derive(Debug, Clone)]
pub(crate) struct Pending {
    pub key_index: usize,
    /// Press time; for tap-dances, time of the latest tap
    pub since_ms: u64,
    pub kind: PendingKind,
}

/// A tap-dance that already fired its last action.
///
/// Further taps within the window keep firing the last action straight
/// away instead of starting a new dance.
#[derive(Debug, Clone)]
pub(crate) struct DanceStreak {
    pub key_index: usize,
    pub last_tap_ms: u64,
    pub dance: Arc<TapDance>,
}

impl Keypad {
    /// Process one key event at time `now_ms`
    pub async fn handle_event(&mut self, event: KeyEvent, now_ms: u64) {
        if event.key_index >= self.keymap.key_count() {
            warn!(
                "Ignoring event for key {} (keypad has {} keys)",
                event.key_index,
                self.keymap.key_count()
            );
            return;
        }
        if event.pressed {
            self.process_pending(now_ms, Trigger::NewPress(event.key_index)).await;
        } else {
            self.process_pending(now_ms, Trigger::Tick).await;
        }
        self.process_key_event(event, now_ms).await;
    }

    /// Time-driven recheck of the pending key
    pub async fn check_pending(&mut self, now_ms: u64) {
        self.process_pending(now_ms, Trigger::Tick).await;
    }

    async fn process_pending(&mut self, now_ms: u64, trigger: Trigger) {
        let Some(pending) = self.pending.clone() else {
            return;
        };
        let key_index = pending.key_index;
        let elapsed = now_ms.saturating_sub(pending.since_ms);

        match pending.kind {
            PendingKind::Composite(composite) => {
                match decide_composite(&composite, elapsed, trigger) {
                    CompositeOutcome::Wait => {}
                    CompositeOutcome::Discard => {
                        debug!("Key {} held past its hold window, ignoring", key_index);
                        self.pending = None;
                    }
                    CompositeOutcome::Press(resolved) => {
                        debug!("Key {} resolved after {}ms: {:?}", key_index, elapsed, resolved);
                        self.pending = None;
                        self.trigger_press(key_index, resolved).await;
                    }
                    CompositeOutcome::Click(action) => {
                        self.pending = None;
                        if let Some(action) = action {
                            debug!("Key {} resolved after {}ms: {}", key_index, elapsed, action);
                            self.trigger_press(key_index, action).await;
                            self.trigger_release(key_index).await;
                        }
                    }
                }
            }
            PendingKind::TapDance { dance, taps, held } => {
                let Some(action) = decide_tap_dance(&dance, taps, key_index, elapsed, trigger) else {
                    return;
                };
                debug!("Key {} tap-dance resolved after {} taps: {}", key_index, taps + 1, action);
                let action = action.clone();
                self.pending = None;
                self.trigger_press(key_index, action).await;
                if !held {
                    self.trigger_release(key_index).await;
                }
            }
        }
    }

    async fn process_key_event(&mut self, event: KeyEvent, now_ms: u64) {
        let KeyEvent { key_index, pressed } = event;
        if !pressed {
            self.process_key_release(key_index, now_ms).await;
            return;
        }

        if self
            .dance_streak
            .as_ref()
            .is_some_and(|streak| streak.key_index != key_index)
        {
            self.dance_streak = None;
        }

        let action = self
            .keymap
            .action(self.layers.active(), key_index)
            .cloned()
            .unwrap_or_default();

        match action {
            KeyAction::Composite(composite) => {
                self.supersede_pending(key_index);
                debug!("Key {} pending composite", key_index);
                self.pending = Some(Pending {
                    key_index,
                    since_ms: now_ms,
                    kind: PendingKind::Composite(composite),
                });
            }
            KeyAction::TapDance(dance) => self.press_tap_dance(key_index, dance, now_ms).await,
            action => self.trigger_press(key_index, action).await,
        }
    }

    async fn process_key_release(&mut self, key_index: usize, now_ms: u64) {
        let pending_kind = self
            .pending
            .as_mut()
            .filter(|p| p.key_index == key_index)
            .map(|p| &mut p.kind);

        let composite = match pending_kind {
            Some(PendingKind::Composite(_)) => true,
            Some(PendingKind::TapDance { held, .. }) => {
                // The dance keeps waiting for more taps
                *held = false;
                return;
            }
            None => false,
        };

        if composite {
            self.process_pending(now_ms, Trigger::Release).await;
        } else {
            self.trigger_release(key_index).await;
        }
    }

    async fn press_tap_dance(&mut self, key_index: usize, dance: Arc<TapDance>, now_ms: u64) {
        if let Some(streak) = self.dance_streak.as_mut() {
            if streak.key_index == key_index
                && Arc::ptr_eq(&streak.dance, &dance)
                && now_ms.saturating_sub(streak.last_tap_ms) <= dance.tap_term_ms()
            {
                streak.last_tap_ms = now_ms;
                let last = dance.last().clone();
                self.trigger_press(key_index, last).await;
                return;
            }
        }
        self.dance_streak = None;

        // A dance already under way keeps counting against its own entries,
        // even if a layer change now maps the key to another dance
        let (taps, dance) = match self.pending.as_mut() {
            Some(Pending {
                key_index: pending_key,
                since_ms,
                kind: PendingKind::TapDance { dance: pending_dance, taps, held },
            }) if *pending_key == key_index => {
                *taps += 1;
                *held = true;
                *since_ms = now_ms;
                (*taps, pending_dance.clone())
            }
            _ => {
                self.supersede_pending(key_index);
                self.pending = Some(Pending {
                    key_index,
                    since_ms: now_ms,
                    kind: PendingKind::TapDance {
                        dance: dance.clone(),
                        taps: 0,
                        held: true,
                    },
                });
                (0, dance)
            }
        };

        if taps + 1 >= dance.len() {
            debug!("Key {} tap-dance reached its last action", key_index);
            self.pending = None;
            self.dance_streak = Some(DanceStreak {
                key_index,
                last_tap_ms: now_ms,
                dance: dance.clone(),
            });
            self.trigger_press(key_index, dance.last().clone()).await;
        }
    }

    /// A new ambiguous press takes over from whatever is still pending
    fn supersede_pending(&mut self, key_index: usize) {
        if let Some(old) = self.pending.take() {
            if old.key_index != key_index {
                warn!(
                    "Key {} replaces pending key {}, which is dropped undecided",
                    key_index, old.key_index
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::LayerId;
    use keypad_hid::codes::key;

    fn tap_hold() -> CompositeAction {
        CompositeAction::builder()
            .tap(KeyAction::RawKey(key::A))
            .hold(KeyAction::RawKey(key::LEFT_SHIFT))
            .layer(1)
            .build()
            .unwrap()
    }

    fn held_layer(c: &CompositeAction) -> CompositeOutcome {
        CompositeOutcome::Press(hold_outcome(c))
    }

    #[test]
    fn composite_release_picks_window() {
        let c = tap_hold();
        assert_eq!(
            decide_composite(&c, 50, Trigger::Release),
            CompositeOutcome::Click(Some(KeyAction::RawKey(key::A)))
        );
        assert_eq!(
            decide_composite(&c, 1500, Trigger::Release),
            CompositeOutcome::Click(Some(KeyAction::RawKey(key::LEFT_SHIFT)))
        );
        assert_eq!(decide_composite(&c, 2500, Trigger::Release), CompositeOutcome::Discard);
    }

    #[test]
    fn composite_tick_without_long_hold_commits_to_hold() {
        let c = tap_hold();
        assert_eq!(decide_composite(&c, 200, Trigger::Tick), CompositeOutcome::Wait);
        assert_eq!(decide_composite(&c, 201, Trigger::Tick), held_layer(&c));
        assert_eq!(
            held_layer(&c),
            CompositeOutcome::Press(Resolved::Layered(LayerAction {
                layer: Some(LayerId::Index(1)),
                action: Some(KeyAction::RawKey(key::LEFT_SHIFT)),
            }))
        );
    }

    #[test]
    fn composite_tick_with_long_hold_waits_for_it() {
        let c = CompositeAction::builder()
            .tap(KeyAction::RawKey(key::A))
            .long_hold(KeyAction::RawKey(key::Z))
            .build()
            .unwrap();
        assert_eq!(decide_composite(&c, 4000, Trigger::Tick), CompositeOutcome::Wait);
        assert_eq!(
            decide_composite(&c, 5001, Trigger::Tick),
            CompositeOutcome::Press(Resolved::Action(KeyAction::RawKey(key::Z)))
        );
    }

    #[test]
    fn composite_interrupted_by_another_key() {
        let c = tap_hold();
        // Not tap-preferred: an early interrupt means hold
        assert_eq!(decide_composite(&c, 10, Trigger::NewPress(3)), held_layer(&c));
        assert_eq!(decide_composite(&c, 2500, Trigger::NewPress(3)), CompositeOutcome::Discard);
        assert_eq!(decide_composite(&c, 6000, Trigger::NewPress(3)), CompositeOutcome::Wait);

        let preferred = CompositeAction::builder()
            .tap(KeyAction::RawKey(key::A))
            .hold(KeyAction::RawKey(key::B))
            .tap_preferred(true)
            .build()
            .unwrap();
        assert_eq!(
            decide_composite(&preferred, 10, Trigger::NewPress(3)),
            CompositeOutcome::Press(Resolved::Action(KeyAction::RawKey(key::A)))
        );
        assert_eq!(
            decide_composite(&preferred, 300, Trigger::NewPress(3)),
            held_layer(&preferred)
        );
    }

    #[test]
    fn tap_dance_waits_for_window_or_other_key() {
        let dance = TapDance::with_default_term(vec![
            KeyAction::RawKey(key::A),
            KeyAction::RawKey(key::B),
            KeyAction::RawKey(key::C),
        ])
        .unwrap();
        assert_eq!(decide_tap_dance(&dance, 0, 2, 100, Trigger::Tick), None);
        assert_eq!(decide_tap_dance(&dance, 0, 2, 100, Trigger::NewPress(2)), None);
        assert_eq!(
            decide_tap_dance(&dance, 1, 2, 100, Trigger::NewPress(4)),
            Some(&KeyAction::RawKey(key::B))
        );
        assert_eq!(
            decide_tap_dance(&dance, 0, 2, 201, Trigger::Tick),
            Some(&KeyAction::RawKey(key::A))
        );
    }
}
