//! The key action vocabulary
//!
//! Every key of every layer maps to one [`KeyAction`]. Most actions are
//! concrete (type a key, click a mouse button, run a callable). Two are
//! *ambiguous*: [`CompositeAction`] and [`TapDance`] only describe a
//! decision that the engine makes later from timing.
//!
//! # Parsing syntax
//!
//! ```text
//! None               → None
//! A                  → RawKey(0x04)
//! Esc                → RawKey(0x29)       (alias)
//! 0x04               → RawKey(0x04)       (hex literal)
//! Ctrl+C             → Combination[LCtrl, C]
//! Mouse(Left)        → MouseButton(0x01)
//! Mouse(4)           → MouseButton(0x04)
//! Consumer(Mute)     → ConsumerCode(0xE2)
//! Consumer(0xCD)     → ConsumerCode(0xCD)
//! ```
//!
//! Text, sequences, tap-dances, composites and callables have no string
//! form; the keymap file spells them as tables.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use keypad_hid::codes;

use crate::callable::UserCallable;
use crate::error::ConfigError;
use crate::layer::LayerId;

/// Default tap window for composites and tap-dances
pub const DEFAULT_TAP_TERM_MS: u64 = 200;
/// Default end of the hold window
pub const DEFAULT_HOLD_TERM_MS: u64 = 2000;
/// Default start of the long-hold window
pub const DEFAULT_LONG_HOLD_START_MS: u64 = 5000;

/// What a key does
#[derive(Debug, Clone, PartialEq, Default)]
pub enum KeyAction {
    /// Does nothing
    #[default]
    None,
    /// Keyboard usage code, held while the key is held
    RawKey(u8),
    /// Typed once on press
    Text(Arc<str>),
    /// Mouse button bitmask, held while the key is held
    MouseButton(u8),
    /// Consumer control usage, held while the key is held
    ConsumerCode(u16),
    /// Each element pressed then released in order
    Sequence(ActionList),
    /// All elements pressed, then all released
    Combination(ActionList),
    TapDance(Arc<TapDance>),
    Composite(Arc<CompositeAction>),
    UserCallable(UserCallable),
}

impl KeyAction {
    pub fn text(text: impl Into<Arc<str>>) -> Self {
        KeyAction::Text(text.into())
    }

    /// Sequence of concrete actions with `delay` after each one
    pub fn sequence(actions: Vec<KeyAction>, delay: Duration) -> Result<Self, ConfigError> {
        Ok(KeyAction::Sequence(ActionList::new(actions, delay, "sequence")?))
    }

    /// Chord of concrete actions with `delay` between press and release
    pub fn combination(actions: Vec<KeyAction>, delay: Duration) -> Result<Self, ConfigError> {
        Ok(KeyAction::Combination(ActionList::new(
            actions,
            delay,
            "combination",
        )?))
    }

    pub fn tap_dance(dance: TapDance) -> Self {
        KeyAction::TapDance(Arc::new(dance))
    }

    pub fn composite(composite: CompositeAction) -> Self {
        KeyAction::Composite(Arc::new(composite))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, KeyAction::None)
    }

    /// Whether resolving this action needs timing information
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, KeyAction::TapDance(_) | KeyAction::Composite(_))
    }

    /// Short variant name for logs and errors
    pub fn kind_name(&self) -> &'static str {
        match self {
            KeyAction::None => "none",
            KeyAction::RawKey(_) => "raw key",
            KeyAction::Text(_) => "text",
            KeyAction::MouseButton(_) => "mouse button",
            KeyAction::ConsumerCode(_) => "consumer code",
            KeyAction::Sequence(_) => "sequence",
            KeyAction::Combination(_) => "combination",
            KeyAction::TapDance(_) => "tap-dance",
            KeyAction::Composite(_) => "composite",
            KeyAction::UserCallable(_) => "callable",
        }
    }
}

/// Reject composites and tap-dances inside `outer`
fn reject_ambiguous<'a>(
    actions: impl IntoIterator<Item = &'a KeyAction>,
    outer: &'static str,
) -> Result<(), ConfigError> {
    match actions.into_iter().find(|a| a.is_ambiguous()) {
        Some(inner) => Err(ConfigError::NestedAmbiguous {
            inner: inner.kind_name(),
            outer,
        }),
        None => Ok(()),
    }
}

/// Ordered actions with a pause, shared by sequences and combinations
#[derive(Debug, Clone, PartialEq)]
pub struct ActionList {
    actions: Arc<[KeyAction]>,
    delay: Duration,
}

impl ActionList {
    fn new(actions: Vec<KeyAction>, delay: Duration, outer: &'static str) -> Result<Self, ConfigError> {
        reject_ambiguous(&actions, outer)?;
        Ok(Self {
            actions: actions.into(),
            delay,
        })
    }

    pub fn actions(&self) -> &[KeyAction] {
        &self.actions
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

/// Tap-count selector.
///
/// Tapping the key `n` times within `tap_term_ms` of each other selects
/// `actions[n - 1]`; counts past the end select the last action.
#[derive(Debug, Clone, PartialEq)]
pub struct TapDance {
    actions: Vec<KeyAction>,
    tap_term_ms: u64,
}

impl TapDance {
    pub fn new(actions: Vec<KeyAction>, tap_term_ms: u64) -> Result<Self, ConfigError> {
        if actions.is_empty() {
            return Err(ConfigError::EmptyTapDance);
        }
        reject_ambiguous(&actions, "tap-dance")?;
        Ok(Self {
            actions,
            tap_term_ms,
        })
    }

    pub fn with_default_term(actions: Vec<KeyAction>) -> Result<Self, ConfigError> {
        Self::new(actions, DEFAULT_TAP_TERM_MS)
    }

    pub fn actions(&self) -> &[KeyAction] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn tap_term_ms(&self) -> u64 {
        self.tap_term_ms
    }

    /// Action for the zero-based tap counter, clamped to the last entry
    pub fn action(&self, counter: usize) -> &KeyAction {
        let index = counter.min(self.actions.len().saturating_sub(1));
        &self.actions[index]
    }

    pub fn last(&self) -> &KeyAction {
        self.action(usize::MAX)
    }
}

/// Tap / hold / long-hold disambiguation rule.
///
/// The timeline after a press is split into three windows:
///
/// ```text
/// 0 ──── tap_term ──── hold_term ──── long_hold_start ────▶
///   tap             hold          (ignored)          long hold
/// ```
///
/// Build one with [`CompositeAction::builder`].
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeAction {
    tap: Option<KeyAction>,
    hold: Option<KeyAction>,
    layer: Option<LayerId>,
    long_hold: Option<KeyAction>,
    tap_term_ms: u64,
    hold_term_ms: u64,
    long_hold_start_ms: u64,
    tap_preferred: bool,
}

impl CompositeAction {
    pub fn builder() -> CompositeBuilder {
        CompositeBuilder::default()
    }

    pub fn tap(&self) -> Option<&KeyAction> {
        self.tap.as_ref()
    }

    pub fn hold(&self) -> Option<&KeyAction> {
        self.hold.as_ref()
    }

    pub fn layer(&self) -> Option<&LayerId> {
        self.layer.as_ref()
    }

    pub fn long_hold(&self) -> Option<&KeyAction> {
        self.long_hold.as_ref()
    }

    pub fn tap_term_ms(&self) -> u64 {
        self.tap_term_ms
    }

    pub fn hold_term_ms(&self) -> u64 {
        self.hold_term_ms
    }

    pub fn long_hold_start_ms(&self) -> u64 {
        self.long_hold_start_ms
    }

    /// Whether another key press during the tap window resolves as a tap
    pub fn tap_preferred(&self) -> bool {
        self.tap_preferred
    }
}

/// Builder for [`CompositeAction`]
#[derive(Debug, Clone, Default)]
pub struct CompositeBuilder {
    tap: Option<KeyAction>,
    hold: Option<KeyAction>,
    layer: Option<LayerId>,
    long_hold: Option<KeyAction>,
    tap_term_ms: Option<u64>,
    hold_term_ms: Option<u64>,
    long_hold_start_ms: Option<u64>,
    tap_preferred: bool,
}

impl CompositeBuilder {
    pub fn tap(mut self, action: KeyAction) -> Self {
        self.tap = Some(action);
        self
    }

    pub fn hold(mut self, action: KeyAction) -> Self {
        self.hold = Some(action);
        self
    }

    pub fn layer(mut self, layer: impl Into<LayerId>) -> Self {
        self.layer = Some(layer.into());
        self
    }

    pub fn long_hold(mut self, action: KeyAction) -> Self {
        self.long_hold = Some(action);
        self
    }

    pub fn tap_term_ms(mut self, ms: u64) -> Self {
        self.tap_term_ms = Some(ms);
        self
    }

    pub fn hold_term_ms(mut self, ms: u64) -> Self {
        self.hold_term_ms = Some(ms);
        self
    }

    pub fn long_hold_start_ms(mut self, ms: u64) -> Self {
        self.long_hold_start_ms = Some(ms);
        self
    }

    pub fn tap_preferred(mut self, preferred: bool) -> Self {
        self.tap_preferred = preferred;
        self
    }

    /// Validate and normalise.
    ///
    /// A composite with only a tap always prefers the tap; one without a
    /// tap never does.
    pub fn build(self) -> Result<CompositeAction, ConfigError> {
        let tap_term_ms = self.tap_term_ms.unwrap_or(DEFAULT_TAP_TERM_MS);
        let hold_term_ms = self.hold_term_ms.unwrap_or(DEFAULT_HOLD_TERM_MS);
        let long_hold_start_ms = self.long_hold_start_ms.unwrap_or(DEFAULT_LONG_HOLD_START_MS);
        if !(tap_term_ms < hold_term_ms && hold_term_ms <= long_hold_start_ms) {
            return Err(ConfigError::CompositeTiming {
                tap_term_ms,
                hold_term_ms,
                long_hold_start_ms,
            });
        }
        reject_ambiguous(
            [&self.tap, &self.hold, &self.long_hold].into_iter().flatten(),
            "composite",
        )?;

        let tap_preferred = if self.tap.is_none() {
            false
        } else if self.hold.is_none() && self.layer.is_none() {
            true
        } else {
            self.tap_preferred
        };

        Ok(CompositeAction {
            tap: self.tap,
            hold: self.hold,
            layer: self.layer,
            long_hold: self.long_hold,
            tap_term_ms,
            hold_term_ms,
            long_hold_start_ms,
            tap_preferred,
        })
    }
}

/// Error when parsing a [`KeyAction`] from a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseActionError {
    UnknownKey(String),
    UnknownMouseButton(String),
    UnknownConsumerCode(String),
    InvalidHexCode,
    EmptyCombo,
}

impl fmt::Display for ParseActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownKey(name) => write!(f, "unknown key: \"{name}\""),
            Self::UnknownMouseButton(name) => write!(f, "unknown mouse button: \"{name}\""),
            Self::UnknownConsumerCode(name) => write!(f, "unknown consumer code: \"{name}\""),
            Self::InvalidHexCode => write!(f, "invalid hex keycode"),
            Self::EmptyCombo => write!(f, "empty key combo"),
        }
    }
}

impl std::error::Error for ParseActionError {}

/// Extract `inner` from `Prefix(inner)`, prefix matched case-insensitively
fn call_arg<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    if !head.eq_ignore_ascii_case(prefix) {
        return None;
    }
    s[prefix.len()..]
        .trim()
        .strip_prefix('(')?
        .strip_suffix(')')
        .map(str::trim)
}

fn parse_hex(s: &str) -> Option<Result<u16, ParseActionError>> {
    let hex = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))?;
    Some(u16::from_str_radix(hex, 16).map_err(|_| ParseActionError::InvalidHexCode))
}

fn parse_key(s: &str) -> Result<u8, ParseActionError> {
    if let Some(code) = parse_hex(s) {
        return u8::try_from(code?).map_err(|_| ParseActionError::InvalidHexCode);
    }
    codes::key_code_from_name(s).ok_or_else(|| ParseActionError::UnknownKey(s.to_string()))
}

impl FromStr for KeyAction {
    type Err = ParseActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        match s.to_ascii_lowercase().as_str() {
            "" | "none" | "disabled" | "off" => return Ok(KeyAction::None),
            _ => {}
        }

        // "Mouse(Left)", "Mouse(4)"
        if let Some(arg) = call_arg(s, "Mouse") {
            let buttons = codes::mouse_button_from_name(arg)
                .or_else(|| arg.parse().ok())
                .ok_or_else(|| ParseActionError::UnknownMouseButton(arg.to_string()))?;
            return Ok(KeyAction::MouseButton(buttons));
        }

        // "Consumer(Mute)", "Consumer(0xCD)"
        if let Some(arg) = call_arg(s, "Consumer") {
            let code = match parse_hex(arg) {
                Some(code) => code?,
                None => codes::consumer_code_from_name(arg)
                    .ok_or_else(|| ParseActionError::UnknownConsumerCode(arg.to_string()))?,
            };
            return Ok(KeyAction::ConsumerCode(code));
        }

        // "Ctrl+C", "Ctrl+Shift+Esc"
        if s.len() > 1 && s.contains('+') {
            let keys = s
                .split('+')
                .map(str::trim)
                .map(|part| {
                    if part.is_empty() {
                        Err(ParseActionError::EmptyCombo)
                    } else {
                        parse_key(part).map(KeyAction::RawKey)
                    }
                })
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(KeyAction::Combination(ActionList {
                actions: keys.into(),
                delay: Duration::ZERO,
            }));
        }

        let code = parse_key(s)?;
        Ok(if code == 0 {
            KeyAction::None
        } else {
            KeyAction::RawKey(code)
        })
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, name: &str, list: &ActionList) -> fmt::Result {
    write!(f, "{name}[")?;
    for (i, action) in list.actions().iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{action}")?;
    }
    write!(f, "]")?;
    if !list.delay().is_zero() {
        write!(f, "@{}ms", list.delay().as_millis())?;
    }
    Ok(())
}

impl fmt::Display for KeyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyAction::None => write!(f, "None"),
            KeyAction::RawKey(code) => match codes::key_name(*code) {
                "?" => write!(f, "0x{code:02X}"),
                name => write!(f, "{name}"),
            },
            KeyAction::Text(text) => write!(f, "Text({text:?})"),
            KeyAction::MouseButton(buttons) => match codes::mouse_button_name(*buttons) {
                Some(name) => write!(f, "Mouse({name})"),
                None => write!(f, "Mouse({buttons})"),
            },
            KeyAction::ConsumerCode(code) => match codes::consumer_name(*code) {
                Some(name) => write!(f, "Consumer({name})"),
                None => write!(f, "Consumer(0x{code:02X})"),
            },
            KeyAction::Sequence(list) => write_list(f, "Sequence", list),
            KeyAction::Combination(list) => {
                if list.delay().is_zero()
                    && list.actions().len() > 1
                    && list.actions().iter().all(|a| matches!(a, KeyAction::RawKey(_)))
                {
                    let names: Vec<String> = list.actions().iter().map(|a| a.to_string()).collect();
                    write!(f, "{}", names.join("+"))
                } else {
                    write_list(f, "Combination", list)
                }
            }
            KeyAction::TapDance(dance) => {
                write!(f, "TapDance[")?;
                for (i, action) in dance.actions().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{action}")?;
                }
                write!(f, "]")
            }
            KeyAction::Composite(c) => {
                write!(f, "Composite(")?;
                let mut sep = "";
                if let Some(tap) = c.tap() {
                    write!(f, "tap={tap}")?;
                    sep = ", ";
                }
                if let Some(hold) = c.hold() {
                    write!(f, "{sep}hold={hold}")?;
                    sep = ", ";
                }
                if let Some(layer) = c.layer() {
                    write!(f, "{sep}layer={layer}")?;
                    sep = ", ";
                }
                if let Some(long) = c.long_hold() {
                    write!(f, "{sep}long_hold={long}")?;
                }
                write!(f, ")")
            }
            KeyAction::UserCallable(callable) => write!(f, "Call({})", callable.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keypad_hid::codes::{consumer, key, mouse};

    #[test]
    fn parse_simple_actions() {
        assert_eq!("A".parse::<KeyAction>().unwrap(), KeyAction::RawKey(key::A));
        assert_eq!("esc".parse::<KeyAction>().unwrap(), KeyAction::RawKey(key::ESCAPE));
        assert_eq!("0x2C".parse::<KeyAction>().unwrap(), KeyAction::RawKey(key::SPACE));
        assert_eq!("none".parse::<KeyAction>().unwrap(), KeyAction::None);
        assert_eq!("0x00".parse::<KeyAction>().unwrap(), KeyAction::None);
        assert_eq!(
            "Mouse(Left)".parse::<KeyAction>().unwrap(),
            KeyAction::MouseButton(mouse::LEFT)
        );
        assert_eq!(
            "mouse(2)".parse::<KeyAction>().unwrap(),
            KeyAction::MouseButton(mouse::RIGHT)
        );
        assert_eq!(
            "Consumer(Mute)".parse::<KeyAction>().unwrap(),
            KeyAction::ConsumerCode(consumer::MUTE)
        );
        assert_eq!(
            "Consumer(0xCD)".parse::<KeyAction>().unwrap(),
            KeyAction::ConsumerCode(consumer::PLAY_PAUSE)
        );
    }

    #[test]
    fn parse_combo() {
        let action: KeyAction = "Ctrl+C".parse().unwrap();
        let KeyAction::Combination(list) = &action else {
            panic!("expected combination, got {action:?}");
        };
        assert_eq!(
            list.actions(),
            &[KeyAction::RawKey(key::LEFT_CONTROL), KeyAction::RawKey(key::C)]
        );
        assert_eq!(action.to_string(), "LCtrl+C");
        assert_eq!("-".parse::<KeyAction>().unwrap(), KeyAction::RawKey(0x2D));
        assert_eq!("Ctrl+".parse::<KeyAction>(), Err(ParseActionError::EmptyCombo));
    }

    #[test]
    fn parse_errors() {
        assert_eq!(
            "Blorp".parse::<KeyAction>(),
            Err(ParseActionError::UnknownKey("Blorp".into()))
        );
        assert_eq!("0xZZ".parse::<KeyAction>(), Err(ParseActionError::InvalidHexCode));
        assert_eq!("0x1FF".parse::<KeyAction>(), Err(ParseActionError::InvalidHexCode));
        assert!(matches!(
            "Mouse(Tail)".parse::<KeyAction>(),
            Err(ParseActionError::UnknownMouseButton(_))
        ));
        assert!(matches!(
            "Consumer(Louder)".parse::<KeyAction>(),
            Err(ParseActionError::UnknownConsumerCode(_))
        ));
    }

    #[test]
    fn display_names() {
        assert_eq!(KeyAction::RawKey(key::F12).to_string(), "F12");
        assert_eq!(KeyAction::MouseButton(mouse::MIDDLE).to_string(), "Mouse(Middle)");
        assert_eq!(KeyAction::ConsumerCode(0x1234).to_string(), "Consumer(0x1234)");
        assert_eq!(KeyAction::text("hi").to_string(), "Text(\"hi\")");
        let seq = KeyAction::sequence(
            vec![KeyAction::RawKey(key::A), KeyAction::RawKey(key::B)],
            Duration::from_millis(50),
        )
        .unwrap();
        assert_eq!(seq.to_string(), "Sequence[A, B]@50ms");
    }

    #[test]
    fn composite_defaults() {
        let c = CompositeAction::builder()
            .tap(KeyAction::RawKey(key::A))
            .hold(KeyAction::RawKey(key::LEFT_SHIFT))
            .build()
            .unwrap();
        assert_eq!(c.tap_term_ms(), DEFAULT_TAP_TERM_MS);
        assert_eq!(c.hold_term_ms(), DEFAULT_HOLD_TERM_MS);
        assert_eq!(c.long_hold_start_ms(), DEFAULT_LONG_HOLD_START_MS);
        assert!(!c.tap_preferred());
    }

    #[test]
    fn composite_tap_preference_is_normalised() {
        let tap_only = CompositeAction::builder()
            .tap(KeyAction::RawKey(key::A))
            .build()
            .unwrap();
        assert!(tap_only.tap_preferred());

        let no_tap = CompositeAction::builder()
            .hold(KeyAction::RawKey(key::B))
            .tap_preferred(true)
            .build()
            .unwrap();
        assert!(!no_tap.tap_preferred());

        let layered = CompositeAction::builder()
            .tap(KeyAction::RawKey(key::A))
            .layer(1)
            .tap_preferred(true)
            .build()
            .unwrap();
        assert!(layered.tap_preferred());
    }

    #[test]
    fn composite_timing_must_be_ordered() {
        let err = CompositeAction::builder()
            .tap_term_ms(300)
            .hold_term_ms(300)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::CompositeTiming { .. }));

        let err = CompositeAction::builder()
            .hold_term_ms(3000)
            .long_hold_start_ms(2500)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::CompositeTiming { .. }));

        // hold_term == long_hold_start is allowed
        CompositeAction::builder()
            .hold_term_ms(3000)
            .long_hold_start_ms(3000)
            .build()
            .unwrap();
    }

    #[test]
    fn ambiguous_actions_cannot_nest() {
        let dance = KeyAction::tap_dance(TapDance::with_default_term(vec![KeyAction::RawKey(key::A)]).unwrap());
        let err = CompositeAction::builder().tap(dance.clone()).build().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::NestedAmbiguous { inner: "tap-dance", outer: "composite" }
        ));
        assert!(TapDance::with_default_term(vec![dance.clone()]).is_err());
        assert!(KeyAction::sequence(vec![dance.clone()], Duration::ZERO).is_err());
        assert!(KeyAction::combination(vec![dance], Duration::ZERO).is_err());
    }

    #[test]
    fn tap_dance_selection_clamps() {
        assert!(matches!(
            TapDance::with_default_term(vec![]),
            Err(ConfigError::EmptyTapDance)
        ));
        let dance = TapDance::with_default_term(vec![
            KeyAction::RawKey(key::A),
            KeyAction::RawKey(key::B),
            KeyAction::RawKey(key::C),
        ])
        .unwrap();
        assert_eq!(dance.action(0), &KeyAction::RawKey(key::A));
        assert_eq!(dance.action(2), &KeyAction::RawKey(key::C));
        assert_eq!(dance.action(7), &KeyAction::RawKey(key::C));
        assert_eq!(dance.last(), &KeyAction::RawKey(key::C));
    }
}
