//! Keymap file
//!
//! The keymap lives in a TOML file. Each layer is an array with one entry
//! per key; an entry is either a string (see [`KeyAction`]'s parsing
//! syntax) or a table:
//!
//! ```toml
//! key_count = 3
//! default_layer = 0
//!
//! [layers]
//! 0 = [
//!     { tap = "Consumer(PlayPause)", layer = 1 },
//!     { text = "hello\n" },
//!     { tap_dance = ["A", "B", "C"], tap_term_ms = 250 },
//! ]
//! 1 = [
//!     "None",
//!     { sequence = ["Ctrl+C", "Ctrl+V"], delay_ms = 20 },
//!     { callable = "jiggle" },
//! ]
//! ```
//!
//! Composite tables accept `tap`, `hold`, `layer`, `long_hold`,
//! `tap_term_ms`, `hold_term_ms`, `long_hold_start_ms` and
//! `tap_preferred`, all optional.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::action::{CompositeAction, KeyAction, TapDance, DEFAULT_TAP_TERM_MS};
use crate::callable::CallableRegistry;
use crate::error::ConfigError;
use crate::event::DEFAULT_QUEUE_CAPACITY;
use crate::keymap::{Keymap, DEFAULT_KEY_COUNT};
use crate::layer::LayerId;
use crate::watchdog;

/// One keymap entry as written in the file
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ActionSpec {
    Name(String),
    Text(TextSpec),
    Sequence(SequenceSpec),
    Combination(CombinationSpec),
    TapDance(TapDanceSpec),
    Callable(CallableSpec),
    /// Tried last: every field is optional
    Composite(CompositeSpec),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TextSpec {
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SequenceSpec {
    pub sequence: Vec<ActionSpec>,
    #[serde(default)]
    pub delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CombinationSpec {
    pub combination: Vec<ActionSpec>,
    #[serde(default)]
    pub delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TapDanceSpec {
    pub tap_dance: Vec<ActionSpec>,
    #[serde(default = "default_tap_term")]
    pub tap_term_ms: u64,
}

fn default_tap_term() -> u64 {
    DEFAULT_TAP_TERM_MS
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CallableSpec {
    pub callable: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompositeSpec {
    #[serde(default)]
    pub tap: Option<Box<ActionSpec>>,
    #[serde(default)]
    pub hold: Option<Box<ActionSpec>>,
    #[serde(default)]
    pub layer: Option<LayerId>,
    #[serde(default)]
    pub long_hold: Option<Box<ActionSpec>>,
    #[serde(default)]
    pub tap_term_ms: Option<u64>,
    #[serde(default)]
    pub hold_term_ms: Option<u64>,
    #[serde(default)]
    pub long_hold_start_ms: Option<u64>,
    #[serde(default)]
    pub tap_preferred: bool,
}

fn build_all(specs: &[ActionSpec], callables: &CallableRegistry) -> Result<Vec<KeyAction>, ConfigError> {
    specs.iter().map(|spec| spec.build(callables)).collect()
}

impl ActionSpec {
    /// Resolve into a validated [`KeyAction`]
    pub fn build(&self, callables: &CallableRegistry) -> Result<KeyAction, ConfigError> {
        Ok(match self {
            ActionSpec::Name(name) => name.parse().map_err(|source| ConfigError::Parse {
                input: name.clone(),
                source,
            })?,
            ActionSpec::Text(spec) => KeyAction::text(spec.text.as_str()),
            ActionSpec::Sequence(spec) => KeyAction::sequence(
                build_all(&spec.sequence, callables)?,
                Duration::from_millis(spec.delay_ms),
            )?,
            ActionSpec::Combination(spec) => KeyAction::combination(
                build_all(&spec.combination, callables)?,
                Duration::from_millis(spec.delay_ms),
            )?,
            ActionSpec::TapDance(spec) => KeyAction::tap_dance(TapDance::new(
                build_all(&spec.tap_dance, callables)?,
                spec.tap_term_ms,
            )?),
            ActionSpec::Callable(spec) => KeyAction::UserCallable(
                callables
                    .get(&spec.callable)
                    .cloned()
                    .ok_or_else(|| ConfigError::UnknownCallable(spec.callable.clone()))?,
            ),
            ActionSpec::Composite(spec) => {
                let mut builder = CompositeAction::builder().tap_preferred(spec.tap_preferred);
                if let Some(tap) = &spec.tap {
                    builder = builder.tap(tap.build(callables)?);
                }
                if let Some(hold) = &spec.hold {
                    builder = builder.hold(hold.build(callables)?);
                }
                if let Some(layer) = &spec.layer {
                    builder = builder.layer(layer.clone());
                }
                if let Some(long_hold) = &spec.long_hold {
                    builder = builder.long_hold(long_hold.build(callables)?);
                }
                if let Some(ms) = spec.tap_term_ms {
                    builder = builder.tap_term_ms(ms);
                }
                if let Some(ms) = spec.hold_term_ms {
                    builder = builder.hold_term_ms(ms);
                }
                if let Some(ms) = spec.long_hold_start_ms {
                    builder = builder.long_hold_start_ms(ms);
                }
                KeyAction::composite(builder.build()?)
            }
        })
    }
}

/// Watchdog settings
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchdogConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Raised to at least 5 seconds
    #[serde(default = "default_watchdog_timeout")]
    pub timeout_s: u64,
    #[serde(default = "default_watchdog_interval")]
    pub interval_s: u64,
}

fn default_watchdog_timeout() -> u64 {
    watchdog::MIN_TIMEOUT.as_secs()
}
fn default_watchdog_interval() -> u64 {
    watchdog::DEFAULT_FEED_INTERVAL.as_secs()
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout_s: default_watchdog_timeout(),
            interval_s: default_watchdog_interval(),
        }
    }
}

impl WatchdogConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_s).max(watchdog::MIN_TIMEOUT)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_s.max(1))
    }
}

/// Complete keypad configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeypadConfig {
    #[serde(default = "default_key_count")]
    pub key_count: usize,
    #[serde(default)]
    pub default_layer: LayerId,
    /// Whether a pressed key reads high
    #[serde(default)]
    pub key_active_high: bool,
    /// Event loop period
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    #[serde(default = "default_queue_capacity")]
    pub event_queue_capacity: usize,
    #[serde(default)]
    pub watchdog: WatchdogConfig,
    /// Missing or empty: one layer typing the key numbers
    #[serde(default)]
    pub layers: BTreeMap<LayerId, Vec<ActionSpec>>,
}

fn default_key_count() -> usize {
    DEFAULT_KEY_COUNT
}
fn default_tick_ms() -> u64 {
    1
}
fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

impl Default for KeypadConfig {
    fn default() -> Self {
        Self {
            key_count: default_key_count(),
            default_layer: LayerId::default(),
            key_active_high: false,
            tick_ms: default_tick_ms(),
            event_queue_capacity: default_queue_capacity(),
            watchdog: WatchdogConfig::default(),
            layers: BTreeMap::new(),
        }
    }
}

impl KeypadConfig {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lemon-keypad")
            .join("keymap.toml")
    }

    /// Load config from a file, or return default if not found
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }

    /// Resolve every layer into a validated [`Keymap`]
    pub fn build_keymap(&self, callables: &CallableRegistry) -> Result<Keymap, ConfigError> {
        if self.layers.is_empty() {
            return Keymap::numbered(self.key_count, self.default_layer.clone());
        }
        let layers = self
            .layers
            .iter()
            .map(|(id, specs)| Ok((id.clone(), build_all(specs, callables)?)))
            .collect::<Result<Vec<_>, ConfigError>>()?;
        Keymap::new(layers, self.default_layer.clone(), self.key_count)
    }
}

/// Printable view of a keymap
#[derive(Debug, Clone, Serialize)]
pub struct KeymapSummary {
    pub key_count: usize,
    pub default_layer: LayerId,
    pub layers: Vec<LayerSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LayerSummary {
    pub id: LayerId,
    pub keys: Vec<String>,
}

impl KeymapSummary {
    pub fn new(keymap: &Keymap) -> Self {
        Self {
            key_count: keymap.key_count(),
            default_layer: keymap.default_layer().clone(),
            layers: keymap
                .layers()
                .map(|(id, actions)| LayerSummary {
                    id: id.clone(),
                    keys: actions.iter().map(|a| a.to_string()).collect(),
                })
                .collect(),
        }
    }
}
