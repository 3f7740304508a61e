//! Input-event core of the lemon macro keypad
//!
//! Key events come in, HID output goes out. In between:
//!
//! - [`action`]: what a key can do ([`KeyAction`])
//! - [`layer`]: which keymap layer is active ([`LayerStack`])
//! - [`engine`]: deciding tap vs. hold vs. long hold, and tap-dance counts
//! - [`dispatch`]: running actions and remembering what each key holds
//! - [`keypad`]: the context object and its event loop ([`Keypad`])
//!
//! Output devices come from the `keypad-hid` crate; anything implementing
//! [`keypad_hid::DeviceProvider`] can back a keypad.
//!
//! ```no_run
//! use lemon_keypad::{event, CallableRegistry, KeypadConfig, Keypad, RunOptions};
//! use keypad_hid::{BusProvider, TraceBus};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let config = KeypadConfig::load(&KeypadConfig::default_path())?;
//! let keymap = config.build_keymap(&CallableRegistry::new())?;
//! let (sender, source) = event::channel(config.event_queue_capacity);
//! let keypad = Keypad::new(keymap, source, BusProvider::new(TraceBus));
//! // hand `sender` to whatever scans the keys
//! # drop(sender);
//! let shutdown = async {
//!     let _ = tokio::signal::ctrl_c().await;
//! };
//! keypad.run_until(shutdown, RunOptions::default()).await;
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod builtin;
pub mod callable;
pub mod config;
pub mod devices;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod event;
pub mod keymap;
pub mod keypad;
pub mod layer;
pub mod script;
pub mod watchdog;

pub use action::{ActionList, CompositeAction, KeyAction, TapDance};
pub use callable::{CallableRegistry, UserAction, UserCallable};
pub use config::KeypadConfig;
pub use dispatch::{ActiveAction, LayerAction, Resolved};
pub use error::ConfigError;
pub use event::{EventSource, KeyEvent};
pub use keymap::Keymap;
pub use keypad::{Keypad, RunOptions};
pub use layer::{LayerError, LayerId, LayerStack};
