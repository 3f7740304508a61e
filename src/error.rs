//! Keypad configuration error types

use std::path::PathBuf;

use thiserror::Error;

use crate::action::ParseActionError;
use crate::layer::LayerId;

/// Errors found while building actions or validating a keymap.
///
/// All of these are fatal at startup: the event loop must not start with a
/// keymap that produced one.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Composite timing brackets out of order
    #[error(
        "tap_term_ms < hold_term_ms <= long_hold_start_ms must be satisfied \
         (got {tap_term_ms}, {hold_term_ms}, {long_hold_start_ms})"
    )]
    CompositeTiming {
        tap_term_ms: u64,
        hold_term_ms: u64,
        long_hold_start_ms: u64,
    },

    /// Tap-dance without any action to pick from
    #[error("tap-dance must list at least one action")]
    EmptyTapDance,

    /// Composite or tap-dance used where only a concrete action can go
    #[error("a {inner} action cannot be nested inside a {outer}")]
    NestedAmbiguous {
        inner: &'static str,
        outer: &'static str,
    },

    #[error("key_count must be at least 1")]
    NoKeys,

    #[error("keymap must define at least one layer")]
    NoLayers,

    #[error(
        "keymap layers must strictly define {expected} key actions, \
         however layer {layer} defines {actual}"
    )]
    LayerLength {
        layer: LayerId,
        expected: usize,
        actual: usize,
    },

    #[error("default layer (which now is `{0}') must be defined in keymap")]
    MissingDefaultLayer(LayerId),

    /// Composite action switching to a layer the keymap does not have
    #[error("key {key_index} on layer {on_layer} switches to layer {layer}, which is not defined")]
    UnknownLayer {
        layer: LayerId,
        on_layer: LayerId,
        key_index: usize,
    },

    #[error("unknown callable: \"{0}\"")]
    UnknownCallable(String),

    #[error("invalid key action \"{input}\": {source}")]
    Parse {
        input: String,
        #[source]
        source: ParseActionError,
    },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid keymap file: {0}")]
    Toml(#[from] toml::de::Error),
}
