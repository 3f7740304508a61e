//! Layer identifiers and the active-layer stack

use std::collections::BTreeSet;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// Layer identifier: a number or a name.
///
/// Strings made of digits (optionally signed) are read as numbers, so the
/// keymap file can write `[layers.1]` and `layer = 1` interchangeably.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LayerId {
    Index(i64),
    Name(String),
}

impl Default for LayerId {
    fn default() -> Self {
        LayerId::Index(0)
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerId::Index(i) => write!(f, "{i}"),
            LayerId::Name(name) => write!(f, "{name}"),
        }
    }
}

impl FromStr for LayerId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(match s.parse::<i64>() {
            Ok(i) => LayerId::Index(i),
            Err(_) => LayerId::Name(s.to_string()),
        })
    }
}

impl From<i64> for LayerId {
    fn from(i: i64) -> Self {
        LayerId::Index(i)
    }
}

impl From<i32> for LayerId {
    fn from(i: i32) -> Self {
        LayerId::Index(i.into())
    }
}

impl From<&str> for LayerId {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(id) => id,
            Err(never) => match never {},
        }
    }
}

impl From<String> for LayerId {
    fn from(s: String) -> Self {
        LayerId::from(s.as_str())
    }
}

impl Serialize for LayerId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            LayerId::Index(i) => serializer.serialize_i64(*i),
            LayerId::Name(name) => serializer.serialize_str(name),
        }
    }
}

struct LayerIdVisitor;

impl Visitor<'_> for LayerIdVisitor {
    type Value = LayerId;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a layer number or name")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<LayerId, E> {
        Ok(LayerId::Index(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<LayerId, E> {
        i64::try_from(v)
            .map(LayerId::Index)
            .map_err(|_| E::custom(format!("layer number {v} is out of range")))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<LayerId, E> {
        Ok(LayerId::from(v))
    }
}

impl<'de> Deserialize<'de> for LayerId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(LayerIdVisitor)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayerError {
    #[error("layer {0} is not defined in the keymap")]
    Unknown(LayerId),
}

/// Stack of active layers.
///
/// The bottom entry is the default layer; the top entry decides which
/// action a key press resolves to. Only layers known to the keymap can be
/// pushed.
#[derive(Debug, Clone)]
pub struct LayerStack {
    stack: Vec<LayerId>,
    default: LayerId,
    known: BTreeSet<LayerId>,
}

impl LayerStack {
    pub fn new(default: LayerId, known: impl IntoIterator<Item = LayerId>) -> Self {
        let mut known: BTreeSet<LayerId> = known.into_iter().collect();
        known.insert(default.clone());
        Self {
            stack: vec![default.clone()],
            default,
            known,
        }
    }

    /// Topmost layer
    pub fn active(&self) -> &LayerId {
        self.stack.last().unwrap_or(&self.default)
    }

    pub fn default_layer(&self) -> &LayerId {
        &self.default
    }

    pub fn is_known(&self, layer: &LayerId) -> bool {
        self.known.contains(layer)
    }

    /// Put `layer` on top
    pub fn push(&mut self, layer: LayerId) -> Result<(), LayerError> {
        if !self.is_known(&layer) {
            return Err(LayerError::Unknown(layer));
        }
        self.stack.push(layer);
        Ok(())
    }

    /// Remove the first (lowest) occurrence of `layer`.
    ///
    /// Never empties the stack: with only the bottom entry left this does
    /// nothing. The removed entry need not be the top one, and when the
    /// same layer was pushed on top of itself the bottom copy goes first.
    /// Returns whether an entry was removed.
    pub fn pop(&mut self, layer: &LayerId) -> bool {
        if self.stack.len() <= 1 {
            return false;
        }
        match self.stack.iter().position(|l| l == layer) {
            Some(pos) => {
                self.stack.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Drop everything but the default layer
    pub fn reset(&mut self) {
        self.stack.clear();
        self.stack.push(self.default.clone());
    }

    /// Change the default layer and reset to it
    pub fn set_default(&mut self, layer: LayerId) -> Result<(), LayerError> {
        if !self.is_known(&layer) {
            return Err(LayerError::Unknown(layer));
        }
        self.default = layer;
        self.reset();
        Ok(())
    }

    /// Bottom to top
    pub fn as_slice(&self) -> &[LayerId] {
        &self.stack
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}
