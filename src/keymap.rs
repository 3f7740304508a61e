//! Validated keymap: layer id to one action per key

use std::collections::BTreeMap;

use crate::action::KeyAction;
use crate::error::ConfigError;
use crate::layer::LayerId;

/// Number of keys on the stock lemon keypad
pub const DEFAULT_KEY_COUNT: usize = 6;

#[derive(Debug, Clone)]
pub struct Keymap {
    layers: BTreeMap<LayerId, Vec<KeyAction>>,
    default_layer: LayerId,
    key_count: usize,
}

impl Keymap {
    /// Build a keymap, checking that
    ///
    /// - every layer has exactly `key_count` actions,
    /// - the default layer exists,
    /// - every composite switches only to layers that exist.
    pub fn new(
        layers: impl IntoIterator<Item = (LayerId, Vec<KeyAction>)>,
        default_layer: LayerId,
        key_count: usize,
    ) -> Result<Self, ConfigError> {
        if key_count == 0 {
            return Err(ConfigError::NoKeys);
        }
        let layers: BTreeMap<_, _> = layers.into_iter().collect();
        if layers.is_empty() {
            return Err(ConfigError::NoLayers);
        }
        for (id, actions) in &layers {
            if actions.len() != key_count {
                return Err(ConfigError::LayerLength {
                    layer: id.clone(),
                    expected: key_count,
                    actual: actions.len(),
                });
            }
        }
        if !layers.contains_key(&default_layer) {
            return Err(ConfigError::MissingDefaultLayer(default_layer));
        }
        for (id, actions) in &layers {
            for (key_index, action) in actions.iter().enumerate() {
                let KeyAction::Composite(composite) = action else {
                    continue;
                };
                if let Some(target) = composite.layer() {
                    if !layers.contains_key(target) {
                        return Err(ConfigError::UnknownLayer {
                            layer: target.clone(),
                            on_layer: id.clone(),
                            key_index,
                        });
                    }
                }
            }
        }

        Ok(Self {
            layers,
            default_layer,
            key_count,
        })
    }

    /// Single layer typing the digits `1`..=`key_count`
    pub fn numbered(key_count: usize, default_layer: LayerId) -> Result<Self, ConfigError> {
        let actions = (1..=key_count)
            .map(|n| KeyAction::text(n.to_string()))
            .collect();
        Self::new([(default_layer.clone(), actions)], default_layer, key_count)
    }

    /// Action bound to `key_index` on `layer`
    pub fn action(&self, layer: &LayerId, key_index: usize) -> Option<&KeyAction> {
        self.layers.get(layer)?.get(key_index)
    }

    pub fn layer(&self, layer: &LayerId) -> Option<&[KeyAction]> {
        self.layers.get(layer).map(Vec::as_slice)
    }

    pub fn contains_layer(&self, layer: &LayerId) -> bool {
        self.layers.contains_key(layer)
    }

    pub fn layer_ids(&self) -> impl Iterator<Item = &LayerId> {
        self.layers.keys()
    }

    pub fn layers(&self) -> impl Iterator<Item = (&LayerId, &[KeyAction])> {
        self.layers.iter().map(|(id, actions)| (id, actions.as_slice()))
    }

    pub fn default_layer(&self) -> &LayerId {
        &self.default_layer
    }

    pub fn key_count(&self) -> usize {
        self.key_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::CompositeAction;
    use keypad_hid::codes::key;

    fn row(code: u8, n: usize) -> Vec<KeyAction> {
        vec![KeyAction::RawKey(code); n]
    }

    #[test]
    fn numbered_keymap_types_digits() {
        let keymap = Keymap::numbered(DEFAULT_KEY_COUNT, LayerId::default()).unwrap();
        assert_eq!(keymap.key_count(), 6);
        assert_eq!(
            keymap.action(&LayerId::Index(0), 0),
            Some(&KeyAction::text("1"))
        );
        assert_eq!(
            keymap.action(&LayerId::Index(0), 5),
            Some(&KeyAction::text("6"))
        );
        assert_eq!(keymap.action(&LayerId::Index(0), 6), None);
        assert_eq!(keymap.action(&LayerId::Index(1), 0), None);
    }

    #[test]
    fn layer_length_must_match_key_count() {
        let err = Keymap::new(
            [(0.into(), row(key::A, 6)), (1.into(), row(key::B, 5))],
            0.into(),
            6,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::LayerLength { expected: 6, actual: 5, .. }
        ));
    }

    #[test]
    fn default_layer_must_exist() {
        let err = Keymap::new([(1.into(), row(key::A, 2))], 0.into(), 2).unwrap_err();
        assert!(matches!(err, ConfigError::MissingDefaultLayer(LayerId::Index(0))));
        assert!(matches!(
            Keymap::new(Vec::new(), 0.into(), 2),
            Err(ConfigError::NoLayers)
        ));
        assert!(matches!(
            Keymap::new([(0.into(), Vec::new())], 0.into(), 0),
            Err(ConfigError::NoKeys)
        ));
    }

    #[test]
    fn composite_layer_targets_must_exist() {
        let shift_to_fn = KeyAction::composite(
            CompositeAction::builder()
                .tap(KeyAction::RawKey(key::A))
                .layer("fn")
                .build()
                .unwrap(),
        );
        let mut base = row(key::A, 2);
        base[1] = shift_to_fn;
        let err = Keymap::new([(0.into(), base.clone())], 0.into(), 2).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownLayer { key_index: 1, .. }));

        let keymap = Keymap::new([(0.into(), base), ("fn".into(), row(key::B, 2))], 0.into(), 2).unwrap();
        assert!(keymap.contains_layer(&"fn".into()));
        assert_eq!(keymap.layer_ids().count(), 2);
    }
}
