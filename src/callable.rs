//! User-supplied callables
//!
//! A callable gets exclusive use of the [`Keypad`] until it returns: the
//! event loop is suspended, so it can read raw key events, drive devices
//! and change layers directly.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::keypad::Keypad;

/// Behaviour behind a [`UserCallable`]
#[async_trait]
pub trait UserAction: Send + Sync {
    async fn call(&self, keypad: &mut Keypad) -> anyhow::Result<()>;
}

/// Adapter for plain closures
struct FnAction<F>(F);

#[async_trait]
impl<F> UserAction for FnAction<F>
where
    F: Fn(&mut Keypad) -> anyhow::Result<()> + Send + Sync,
{
    async fn call(&self, keypad: &mut Keypad) -> anyhow::Result<()> {
        (self.0)(keypad)
    }
}

/// Named, shareable handle to a [`UserAction`].
///
/// Two handles are equal when they share the same underlying action.
#[derive(Clone)]
pub struct UserCallable {
    name: Arc<str>,
    action: Arc<dyn UserAction>,
}

impl UserCallable {
    pub fn new(name: impl Into<Arc<str>>, action: impl UserAction + 'static) -> Self {
        Self {
            name: name.into(),
            action: Arc::new(action),
        }
    }

    /// Wrap a synchronous closure
    pub fn from_fn<F>(name: impl Into<Arc<str>>, f: F) -> Self
    where
        F: Fn(&mut Keypad) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::new(name, FnAction(f))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) async fn invoke(&self, keypad: &mut Keypad) -> anyhow::Result<()> {
        self.action.call(keypad).await
    }
}

impl PartialEq for UserCallable {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.action, &other.action)
    }
}

impl fmt::Debug for UserCallable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("UserCallable").field(&self.name).finish()
    }
}

/// Callables the keymap file may refer to by name
#[derive(Clone, Default)]
pub struct CallableRegistry {
    callables: BTreeMap<String, UserCallable>,
}

impl CallableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a callable under its own name
    pub fn register(&mut self, callable: UserCallable) {
        self.callables.insert(callable.name().to_string(), callable);
    }

    pub fn get(&self, name: &str) -> Option<&UserCallable> {
        self.callables.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.callables.keys().map(String::as_str)
    }
}

impl fmt::Debug for CallableRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_follows_the_action() {
        let a = UserCallable::from_fn("noop", |_| Ok(()));
        let b = a.clone();
        let c = UserCallable::from_fn("noop", |_| Ok(()));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(format!("{a:?}"), "UserCallable(\"noop\")");
    }

    #[test]
    fn registry_lookup() {
        let mut registry = CallableRegistry::new();
        registry.register(UserCallable::from_fn("beep", |_| Ok(())));
        registry.register(UserCallable::from_fn("alpha", |_| Ok(())));
        assert!(registry.get("beep").is_some());
        assert!(registry.get("nope").is_none());
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["alpha", "beep"]);
    }
}
