//! Selector type definitions

use serde::de::Deserializer;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

use crate::flow::condition::Condition;

/// Signature of a terminal key function: `(context) -> key`
pub type KeyFnBody<C> = dyn Fn(&C) -> Option<String> + Send + Sync;

/// A callable that produces the final key from the caller's context
///
/// Written `{ call: name }` in YAML/JSON and bound through the registry.
pub struct KeyFn<C = ()> {
    name: Option<String>,
    func: Option<Arc<KeyFnBody<C>>>,
}

impl<C> KeyFn<C> {
    pub fn named<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&C) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            name: Some(name.into()),
            func: Some(Arc::new(func)),
        }
    }

    pub fn anonymous<F>(func: F) -> Self
    where
        F: Fn(&C) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            name: None,
            func: Some(Arc::new(func)),
        }
    }

    /// A reference by name, not yet bound to a function
    pub fn reference(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            func: None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_bound(&self) -> bool {
        self.func.is_some()
    }

    pub fn bind(&mut self, func: Arc<KeyFnBody<C>>) {
        self.func = Some(func);
    }

    /// Invoke the function; unbound references produce no key
    pub fn call(&self, ctx: &C) -> Option<String> {
        match &self.func {
            Some(f) => f(ctx),
            None => {
                log::warn!(
                    "Key function '{}' is not bound; no key selected",
                    self.name().unwrap_or("<anonymous>")
                );
                None
            }
        }
    }
}

impl<C> Clone for KeyFn<C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            func: self.func.clone(),
        }
    }
}

impl<C> fmt::Debug for KeyFn<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyFn")
            .field("name", &self.name)
            .field("bound", &self.func.is_some())
            .finish()
    }
}

impl<'de, C> Deserialize<'de> for KeyFn<C> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct KeyFnRef {
            call: String,
        }

        let KeyFnRef { call } = KeyFnRef::deserialize(deserializer)?;
        Ok(KeyFn::reference(call))
    }
}

/// What a content key resolves from
#[derive(Deserialize)]
#[serde(untagged, bound(deserialize = ""))]
pub enum Selector<C = ()> {
    /// A fixed key
    Key(String),
    /// A key computed from the context
    Function(KeyFn<C>),
    /// First matching entry wins
    Sequence(Vec<SelectorEntry<C>>),
}

/// One entry of a selector sequence
#[derive(Deserialize)]
#[serde(untagged, bound(deserialize = ""))]
pub enum SelectorEntry<C = ()> {
    /// Fallback key; ends the scan
    Key(String),
    /// Fallback function; ends the scan
    Function(KeyFn<C>),
    /// Selects its `key` when it matches
    Condition(Condition<Selector<C>, C>),
}

impl<C> Selector<C> {
    pub fn key(key: impl Into<String>) -> Self {
        Selector::Key(key.into())
    }

    pub fn first(entries: Vec<SelectorEntry<C>>) -> Self {
        Selector::Sequence(entries)
    }
}

impl<C> From<&str> for Selector<C> {
    fn from(key: &str) -> Self {
        Selector::Key(key.to_string())
    }
}

impl<C> From<String> for Selector<C> {
    fn from(key: String) -> Self {
        Selector::Key(key)
    }
}

impl<C> From<KeyFn<C>> for Selector<C> {
    fn from(func: KeyFn<C>) -> Self {
        Selector::Function(func)
    }
}

impl<C> From<Vec<SelectorEntry<C>>> for Selector<C> {
    fn from(entries: Vec<SelectorEntry<C>>) -> Self {
        Selector::Sequence(entries)
    }
}

impl<C> From<&str> for SelectorEntry<C> {
    fn from(key: &str) -> Self {
        SelectorEntry::Key(key.to_string())
    }
}

impl<C> From<KeyFn<C>> for SelectorEntry<C> {
    fn from(func: KeyFn<C>) -> Self {
        SelectorEntry::Function(func)
    }
}

impl<C> From<Condition<Selector<C>, C>> for SelectorEntry<C> {
    fn from(condition: Condition<Selector<C>, C>) -> Self {
        SelectorEntry::Condition(condition)
    }
}

impl<C> Clone for Selector<C> {
    fn clone(&self) -> Self {
        match self {
            Selector::Key(k) => Selector::Key(k.clone()),
            Selector::Function(f) => Selector::Function(f.clone()),
            Selector::Sequence(entries) => Selector::Sequence(entries.clone()),
        }
    }
}

impl<C> Clone for SelectorEntry<C> {
    fn clone(&self) -> Self {
        match self {
            SelectorEntry::Key(k) => SelectorEntry::Key(k.clone()),
            SelectorEntry::Function(f) => SelectorEntry::Function(f.clone()),
            SelectorEntry::Condition(c) => SelectorEntry::Condition(c.clone()),
        }
    }
}

impl<C> fmt::Debug for Selector<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Key(k) => f.debug_tuple("Key").field(k).finish(),
            Selector::Function(func) => f.debug_tuple("Function").field(func).finish(),
            Selector::Sequence(entries) => f.debug_tuple("Sequence").field(entries).finish(),
        }
    }
}

impl<C> fmt::Debug for SelectorEntry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectorEntry::Key(k) => f.debug_tuple("Key").field(k).finish(),
            SelectorEntry::Function(func) => f.debug_tuple("Function").field(func).finish(),
            SelectorEntry::Condition(c) => f.debug_tuple("Condition").field(c).finish(),
        }
    }
}
