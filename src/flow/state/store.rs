// SPDX-License-Identifier: MIT

//! Field value storage and lookup

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Maps a field name to its current value
///
/// Implemented for closures, so a session store can be adapted in place:
/// `|name: &str| session.get(name).cloned()`.
pub trait FieldSource {
    fn field(&self, name: &str) -> Option<Value>;
}

impl<F> FieldSource for F
where
    F: Fn(&str) -> Option<Value>,
{
    fn field(&self, name: &str) -> Option<Value> {
        self(name)
    }
}

/// Field values held in memory
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct FieldValues {
    fields: HashMap<String, Value>,
}

impl FieldValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON object; any other value yields an empty store
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(map) => Self {
                fields: map.into_iter().collect(),
            },
            _ => Self::new(),
        }
    }

    /// Set a field, replacing any previous value
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
    }

    /// Get a field value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Get a nested field value using dot notation (e.g., "address.postcode")
    ///
    /// A field stored under the full dotted name takes precedence.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        if let Some(value) = self.fields.get(path) {
            return Some(value);
        }

        let mut parts = path.split('.');
        let mut current = self.fields.get(parts.next()?)?;
        for part in parts {
            current = match current {
                Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
                other => other.get(part)?,
            };
        }
        Some(current)
    }

    /// Convert to a JSON object
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FieldSource for FieldValues {
    fn field(&self, name: &str) -> Option<Value> {
        self.get_path(name).cloned()
    }
}

// Plain maps are looked up by exact name only.
impl FieldSource for HashMap<String, Value> {
    fn field(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl FieldSource for Map<String, Value> {
    fn field(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for FieldValues {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
