//! Per-field content keys
//!
//! Each field of a form may declare a `contentKey` selector that names the
//! template content shown for it. Resolving the selectors gives the keys in
//! effect for the current values; a field whose selector misses loses its
//! content key.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

use super::resolver::resolve;
use super::types::Selector;
use crate::flow::state::FieldSource;

/// Options of a single form field; only `contentKey` is read
#[derive(Deserialize)]
#[serde(bound(deserialize = ""))]
pub struct FieldOptions<C = ()> {
    #[serde(default, rename = "contentKey", alias = "content_key")]
    pub content_key: Option<Selector<C>>,
}

impl<C> FieldOptions<C> {
    pub fn with_content_key(selector: impl Into<Selector<C>>) -> Self {
        Self {
            content_key: Some(selector.into()),
        }
    }
}

impl<C> Default for FieldOptions<C> {
    fn default() -> Self {
        Self { content_key: None }
    }
}

impl<C> Clone for FieldOptions<C> {
    fn clone(&self) -> Self {
        Self {
            content_key: self.content_key.clone(),
        }
    }
}

impl<C> fmt::Debug for FieldOptions<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldOptions")
            .field("content_key", &self.content_key)
            .finish()
    }
}

/// Form fields keyed by name
pub type FieldSet<C = ()> = BTreeMap<String, FieldOptions<C>>;

/// Resolve the content key of every field that declares one
///
/// Fields without a `contentKey`, or whose selector resolves to nothing or
/// to an empty key, are absent from the result.
pub fn configure_content_keys<C, S>(fields: &FieldSet<C>, source: &S, ctx: &C) -> BTreeMap<String, String>
where
    S: FieldSource + ?Sized,
{
    let mut keys = BTreeMap::new();

    for (name, options) in fields {
        let Some(selector) = &options.content_key else {
            continue;
        };
        match resolve(selector, source, ctx) {
            Some(key) if !key.is_empty() => {
                keys.insert(name.clone(), key);
            }
            _ => log::debug!("Field '{}': content key removed", name),
        }
    }

    keys
}
