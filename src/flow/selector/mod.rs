// SPDX-License-Identifier: MIT

//! Runtime selectors
//!
//! A selector picks one key from live field values using the same condition
//! grammar as next-rules:
//! - `welcome` - always `welcome`
//! - `[{ field: age, op: "<", value: 18, key: minor }, adult]` - first hit wins

pub mod content_key;
mod resolver;
pub mod types;

pub use content_key::{configure_content_keys, FieldOptions, FieldSet};
pub use resolver::resolve;
pub use types::{KeyFn, KeyFnBody, Selector, SelectorEntry};
