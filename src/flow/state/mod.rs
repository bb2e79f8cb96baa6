// SPDX-License-Identifier: MIT

//! Field values read by the selector resolver
//!
//! This module provides:
//! - `FieldSource` - the lookup capability the resolver is handed per call
//! - `FieldValues` - an owned store with dotted path lookup

mod store;

pub use store::{FieldSource, FieldValues};
