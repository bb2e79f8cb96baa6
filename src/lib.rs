// SPDX-License-Identifier: MIT

//! Branching rules for multi-step forms
//!
//! One rule grammar, two consumers: [`flow::graph::compile`] turns a step map
//! into a directed graph ahead of time, and [`flow::selector::resolve`] picks
//! a single key from live field values.

pub mod error;
pub mod flow;

pub use error::{FlowError, Result};
pub use flow::graph::{compile, Compilation, Graph};
pub use flow::registry::PredicateRegistry;
pub use flow::selector::{configure_content_keys, resolve, Selector};
pub use flow::state::{FieldSource, FieldValues};
