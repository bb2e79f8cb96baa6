// SPDX-License-Identifier: MIT

//! Static flow graphs
//!
//! Compiles a step map, where each step may carry a branching `next` rule,
//! into a directed graph for flow analysis and visualization.

mod compiler;
pub mod types;

pub use compiler::{compile, compile_value, Compilation};
pub use types::{Diagnostic, Discriminator, Edge, Graph, NextRule, Step, StepMap};
