// SPDX-License-Identifier: MIT

//! Condition grammar shared by next-rules and content-key selectors
//!
//! A condition compares a named field against a value:
//! - `{ field: age, op: ">=", value: 18 }`
//! - `{ field: country, op: in, value: [NL, BE] }`
//! - `{ fn: isEligible }` with the decision left to a registered predicate

mod ast;
mod evaluator;

pub use ast::{Comparator, Condition, Operands, Operator, Predicate, PredicateFn};
pub use evaluator::evaluate;
