// SPDX-License-Identifier: MIT

use crate::error::{FlowError, Result};
use crate::flow::condition::{Condition, Operands, Predicate, PredicateFn};
use crate::flow::graph::{NextRule, StepMap};
use crate::flow::selector::{FieldSet, KeyFn, KeyFnBody, Selector, SelectorEntry};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Named predicates and key functions for rules loaded from files
///
/// Declarative rules can only name their callables (`fn: isAdult`,
/// `op: isBar`, `{ call: pickKey }`); binding attaches the registered
/// functions to those names.
pub struct PredicateRegistry<C = ()> {
    predicates: HashMap<String, Arc<PredicateFn<C>>>,
    key_functions: HashMap<String, Arc<KeyFnBody<C>>>,
}

impl<C> PredicateRegistry<C> {
    pub fn new() -> Self {
        Self {
            predicates: HashMap::new(),
            key_functions: HashMap::new(),
        }
    }

    pub fn register_predicate<F>(&mut self, name: impl Into<String>, func: F)
    where
        F: Fn(Option<&Value>, &C, &Operands<'_>) -> bool + Send + Sync + 'static,
    {
        self.predicates.insert(name.into(), Arc::new(func));
    }

    pub fn register_key_function<F>(&mut self, name: impl Into<String>, func: F)
    where
        F: Fn(&C) -> Option<String> + Send + Sync + 'static,
    {
        self.key_functions.insert(name.into(), Arc::new(func));
    }

    /// A bound predicate for `name`
    pub fn predicate(&self, name: &str) -> Option<Predicate<C>> {
        self.predicates.get(name).map(|func| {
            let mut p = Predicate::reference(name);
            p.bind(func.clone());
            p
        })
    }

    /// A bound key function for `name`
    pub fn key_function(&self, name: &str) -> Option<KeyFn<C>> {
        self.key_functions.get(name).map(|func| {
            let mut f = KeyFn::reference(name);
            f.bind(func.clone());
            f
        })
    }

    pub fn has_predicate(&self, name: &str) -> bool {
        self.predicates.contains_key(name)
    }

    /// Bind every predicate referenced from the step map's next-rules
    pub fn bind_step_map(&self, steps: &mut StepMap<C>) -> Result<()> {
        for (_, step) in steps.iter_mut() {
            let Some(next) = step.next.as_mut() else {
                continue;
            };
            let mut pending = vec![next];
            while let Some(rule) = pending.pop() {
                match rule {
                    NextRule::Target(_) => {}
                    NextRule::Condition(condition) => self.bind_condition(condition)?,
                    NextRule::Sequence(rules) => pending.extend(rules.iter_mut()),
                }
            }
        }
        Ok(())
    }

    /// Bind every predicate and key function referenced from the selector
    pub fn bind_selector(&self, selector: &mut Selector<C>) -> Result<()> {
        let mut pending = vec![selector];
        while let Some(selector) = pending.pop() {
            match selector {
                Selector::Key(_) => {}
                Selector::Function(f) => self.bind_key_function(f)?,
                Selector::Sequence(entries) => {
                    for entry in entries.iter_mut() {
                        match entry {
                            SelectorEntry::Key(_) => {}
                            SelectorEntry::Function(f) => self.bind_key_function(f)?,
                            SelectorEntry::Condition(condition) => {
                                self.bind_condition(condition)?;
                                if let Some(outcome) = condition.outcome.as_mut() {
                                    pending.push(outcome);
                                }
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Bind the content-key selectors of every field
    pub fn bind_field_set(&self, fields: &mut FieldSet<C>) -> Result<()> {
        for options in fields.values_mut() {
            if let Some(selector) = options.content_key.as_mut() {
                self.bind_selector(selector)?;
            }
        }
        Ok(())
    }

    fn bind_condition<T>(&self, condition: &mut Condition<T, C>) -> Result<()> {
        for predicate in condition.predicates_mut() {
            if predicate.is_bound() {
                continue;
            }
            let Some(name) = predicate.name() else {
                continue;
            };
            let func = self
                .predicates
                .get(name)
                .ok_or_else(|| FlowError::unknown_predicate(name))?
                .clone();
            predicate.bind(func);
        }
        Ok(())
    }

    fn bind_key_function(&self, key_fn: &mut KeyFn<C>) -> Result<()> {
        if key_fn.is_bound() {
            return Ok(());
        }
        let Some(name) = key_fn.name() else {
            return Ok(());
        };
        let func = self
            .key_functions
            .get(name)
            .ok_or_else(|| FlowError::unknown_key_function(name))?
            .clone();
        key_fn.bind(func);
        Ok(())
    }
}

impl<C> Default for PredicateRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Clone for PredicateRegistry<C> {
    fn clone(&self) -> Self {
        Self {
            predicates: self.predicates.clone(),
            key_functions: self.key_functions.clone(),
        }
    }
}
