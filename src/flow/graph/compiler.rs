//! Step map compilation - expands next-rules into graph edges

use super::types::{Diagnostic, Discriminator, Graph, NextRule, StepMap};
use crate::error::{FlowError, Result};
use crate::flow::condition::{Condition, Operator};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;

/// Output of [`compile`]: the graph plus anything that could not be drawn
#[derive(Debug, Clone, Default)]
pub struct Compilation {
    pub graph: Graph,
    pub diagnostics: Vec<Diagnostic>,
}

/// Compile a step map into a directed graph
///
/// Every step becomes a node. Unconditional transitions give unlabeled
/// edges; conditions give edges labeled `"<field> <op> <value>"` or with the
/// name of their predicate.
pub fn compile<C>(steps: &StepMap<C>) -> Compilation {
    let targets = Targets::new(steps);
    let mut out = Compilation::default();

    for (id, step) in steps.iter() {
        out.graph.set_node(id);
        if let Some(next) = &step.next {
            expand(&mut out, &targets, id, next);
        }
    }

    for diagnostic in &out.diagnostics {
        log::warn!("{}", diagnostic);
    }
    log::debug!(
        "Compiled {} steps into {} nodes and {} edges",
        steps.len(),
        out.graph.nodes().len(),
        out.graph.edges().len()
    );

    out
}

/// Decode a JSON step map and compile it
///
/// Fails with [`FlowError::InvalidDefinition`] when `value` is not an object.
pub fn compile_value(value: &Value) -> Result<Compilation> {
    if !value.is_object() {
        return Err(FlowError::InvalidDefinition);
    }
    let steps: StepMap =
        StepMap::deserialize(value).map_err(|e| FlowError::InvalidRule(e.to_string()))?;
    Ok(compile(&steps))
}

fn expand<C>(out: &mut Compilation, targets: &Targets<'_>, source: &str, rule: &NextRule<C>) {
    let mut pending = vec![rule];

    while let Some(rule) = pending.pop() {
        match rule {
            NextRule::Target(target) => {
                if !target.is_empty() {
                    out.graph.add_edge(source, &targets.normalize(target), None);
                }
            }
            NextRule::Condition(condition) if condition.is_empty() => {
                log::debug!("Step '{}': empty next step condition ignored", source)
            }
            NextRule::Condition(condition) => add_condition_edge(out, targets, source, condition),
            NextRule::Sequence(entries) => {
                // Only nested groups branch; bare entries of this level are skipped.
                let mut branches = Vec::new();
                for entry in entries {
                    match entry {
                        NextRule::Sequence(group) => branches.extend(group.iter()),
                        _ => log::debug!(
                            "Step '{}': bare entry in next step sequence produces no edge",
                            source
                        ),
                    }
                }
                pending.extend(branches.into_iter().rev());
            }
        }
    }
}

fn add_condition_edge<C>(
    out: &mut Compilation,
    targets: &Targets<'_>,
    source: &str,
    condition: &Condition<String, C>,
) {
    let label = match branch_label(condition) {
        Ok(label) => label,
        Err(discriminator) => {
            out.diagnostics.push(Diagnostic::UnlabelableBranch {
                step: source.to_string(),
                discriminator,
            });
            return;
        }
    };

    match condition.outcome.as_deref() {
        Some(target) if !target.is_empty() => {
            out.graph.add_edge(source, &targets.normalize(target), Some(label));
        }
        _ => out.diagnostics.push(Diagnostic::MissingTarget {
            step: source.to_string(),
        }),
    }
}

fn branch_label<C>(condition: &Condition<String, C>) -> std::result::Result<String, Discriminator> {
    if let Some(predicate) = &condition.predicate {
        return predicate
            .name()
            .map(str::to_string)
            .ok_or(Discriminator::Function);
    }

    match &condition.op {
        Operator::Custom(predicate) => predicate
            .name()
            .map(str::to_string)
            .ok_or(Discriminator::Operator),
        Operator::BuiltIn(cmp) => Ok(format!(
            "{} {} {}",
            condition.field,
            cmp,
            render_value(condition.value.as_ref())
        )),
    }
}

/// Maps `next` values onto step identifiers
///
/// Step maps keyed by URL path (`/start`) name their targets without the
/// leading slash; those get it prepended unless the bare name is a step.
struct Targets<'a> {
    declared: HashSet<&'a str>,
    path_keyed: bool,
}

impl<'a> Targets<'a> {
    fn new<C>(steps: &'a StepMap<C>) -> Self {
        let declared: HashSet<&str> = steps.ids().collect();
        let path_keyed = declared.iter().any(|id| id.starts_with('/'));
        Self {
            declared,
            path_keyed,
        }
    }

    fn normalize(&self, target: &str) -> String {
        if !self.path_keyed || target.starts_with('/') || self.declared.contains(target) {
            return target.to_string();
        }
        format!("/{}", target)
    }
}

fn render_value(value: Option<&Value>) -> String {
    match value {
        None => "undefined".to_string(),
        Some(Value::Null) => "null".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => render_value(Some(other)),
            })
            .collect::<Vec<_>>()
            .join(","),
        Some(other) => other.to_string(),
    }
}
