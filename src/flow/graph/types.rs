//! Step map and graph type definitions

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;

use crate::flow::condition::Condition;

/// How a step moves on
#[derive(Deserialize)]
#[serde(untagged, bound(deserialize = ""))]
pub enum NextRule<C = ()> {
    /// Unconditional transition
    Target(String),
    /// OR-group of rules, in declared order
    Sequence(Vec<NextRule<C>>),
    /// Conditional transition
    Condition(Condition<String, C>),
}

impl<C> NextRule<C> {
    pub fn to(target: impl Into<String>) -> Self {
        NextRule::Target(target.into())
    }

    pub fn when(condition: Condition<String, C>) -> Self {
        NextRule::Condition(condition)
    }

    pub fn any(rules: Vec<NextRule<C>>) -> Self {
        NextRule::Sequence(rules)
    }
}

impl<C> From<&str> for NextRule<C> {
    fn from(target: &str) -> Self {
        NextRule::Target(target.to_string())
    }
}

impl<C> From<Condition<String, C>> for NextRule<C> {
    fn from(condition: Condition<String, C>) -> Self {
        NextRule::Condition(condition)
    }
}

impl<C> Clone for NextRule<C> {
    fn clone(&self) -> Self {
        match self {
            NextRule::Target(t) => NextRule::Target(t.clone()),
            NextRule::Sequence(rules) => NextRule::Sequence(rules.clone()),
            NextRule::Condition(c) => NextRule::Condition(c.clone()),
        }
    }
}

impl<C> fmt::Debug for NextRule<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NextRule::Target(t) => f.debug_tuple("Target").field(t).finish(),
            NextRule::Sequence(rules) => f.debug_tuple("Sequence").field(rules).finish(),
            NextRule::Condition(c) => f.debug_tuple("Condition").field(c).finish(),
        }
    }
}

/// A step definition; other keys of the step are ignored
#[derive(Deserialize)]
#[serde(bound(deserialize = ""))]
pub struct Step<C = ()> {
    #[serde(default)]
    pub next: Option<NextRule<C>>,
}

impl<C> Step<C> {
    /// A step with no outgoing transition
    pub fn terminal() -> Self {
        Self { next: None }
    }

    /// A step with a single conditional transition
    pub fn when(condition: Condition<String, C>) -> Self {
        Self {
            next: Some(NextRule::Condition(condition)),
        }
    }

    pub fn with_next(next: impl Into<NextRule<C>>) -> Self {
        Self {
            next: Some(next.into()),
        }
    }
}

impl<C> Default for Step<C> {
    fn default() -> Self {
        Self::terminal()
    }
}

impl<C> Clone for Step<C> {
    fn clone(&self) -> Self {
        Self {
            next: self.next.clone(),
        }
    }
}

impl<C> fmt::Debug for Step<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step").field("next", &self.next).finish()
    }
}

/// Steps keyed by identifier, in declaration order
pub struct StepMap<C = ()> {
    steps: Vec<(String, Step<C>)>,
}

impl<C> StepMap<C> {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Add a step; redefining an identifier keeps its original position
    pub fn insert(&mut self, id: impl Into<String>, step: Step<C>) {
        let id = id.into();
        match self.steps.iter_mut().find(|(existing, _)| *existing == id) {
            Some((_, slot)) => *slot = step,
            None => self.steps.push((id, step)),
        }
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn step(mut self, id: impl Into<String>, step: Step<C>) -> Self {
        self.insert(id, step);
        self
    }

    pub fn get(&self, id: &str) -> Option<&Step<C>> {
        self.steps.iter().find(|(k, _)| k == id).map(|(_, s)| s)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Step<C>)> {
        self.steps.iter().map(|(k, s)| (k.as_str(), s))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Step<C>)> {
        self.steps.iter_mut().map(|(k, s)| (k.as_str(), s))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl<C> Default for StepMap<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Clone for StepMap<C> {
    fn clone(&self) -> Self {
        Self {
            steps: self.steps.clone(),
        }
    }
}

impl<C> fmt::Debug for StepMap<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'de, C> Deserialize<'de> for StepMap<C> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct StepMapVisitor<C>(PhantomData<C>);

        impl<'de, C> Visitor<'de> for StepMapVisitor<C> {
            type Value = StepMap<C>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of step definitions")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = StepMap::new();
                while let Some((id, step)) = access.next_entry::<String, Option<Step<C>>>()? {
                    map.insert(id, step.unwrap_or_default());
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(StepMapVisitor(PhantomData))
    }
}

/// A directed edge between two steps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub source: String,
    pub target: String,
    /// Human-readable condition; `None` for unconditional transitions
    pub label: Option<String>,
}

/// Directed graph of steps with insertion-ordered nodes and edges
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graph {
    nodes: Vec<String>,
    known: HashSet<String>,
    edges: Vec<Edge>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node unless it already exists
    pub fn set_node(&mut self, id: &str) {
        if self.known.insert(id.to_string()) {
            self.nodes.push(id.to_string());
        }
    }

    /// Add an edge, creating missing endpoints
    pub fn add_edge(&mut self, source: &str, target: &str, label: Option<String>) {
        self.set_node(source);
        self.set_node(target);
        self.edges.push(Edge {
            source: source.to_string(),
            target: target.to_string(),
            label,
        });
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.known.contains(id)
    }

    /// Targets reachable in one transition from `id`, in edge order
    pub fn successors(&self, id: &str) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.edges
            .iter()
            .filter(|e| e.source == id)
            .map(|e| e.target.as_str())
            .filter(|t| seen.insert(*t))
            .collect()
    }

    /// Nodes with no outgoing edge
    pub fn sinks(&self) -> Vec<&str> {
        let sources: HashSet<&str> = self.edges.iter().map(|e| e.source.as_str()).collect();
        self.nodes
            .iter()
            .map(String::as_str)
            .filter(|n| !sources.contains(n))
            .collect()
    }

    /// Render as a Graphviz digraph
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph {\n");
        for node in &self.nodes {
            out.push_str(&format!("    {};\n", dot_quote(node)));
        }
        for edge in &self.edges {
            out.push_str(&format!(
                "    {} -> {}",
                dot_quote(&edge.source),
                dot_quote(&edge.target)
            ));
            if let Some(label) = &edge.label {
                out.push_str(&format!(" [label={}]", dot_quote(label)));
            }
            out.push_str(";\n");
        }
        out.push('}');
        out.push('\n');
        out
    }
}

fn dot_quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

// Same layout as graphlib's `json.write`: `{ nodes: [{v}], edges: [{v, w, value?}] }`
impl Serialize for Graph {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Nodes<'a>(&'a [String]);
        struct Edges<'a>(&'a [Edge]);

        impl Serialize for Nodes<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
                for node in self.0 {
                    let mut entry = std::collections::BTreeMap::new();
                    entry.insert("v", node);
                    seq.serialize_element(&entry)?;
                }
                seq.end()
            }
        }

        impl Serialize for Edges<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
                for edge in self.0 {
                    seq.serialize_element(&EdgeEntry(edge))?;
                }
                seq.end()
            }
        }

        struct EdgeEntry<'a>(&'a Edge);

        impl Serialize for EdgeEntry<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let len = if self.0.label.is_some() { 3 } else { 2 };
                let mut map = serializer.serialize_map(Some(len))?;
                map.serialize_entry("v", &self.0.source)?;
                map.serialize_entry("w", &self.0.target)?;
                if let Some(label) = &self.0.label {
                    map.serialize_entry("value", label)?;
                }
                map.end()
            }
        }

        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("nodes", &Nodes(&self.nodes))?;
        map.serialize_entry("edges", &Edges(&self.edges))?;
        map.end()
    }
}

/// What kind of discriminator could not be labeled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discriminator {
    /// The condition's `fn`
    Function,
    /// A callable `op`
    Operator,
}

/// Non-fatal findings collected during compilation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A callable discriminator has no name; its edge was omitted
    UnlabelableBranch {
        step: String,
        discriminator: Discriminator,
    },
    /// A condition names no target step; its edge was omitted
    MissingTarget { step: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnlabelableBranch {
                step,
                discriminator: Discriminator::Function,
            } => write!(f, "step '{}': unnamed function in next step condition", step),
            Diagnostic::UnlabelableBranch {
                step,
                discriminator: Discriminator::Operator,
            } => write!(f, "step '{}': unnamed function used as operator", step),
            Diagnostic::MissingTarget { step } => {
                write!(f, "step '{}': condition has no next step", step)
            }
        }
    }
}
