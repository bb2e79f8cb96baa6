// SPDX-License-Identifier: MIT

//! Rule model shared by the graph compiler and the selector resolver

use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// The field and expected value handed to a custom predicate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Operands<'a> {
    pub field: &'a str,
    pub value: Option<&'a Value>,
}

/// Signature of a caller-supplied predicate: `(current, context, operands)`
pub type PredicateFn<C> = dyn Fn(Option<&Value>, &C, &Operands<'_>) -> bool + Send + Sync;

/// A custom discriminator used as `fn` or as `op`
///
/// Rules loaded from YAML/JSON only carry the name; the function is attached
/// later through [`PredicateRegistry`](crate::flow::registry::PredicateRegistry).
/// Rules built in code may carry a function without a name, which the graph
/// compiler cannot label.
pub struct Predicate<C = ()> {
    name: Option<String>,
    func: Option<Arc<PredicateFn<C>>>,
}

impl<C> Predicate<C> {
    /// A named predicate backed by `func`
    pub fn named<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Option<&Value>, &C, &Operands<'_>) -> bool + Send + Sync + 'static,
    {
        Self {
            name: Some(name.into()),
            func: Some(Arc::new(func)),
        }
    }

    /// A predicate with no name
    pub fn anonymous<F>(func: F) -> Self
    where
        F: Fn(Option<&Value>, &C, &Operands<'_>) -> bool + Send + Sync + 'static,
    {
        Self {
            name: None,
            func: Some(Arc::new(func)),
        }
    }

    /// A reference by name, not yet bound to a function
    pub fn reference(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            func: None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_bound(&self) -> bool {
        self.func.is_some()
    }

    /// Attach a function, keeping the name
    pub fn bind(&mut self, func: Arc<PredicateFn<C>>) {
        self.func = Some(func);
    }

    /// Invoke the predicate; `None` when no function is bound
    pub fn call(&self, current: Option<&Value>, ctx: &C, operands: &Operands<'_>) -> Option<bool> {
        self.func.as_ref().map(|f| f(current, ctx, operands))
    }
}

impl<C> Clone for Predicate<C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            func: self.func.clone(),
        }
    }
}

impl<C> fmt::Debug for Predicate<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("name", &self.name)
            .field("bound", &self.func.is_some())
            .finish()
    }
}

impl<'de, C> Deserialize<'de> for Predicate<C> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        if name.is_empty() {
            return Err(de::Error::custom("predicate name must not be empty"));
        }
        Ok(Predicate::reference(name))
    }
}

/// Built-in comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Comparator {
    /// >
    Gt,
    /// >=
    Gte,
    /// <
    Lt,
    /// <=
    Lte,
    /// == (loose)
    Eq,
    /// !=
    NotEq,
    /// membership in an array value
    In,
    /// implicit equality, written `=` or omitted; same as `==`
    #[default]
    Default,
}

impl Comparator {
    /// Look up a comparator by its symbol
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let cmp = match symbol {
            ">" => Comparator::Gt,
            ">=" => Comparator::Gte,
            "<" => Comparator::Lt,
            "<=" => Comparator::Lte,
            "==" => Comparator::Eq,
            "!=" => Comparator::NotEq,
            "in" => Comparator::In,
            "=" => Comparator::Default,
            _ => return None,
        };
        Some(cmp)
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Comparator::Gt => ">",
            Comparator::Gte => ">=",
            Comparator::Lt => "<",
            Comparator::Lte => "<=",
            Comparator::Eq => "==",
            Comparator::NotEq => "!=",
            Comparator::In => "in",
            Comparator::Default => "=",
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// The `op` of a condition
pub enum Operator<C = ()> {
    BuiltIn(Comparator),
    Custom(Predicate<C>),
}

impl<C> Default for Operator<C> {
    fn default() -> Self {
        Operator::BuiltIn(Comparator::Default)
    }
}

impl<C> Clone for Operator<C> {
    fn clone(&self) -> Self {
        match self {
            Operator::BuiltIn(cmp) => Operator::BuiltIn(*cmp),
            Operator::Custom(p) => Operator::Custom(p.clone()),
        }
    }
}

impl<C> fmt::Debug for Operator<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::BuiltIn(cmp) => f.debug_tuple("BuiltIn").field(cmp).finish(),
            Operator::Custom(p) => f.debug_tuple("Custom").field(p).finish(),
        }
    }
}

impl<C> From<Comparator> for Operator<C> {
    fn from(cmp: Comparator) -> Self {
        Operator::BuiltIn(cmp)
    }
}

impl<C> From<Predicate<C>> for Operator<C> {
    fn from(p: Predicate<C>) -> Self {
        Operator::Custom(p)
    }
}

impl<'de, C> Deserialize<'de> for Operator<C> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OperatorVisitor<C>(std::marker::PhantomData<C>);

        impl<'de, C> Visitor<'de> for OperatorVisitor<C> {
            type Value = Operator<C>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a comparator symbol or a predicate name")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                if v.is_empty() {
                    return Ok(Operator::default());
                }
                Ok(match Comparator::from_symbol(v) {
                    Some(cmp) => Operator::BuiltIn(cmp),
                    None => Operator::Custom(Predicate::reference(v)),
                })
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(Operator::default())
            }

            fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(Operator::default())
            }
        }

        deserializer.deserialize_any(OperatorVisitor(std::marker::PhantomData))
    }
}

/// A single rule entry: `{ field, op, value, fn?, next|key }`
///
/// `T` is the outcome: a step identifier for next-rules, a nested selector
/// for content keys.
#[derive(Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Condition<T, C = ()> {
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub op: Operator<C>,
    #[serde(default)]
    pub value: Option<Value>,
    /// When present, decides the match on its own
    #[serde(default, rename = "fn")]
    pub predicate: Option<Predicate<C>>,
    #[serde(default, rename = "next", alias = "key")]
    pub outcome: Option<T>,
}

impl<T, C> Condition<T, C> {
    pub fn new(field: impl Into<String>, op: impl Into<Operator<C>>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op: op.into(),
            value: Some(value.into()),
            predicate: None,
            outcome: None,
        }
    }

    /// Implicit equality on `field`
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Comparator::Default, value)
    }

    /// A condition decided entirely by `predicate`
    pub fn predicate(predicate: Predicate<C>) -> Self {
        Self {
            field: String::new(),
            op: Operator::default(),
            value: None,
            predicate: Some(predicate),
            outcome: None,
        }
    }

    pub fn then(mut self, outcome: impl Into<T>) -> Self {
        self.outcome = Some(outcome.into());
        self
    }

    pub fn with_predicate(mut self, predicate: Predicate<C>) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// True for a condition with nothing set, as decoded from `{}`
    pub fn is_empty(&self) -> bool {
        self.field.is_empty()
            && self.value.is_none()
            && self.predicate.is_none()
            && self.outcome.is_none()
            && matches!(self.op, Operator::BuiltIn(Comparator::Default))
    }

    pub fn operands(&self) -> Operands<'_> {
        Operands {
            field: &self.field,
            value: self.value.as_ref(),
        }
    }

    /// Predicates reachable from this condition, `fn` first
    pub(crate) fn predicates_mut(&mut self) -> impl Iterator<Item = &mut Predicate<C>> {
        let op = match &mut self.op {
            Operator::Custom(p) => Some(p),
            Operator::BuiltIn(_) => None,
        };
        self.predicate.as_mut().into_iter().chain(op)
    }
}

impl<T: Clone, C> Clone for Condition<T, C> {
    fn clone(&self) -> Self {
        Self {
            field: self.field.clone(),
            op: self.op.clone(),
            value: self.value.clone(),
            predicate: self.predicate.clone(),
            outcome: self.outcome.clone(),
        }
    }
}

impl<T: fmt::Debug, C> fmt::Debug for Condition<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condition")
            .field("field", &self.field)
            .field("op", &self.op)
            .field("value", &self.value)
            .field("predicate", &self.predicate)
            .field("outcome", &self.outcome)
            .finish()
    }
}
