//! Comparator table and condition evaluation

use super::ast::{Comparator, Condition, Operator, Predicate};
use serde_json::Value;
use std::cmp::Ordering;

impl Comparator {
    /// Apply the comparator to the field's current value and the rule's value
    pub fn evaluate(&self, current: Option<&Value>, expected: Option<&Value>) -> bool {
        match self {
            Comparator::Gt => matches!(order(current, expected), Some(Ordering::Greater)),
            Comparator::Gte => matches!(
                order(current, expected),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Comparator::Lt => matches!(order(current, expected), Some(Ordering::Less)),
            Comparator::Lte => matches!(
                order(current, expected),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Comparator::Eq | Comparator::Default => loose_equal(current, expected),
            Comparator::NotEq => !loose_equal(current, expected),
            Comparator::In => check_in(current, expected),
        }
    }
}

/// Evaluate a condition against the current value of its field
///
/// `fn` wins over `op`; a custom `op` wins over `value`.
pub fn evaluate<T, C>(condition: &Condition<T, C>, current: Option<&Value>, ctx: &C) -> bool {
    if let Some(predicate) = &condition.predicate {
        return call_predicate(predicate, condition, current, ctx);
    }

    match &condition.op {
        Operator::Custom(predicate) => call_predicate(predicate, condition, current, ctx),
        Operator::BuiltIn(cmp) => cmp.evaluate(current, condition.value.as_ref()),
    }
}

fn call_predicate<T, C>(
    predicate: &Predicate<C>,
    condition: &Condition<T, C>,
    current: Option<&Value>,
    ctx: &C,
) -> bool {
    match predicate.call(current, ctx, &condition.operands()) {
        Some(result) => result,
        None => {
            log::warn!(
                "Predicate '{}' is not bound; treating condition on '{}' as unmatched",
                predicate.name().unwrap_or("<anonymous>"),
                condition.field
            );
            false
        }
    }
}

fn order(current: Option<&Value>, expected: Option<&Value>) -> Option<Ordering> {
    match (current?, expected?) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn numbers_equal(a: &serde_json::Number, b: &serde_json::Number) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

// A missing value and null are interchangeable.
fn loose_equal(current: Option<&Value>, expected: Option<&Value>) -> bool {
    match (current, expected) {
        (None | Some(Value::Null), None | Some(Value::Null)) => true,
        (Some(Value::Number(a)), Some(Value::Number(b))) => numbers_equal(a, b),
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn check_in(current: Option<&Value>, expected: Option<&Value>) -> bool {
    match (current, expected) {
        (Some(value), Some(Value::Array(items))) => items.contains(value),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::condition::ast::Predicate;
    use serde_json::json;

    fn check(cmp: Comparator, current: Value, expected: Value) -> bool {
        cmp.evaluate(Some(&current), Some(&expected))
    }

    #[test]
    fn test_number_ordering() {
        assert!(check(Comparator::Gt, json!(10), json!(5)));
        assert!(!check(Comparator::Gt, json!(5), json!(5)));
        assert!(check(Comparator::Gte, json!(5), json!(5)));
        assert!(check(Comparator::Gte, json!(7.5), json!(7)));
        assert!(check(Comparator::Lt, json!(3), json!(5)));
        assert!(!check(Comparator::Lt, json!(5), json!(5)));
        assert!(check(Comparator::Lte, json!(5), json!(5.0)));
    }

    #[test]
    fn test_string_ordering_is_lexical() {
        assert!(check(Comparator::Gt, json!("b"), json!("a")));
        assert!(check(Comparator::Lt, json!("10"), json!("9")));
    }

    #[test]
    fn test_mixed_types_do_not_order() {
        assert!(!check(Comparator::Gt, json!("10"), json!(5)));
        assert!(!check(Comparator::Lte, json!(null), json!(5)));
        assert!(!Comparator::Gt.evaluate(None, Some(&json!(0))));
    }

    #[test]
    fn test_loose_equality() {
        assert!(check(Comparator::Eq, json!(5), json!(5.0)));
        assert!(check(Comparator::Eq, json!("baz"), json!("baz")));
        assert!(!check(Comparator::Eq, json!("5"), json!(5)));
        assert!(Comparator::Eq.evaluate(None, Some(&json!(null))));
        assert!(check(Comparator::NotEq, json!(3), json!(5)));
        assert!(!check(Comparator::NotEq, json!(5), json!(5)));
    }

    #[test]
    fn test_default_behaves_like_loose_equality() {
        assert!(check(Comparator::Default, json!("baz"), json!("baz")));
        assert!(check(Comparator::Default, json!(10), json!(10.0)));
        assert!(!check(Comparator::Default, json!(7), json!(10)));
        assert!(Comparator::Default.evaluate(None, None));
        assert!(Comparator::Default.evaluate(None, Some(&json!(null))));
        assert!(Comparator::Default.evaluate(Some(&json!(null)), None));
        assert!(!Comparator::Default.evaluate(None, Some(&json!(0))));

        let samples = [None, Some(json!(null)), Some(json!(1)), Some(json!("1"))];
        for current in &samples {
            for expected in &samples {
                assert_eq!(
                    Comparator::Default.evaluate(current.as_ref(), expected.as_ref()),
                    Comparator::Eq.evaluate(current.as_ref(), expected.as_ref())
                );
            }
        }
    }

    #[test]
    fn test_in_requires_exact_element() {
        assert!(check(Comparator::In, json!("bar"), json!(["bar", "baz"])));
        assert!(!check(Comparator::In, json!("qux"), json!(["bar", "baz"])));
        assert!(!check(Comparator::In, json!("1"), json!([1, 2])));
        assert!(!check(Comparator::In, json!("bar"), json!("barbaz")));
        assert!(!Comparator::In.evaluate(None, Some(&json!([null]))));
    }

    #[test]
    fn test_fn_overrides_op_and_value() {
        let cond: Condition<String> = Condition::new("age", Comparator::Gt, 100)
            .with_predicate(Predicate::named("always", |_, _, _| true));
        assert!(evaluate(&cond, Some(&json!(1)), &()));
    }

    #[test]
    fn test_custom_op_receives_operands_and_context() {
        let op = Predicate::named("differsFromContext", |current, ctx: &String, ops| {
            assert_eq!(ops.field, "foo");
            current.and_then(Value::as_str) != Some(ctx.as_str())
        });
        let cond: Condition<String, String> = Condition::new("foo", op, json!(null));
        assert!(evaluate(&cond, Some(&json!("baz")), &"foo".to_string()));
        assert!(!evaluate(&cond, Some(&json!("foo")), &"foo".to_string()));
    }

    #[test]
    fn test_unbound_predicate_never_matches() {
        let cond: Condition<String> = Condition::predicate(Predicate::reference("isAdult"));
        assert!(!evaluate(&cond, Some(&json!(30)), &()));
    }
}
