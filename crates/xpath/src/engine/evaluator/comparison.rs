//! `=`, `!=`, `<`, `<=`, `>`, `>=` with the XPath 1.0 node-set rules.
//!
//! A comparison involving a node-set is existential: it holds when some
//! node (or pair of nodes) satisfies the scalar comparison. Each operand is
//! evaluated exactly once; the invariant side is converted up front.

use crate::engine::runtime::Error;
use crate::model::Navigator;
use crate::parser::ast::{CompareOp, Expr};
use crate::xdm::{NodeSequence, Value, string_to_number};

use super::{Focus, evaluate};

pub(crate) fn compare<N: Navigator>(
    op: CompareOp,
    left: &Expr,
    right: &Expr,
    focus: &Focus<'_, N>,
) -> Result<bool, Error> {
    let l = evaluate(left, focus)?;
    let r = evaluate(right, focus)?;
    compare_values(op, l, r)
}

pub(crate) fn compare_values<N: Navigator>(op: CompareOp, l: Value<N>, r: Value<N>) -> Result<bool, Error> {
    match (l, r) {
        (Value::NodeSet(a), Value::NodeSet(b)) => node_sets(op, a, b),
        (Value::NodeSet(a), scalar) => node_set_scalar(op, a, scalar),
        (scalar, Value::NodeSet(b)) => node_set_scalar(op.flip(), b, scalar),
        (a, b) => scalars(op, &a, &b),
    }
}

fn node_sets<N: Navigator>(op: CompareOp, a: NodeSequence<N>, b: NodeSequence<N>) -> Result<bool, Error> {
    let right: Vec<String> = b.map(|n| n.map(|n| n.string_value())).collect::<Result<_, _>>()?;
    if right.is_empty() {
        return Ok(false);
    }
    if op.is_equality() {
        for n in a {
            let s = n?.string_value();
            if right.iter().any(|r| strings(op, &s, r)) {
                return Ok(true);
            }
        }
    } else {
        let right: Vec<f64> = right.iter().map(|s| string_to_number(s)).collect();
        for n in a {
            let x = string_to_number(&n?.string_value());
            if right.iter().any(|&y| numbers(op, x, y)) {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

fn node_set_scalar<N: Navigator>(op: CompareOp, a: NodeSequence<N>, scalar: Value<N>) -> Result<bool, Error> {
    match scalar {
        Value::Boolean(b) => {
            let x = !a.is_empty()?;
            Ok(booleans(op, x, b))
        }
        Value::Number(y) => {
            for n in a {
                if numbers(op, string_to_number(&n?.string_value()), y) {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Value::String(s) if op.is_equality() => {
            for n in a {
                if strings(op, &n?.string_value(), &s) {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Value::String(s) => {
            let y = string_to_number(&s);
            for n in a {
                if numbers(op, string_to_number(&n?.string_value()), y) {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Value::NodeSet(b) => node_sets(op, a, b),
    }
}

fn scalars<N: Navigator>(op: CompareOp, a: &Value<N>, b: &Value<N>) -> Result<bool, Error> {
    if !op.is_equality() {
        return Ok(numbers(op, a.to_number()?, b.to_number()?));
    }
    Ok(match (a, b) {
        (Value::Boolean(_), _) | (_, Value::Boolean(_)) => booleans(op, a.to_boolean()?, b.to_boolean()?),
        (Value::Number(_), _) | (_, Value::Number(_)) => numbers(op, a.to_number()?, b.to_number()?),
        _ => strings(op, &a.to_string_value()?, &b.to_string_value()?),
    })
}

fn numbers(op: CompareOp, a: f64, b: f64) -> bool {
    match op {
        CompareOp::Eq => a == b,
        CompareOp::Ne => a != b,
        CompareOp::Lt => a < b,
        CompareOp::Le => a <= b,
        CompareOp::Gt => a > b,
        CompareOp::Ge => a >= b,
    }
}

fn strings(op: CompareOp, a: &str, b: &str) -> bool {
    match op {
        CompareOp::Eq => a == b,
        _ => a != b,
    }
}

fn booleans(op: CompareOp, a: bool, b: bool) -> bool {
    match op {
        CompareOp::Eq => a == b,
        CompareOp::Ne => a != b,
        _ => numbers(op, f64::from(u8::from(a)), f64::from(u8::from(b))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::simple::{SimpleNavigator, doc, elem, text};
    use crate::xdm::SeqOrder;

    fn items(values: &[&str]) -> NodeSequence<SimpleNavigator> {
        let root = doc()
            .child(elem("r").children(values.iter().map(|v| elem("v").child(text(v)))))
            .build();
        let mut r = root.clone();
        r.move_to_first_child();
        let mut nodes = Vec::new();
        let mut c = r.clone();
        if c.move_to_first_child() {
            nodes.push(c.clone());
            while c.move_to_next() {
                nodes.push(c.clone());
            }
        }
        NodeSequence::from_nodes(nodes, SeqOrder::Document)
    }

    #[test]
    fn node_set_equality_is_existential() {
        let ns = || Value::NodeSet(items(&["1", "2"]));
        assert!(compare_values(CompareOp::Eq, ns(), Value::from("2")).unwrap());
        assert!(compare_values(CompareOp::Ne, ns(), Value::from("2")).unwrap());
        assert!(!compare_values(CompareOp::Eq, ns(), Value::from("3")).unwrap());
    }

    #[test]
    fn scalar_on_the_left_flips_relational_ops() {
        let ns = Value::NodeSet(items(&["5"]));
        assert!(compare_values(CompareOp::Lt, Value::Number(3.0), ns).unwrap());
    }

    #[test]
    fn empty_node_set_compares_false_except_against_booleans() {
        let empty = || Value::<SimpleNavigator>::NodeSet(NodeSequence::empty());
        assert!(!compare_values(CompareOp::Eq, empty(), empty()).unwrap());
        assert!(!compare_values(CompareOp::Ne, empty(), Value::from("")).unwrap());
        assert!(compare_values(CompareOp::Eq, empty(), Value::Boolean(false)).unwrap());
    }

    #[test]
    fn nan_is_unequal_to_itself() {
        let nan = || Value::<SimpleNavigator>::Number(f64::NAN);
        assert!(!compare_values(CompareOp::Eq, nan(), nan()).unwrap());
        assert!(compare_values(CompareOp::Ne, nan(), nan()).unwrap());
    }
}
