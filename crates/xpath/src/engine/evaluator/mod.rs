//! Expression evaluation against a positioned context.
//!
//! Scalar sub-expressions are computed eagerly; node-set sub-expressions
//! become cursor chains that do their work in `move_next`. Cursors own
//! clones of the dynamic context and of the expression nodes they need, so
//! a returned [`NodeSequence`] stays valid after `evaluate` returns.

pub(crate) mod axes;
pub(crate) mod comparison;
pub(crate) mod cursors;
pub mod sort;

use std::sync::Arc;

use smallvec::SmallVec;

use crate::engine::runtime::{CallCtx, DynamicContext, Error, ErrorCode, ResolveError};
use crate::model::Navigator;
use crate::parser::ast::{ArithOp, Expr, Step};
use crate::xdm::{NodeSequence, SeqOrder, Value};

use axes::step_cursor;
use cursors::{DocOrderCursor, PathCursor, PredicateCursor, UnionCursor};

/// Context size as seen by `last()`.
#[derive(Clone, Copy)]
pub(crate) enum ContextSize<'a> {
    Known(usize),
    /// Computed on demand by walking a clone of the context sequence.
    Lazy(&'a dyn Fn() -> Result<usize, Error>),
}

/// The positioned context an expression is evaluated in: context node,
/// 1-based position, size and the dynamic configuration.
pub(crate) struct Focus<'a, N> {
    pub(crate) node: &'a N,
    pub(crate) position: usize,
    pub(crate) size: ContextSize<'a>,
    pub(crate) ctx: &'a DynamicContext<N>,
}

impl<'a, N> Focus<'a, N> {
    pub(crate) fn single(node: &'a N, ctx: &'a DynamicContext<N>) -> Self {
        Self {
            node,
            position: 1,
            size: ContextSize::Known(1),
            ctx,
        }
    }

    pub(crate) fn size(&self) -> Result<usize, Error> {
        match self.size {
            ContextSize::Known(n) => Ok(n),
            ContextSize::Lazy(f) => f(),
        }
    }
}

pub(crate) fn evaluate<N: Navigator>(expr: &Expr, focus: &Focus<'_, N>) -> Result<Value<N>, Error> {
    Ok(match expr {
        Expr::Number(n) => Value::Number(*n),
        Expr::Literal(s) => Value::String(s.clone()),
        Expr::Variable(name) => focus.ctx.variable(name).cloned().ok_or_else(|| {
            Error::from_code(ErrorCode::XPST0008, format!("variable ${name} is not bound"))
        })?,
        Expr::Or(l, r) => Value::Boolean(evaluate_boolean(l, focus)? || evaluate_boolean(r, focus)?),
        Expr::And(l, r) => Value::Boolean(evaluate_boolean(l, focus)? && evaluate_boolean(r, focus)?),
        Expr::Compare { op, left, right } => {
            Value::Boolean(comparison::compare(*op, left, right, focus)?)
        }
        Expr::Arithmetic { op, left, right } => {
            let a = evaluate_number(left, focus)?;
            let b = evaluate_number(right, focus)?;
            Value::Number(match op {
                ArithOp::Add => a + b,
                ArithOp::Sub => a - b,
                ArithOp::Mul => a * b,
                ArithOp::Div => a / b,
                ArithOp::Mod => a % b,
            })
        }
        Expr::Negate(e) => Value::Number(-evaluate_number(e, focus)?),
        Expr::Union(l, r) => {
            let a = evaluate_node_set(l, focus)?;
            let b = evaluate_node_set(r, focus)?;
            Value::NodeSet(NodeSequence::new(Box::new(UnionCursor::new(
                a.into_cursor(),
                b.into_cursor(),
            ))))
        }
        Expr::Root => {
            let mut root = focus.node.clone();
            root.move_to_root();
            Value::NodeSet(NodeSequence::singleton(root))
        }
        Expr::Step(step) => Value::NodeSet(NodeSequence::new(step_cursor(
            focus.node,
            step,
            focus.ctx,
        ))),
        Expr::Path { left, step } => {
            let input = evaluate_node_set(left, focus)?;
            Value::NodeSet(path(input, step, focus.ctx))
        }
        Expr::Filter { base, predicates } => {
            let input = evaluate_node_set(base, focus)?;
            let mut cursor = input.into_cursor();
            if cursor.order() != SeqOrder::Document {
                cursor = Box::new(DocOrderCursor::new(cursor));
            }
            for p in predicates {
                cursor = Box::new(PredicateCursor::new(cursor, Arc::clone(p), focus.ctx.clone()));
            }
            Value::NodeSet(NodeSequence::new(cursor))
        }
        Expr::FunctionCall { name, args, .. } => {
            let values = args
                .iter()
                .map(|a| evaluate(a, focus))
                .collect::<Result<SmallVec<[Value<N>; 4]>, Error>>()?;
            let func = focus.ctx.functions.resolve(name, values.len()).map_err(|e| match e {
                ResolveError::Unknown(n) => {
                    Error::from_code(ErrorCode::XPST0017, format!("unknown function {n}()"))
                }
                ResolveError::WrongArity { name, available } => Error::from_code(
                    ErrorCode::XPST0017,
                    format!(
                        "function {name}() does not take {} argument(s); available arities: {available:?}",
                        values.len()
                    ),
                ),
            })?;
            func(&CallCtx::new(focus), values.as_slice())?
        }
        Expr::Position => Value::Number(focus.position as f64),
        Expr::Last => Value::Number(focus.size()? as f64),
    })
}

pub(crate) fn evaluate_boolean<N: Navigator>(expr: &Expr, focus: &Focus<'_, N>) -> Result<bool, Error> {
    evaluate(expr, focus)?.to_boolean()
}

pub(crate) fn evaluate_number<N: Navigator>(expr: &Expr, focus: &Focus<'_, N>) -> Result<f64, Error> {
    evaluate(expr, focus)?.to_number()
}

pub(crate) fn evaluate_string<N: Navigator>(expr: &Expr, focus: &Focus<'_, N>) -> Result<String, Error> {
    evaluate(expr, focus)?.to_string_value()
}

/// Node-set evaluation with the required-type check: scalar expressions are
/// rejected up front, `Any` expressions once their value is known.
pub(crate) fn evaluate_node_set<N: Navigator>(
    expr: &Expr,
    focus: &Focus<'_, N>,
) -> Result<NodeSequence<N>, Error> {
    let rt = expr.return_type();
    if rt.is_scalar() {
        return Err(Error::from_code(
            ErrorCode::XPTY0004,
            format!("{expr} is a {rt:?}, not a node-set"),
        ));
    }
    evaluate(expr, focus)?.into_node_set()
}

/// `input/step`, in document order without duplicates.
pub(crate) fn path<N: Navigator>(
    input: NodeSequence<N>,
    step: &Arc<Step>,
    ctx: &DynamicContext<N>,
) -> NodeSequence<N> {
    NodeSequence::new(Box::new(PathCursor::new(
        input.into_cursor(),
        Arc::clone(step),
        ctx.clone(),
    )))
}
