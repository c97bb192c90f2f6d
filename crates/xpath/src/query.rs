//! Compiled queries: the public entry point of the engine.

use std::sync::Arc;

use tracing::debug;

use crate::engine::evaluator::sort::{SortKey, sort_nodes};
use crate::engine::evaluator::{ContextSize, Focus, evaluate};
use crate::engine::runtime::{DynamicContext, Error, ErrorCode, StaticContext};
use crate::model::Navigator;
use crate::parser::{self, ast::Expr};
use crate::xdm::{NodeSequence, ReturnType, Value};

pub use crate::engine::evaluator::sort::{CaseOrder, SortDataType, SortOrder};

/// Compile `text` into a reusable query. Prefixes are resolved against
/// `static_ctx`; core-function arities are checked here.
pub fn compile(text: &str, static_ctx: &StaticContext) -> Result<CompiledQuery, Error> {
    debug!(query = text, "compile");
    let expr = parser::parse(text, static_ctx).inspect_err(|e| {
        debug!(query = text, error = %e, "compile failed");
    })?;
    Ok(CompiledQuery {
        expr: Arc::new(expr),
        text: text.to_string(),
        static_ctx: static_ctx.clone(),
        sorts: Vec::new(),
    })
}

/// A parsed expression plus optional sort keys.
///
/// Evaluation never mutates the query; one instance can be evaluated any
/// number of times against different nodes and contexts.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    expr: Arc<Expr>,
    text: String,
    static_ctx: StaticContext,
    sorts: Vec<SortKey>,
}

impl CompiledQuery {
    /// The source text.
    pub fn expression(&self) -> &str {
        &self.text
    }

    pub fn ast(&self) -> &Expr {
        &self.expr
    }

    pub fn return_type(&self) -> ReturnType {
        self.expr.return_type()
    }

    /// Evaluate with `node` as the context node (position 1, size 1).
    ///
    /// A node-set result is lazy unless sort keys are registered: errors
    /// raised while walking it are returned by the sequence's `move_next`.
    pub fn evaluate<N: Navigator>(&self, node: &N, ctx: &DynamicContext<N>) -> Result<Value<N>, Error> {
        self.finish(evaluate(&self.expr, &Focus::single(node, ctx))?, ctx)
    }

    /// Evaluate with the current node of `seq` as the context node; the
    /// context position and size come from the sequence.
    pub fn evaluate_at<N: Navigator>(
        &self,
        seq: &NodeSequence<N>,
        ctx: &DynamicContext<N>,
    ) -> Result<Value<N>, Error> {
        let Some(node) = seq.current() else {
            return Err(Error::from_code(
                ErrorCode::XPDY0002,
                "context sequence is not positioned on a node",
            ));
        };
        let size = || seq.len();
        let focus = Focus {
            node,
            position: seq.position(),
            size: ContextSize::Lazy(&size),
            ctx,
        };
        self.finish(evaluate(&self.expr, &focus)?, ctx)
    }

    fn finish<N: Navigator>(&self, value: Value<N>, ctx: &DynamicContext<N>) -> Result<Value<N>, Error> {
        if self.sorts.is_empty() {
            return Ok(value);
        }
        let nodes = value.into_node_set()?;
        Ok(Value::NodeSet(sort_nodes(nodes, &self.sorts, ctx)?))
    }

    /// Evaluate and require a node-set (`err:XPTY0004` otherwise).
    pub fn select<N: Navigator>(&self, node: &N, ctx: &DynamicContext<N>) -> Result<NodeSequence<N>, Error> {
        self.evaluate(node, ctx)?.into_node_set()
    }

    /// First selected node: in document order, or in sort order when sort
    /// keys are registered.
    pub fn select_first<N: Navigator>(&self, node: &N, ctx: &DynamicContext<N>) -> Result<Option<N>, Error> {
        let mut nodes = self.select(node, ctx)?;
        if !self.sorts.is_empty() {
            return nodes.next().transpose();
        }
        nodes.first_in_document_order()
    }

    /// Pattern test: `node` is selected when the query is evaluated from
    /// `node` itself or from one of its ancestors.
    pub fn matches<N: Navigator>(&self, node: &N, ctx: &DynamicContext<N>) -> Result<bool, Error> {
        let mut origin = node.clone();
        loop {
            for hit in self.select(&origin, ctx)? {
                if hit?.is_same_position(node) {
                    return Ok(true);
                }
            }
            if !origin.move_to_parent() {
                return Ok(false);
            }
        }
    }

    /// Register a sort key; keys apply in registration order.
    pub fn add_sort(
        &mut self,
        key: &str,
        order: SortOrder,
        case_order: CaseOrder,
        lang: Option<&str>,
        data_type: SortDataType,
    ) -> Result<(), Error> {
        let key = compile(key, &self.static_ctx)?;
        self.add_sort_query(&key, order, case_order, lang, data_type)
    }

    /// [`CompiledQuery::add_sort`] with an already compiled key expression.
    pub fn add_sort_query(
        &mut self,
        key: &CompiledQuery,
        order: SortOrder,
        case_order: CaseOrder,
        lang: Option<&str>,
        data_type: SortDataType,
    ) -> Result<(), Error> {
        if self.return_type().is_scalar() {
            return Err(Error::from_code(
                ErrorCode::XPTY0004,
                format!("cannot sort the {:?} result of {}", self.return_type(), self.text),
            ));
        }
        self.sorts.push(SortKey {
            expr: Arc::clone(&key.expr),
            order,
            case_order,
            lang: lang.map(str::to_string),
            data_type,
        });
        Ok(())
    }
}
