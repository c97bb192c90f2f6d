//! Composite cursors: predicates, path composition, union and
//! document-order normalization.

use core::cmp::Ordering;
use std::cell::Cell;
use std::sync::Arc;

use tracing::trace;

use crate::engine::runtime::{DynamicContext, Error, ErrorCode};
use crate::model::{Navigator, NodeOrder, try_document_order};
use crate::parser::ast::{Expr, Step};
use crate::xdm::{NodeCursor, SeqOrder, Value, VecCursor};

use super::axes::step_cursor;
use super::{ContextSize, Focus, evaluate};

/// Sort into document order and drop duplicates. Nodes that cannot be
/// ordered against each other fail with `err:FOER0000`.
pub(crate) fn sort_document_order<N: Navigator>(mut nodes: Vec<N>) -> Result<Vec<N>, Error> {
    let mut failure = None;
    nodes.sort_by(|a, b| match a.compare_position(b) {
        NodeOrder::Before => Ordering::Less,
        NodeOrder::After => Ordering::Greater,
        NodeOrder::Same => Ordering::Equal,
        NodeOrder::Unknown => {
            failure.get_or_insert_with(|| {
                Error::from_code(
                    ErrorCode::FOER0000,
                    "nodes from different documents cannot be ordered",
                )
            });
            Ordering::Equal
        }
    });
    if let Some(e) = failure {
        return Err(e);
    }
    nodes.dedup_by(|a, b| a.is_same_position(b));
    Ok(nodes)
}

fn drain<N: Navigator>(cursor: &mut dyn NodeCursor<N>, out: &mut Vec<N>) -> Result<(), Error> {
    while cursor.move_next()? {
        if let Some(n) = cursor.current() {
            out.push(n.clone());
        }
    }
    Ok(())
}

/// `[expr]` over an input cursor.
///
/// A numeric predicate value selects by position; anything else is
/// converted to boolean. Positions follow the input's enumeration order, so
/// on reverse axes position 1 is the node nearest the context node.
pub(crate) struct PredicateCursor<N> {
    input: Box<dyn NodeCursor<N>>,
    predicate: Arc<Expr>,
    ctx: DynamicContext<N>,
    input_size: Cell<Option<usize>>,
    pos: usize,
}

impl<N: Navigator> PredicateCursor<N> {
    pub(crate) fn new(input: Box<dyn NodeCursor<N>>, predicate: Arc<Expr>, ctx: DynamicContext<N>) -> Self {
        Self {
            input,
            predicate,
            ctx,
            input_size: Cell::new(None),
            pos: 0,
        }
    }
}

impl<N: Navigator> NodeCursor<N> for PredicateCursor<N> {
    fn move_next(&mut self) -> Result<bool, Error> {
        while self.input.move_next()? {
            let input = &*self.input;
            let Some(node) = input.current() else {
                continue;
            };
            let cached = &self.input_size;
            let size = || -> Result<usize, Error> {
                if let Some(n) = cached.get() {
                    return Ok(n);
                }
                let n = input.count()?;
                cached.set(Some(n));
                Ok(n)
            };
            let position = input.position();
            let focus = Focus {
                node,
                position,
                size: ContextSize::Lazy(&size),
                ctx: &self.ctx,
            };
            let keep = match evaluate(&self.predicate, &focus)? {
                Value::Number(n) => n == position as f64,
                other => other.to_boolean()?,
            };
            if keep {
                self.pos += 1;
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn current(&self) -> Option<&N> {
        self.input.current()
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn boxed_clone(&self) -> Box<dyn NodeCursor<N>> {
        Box::new(Self {
            input: self.input.boxed_clone(),
            predicate: Arc::clone(&self.predicate),
            ctx: self.ctx.clone(),
            input_size: self.input_size.clone(),
            pos: self.pos,
        })
    }

    fn order(&self) -> SeqOrder {
        self.input.order()
    }
}

/// A step cursor together with the node it currently points at.
struct Column<N> {
    head: N,
    cursor: Box<dyn NodeCursor<N>>,
}

impl<N: Navigator> Clone for Column<N> {
    fn clone(&self) -> Self {
        Self {
            head: self.head.clone(),
            cursor: self.cursor.boxed_clone(),
        }
    }
}

enum PathState<N> {
    /// Left input is in document order and the step moves forward: every
    /// result of a left node lies at or after it, so columns can be merged
    /// while the left input is consumed lazily.
    Merge {
        left: Box<dyn NodeCursor<N>>,
        left_done: bool,
        /// Next left node, not yet expanded.
        pending: Option<N>,
        /// Sorted by head, largest first.
        columns: Vec<Column<N>>,
        last: Option<N>,
    },
    Unsorted(Box<dyn NodeCursor<N>>),
    Sorted(Box<dyn NodeCursor<N>>),
}

impl<N: Navigator> Clone for PathState<N> {
    fn clone(&self) -> Self {
        match self {
            PathState::Merge {
                left,
                left_done,
                pending,
                columns,
                last,
            } => PathState::Merge {
                left: left.boxed_clone(),
                left_done: *left_done,
                pending: pending.clone(),
                columns: columns.clone(),
                last: last.clone(),
            },
            PathState::Unsorted(left) => PathState::Unsorted(left.boxed_clone()),
            PathState::Sorted(v) => PathState::Sorted(v.boxed_clone()),
        }
    }
}

/// `left/step`: the union of the step applied to every left node, in
/// document order without duplicates.
pub(crate) struct PathCursor<N> {
    step: Arc<Step>,
    ctx: DynamicContext<N>,
    state: PathState<N>,
    current: Option<N>,
    pos: usize,
}

impl<N: Navigator> PathCursor<N> {
    pub(crate) fn new(left: Box<dyn NodeCursor<N>>, step: Arc<Step>, ctx: DynamicContext<N>) -> Self {
        let state = if left.order() == SeqOrder::Document && !step.axis.is_reverse() {
            PathState::Merge {
                left,
                left_done: false,
                pending: None,
                columns: Vec::new(),
                last: None,
            }
        } else {
            PathState::Unsorted(left)
        };
        Self {
            step,
            ctx,
            state,
            current: None,
            pos: 0,
        }
    }

    fn materialize(&self, left: &mut dyn NodeCursor<N>) -> Result<Box<dyn NodeCursor<N>>, Error> {
        trace!(
            axis = self.step.axis.name(),
            left_order = ?left.order(),
            "path: collecting step results for sorting"
        );
        let mut out = Vec::new();
        while left.move_next()? {
            if let Some(n) = left.current() {
                drain(&mut *step_cursor(n, &self.step, &self.ctx), &mut out)?;
            }
        }
        Ok(Box::new(VecCursor::new(sort_document_order(out)?, SeqOrder::Document)))
    }

    fn next_merged(&mut self) -> Result<Option<N>, Error> {
        let PathState::Merge {
            left,
            left_done,
            pending,
            columns,
            last,
        } = &mut self.state
        else {
            return Ok(None);
        };
        loop {
            if pending.is_none() && !*left_done {
                if left.move_next()? {
                    *pending = left.current().cloned();
                } else {
                    *left_done = true;
                }
            }
            let expand = match (pending.as_ref(), columns.last()) {
                (Some(l), Some(col)) => try_document_order(l, &col.head)? != Ordering::Greater,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => return Ok(None),
            };
            if expand {
                if let Some(l) = pending.take() {
                    let mut cursor = step_cursor(&l, &self.step, &self.ctx);
                    if cursor.move_next()? {
                        if let Some(head) = cursor.current().cloned() {
                            insert_column(columns, Column { head, cursor })?;
                        }
                    }
                }
                continue;
            }
            let Some(Column { head, mut cursor }) = columns.pop() else {
                continue;
            };
            if cursor.move_next()? {
                if let Some(next) = cursor.current().cloned() {
                    insert_column(columns, Column { head: next, cursor })?;
                }
            }
            if last.as_ref().is_some_and(|l| l.is_same_position(&head)) {
                continue;
            }
            *last = Some(head.clone());
            return Ok(Some(head));
        }
    }
}

fn insert_column<N: Navigator>(columns: &mut Vec<Column<N>>, col: Column<N>) -> Result<(), Error> {
    let mut at = columns.len();
    while at > 0 && try_document_order(&columns[at - 1].head, &col.head)? == Ordering::Less {
        at -= 1;
    }
    columns.insert(at, col);
    Ok(())
}

impl<N: Navigator> NodeCursor<N> for PathCursor<N> {
    fn move_next(&mut self) -> Result<bool, Error> {
        if let PathState::Unsorted(left) = &self.state {
            let mut left = left.boxed_clone();
            self.state = PathState::Sorted(self.materialize(&mut *left)?);
        }
        let next = match &mut self.state {
            PathState::Sorted(v) => {
                if v.move_next()? {
                    v.current().cloned()
                } else {
                    None
                }
            }
            _ => self.next_merged()?,
        };
        match next {
            Some(n) => {
                self.current = Some(n);
                self.pos += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn current(&self) -> Option<&N> {
        self.current.as_ref()
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn boxed_clone(&self) -> Box<dyn NodeCursor<N>> {
        Box::new(Self {
            step: Arc::clone(&self.step),
            ctx: self.ctx.clone(),
            state: self.state.clone(),
            current: self.current.clone(),
            pos: self.pos,
        })
    }

    fn order(&self) -> SeqOrder {
        SeqOrder::Document
    }
}

/// Brings any input into document order. Reverse input is flipped without
/// comparisons; unordered input is sorted on the first `move_next`.
pub(crate) struct DocOrderCursor<N> {
    input: Option<Box<dyn NodeCursor<N>>>,
    sorted: Option<Box<dyn NodeCursor<N>>>,
}

impl<N: Navigator> DocOrderCursor<N> {
    pub(crate) fn new(input: Box<dyn NodeCursor<N>>) -> Self {
        Self {
            input: Some(input),
            sorted: None,
        }
    }

    fn sorted(&mut self) -> Result<&mut Box<dyn NodeCursor<N>>, Error> {
        if let Some(mut input) = self.input.take() {
            let order = input.order();
            let mut nodes = Vec::new();
            drain(&mut *input, &mut nodes)?;
            let nodes = match order {
                SeqOrder::Document => nodes,
                SeqOrder::Reverse => {
                    nodes.reverse();
                    nodes
                }
                SeqOrder::Unordered => sort_document_order(nodes)?,
            };
            self.sorted = Some(Box::new(VecCursor::new(nodes, SeqOrder::Document)));
        }
        match self.sorted.as_mut() {
            Some(s) => Ok(s),
            None => Err(Error::from_code(ErrorCode::FOER0000, "document-order cursor lost its input")),
        }
    }
}

impl<N: Navigator> NodeCursor<N> for DocOrderCursor<N> {
    fn move_next(&mut self) -> Result<bool, Error> {
        self.sorted()?.move_next()
    }

    fn current(&self) -> Option<&N> {
        self.sorted.as_ref().and_then(|s| s.current())
    }

    fn position(&self) -> usize {
        self.sorted.as_ref().map_or(0, |s| s.position())
    }

    fn count(&self) -> Result<usize, Error> {
        match (&self.sorted, &self.input) {
            (Some(s), _) => s.count(),
            (None, Some(input)) if input.order() != SeqOrder::Unordered => input.count(),
            _ => {
                let mut probe = self.boxed_clone();
                while probe.move_next()? {}
                Ok(probe.position())
            }
        }
    }

    fn boxed_clone(&self) -> Box<dyn NodeCursor<N>> {
        Box::new(Self {
            input: self.input.as_ref().map(|c| c.boxed_clone()),
            sorted: self.sorted.as_ref().map(|c| c.boxed_clone()),
        })
    }

    fn order(&self) -> SeqOrder {
        SeqOrder::Document
    }
}

/// `a | b` over two document-ordered inputs; a node present on both sides
/// is emitted once.
pub(crate) struct UnionCursor<N> {
    a: Box<dyn NodeCursor<N>>,
    b: Box<dyn NodeCursor<N>>,
    a_head: Option<N>,
    b_head: Option<N>,
    started: bool,
    current: Option<N>,
    pos: usize,
}

fn doc_ordered<N: Navigator>(c: Box<dyn NodeCursor<N>>) -> Box<dyn NodeCursor<N>> {
    if c.order() == SeqOrder::Document {
        c
    } else {
        Box::new(DocOrderCursor::new(c))
    }
}

fn pull<N: Navigator>(c: &mut dyn NodeCursor<N>) -> Result<Option<N>, Error> {
    Ok(if c.move_next()? { c.current().cloned() } else { None })
}

impl<N: Navigator> UnionCursor<N> {
    pub(crate) fn new(a: Box<dyn NodeCursor<N>>, b: Box<dyn NodeCursor<N>>) -> Self {
        Self {
            a: doc_ordered(a),
            b: doc_ordered(b),
            a_head: None,
            b_head: None,
            started: false,
            current: None,
            pos: 0,
        }
    }
}

impl<N: Navigator> NodeCursor<N> for UnionCursor<N> {
    fn move_next(&mut self) -> Result<bool, Error> {
        if !self.started {
            self.started = true;
            self.a_head = pull(&mut *self.a)?;
            self.b_head = pull(&mut *self.b)?;
        }
        let (take_a, take_b) = match (&self.a_head, &self.b_head) {
            (None, None) => return Ok(false),
            (Some(_), None) => (true, false),
            (None, Some(_)) => (false, true),
            (Some(x), Some(y)) => match try_document_order(x, y)? {
                Ordering::Less => (true, false),
                Ordering::Greater => (false, true),
                Ordering::Equal => (true, true),
            },
        };
        if take_b {
            let next = pull(&mut *self.b)?;
            let head = std::mem::replace(&mut self.b_head, next);
            if !take_a {
                self.current = head;
            }
        }
        if take_a {
            let next = pull(&mut *self.a)?;
            self.current = std::mem::replace(&mut self.a_head, next);
        }
        self.pos += 1;
        Ok(true)
    }

    fn current(&self) -> Option<&N> {
        self.current.as_ref()
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn boxed_clone(&self) -> Box<dyn NodeCursor<N>> {
        Box::new(Self {
            a: self.a.boxed_clone(),
            b: self.b.boxed_clone(),
            a_head: self.a_head.clone(),
            b_head: self.b_head.clone(),
            started: self.started,
            current: self.current.clone(),
            pos: self.pos,
        })
    }

    fn order(&self) -> SeqOrder {
        SeqOrder::Document
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::simple::{SimpleNavigator, doc, elem};

    fn leaves() -> Vec<SimpleNavigator> {
        let root = doc()
            .child(elem("r").child(elem("a")).child(elem("b")).child(elem("c")))
            .build();
        let mut n = root.clone();
        n.move_to_first_child();
        n.move_to_first_child();
        let mut out = vec![n.clone()];
        while n.move_to_next() {
            out.push(n.clone());
        }
        out
    }

    fn collect(mut c: Box<dyn NodeCursor<SimpleNavigator>>) -> Vec<String> {
        let mut out = Vec::new();
        while c.move_next().unwrap() {
            out.push(c.current().unwrap().local_name().to_string());
        }
        out
    }

    #[test]
    fn union_merges_and_drops_shared_nodes() {
        let l = leaves();
        let a = VecCursor::new(vec![l[0].clone(), l[2].clone()], SeqOrder::Document);
        let b = VecCursor::new(vec![l[2].clone(), l[1].clone()], SeqOrder::Unordered);
        let u = UnionCursor::new(Box::new(a), Box::new(b));
        assert_eq!(collect(Box::new(u)), ["a", "b", "c"]);
    }

    #[test]
    fn reverse_input_is_flipped() {
        let l = leaves();
        let rev = VecCursor::new(vec![l[2].clone(), l[1].clone(), l[0].clone()], SeqOrder::Reverse);
        let c = DocOrderCursor::new(Box::new(rev));
        assert_eq!(c.count().unwrap(), 3);
        assert_eq!(collect(Box::new(c)), ["a", "b", "c"]);
    }

    #[test]
    fn sorting_dedups() {
        let l = leaves();
        let sorted = sort_document_order(vec![l[1].clone(), l[0].clone(), l[1].clone()]).unwrap();
        assert_eq!(sorted.len(), 2);
        assert!(sorted[0].is_same_position(&l[0]));
    }
}
