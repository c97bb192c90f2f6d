//! Axis cursors.
//!
//! One state machine per axis, driving a private clone of the navigator.
//! Forward axes enumerate in document order. Reverse axes enumerate nearest
//! node first; the ones the navigator can only reach from the root side
//! (`preceding`, `preceding-sibling`) collect their candidates on the first
//! `move_next` and replay them backwards.

use std::rc::Rc;
use std::sync::Arc;

use smallvec::SmallVec;
use string_cache::DefaultAtom;

use crate::engine::runtime::{DynamicContext, Error};
use crate::model::{NamespaceScope, Navigator, NodeKind};
use crate::parser::ast::{Axis, Step};
use crate::xdm::{NodeCursor, SeqOrder};

use super::cursors::PredicateCursor;

/// The cursor for `step` applied to `node`, predicates included.
pub(crate) fn step_cursor<N: Navigator>(
    node: &N,
    step: &Arc<Step>,
    ctx: &DynamicContext<N>,
) -> Box<dyn NodeCursor<N>> {
    let mut cursor: Box<dyn NodeCursor<N>> = Box::new(AxisTestCursor::new(
        AxisCursor::new(step.axis, node.clone()),
        Arc::clone(step),
    ));
    for p in &step.predicates {
        cursor = Box::new(PredicateCursor::new(cursor, Arc::clone(p), ctx.clone()));
    }
    cursor
}

fn is_tree_leaf(kind: NodeKind) -> bool {
    matches!(kind, NodeKind::Attribute | NodeKind::Namespace)
}

#[derive(Clone)]
enum AxisState<N> {
    Start,
    /// The node last emitted.
    At(N),
    /// Descendant walk: last emitted node and its depth below the origin.
    Descend { node: N, depth: usize },
    /// Candidates in document order, replayed from the back.
    Replay { nodes: Rc<[N]>, left: usize },
    Done,
}

/// Unfiltered walk along one axis.
#[derive(Clone)]
pub(crate) struct AxisCursor<N> {
    axis: Axis,
    origin: N,
    state: AxisState<N>,
    /// Namespace prefixes already emitted.
    seen_prefixes: SmallVec<[DefaultAtom; 8]>,
}

impl<N: Navigator> AxisCursor<N> {
    pub(crate) fn new(axis: Axis, origin: N) -> Self {
        Self {
            axis,
            origin,
            state: AxisState::Start,
            seen_prefixes: SmallVec::new(),
        }
    }

    pub(crate) fn current(&self) -> Option<&N> {
        match &self.state {
            AxisState::At(n) | AxisState::Descend { node: n, .. } => Some(n),
            AxisState::Replay { nodes, left } => nodes.get(*left),
            AxisState::Start | AxisState::Done => None,
        }
    }

    /// Advance to the next node on the axis; `false` once exhausted.
    pub(crate) fn advance(&mut self) -> bool {
        let next = match std::mem::replace(&mut self.state, AxisState::Done) {
            AxisState::Done => AxisState::Done,
            AxisState::Start => self.first(),
            AxisState::At(prev) => self.after(prev),
            AxisState::Descend { node, depth } => descend(node, depth),
            AxisState::Replay { nodes, left } => match left.checked_sub(1) {
                Some(i) => AxisState::Replay { nodes, left: i },
                None => AxisState::Done,
            },
        };
        self.state = next;
        !matches!(self.state, AxisState::Done)
    }

    fn first(&mut self) -> AxisState<N> {
        let mut n = self.origin.clone();
        let found = match self.axis {
            Axis::SelfAxis | Axis::AncestorOrSelf => true,
            Axis::Child => n.move_to_first_child(),
            Axis::Attribute => n.move_to_first_attribute(),
            Axis::Namespace => {
                if !n.move_to_first_namespace(NamespaceScope::All) {
                    return AxisState::Done;
                }
                return self.skip_seen_namespaces(n);
            }
            Axis::Parent | Axis::Ancestor => n.move_to_parent(),
            Axis::FollowingSibling => !is_tree_leaf(n.kind()) && n.move_to_next(),
            Axis::Descendant => {
                if !n.move_to_first_child() {
                    return AxisState::Done;
                }
                return AxisState::Descend { node: n, depth: 1 };
            }
            Axis::DescendantOrSelf => return AxisState::Descend { node: n, depth: 0 },
            Axis::Following => {
                if is_tree_leaf(n.kind()) {
                    if !n.move_to_parent() {
                        return AxisState::Done;
                    }
                    if n.move_to_first_child() {
                        return AxisState::At(n);
                    }
                }
                skip_subtree(&mut n)
            }
            Axis::PrecedingSibling => return replay(preceding_siblings(&self.origin)),
            Axis::Preceding => return replay(preceding(&self.origin)),
        };
        if found {
            AxisState::At(n)
        } else {
            AxisState::Done
        }
    }

    fn after(&mut self, mut n: N) -> AxisState<N> {
        let found = match self.axis {
            Axis::SelfAxis | Axis::Parent => false,
            Axis::Child | Axis::FollowingSibling => n.move_to_next(),
            Axis::Attribute => n.move_to_next_attribute(),
            Axis::Namespace => {
                if !n.move_to_next_namespace(NamespaceScope::All) {
                    return AxisState::Done;
                }
                return self.skip_seen_namespaces(n);
            }
            Axis::Ancestor | Axis::AncestorOrSelf => n.move_to_parent(),
            Axis::Following => n.move_to_first_child() || skip_subtree(&mut n),
            Axis::Descendant | Axis::DescendantOrSelf | Axis::Preceding | Axis::PrecedingSibling => false,
        };
        if found {
            AxisState::At(n)
        } else {
            AxisState::Done
        }
    }

    /// Namespace nodes of an element: first binding per prefix wins and the
    /// `xmlns` pseudo-binding is never a namespace node.
    fn skip_seen_namespaces(&mut self, mut n: N) -> AxisState<N> {
        loop {
            let prefix = DefaultAtom::from(n.local_name());
            if &*prefix != "xmlns" && !self.seen_prefixes.contains(&prefix) {
                self.seen_prefixes.push(prefix);
                return AxisState::At(n);
            }
            if !n.move_to_next_namespace(NamespaceScope::All) {
                return AxisState::Done;
            }
        }
    }
}

/// Pre-order successor of `node` (at `depth` below the origin) that stays
/// inside the origin's subtree.
fn descend<N: Navigator>(mut node: N, mut depth: usize) -> AxisState<N> {
    if node.move_to_first_child() {
        return AxisState::Descend { node, depth: depth + 1 };
    }
    while depth > 0 {
        if node.move_to_next() {
            return AxisState::Descend { node, depth };
        }
        if !node.move_to_parent() {
            break;
        }
        depth -= 1;
    }
    AxisState::Done
}

/// Move to the first node after `n`'s subtree in document order.
fn skip_subtree<N: Navigator>(n: &mut N) -> bool {
    let mut probe = n.clone();
    loop {
        if probe.move_to_next() {
            *n = probe;
            return true;
        }
        if !probe.move_to_parent() {
            return false;
        }
    }
}

fn replay<N>(nodes: Vec<N>) -> AxisState<N> {
    match nodes.len().checked_sub(1) {
        Some(last) => AxisState::Replay {
            nodes: nodes.into(),
            left: last,
        },
        None => AxisState::Done,
    }
}

fn preceding_siblings<N: Navigator>(origin: &N) -> Vec<N> {
    let mut out = Vec::new();
    if is_tree_leaf(origin.kind()) {
        return out;
    }
    let mut n = origin.clone();
    if !n.move_to_parent() || !n.move_to_first_child() {
        return out;
    }
    while !n.is_same_position(origin) {
        out.push(n.clone());
        if !n.move_to_next() {
            break;
        }
    }
    out
}

/// Every node before `origin` in document order that is not one of its
/// ancestors, in document order.
fn preceding<N: Navigator>(origin: &N) -> Vec<N> {
    let mut chain: Vec<N> = Vec::new();
    let mut n = origin.clone();
    if is_tree_leaf(n.kind()) && !n.move_to_parent() {
        return Vec::new();
    }
    chain.push(n.clone());
    while n.move_to_parent() {
        chain.push(n.clone());
    }
    chain.reverse();

    let mut out = Vec::new();
    for pair in chain.windows(2) {
        let (parent, target) = (&pair[0], &pair[1]);
        let mut child = parent.clone();
        if !child.move_to_first_child() {
            continue;
        }
        while !child.is_same_position(target) {
            push_subtree(&child, &mut out);
            if !child.move_to_next() {
                break;
            }
        }
    }
    out
}

fn push_subtree<N: Navigator>(root: &N, out: &mut Vec<N>) {
    out.push(root.clone());
    let mut state = AxisCursor::new(Axis::Descendant, root.clone());
    while state.advance() {
        if let Some(n) = state.current() {
            out.push(n.clone());
        }
    }
}

/// Axis cursor filtered by the step's node test.
pub(crate) struct AxisTestCursor<N> {
    axis: AxisCursor<N>,
    step: Arc<Step>,
    principal: NodeKind,
    pos: usize,
}

impl<N: Navigator> AxisTestCursor<N> {
    pub(crate) fn new(axis: AxisCursor<N>, step: Arc<Step>) -> Self {
        let principal = step.axis.principal_kind();
        Self {
            axis,
            step,
            principal,
            pos: 0,
        }
    }
}

impl<N: Navigator> NodeCursor<N> for AxisTestCursor<N> {
    fn move_next(&mut self) -> Result<bool, Error> {
        while self.axis.advance() {
            let hit = self
                .axis
                .current()
                .is_some_and(|n| self.step.test.matches(n, self.principal));
            if hit {
                self.pos += 1;
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn current(&self) -> Option<&N> {
        self.axis.current()
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn boxed_clone(&self) -> Box<dyn NodeCursor<N>> {
        Box::new(Self {
            axis: self.axis.clone(),
            step: Arc::clone(&self.step),
            principal: self.principal,
            pos: self.pos,
        })
    }

    fn order(&self) -> SeqOrder {
        if self.step.axis.is_reverse() {
            SeqOrder::Reverse
        } else {
            SeqOrder::Document
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::simple::{SimpleNavigator, attr, comment, doc, elem, text};

    fn tree() -> SimpleNavigator {
        doc()
            .child(
                elem("a")
                    .attr(attr("id", "a"))
                    .child(elem("b").child(elem("c")).child(text("t")))
                    .child(comment("x"))
                    .child(elem("d").child(elem("e"))),
            )
            .build()
    }

    fn names(axis: Axis, origin: &SimpleNavigator) -> Vec<String> {
        let mut cur = AxisCursor::new(axis, origin.clone());
        let mut out = Vec::new();
        while cur.advance() {
            let n = cur.current().unwrap();
            out.push(match n.kind() {
                NodeKind::Text => "#text".to_string(),
                NodeKind::Comment => "#comment".to_string(),
                NodeKind::Document => "#doc".to_string(),
                _ => n.local_name().to_string(),
            });
        }
        out
    }

    fn find(root: &SimpleNavigator, name: &str) -> SimpleNavigator {
        let mut cur = AxisCursor::new(Axis::Descendant, root.clone());
        while cur.advance() {
            let n = cur.current().unwrap();
            if n.kind() == NodeKind::Element && n.local_name() == name {
                return n.clone();
            }
        }
        panic!("no element {name}");
    }

    #[test]
    fn descendant_walk_stops_at_origin_subtree() {
        let root = tree();
        let b = find(&root, "b");
        assert_eq!(names(Axis::Descendant, &b), ["c", "#text"]);
        assert_eq!(names(Axis::DescendantOrSelf, &b), ["b", "c", "#text"]);
    }

    #[test]
    fn following_skips_descendants() {
        let root = tree();
        let b = find(&root, "b");
        assert_eq!(names(Axis::Following, &b), ["#comment", "d", "e"]);
    }

    #[test]
    fn preceding_excludes_ancestors_and_runs_backwards() {
        let root = tree();
        let e = find(&root, "e");
        assert_eq!(names(Axis::Preceding, &e), ["#comment", "#text", "c", "b"]);
        assert_eq!(names(Axis::PrecedingSibling, &find(&root, "d")), ["#comment", "b"]);
        assert_eq!(names(Axis::Ancestor, &e), ["d", "a", "#doc"]);
    }

    #[test]
    fn attribute_origin_follows_into_owner_children() {
        let root = tree();
        let a = find(&root, "a");
        let mut at = a.clone();
        assert!(at.move_to_first_attribute());
        assert_eq!(names(Axis::Following, &at).first().map(String::as_str), Some("b"));
        assert!(names(Axis::FollowingSibling, &at).is_empty());
        assert_eq!(names(Axis::Parent, &at), ["a"]);
    }
}
