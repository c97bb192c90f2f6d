//! The navigation capability the engine consumes.
//!
//! A [`Navigator`] is a movable cursor over one tree node. The engine never
//! mutates the tree; it forks cursors with `clone()` whenever two walks must
//! stay independent.

use core::cmp::Ordering;
use core::fmt::Debug;
use smallvec::SmallVec;

use crate::engine::runtime::{Error, ErrorCode};

pub mod simple;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Element,
    Attribute,
    Namespace,
    Text,
    Comment,
    ProcessingInstruction,
}

/// Relative document order of two navigator positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeOrder {
    Before,
    After,
    Same,
    /// The nodes live in different trees; no order can be established.
    Unknown,
}

impl NodeOrder {
    #[must_use]
    pub fn reverse(self) -> Self {
        match self {
            NodeOrder::Before => NodeOrder::After,
            NodeOrder::After => NodeOrder::Before,
            other => other,
        }
    }
}

/// Which namespace nodes `move_to_first_namespace` / `move_to_next_namespace` visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NamespaceScope {
    /// Every in-scope namespace, including the implicit `xml` binding.
    #[default]
    All,
    /// Every in-scope namespace except the implicit `xml` binding.
    ExcludeXml,
    /// Only namespaces declared on the element itself.
    Local,
}

/// Cursor over a node of a host tree.
///
/// Moves return `false` and leave the cursor unchanged when the target does
/// not exist. Attribute and namespace nodes have their owner element as
/// parent but are not its children: `move_to_next` on them returns `false`.
pub trait Navigator: Clone + Debug + 'static {
    fn kind(&self) -> NodeKind;

    /// Local part of the node name; the prefix for namespace nodes, the
    /// target for processing instructions, empty for unnamed nodes.
    fn local_name(&self) -> &str;

    fn namespace_uri(&self) -> &str;

    fn prefix(&self) -> &str;

    /// Qualified name as written in the source (`prefix:local`).
    fn name(&self) -> String {
        let prefix = self.prefix();
        if prefix.is_empty() {
            self.local_name().to_string()
        } else {
            format!("{prefix}:{}", self.local_name())
        }
    }

    fn string_value(&self) -> String;

    fn is_same_position(&self, other: &Self) -> bool;

    fn move_to_root(&mut self) {
        while self.move_to_parent() {}
    }

    fn move_to_parent(&mut self) -> bool;

    fn move_to_first_child(&mut self) -> bool;

    /// Next sibling in the child list.
    fn move_to_next(&mut self) -> bool;

    fn move_to_first_attribute(&mut self) -> bool;

    fn move_to_next_attribute(&mut self) -> bool;

    fn move_to_first_namespace(&mut self, scope: NamespaceScope) -> bool;

    fn move_to_next_namespace(&mut self, scope: NamespaceScope) -> bool;

    /// Move to the element whose ID attribute equals `id`.
    fn move_to_id(&mut self, _id: &str) -> bool {
        false
    }

    /// Document order of `self` relative to `other`.
    ///
    /// The default walks both ancestor chains; hosts with a cheap order key
    /// should override it.
    fn compare_position(&self, other: &Self) -> NodeOrder {
        compare_by_ancestry(self, other)
    }
}

/// [`Navigator::compare_position`] as an [`Ordering`], failing with
/// `err:FOER0000` when the nodes cannot be ordered.
pub fn try_document_order<N: Navigator>(a: &N, b: &N) -> Result<Ordering, Error> {
    match a.compare_position(b) {
        NodeOrder::Before => Ok(Ordering::Less),
        NodeOrder::After => Ok(Ordering::Greater),
        NodeOrder::Same => Ok(Ordering::Equal),
        NodeOrder::Unknown => Err(Error::from_code(
            ErrorCode::FOER0000,
            "document order is undefined for nodes from different trees",
        )),
    }
}

fn path_from_root<N: Navigator>(node: &N) -> SmallVec<[N; 16]> {
    let mut cur = node.clone();
    let mut path: SmallVec<[N; 16]> = SmallVec::new();
    path.push(cur.clone());
    while cur.move_to_parent() {
        path.push(cur.clone());
    }
    path.reverse();
    path
}

#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
enum SiblingGroup {
    Namespace,
    Attribute,
    Child,
}

fn sibling_group(kind: NodeKind) -> SiblingGroup {
    match kind {
        NodeKind::Namespace => SiblingGroup::Namespace,
        NodeKind::Attribute => SiblingGroup::Attribute,
        _ => SiblingGroup::Child,
    }
}

/// Order two nodes by walking their ancestor chains.
///
/// Ancestors precede descendants. Below a common parent, namespace nodes
/// precede attributes, which precede children; within a group the
/// navigator's own enumeration order decides. Nodes of different trees
/// compare as [`NodeOrder::Unknown`].
pub fn compare_by_ancestry<N: Navigator>(a: &N, b: &N) -> NodeOrder {
    if a.is_same_position(b) {
        return NodeOrder::Same;
    }
    let pa = path_from_root(a);
    let pb = path_from_root(b);
    if !pa[0].is_same_position(&pb[0]) {
        return NodeOrder::Unknown;
    }
    let len = pa.len().min(pb.len());
    let mut i = 1;
    while i < len && pa[i].is_same_position(&pb[i]) {
        i += 1;
    }
    if i == pa.len() {
        return NodeOrder::Before;
    }
    if i == pb.len() {
        return NodeOrder::After;
    }
    sibling_order(&pa[i - 1], &pa[i], &pb[i])
}

fn sibling_order<N: Navigator>(parent: &N, x: &N, y: &N) -> NodeOrder {
    let gx = sibling_group(x.kind());
    let gy = sibling_group(y.kind());
    if gx != gy {
        return if gx < gy { NodeOrder::Before } else { NodeOrder::After };
    }
    let mut cur = parent.clone();
    let mut more = match gx {
        SiblingGroup::Namespace => cur.move_to_first_namespace(NamespaceScope::All),
        SiblingGroup::Attribute => cur.move_to_first_attribute(),
        SiblingGroup::Child => cur.move_to_first_child(),
    };
    while more {
        if cur.is_same_position(x) {
            return NodeOrder::Before;
        }
        if cur.is_same_position(y) {
            return NodeOrder::After;
        }
        more = match gx {
            SiblingGroup::Namespace => cur.move_to_next_namespace(NamespaceScope::All),
            SiblingGroup::Attribute => cur.move_to_next_attribute(),
            SiblingGroup::Child => cur.move_to_next(),
        };
    }
    NodeOrder::Unknown
}
