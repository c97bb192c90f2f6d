//! Arena-backed in-memory tree implementing [`Navigator`], for tests, benches
//! and quick prototypes.
//!
//! ```
//! use navpath_xpath::model::simple::{doc, elem, attr, ns, text};
//! use navpath_xpath::{Navigator, NodeKind};
//!
//! // <root xmlns:p="urn:one" id="r"><p:child>Hello</p:child></root>
//! let mut nav = doc()
//!     .child(
//!         elem("root")
//!             .namespace(ns("p", "urn:one"))
//!             .attr(attr("id", "r"))
//!             .child(elem("p:child").child(text("Hello"))),
//!     )
//!     .build();
//!
//! assert_eq!(nav.kind(), NodeKind::Document);
//! assert!(nav.move_to_first_child());
//! assert_eq!(nav.local_name(), "root");
//! assert!(nav.move_to_first_child());
//! assert_eq!(nav.namespace_uri(), "urn:one");
//! assert_eq!(nav.string_value(), "Hello");
//! ```

use core::fmt;
use std::collections::HashMap;
use std::sync::Arc;

use compact_str::CompactString;

use super::{NamespaceScope, Navigator, NodeKind, NodeOrder};
use crate::consts::XML_URI;

#[derive(Debug)]
struct NodeRec {
    kind: NodeKind,
    prefix: CompactString,
    local: CompactString,
    ns_uri: CompactString,
    value: String,
    parent: Option<usize>,
    first_child: Option<usize>,
    // Next child for child nodes, next attribute for attributes.
    next: Option<usize>,
    first_attr: Option<usize>,
    // In-scope namespace nodes of an element, local declarations first.
    namespaces: Vec<usize>,
    // Namespace node declared on its owner element (as opposed to inherited).
    declared_here: bool,
    // One past the last arena index of the subtree.
    end: usize,
}

impl NodeRec {
    fn new(kind: NodeKind, parent: Option<usize>) -> Self {
        Self {
            kind,
            prefix: CompactString::default(),
            local: CompactString::default(),
            ns_uri: CompactString::default(),
            value: String::new(),
            parent,
            first_child: None,
            next: None,
            first_attr: None,
            namespaces: Vec::new(),
            declared_here: false,
            end: 0,
        }
    }
}

#[derive(Debug, Default)]
struct Tree {
    nodes: Vec<NodeRec>,
    ids: HashMap<String, usize>,
}

/// Cursor over a [`Tree`]; cloning is an `Arc` bump.
#[derive(Clone)]
pub struct SimpleNavigator {
    tree: Arc<Tree>,
    idx: usize,
}

impl SimpleNavigator {
    fn rec(&self) -> &NodeRec {
        &self.tree.nodes[self.idx]
    }

    fn namespace_matches(&self, idx: usize, scope: NamespaceScope) -> bool {
        let rec = &self.tree.nodes[idx];
        match scope {
            NamespaceScope::All => true,
            NamespaceScope::ExcludeXml => rec.local != "xml",
            NamespaceScope::Local => rec.declared_here,
        }
    }
}

impl PartialEq for SimpleNavigator {
    fn eq(&self, other: &Self) -> bool {
        self.is_same_position(other)
    }
}

impl Eq for SimpleNavigator {}

impl fmt::Debug for SimpleNavigator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rec = self.rec();
        f.debug_struct("SimpleNavigator")
            .field("idx", &self.idx)
            .field("kind", &rec.kind)
            .field("name", &self.name())
            .finish()
    }
}

impl Navigator for SimpleNavigator {
    fn kind(&self) -> NodeKind {
        self.rec().kind
    }

    fn local_name(&self) -> &str {
        &self.rec().local
    }

    fn namespace_uri(&self) -> &str {
        &self.rec().ns_uri
    }

    fn prefix(&self) -> &str {
        &self.rec().prefix
    }

    fn string_value(&self) -> String {
        let rec = self.rec();
        match rec.kind {
            NodeKind::Document | NodeKind::Element => self.tree.nodes[self.idx + 1..rec.end]
                .iter()
                .filter(|n| n.kind == NodeKind::Text)
                .map(|n| n.value.as_str())
                .collect(),
            _ => rec.value.clone(),
        }
    }

    fn is_same_position(&self, other: &Self) -> bool {
        self.idx == other.idx && Arc::ptr_eq(&self.tree, &other.tree)
    }

    fn move_to_root(&mut self) {
        self.idx = 0;
    }

    fn move_to_parent(&mut self) -> bool {
        match self.rec().parent {
            Some(p) => {
                self.idx = p;
                true
            }
            None => false,
        }
    }

    fn move_to_first_child(&mut self) -> bool {
        match self.rec().first_child {
            Some(c) => {
                self.idx = c;
                true
            }
            None => false,
        }
    }

    fn move_to_next(&mut self) -> bool {
        let rec = self.rec();
        if matches!(rec.kind, NodeKind::Attribute | NodeKind::Namespace) {
            return false;
        }
        match rec.next {
            Some(n) => {
                self.idx = n;
                true
            }
            None => false,
        }
    }

    fn move_to_first_attribute(&mut self) -> bool {
        match self.rec().first_attr {
            Some(a) => {
                self.idx = a;
                true
            }
            None => false,
        }
    }

    fn move_to_next_attribute(&mut self) -> bool {
        let rec = self.rec();
        if rec.kind != NodeKind::Attribute {
            return false;
        }
        match rec.next {
            Some(n) => {
                self.idx = n;
                true
            }
            None => false,
        }
    }

    fn move_to_first_namespace(&mut self, scope: NamespaceScope) -> bool {
        let rec = self.rec();
        if rec.kind != NodeKind::Element {
            return false;
        }
        let found = rec
            .namespaces
            .iter()
            .copied()
            .find(|&n| self.namespace_matches(n, scope));
        match found {
            Some(n) => {
                self.idx = n;
                true
            }
            None => false,
        }
    }

    fn move_to_next_namespace(&mut self, scope: NamespaceScope) -> bool {
        let rec = self.rec();
        let (NodeKind::Namespace, Some(owner)) = (rec.kind, rec.parent) else {
            return false;
        };
        let list = &self.tree.nodes[owner].namespaces;
        let Some(at) = list.iter().position(|&n| n == self.idx) else {
            return false;
        };
        let found = list[at + 1..]
            .iter()
            .copied()
            .find(|&n| self.namespace_matches(n, scope));
        match found {
            Some(n) => {
                self.idx = n;
                true
            }
            None => false,
        }
    }

    fn move_to_id(&mut self, id: &str) -> bool {
        match self.tree.ids.get(id) {
            Some(&n) => {
                self.idx = n;
                true
            }
            None => false,
        }
    }

    fn compare_position(&self, other: &Self) -> NodeOrder {
        if !Arc::ptr_eq(&self.tree, &other.tree) {
            return NodeOrder::Unknown;
        }
        match self.idx.cmp(&other.idx) {
            core::cmp::Ordering::Less => NodeOrder::Before,
            core::cmp::Ordering::Greater => NodeOrder::After,
            core::cmp::Ordering::Equal => NodeOrder::Same,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AttrSpec {
    name: String,
    value: String,
}

#[derive(Debug, Clone)]
pub struct NsSpec {
    prefix: String,
    uri: String,
}

/// Unbuilt node description.
#[derive(Debug, Clone)]
pub enum NodeSpec {
    Node(NodeBuilder),
    Text(String),
    Comment(String),
    ProcessingInstruction { target: String, data: String },
}

/// Builder for documents and elements.
#[derive(Debug, Clone)]
pub struct NodeBuilder {
    kind: NodeKind,
    name: String,
    attrs: Vec<AttrSpec>,
    namespaces: Vec<NsSpec>,
    children: Vec<NodeSpec>,
}

impl From<NodeBuilder> for NodeSpec {
    fn from(b: NodeBuilder) -> Self {
        NodeSpec::Node(b)
    }
}

impl NodeBuilder {
    fn new(kind: NodeKind, name: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
            attrs: Vec::new(),
            namespaces: Vec::new(),
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn child(mut self, child: impl Into<NodeSpec>) -> Self {
        self.children.push(child.into());
        self
    }

    #[must_use]
    pub fn children<I, C>(mut self, it: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<NodeSpec>,
    {
        self.children.extend(it.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn attr(mut self, attr: AttrSpec) -> Self {
        self.attrs.push(attr);
        self
    }

    #[must_use]
    pub fn namespace(mut self, ns: NsSpec) -> Self {
        self.namespaces.push(ns);
        self
    }

    /// Flatten into an arena and return a navigator positioned on the root.
    #[must_use]
    pub fn build(self) -> SimpleNavigator {
        let mut tree = Tree::default();
        let scope = vec![("xml".to_string(), XML_URI.to_string())];
        flatten_node(&mut tree, self, None, &scope);
        SimpleNavigator {
            tree: Arc::new(tree),
            idx: 0,
        }
    }
}

fn split_qname(name: &str) -> (&str, &str) {
    match name.split_once(':') {
        Some((p, l)) => (p, l),
        None => ("", name),
    }
}

fn lookup<'a>(scope: &'a [(String, String)], prefix: &str) -> Option<&'a str> {
    scope
        .iter()
        .rev()
        .find(|(p, _)| p == prefix)
        .map(|(_, u)| u.as_str())
}

fn push(tree: &mut Tree, rec: NodeRec) -> usize {
    tree.nodes.push(rec);
    tree.nodes.len() - 1
}

fn link_child(tree: &mut Tree, parent: usize, prev: &mut Option<usize>, idx: usize) {
    match *prev {
        Some(p) => tree.nodes[p].next = Some(idx),
        None => tree.nodes[parent].first_child = Some(idx),
    }
    *prev = Some(idx);
}

fn flatten_node(
    tree: &mut Tree,
    b: NodeBuilder,
    parent: Option<usize>,
    outer: &[(String, String)],
) -> usize {
    let idx = push(tree, NodeRec::new(b.kind, parent));
    let mut scope = outer.to_vec();
    if b.kind == NodeKind::Element {
        for decl in &b.namespaces {
            scope.retain(|(p, _)| *p != decl.prefix);
            if !decl.uri.is_empty() {
                scope.push((decl.prefix.clone(), decl.uri.clone()));
            }
        }
        let (prefix, local) = split_qname(&b.name);
        let ns_uri = lookup(&scope, prefix).unwrap_or_default();
        let rec = &mut tree.nodes[idx];
        rec.prefix = prefix.into();
        rec.local = local.into();
        rec.ns_uri = ns_uri.into();

        // Namespace nodes: local declarations first, then inherited bindings.
        let mut ordered: Vec<(&String, &String, bool)> = Vec::new();
        for (p, u) in scope.iter().rev() {
            if ordered.iter().any(|(op, _, _)| *op == p) {
                continue;
            }
            let local_decl = b.namespaces.iter().any(|d| &d.prefix == p);
            ordered.push((p, u, local_decl));
        }
        ordered.sort_by_key(|(_, _, local_decl)| !*local_decl);
        let mut ns_nodes = Vec::with_capacity(ordered.len());
        for (p, u, local_decl) in ordered {
            let mut rec = NodeRec::new(NodeKind::Namespace, Some(idx));
            rec.local = p.as_str().into();
            rec.value.clone_from(u);
            rec.declared_here = local_decl;
            let n = push(tree, rec);
            tree.nodes[n].end = n + 1;
            ns_nodes.push(n);
        }
        tree.nodes[idx].namespaces = ns_nodes;

        let mut prev_attr: Option<usize> = None;
        for a in &b.attrs {
            let (prefix, local) = split_qname(&a.name);
            let ns_uri = if prefix.is_empty() {
                ""
            } else {
                lookup(&scope, prefix).unwrap_or_default()
            };
            let mut rec = NodeRec::new(NodeKind::Attribute, Some(idx));
            rec.prefix = prefix.into();
            rec.local = local.into();
            rec.ns_uri = ns_uri.into();
            rec.value.clone_from(&a.value);
            let n = push(tree, rec);
            tree.nodes[n].end = n + 1;
            match prev_attr {
                Some(p) => tree.nodes[p].next = Some(n),
                None => tree.nodes[idx].first_attr = Some(n),
            }
            prev_attr = Some(n);
            let is_id = (prefix.is_empty() && local == "id") || (ns_uri == XML_URI && local == "id");
            if is_id {
                tree.ids.entry(a.value.trim().to_string()).or_insert(idx);
            }
        }
    }

    let mut prev: Option<usize> = None;
    for child in b.children {
        let c = match child {
            NodeSpec::Node(nb) => flatten_node(tree, nb, Some(idx), &scope),
            NodeSpec::Text(v) => {
                let mut rec = NodeRec::new(NodeKind::Text, Some(idx));
                rec.value = v;
                let n = push(tree, rec);
                tree.nodes[n].end = n + 1;
                n
            }
            NodeSpec::Comment(v) => {
                let mut rec = NodeRec::new(NodeKind::Comment, Some(idx));
                rec.value = v;
                let n = push(tree, rec);
                tree.nodes[n].end = n + 1;
                n
            }
            NodeSpec::ProcessingInstruction { target, data } => {
                let mut rec = NodeRec::new(NodeKind::ProcessingInstruction, Some(idx));
                rec.local = target.into();
                rec.value = data;
                let n = push(tree, rec);
                tree.nodes[n].end = n + 1;
                n
            }
        };
        link_child(tree, idx, &mut prev, c);
    }
    tree.nodes[idx].end = tree.nodes.len();
    idx
}

pub fn doc() -> NodeBuilder {
    NodeBuilder::new(NodeKind::Document, "")
}

/// Element builder; `name` may carry a prefix (`p:item`) resolved against
/// the in-scope declarations at build time.
pub fn elem(name: &str) -> NodeBuilder {
    NodeBuilder::new(NodeKind::Element, name)
}

pub fn attr(name: &str, value: &str) -> AttrSpec {
    AttrSpec {
        name: name.to_string(),
        value: value.to_string(),
    }
}

/// Namespace declaration; an empty prefix declares the default namespace.
pub fn ns(prefix: &str, uri: &str) -> NsSpec {
    NsSpec {
        prefix: prefix.to_string(),
        uri: uri.to_string(),
    }
}

pub fn text(value: &str) -> NodeSpec {
    NodeSpec::Text(value.to_string())
}

pub fn comment(value: &str) -> NodeSpec {
    NodeSpec::Comment(value.to_string())
}

pub fn pi(target: &str, data: &str) -> NodeSpec {
    NodeSpec::ProcessingInstruction {
        target: target.to_string(),
        data: data.to_string(),
    }
}
