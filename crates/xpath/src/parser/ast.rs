//! Expression tree produced by the parser.
//!
//! Trees are immutable once built. Sub-expressions that lazily evaluating
//! cursors keep after `evaluate` returns (path steps and predicates) are
//! shared through `Arc`.

use core::fmt;
use std::sync::Arc;

use crate::model::{Navigator, NodeKind};
use crate::xdm::{ExpandedName, ReturnType, number_to_string};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Ancestor,
    AncestorOrSelf,
    Attribute,
    Child,
    Descendant,
    DescendantOrSelf,
    Following,
    FollowingSibling,
    Namespace,
    Parent,
    Preceding,
    PrecedingSibling,
    SelfAxis,
}

struct AxisInfo {
    axis: Axis,
    name: &'static str,
    reverse: bool,
    principal: NodeKind,
}

const AXES: [AxisInfo; 13] = [
    AxisInfo { axis: Axis::Ancestor, name: "ancestor", reverse: true, principal: NodeKind::Element },
    AxisInfo { axis: Axis::AncestorOrSelf, name: "ancestor-or-self", reverse: true, principal: NodeKind::Element },
    AxisInfo { axis: Axis::Attribute, name: "attribute", reverse: false, principal: NodeKind::Attribute },
    AxisInfo { axis: Axis::Child, name: "child", reverse: false, principal: NodeKind::Element },
    AxisInfo { axis: Axis::Descendant, name: "descendant", reverse: false, principal: NodeKind::Element },
    AxisInfo { axis: Axis::DescendantOrSelf, name: "descendant-or-self", reverse: false, principal: NodeKind::Element },
    AxisInfo { axis: Axis::Following, name: "following", reverse: false, principal: NodeKind::Element },
    AxisInfo { axis: Axis::FollowingSibling, name: "following-sibling", reverse: false, principal: NodeKind::Element },
    AxisInfo { axis: Axis::Namespace, name: "namespace", reverse: false, principal: NodeKind::Namespace },
    AxisInfo { axis: Axis::Parent, name: "parent", reverse: true, principal: NodeKind::Element },
    AxisInfo { axis: Axis::Preceding, name: "preceding", reverse: true, principal: NodeKind::Element },
    AxisInfo { axis: Axis::PrecedingSibling, name: "preceding-sibling", reverse: true, principal: NodeKind::Element },
    AxisInfo { axis: Axis::SelfAxis, name: "self", reverse: false, principal: NodeKind::Element },
];

impl Axis {
    fn info(self) -> &'static AxisInfo {
        &AXES[self as usize]
    }

    pub fn from_name(name: &str) -> Option<Axis> {
        AXES.iter().find(|i| i.name == name).map(|i| i.axis)
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }

    /// Reverse axes enumerate nearest-first, against document order.
    pub fn is_reverse(self) -> bool {
        self.info().reverse
    }

    /// Node kind a `*` or plain name test selects on this axis.
    pub fn principal_kind(self) -> NodeKind {
        self.info().principal
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    /// `node()`
    AnyNode,
    /// `text()`
    Text,
    /// `comment()`
    Comment,
    /// `processing-instruction()` with an optional target literal.
    ProcessingInstruction(Option<String>),
    /// `*`
    Principal,
    /// `prefix:*`, prefix already resolved.
    NamespaceWildcard(String),
    /// `name` / `prefix:name`; unprefixed names are in no namespace.
    Name { ns_uri: String, local: String },
}

impl NodeTest {
    pub fn matches<N: Navigator>(&self, node: &N, principal: NodeKind) -> bool {
        match self {
            NodeTest::AnyNode => true,
            NodeTest::Text => node.kind() == NodeKind::Text,
            NodeTest::Comment => node.kind() == NodeKind::Comment,
            NodeTest::ProcessingInstruction(target) => {
                node.kind() == NodeKind::ProcessingInstruction
                    && target.as_deref().is_none_or(|t| node.local_name() == t)
            }
            NodeTest::Principal => node.kind() == principal,
            NodeTest::NamespaceWildcard(uri) => {
                node.kind() == principal && node.namespace_uri() == uri
            }
            NodeTest::Name { ns_uri, local } => {
                node.kind() == principal
                    && node.local_name() == local
                    && node.namespace_uri() == ns_uri
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    /// The operator with its operands swapped (`a < b` ⇔ `b > a`).
    pub fn flip(self) -> Self {
        match self {
            CompareOp::Lt => CompareOp::Gt,
            CompareOp::Le => CompareOp::Ge,
            CompareOp::Gt => CompareOp::Lt,
            CompareOp::Ge => CompareOp::Le,
            other => other,
        }
    }

    pub fn is_equality(self) -> bool {
        matches!(self, CompareOp::Eq | CompareOp::Ne)
    }

    fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl ArithOp {
    fn symbol(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "div",
            ArithOp::Mod => "mod",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub axis: Axis,
    pub test: NodeTest,
    /// In textual order; each filters the survivors of the previous one.
    pub predicates: Vec<Arc<Expr>>,
}

impl Step {
    pub fn new(axis: Axis, test: NodeTest) -> Self {
        Self {
            axis,
            test,
            predicates: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Literal(String),
    Variable(ExpandedName),
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Arithmetic {
        op: ArithOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Negate(Box<Expr>),
    Union(Box<Expr>, Box<Expr>),
    /// `/`: the root of the context node's tree.
    Root,
    /// A step applied to the context node.
    Step(Arc<Step>),
    /// `left/step`
    Path {
        left: Box<Expr>,
        step: Arc<Step>,
    },
    /// `primary[p1][p2]...`
    Filter {
        base: Box<Expr>,
        predicates: Vec<Arc<Expr>>,
    },
    FunctionCall {
        name: ExpandedName,
        args: Vec<Expr>,
        return_type: ReturnType,
    },
    /// `position()`
    Position,
    /// `last()`
    Last,
}

impl Expr {
    pub fn return_type(&self) -> ReturnType {
        match self {
            Expr::Number(_) | Expr::Arithmetic { .. } | Expr::Negate(_) => ReturnType::Number,
            Expr::Position | Expr::Last => ReturnType::Number,
            Expr::Literal(_) => ReturnType::String,
            Expr::Or(..) | Expr::And(..) | Expr::Compare { .. } => ReturnType::Boolean,
            Expr::Union(..) | Expr::Root | Expr::Step(_) | Expr::Path { .. } | Expr::Filter { .. } => {
                ReturnType::NodeSet
            }
            Expr::Variable(_) => ReturnType::Any,
            Expr::FunctionCall { return_type, .. } => *return_type,
        }
    }
}

fn write_predicates(f: &mut fmt::Formatter<'_>, preds: &[Arc<Expr>]) -> fmt::Result {
    for p in preds {
        write!(f, "[{p}]")?;
    }
    Ok(())
}

impl fmt::Display for NodeTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeTest::AnyNode => f.write_str("node()"),
            NodeTest::Text => f.write_str("text()"),
            NodeTest::Comment => f.write_str("comment()"),
            NodeTest::ProcessingInstruction(None) => f.write_str("processing-instruction()"),
            NodeTest::ProcessingInstruction(Some(t)) => write!(f, "processing-instruction('{t}')"),
            NodeTest::Principal => f.write_str("*"),
            NodeTest::NamespaceWildcard(uri) => write!(f, "Q{{{uri}}}*"),
            NodeTest::Name { ns_uri, local } if ns_uri.is_empty() => f.write_str(local),
            NodeTest::Name { ns_uri, local } => write!(f, "Q{{{ns_uri}}}{local}"),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.axis.name(), self.test)?;
        write_predicates(f, &self.predicates)
    }
}

/// Fully parenthesized rendering; mainly for diagnostics and tests.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => f.write_str(&number_to_string(*n)),
            Expr::Literal(s) if s.contains('"') => write!(f, "'{s}'"),
            Expr::Literal(s) => write!(f, "\"{s}\""),
            Expr::Variable(name) => write!(f, "${name}"),
            Expr::Or(l, r) => write!(f, "({l} or {r})"),
            Expr::And(l, r) => write!(f, "({l} and {r})"),
            Expr::Compare { op, left, right } => write!(f, "({left} {} {right})", op.symbol()),
            Expr::Arithmetic { op, left, right } => write!(f, "({left} {} {right})", op.symbol()),
            Expr::Negate(e) => write!(f, "-({e})"),
            Expr::Union(l, r) => write!(f, "({l} | {r})"),
            Expr::Root => f.write_str("/"),
            Expr::Step(step) => write!(f, "{step}"),
            Expr::Path { left, step } => match left.as_ref() {
                Expr::Root => write!(f, "/{step}"),
                other => write!(f, "{other}/{step}"),
            },
            Expr::Filter { base, predicates } => {
                write!(f, "({base})")?;
                write_predicates(f, predicates)
            }
            Expr::FunctionCall { name, args, .. } => {
                write!(f, "{name}(")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{a}")?;
                }
                f.write_str(")")
            }
            Expr::Position => f.write_str("position()"),
            Expr::Last => f.write_str("last()"),
        }
    }
}
