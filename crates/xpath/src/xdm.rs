//! Values, node cursors and the XPath 1.0 coercion ladder.

use core::cmp::Ordering;
use core::fmt;
use std::rc::Rc;

use crate::engine::runtime::{Error, ErrorCode};
use crate::model::{Navigator, try_document_order};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExpandedName {
    pub ns_uri: Option<String>,
    pub local: String,
}

impl ExpandedName {
    pub fn new(ns_uri: Option<String>, local: impl Into<String>) -> Self {
        Self {
            ns_uri,
            local: local.into(),
        }
    }

    pub fn local(local: impl Into<String>) -> Self {
        Self::new(None, local)
    }
}

impl From<&str> for ExpandedName {
    fn from(local: &str) -> Self {
        ExpandedName::local(local)
    }
}

impl fmt::Display for ExpandedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ns_uri {
            Some(ns) => write!(f, "Q{{{ns}}}{}", self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// Static result type of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnType {
    Number,
    String,
    Boolean,
    NodeSet,
    /// Only known at evaluation time (variables, extension functions).
    Any,
}

impl ReturnType {
    pub fn is_scalar(self) -> bool {
        matches!(self, ReturnType::Number | ReturnType::String | ReturnType::Boolean)
    }
}

/// Ordering promise of a node cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeqOrder {
    /// Strictly ascending document order, no duplicates.
    Document,
    /// Strictly descending document order, no duplicates (reverse axes).
    Reverse,
    /// No promise beyond "no duplicates".
    Unordered,
}

/// Pull-style cursor over nodes.
///
/// `position` is 0 before the first successful `move_next`, then 1-based; it
/// keeps the last position once the cursor is exhausted. Cursors own their
/// navigators privately: forking a walk goes through `boxed_clone`.
pub trait NodeCursor<N> {
    fn move_next(&mut self) -> Result<bool, Error>;

    fn current(&self) -> Option<&N>;

    fn position(&self) -> usize;

    /// Size of the whole sequence. Walks a clone; `self` is not disturbed.
    fn count(&self) -> Result<usize, Error> {
        let mut probe = self.boxed_clone();
        while probe.move_next()? {}
        Ok(probe.position())
    }

    fn boxed_clone(&self) -> Box<dyn NodeCursor<N>>;

    fn order(&self) -> SeqOrder;
}

#[derive(Debug)]
pub(crate) struct EmptyCursor;

impl<N: 'static> NodeCursor<N> for EmptyCursor {
    fn move_next(&mut self) -> Result<bool, Error> {
        Ok(false)
    }
    fn current(&self) -> Option<&N> {
        None
    }
    fn position(&self) -> usize {
        0
    }
    fn count(&self) -> Result<usize, Error> {
        Ok(0)
    }
    fn boxed_clone(&self) -> Box<dyn NodeCursor<N>> {
        Box::new(EmptyCursor)
    }
    fn order(&self) -> SeqOrder {
        SeqOrder::Document
    }
}

/// Cursor over materialized nodes.
pub(crate) struct VecCursor<N> {
    nodes: Rc<[N]>,
    pos: usize,
    order: SeqOrder,
}

impl<N> VecCursor<N> {
    pub(crate) fn new(nodes: Vec<N>, order: SeqOrder) -> Self {
        Self {
            nodes: nodes.into(),
            pos: 0,
            order,
        }
    }
}

impl<N: Clone + 'static> NodeCursor<N> for VecCursor<N> {
    fn move_next(&mut self) -> Result<bool, Error> {
        if self.pos < self.nodes.len() {
            self.pos += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }
    fn current(&self) -> Option<&N> {
        self.pos.checked_sub(1).and_then(|i| self.nodes.get(i))
    }
    fn position(&self) -> usize {
        self.pos
    }
    fn count(&self) -> Result<usize, Error> {
        Ok(self.nodes.len())
    }
    fn boxed_clone(&self) -> Box<dyn NodeCursor<N>> {
        Box::new(Self {
            nodes: Rc::clone(&self.nodes),
            pos: self.pos,
            order: self.order,
        })
    }
    fn order(&self) -> SeqOrder {
        self.order
    }
}

/// A node-set result: a lazily evaluated, cloneable cursor.
///
/// Iterating yields the remaining nodes in the cursor's natural order; see
/// [`NodeSequence::order`].
pub struct NodeSequence<N> {
    cursor: Box<dyn NodeCursor<N>>,
}

impl<N: Navigator> NodeSequence<N> {
    pub fn new(cursor: Box<dyn NodeCursor<N>>) -> Self {
        Self { cursor }
    }

    pub fn empty() -> Self {
        Self::new(Box::new(EmptyCursor))
    }

    pub fn from_nodes(nodes: Vec<N>, order: SeqOrder) -> Self {
        Self::new(Box::new(VecCursor::new(nodes, order)))
    }

    pub fn singleton(node: N) -> Self {
        Self::from_nodes(vec![node], SeqOrder::Document)
    }

    pub fn move_next(&mut self) -> Result<bool, Error> {
        self.cursor.move_next()
    }

    pub fn current(&self) -> Option<&N> {
        self.cursor.current()
    }

    pub fn position(&self) -> usize {
        self.cursor.position()
    }

    /// Total number of nodes in the sequence, counted on a clone; the
    /// receiver's position is untouched.
    pub fn len(&self) -> Result<usize, Error> {
        self.cursor.count()
    }

    pub fn order(&self) -> SeqOrder {
        self.cursor.order()
    }

    pub fn into_cursor(self) -> Box<dyn NodeCursor<N>> {
        self.cursor
    }

    /// The nodes not yet consumed, collected from a clone.
    pub fn to_vec(&self) -> Result<Vec<N>, Error> {
        self.clone().collect()
    }

    /// True when no further node can be pulled.
    pub fn is_empty(&self) -> Result<bool, Error> {
        let mut probe = self.cursor.boxed_clone();
        Ok(!probe.move_next()?)
    }

    /// First remaining node in document order, whatever order the cursor
    /// enumerates in.
    pub fn first_in_document_order(&self) -> Result<Option<N>, Error> {
        let mut probe = self.cursor.boxed_clone();
        match self.cursor.order() {
            SeqOrder::Document => {
                if probe.move_next()? {
                    Ok(probe.current().cloned())
                } else {
                    Ok(None)
                }
            }
            SeqOrder::Reverse => {
                let mut last = None;
                while probe.move_next()? {
                    last = probe.current().cloned();
                }
                Ok(last)
            }
            SeqOrder::Unordered => {
                let mut best: Option<N> = None;
                while probe.move_next()? {
                    let Some(n) = probe.current() else { continue };
                    let replace = match &best {
                        None => true,
                        Some(b) => try_document_order(n, b)? == Ordering::Less,
                    };
                    if replace {
                        best = Some(n.clone());
                    }
                }
                Ok(best)
            }
        }
    }
}

impl<N> Clone for NodeSequence<N> {
    fn clone(&self) -> Self {
        Self {
            cursor: self.cursor.boxed_clone(),
        }
    }
}

impl<N: fmt::Debug> fmt::Debug for NodeSequence<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeSequence")
            .field("order", &self.cursor.order())
            .field("position", &self.cursor.position())
            .field("current", &self.cursor.current())
            .finish()
    }
}

impl<N: Navigator> Iterator for NodeSequence<N> {
    type Item = Result<N, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.cursor.move_next() {
            Ok(true) => self.cursor.current().cloned().map(Ok),
            Ok(false) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

/// Result of evaluating an expression.
#[derive(Debug, Clone)]
pub enum Value<N> {
    Boolean(bool),
    Number(f64),
    String(String),
    NodeSet(NodeSequence<N>),
}

impl<N: Navigator> Value<N> {
    pub fn return_type(&self) -> ReturnType {
        match self {
            Value::Boolean(_) => ReturnType::Boolean,
            Value::Number(_) => ReturnType::Number,
            Value::String(_) => ReturnType::String,
            Value::NodeSet(_) => ReturnType::NodeSet,
        }
    }

    pub fn to_boolean(&self) -> Result<bool, Error> {
        Ok(match self {
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::NodeSet(ns) => !ns.is_empty()?,
        })
    }

    pub fn to_number(&self) -> Result<f64, Error> {
        Ok(match self {
            Value::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) => *n,
            Value::String(s) => string_to_number(s),
            Value::NodeSet(_) => string_to_number(&self.to_string_value()?),
        })
    }

    pub fn to_string_value(&self) -> Result<String, Error> {
        Ok(match self {
            Value::Boolean(b) => String::from(if *b { "true" } else { "false" }),
            Value::Number(n) => number_to_string(*n),
            Value::String(s) => s.clone(),
            Value::NodeSet(ns) => ns
                .first_in_document_order()?
                .map(|n| n.string_value())
                .unwrap_or_default(),
        })
    }

    pub fn into_node_set(self) -> Result<NodeSequence<N>, Error> {
        match self {
            Value::NodeSet(ns) => Ok(ns),
            other => Err(Error::from_code(
                ErrorCode::XPTY0004,
                format!("expected a node-set, got {:?}", other.return_type()),
            )),
        }
    }
}

impl<N> From<bool> for Value<N> {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl<N> From<f64> for Value<N> {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl<N> From<String> for Value<N> {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl<N> From<&str> for Value<N> {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl<N> From<NodeSequence<N>> for Value<N> {
    fn from(ns: NodeSequence<N>) -> Self {
        Value::NodeSet(ns)
    }
}

/// XPath 1.0 number → string: integers without a decimal point, no
/// exponent form, `NaN`, `Infinity`, `-Infinity`, and `0` for negative zero.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        String::from(if n > 0.0 { "Infinity" } else { "-Infinity" })
    } else if n == 0.0 {
        "0".to_string()
    } else {
        format!("{n}")
    }
}

pub(crate) fn is_xml_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// XPath 1.0 string → number: optional whitespace, optional `-`, digits with
/// an optional fraction. Anything else is NaN.
pub fn string_to_number(s: &str) -> f64 {
    let t = s.trim_matches(is_xml_whitespace);
    let body = t.strip_prefix('-').unwrap_or(t);
    let (int, frac) = match body.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (body, None),
    };
    let digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
    let valid = digits(int)
        && frac.is_none_or(digits)
        && (!int.is_empty() || frac.is_some_and(|f| !f.is_empty()));
    if !valid {
        return f64::NAN;
    }
    let mut normalized = String::with_capacity(t.len() + 2);
    if t.starts_with('-') {
        normalized.push('-');
    }
    normalized.push_str(if int.is_empty() { "0" } else { int });
    if let Some(f) = frac.filter(|f| !f.is_empty()) {
        normalized.push('.');
        normalized.push_str(f);
    }
    normalized.parse().unwrap_or(f64::NAN)
}
