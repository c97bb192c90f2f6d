use crate::consts::{ERR_NS, XML_URI};
use crate::engine::collation::CollationRegistry;
use crate::engine::evaluator::Focus;
use crate::model::Navigator;
use crate::xdm::{ExpandedName, Value};
use core::fmt;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

pub type Arity = usize;

/// Error type returned by function resolution.
#[derive(Debug, Clone)]
pub enum ResolveError {
    /// No function with that name exists.
    Unknown(ExpandedName),
    /// Function exists, but not for the requested arity. Provides known arities.
    WrongArity {
        name: ExpandedName,
        available: Vec<Arity>,
    },
}

/// What a function implementation sees of the evaluation state.
pub struct CallCtx<'a, N> {
    pub dyn_ctx: &'a DynamicContext<N>,
    focus: &'a Focus<'a, N>,
}

impl<'a, N> CallCtx<'a, N> {
    pub(crate) fn new(focus: &'a Focus<'a, N>) -> Self {
        Self {
            dyn_ctx: focus.ctx,
            focus,
        }
    }

    pub fn context_node(&self) -> &N {
        self.focus.node
    }

    pub fn position(&self) -> usize {
        self.focus.position
    }

    /// Context size; computed on first use when the context is a lazy sequence.
    pub fn size(&self) -> Result<usize, Error> {
        self.focus.size()
    }
}

pub type FunctionImpl<N> =
    Arc<dyn Fn(&CallCtx<N>, &[Value<N>]) -> Result<Value<N>, Error> + Send + Sync>;

// (min_arity, max_arity, impl); `None` as max means variadic.
pub type FunctionOverload<N> = (Arity, Option<Arity>, FunctionImpl<N>);

/// Function-resolution capability: `(namespace, local-name, arity) → callable`.
pub struct FunctionRegistry<N> {
    fns: HashMap<ExpandedName, Vec<FunctionOverload<N>>>,
}

impl<N> Default for FunctionRegistry<N> {
    fn default() -> Self {
        Self {
            fns: HashMap::new(),
        }
    }
}

fn overload_specificity<N>(a: &FunctionOverload<N>, b: &FunctionOverload<N>) -> core::cmp::Ordering {
    // Higher minimum first; for equal minimums the tighter bound wins.
    b.0.cmp(&a.0).then_with(|| match (a.1, b.1) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => core::cmp::Ordering::Less,
        (None, Some(_)) => core::cmp::Ordering::Greater,
        (None, None) => core::cmp::Ordering::Equal,
    })
}

impl<N> FunctionRegistry<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `func` for `min_arity..=max_arity` (unbounded when `max_arity` is None).
    /// Later registrations with an overlapping range shadow earlier ones only
    /// when they are more specific.
    pub fn register_range(
        &mut self,
        name: ExpandedName,
        min_arity: Arity,
        max_arity: Option<Arity>,
        func: FunctionImpl<N>,
    ) {
        let overloads = self.fns.entry(name).or_default();
        overloads.push((min_arity, max_arity, func));
        overloads.sort_by(overload_specificity);
    }

    pub fn register(&mut self, name: ExpandedName, arity: Arity, func: FunctionImpl<N>) {
        self.register_range(name, arity, Some(arity), func);
    }

    /// Register a plain closure under `name` with an exact arity.
    pub fn register_fn<F>(&mut self, name: ExpandedName, arity: Arity, f: F)
    where
        F: 'static + Send + Sync + Fn(&CallCtx<N>, &[Value<N>]) -> Result<Value<N>, Error>,
    {
        self.register(name, arity, Arc::new(f));
    }

    /// Register an extension function in a namespace.
    pub fn register_ns<F>(&mut self, ns_uri: &str, local: &str, arity: Arity, f: F)
    where
        F: 'static + Send + Sync + Fn(&CallCtx<N>, &[Value<N>]) -> Result<Value<N>, Error>,
    {
        self.register_fn(ExpandedName::new(Some(ns_uri.to_string()), local), arity, f);
    }

    pub fn register_ns_range<F>(
        &mut self,
        ns_uri: &str,
        local: &str,
        min_arity: Arity,
        max_arity: Option<Arity>,
        f: F,
    ) where
        F: 'static + Send + Sync + Fn(&CallCtx<N>, &[Value<N>]) -> Result<Value<N>, Error>,
    {
        let name = ExpandedName::new(Some(ns_uri.to_string()), local);
        self.register_range(name, min_arity, max_arity, Arc::new(f));
    }

    /// Register a function without a namespace with an arity range.
    pub fn register_local_range<F>(
        &mut self,
        local: &str,
        min_arity: Arity,
        max_arity: Option<Arity>,
        f: F,
    ) where
        F: 'static + Send + Sync + Fn(&CallCtx<N>, &[Value<N>]) -> Result<Value<N>, Error>,
    {
        self.register_range(ExpandedName::local(local), min_arity, max_arity, Arc::new(f));
    }

    pub fn register_local<F>(&mut self, local: &str, arity: Arity, f: F)
    where
        F: 'static + Send + Sync + Fn(&CallCtx<N>, &[Value<N>]) -> Result<Value<N>, Error>,
    {
        self.register_fn(ExpandedName::local(local), arity, f);
    }

    pub fn contains(&self, name: &ExpandedName) -> bool {
        self.fns.contains_key(name)
    }

    /// Resolve a function by name and arity; distinguishes unknown names from
    /// known names called with an unsupported arity.
    pub fn resolve(&self, name: &ExpandedName, arity: Arity) -> Result<&FunctionImpl<N>, ResolveError> {
        let Some(cands) = self.fns.get(name) else {
            return Err(ResolveError::Unknown(name.clone()));
        };
        if let Some((_, _, f)) = cands
            .iter()
            .find(|(min, max, _)| arity >= *min && max.is_none_or(|m| arity <= m))
        {
            return Ok(f);
        }
        let mut available: Vec<Arity> = cands
            .iter()
            .filter_map(|(min, max, _)| max.map(|m| *min..=m))
            .flatten()
            .collect();
        available.sort_unstable();
        available.dedup();
        Err(ResolveError::WrongArity {
            name: name.clone(),
            available,
        })
    }
}

/// Error codes the engine emits (W3C xqt-errors vocabulary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    FOER0000, // navigation failure / unordered nodes
    FOCH0002, // collation does not exist
    XPTY0004, // type error (node-set required)
    XPDY0002, // context undefined
    XPST0003, // syntax error
    XPST0008, // unbound variable
    XPST0017, // unknown function or wrong arity
    XPST0081, // undeclared namespace prefix
    /// Only produced by [`ErrorCode::from_code`] for unrecognised strings.
    Unknown,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::FOER0000 => "FOER0000",
            ErrorCode::FOCH0002 => "FOCH0002",
            ErrorCode::XPTY0004 => "XPTY0004",
            ErrorCode::XPDY0002 => "XPDY0002",
            ErrorCode::XPST0003 => "XPST0003",
            ErrorCode::XPST0008 => "XPST0008",
            ErrorCode::XPST0017 => "XPST0017",
            ErrorCode::XPST0081 => "XPST0081",
            ErrorCode::Unknown => "UNKNOWN",
        }
    }

    /// The code as a QName in the xqt-errors namespace.
    pub fn qname(&self) -> ExpandedName {
        ExpandedName::new(Some(ERR_NS.to_string()), self.as_str())
    }

    pub fn from_code(s: &str) -> Self {
        use ErrorCode::*;
        match s.strip_prefix("err:").unwrap_or(s) {
            "FOER0000" => FOER0000,
            "FOCH0002" => FOCH0002,
            "XPTY0004" => XPTY0004,
            "XPDY0002" => XPDY0002,
            "XPST0003" => XPST0003,
            "XPST0008" => XPST0008,
            "XPST0017" => XPST0017,
            "XPST0081" => XPST0081,
            _ => Unknown,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "err:{}", self.as_str())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    /// Byte offset into the query text (compile errors).
    pub position: Option<usize>,
    /// Tokens the parser would have accepted at `position`.
    pub expected: Vec<String>,
    #[source]
    pub source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    pub fn from_code(code: ErrorCode, msg: impl Into<String>) -> Self {
        Self {
            code,
            message: msg.into(),
            position: None,
            expected: Vec::new(),
            source: None,
        }
    }

    pub fn code_enum(&self) -> ErrorCode {
        self.code
    }

    #[must_use]
    pub fn at(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    #[must_use]
    pub fn expecting<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expected = tokens.into_iter().map(Into::into).collect();
        self
    }

    /// Compose an error with a source cause.
    #[must_use]
    pub fn with_source(
        mut self,
        source: impl Into<Option<Arc<dyn std::error::Error + Send + Sync>>>,
    ) -> Self {
        self.source = source.into();
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error: {} ({})", self.message, self.code)?;
        if let Some(pos) = self.position {
            write!(f, " at offset {pos}")?;
        }
        if !self.expected.is_empty() {
            write!(f, "; expected one of: {}", self.expected.join(", "))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct NamespaceBindings {
    pub by_prefix: HashMap<String, String>,
}

/// Compile-time configuration.
#[derive(Debug, Clone)]
pub struct StaticContext {
    pub namespaces: NamespaceBindings,
}

impl Default for StaticContext {
    fn default() -> Self {
        let mut ns = NamespaceBindings::default();
        ns.by_prefix.insert("xml".to_string(), XML_URI.to_string());
        Self { namespaces: ns }
    }
}

impl StaticContext {
    pub fn resolve_prefix(&self, prefix: &str) -> Option<&str> {
        self.namespaces.by_prefix.get(prefix).map(String::as_str)
    }
}

pub struct StaticContextBuilder {
    ctx: StaticContext,
}

impl Default for StaticContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticContextBuilder {
    /// The built `StaticContext` is captured by `compile`; prefixes are
    /// resolved once, at compile time.
    pub fn new() -> Self {
        Self {
            ctx: StaticContext::default(),
        }
    }

    /// Register a namespace prefix → URI mapping. Attempts to rebind the
    /// reserved `xml` prefix are ignored.
    #[must_use]
    pub fn with_namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        let p = prefix.into();
        if p == "xml" {
            return self;
        }
        self.ctx.namespaces.by_prefix.insert(p, uri.into());
        self
    }

    pub fn build(self) -> StaticContext {
        self.ctx
    }
}

/// Evaluation-time configuration: variables, functions, collations.
///
/// Cloning is cheap; cursors that outlive an `evaluate` call keep a clone.
pub struct DynamicContext<N> {
    pub(crate) variables: Rc<HashMap<ExpandedName, Value<N>>>,
    pub functions: Arc<FunctionRegistry<N>>,
    pub collations: Arc<CollationRegistry>,
}

impl<N> Clone for DynamicContext<N> {
    fn clone(&self) -> Self {
        Self {
            variables: Rc::clone(&self.variables),
            functions: Arc::clone(&self.functions),
            collations: Arc::clone(&self.collations),
        }
    }
}

impl<N: Navigator> Default for DynamicContext<N> {
    fn default() -> Self {
        Self {
            variables: Rc::new(HashMap::new()),
            functions: Arc::new(crate::engine::functions::default_function_registry::<N>()),
            collations: Arc::new(CollationRegistry::default()),
        }
    }
}

impl<N> DynamicContext<N> {
    pub fn variable(&self, name: &ExpandedName) -> Option<&Value<N>> {
        self.variables.get(name)
    }
}

pub struct DynamicContextBuilder<N> {
    variables: HashMap<ExpandedName, Value<N>>,
    functions: Option<Arc<FunctionRegistry<N>>>,
    collations: Option<Arc<CollationRegistry>>,
}

impl<N: Navigator> Default for DynamicContextBuilder<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: Navigator> DynamicContextBuilder<N> {
    pub fn new() -> Self {
        Self {
            variables: HashMap::new(),
            functions: None,
            collations: None,
        }
    }

    #[must_use]
    pub fn with_variable(mut self, name: impl Into<ExpandedName>, value: impl Into<Value<N>>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    /// Replace the function registry (defaults to the core library).
    #[must_use]
    pub fn with_functions(mut self, reg: Arc<FunctionRegistry<N>>) -> Self {
        self.functions = Some(reg);
        self
    }

    #[must_use]
    pub fn with_collations(mut self, reg: Arc<CollationRegistry>) -> Self {
        self.collations = Some(reg);
        self
    }

    pub fn build(self) -> DynamicContext<N> {
        DynamicContext {
            variables: Rc::new(self.variables),
            functions: self
                .functions
                .unwrap_or_else(|| Arc::new(crate::engine::functions::default_function_registry::<N>())),
            collations: self.collations.unwrap_or_default(),
        }
    }
}
