//! The XPath 1.0 core function library.
//!
//! [`CORE_FUNCTIONS`] carries the static signature of each function (arity
//! range, result type, node-set parameters); the parser checks calls
//! against it. [`default_function_registry`] binds the implementations.

use crate::engine::runtime::{CallCtx, Error, ErrorCode, FunctionRegistry};
use crate::model::Navigator;
use crate::xdm::{NodeSequence, ReturnType, Value};

pub mod boolean;
pub mod nodes;
pub mod numeric;
pub mod strings;

/// Static signature of a core function.
#[derive(Debug)]
pub struct CoreFunction {
    pub name: &'static str,
    pub min_arity: usize,
    /// `None` for variadic functions.
    pub max_arity: Option<usize>,
    pub return_type: ReturnType,
    /// Argument indices that must be node-sets.
    pub node_set_args: &'static [usize],
}

const fn sig(
    name: &'static str,
    min_arity: usize,
    max_arity: Option<usize>,
    return_type: ReturnType,
    node_set_args: &'static [usize],
) -> CoreFunction {
    CoreFunction {
        name,
        min_arity,
        max_arity,
        return_type,
        node_set_args,
    }
}

pub const CORE_FUNCTIONS: [CoreFunction; 27] = [
    sig("last", 0, Some(0), ReturnType::Number, &[]),
    sig("position", 0, Some(0), ReturnType::Number, &[]),
    sig("count", 1, Some(1), ReturnType::Number, &[0]),
    sig("id", 1, Some(1), ReturnType::NodeSet, &[]),
    sig("local-name", 0, Some(1), ReturnType::String, &[0]),
    sig("namespace-uri", 0, Some(1), ReturnType::String, &[0]),
    sig("name", 0, Some(1), ReturnType::String, &[0]),
    sig("string", 0, Some(1), ReturnType::String, &[]),
    sig("concat", 2, None, ReturnType::String, &[]),
    sig("starts-with", 2, Some(2), ReturnType::Boolean, &[]),
    sig("contains", 2, Some(2), ReturnType::Boolean, &[]),
    sig("substring-before", 2, Some(2), ReturnType::String, &[]),
    sig("substring-after", 2, Some(2), ReturnType::String, &[]),
    sig("substring", 2, Some(3), ReturnType::String, &[]),
    sig("string-length", 0, Some(1), ReturnType::Number, &[]),
    sig("normalize-space", 0, Some(1), ReturnType::String, &[]),
    sig("translate", 3, Some(3), ReturnType::String, &[]),
    sig("boolean", 1, Some(1), ReturnType::Boolean, &[]),
    sig("not", 1, Some(1), ReturnType::Boolean, &[]),
    sig("true", 0, Some(0), ReturnType::Boolean, &[]),
    sig("false", 0, Some(0), ReturnType::Boolean, &[]),
    sig("lang", 1, Some(1), ReturnType::Boolean, &[]),
    sig("number", 0, Some(1), ReturnType::Number, &[]),
    sig("sum", 1, Some(1), ReturnType::Number, &[0]),
    sig("floor", 1, Some(1), ReturnType::Number, &[]),
    sig("ceiling", 1, Some(1), ReturnType::Number, &[]),
    sig("round", 1, Some(1), ReturnType::Number, &[]),
];

/// Signature of the core function `name`, if it is one.
pub fn core_function(name: &str) -> Option<&'static CoreFunction> {
    CORE_FUNCTIONS.iter().find(|f| f.name == name)
}

type CoreFn<N> = fn(&CallCtx<N>, &[Value<N>]) -> Result<Value<N>, Error>;

fn implementation<N: Navigator>(name: &str) -> Option<CoreFn<N>> {
    let f: CoreFn<N> = match name {
        "last" => nodes::last_fn,
        "position" => nodes::position_fn,
        "count" => nodes::count_fn,
        "id" => nodes::id_fn,
        "local-name" => nodes::local_name_fn,
        "namespace-uri" => nodes::namespace_uri_fn,
        "name" => nodes::name_fn,
        "string" => strings::string_fn,
        "concat" => strings::concat_fn,
        "starts-with" => strings::starts_with_fn,
        "contains" => strings::contains_fn,
        "substring-before" => strings::substring_before_fn,
        "substring-after" => strings::substring_after_fn,
        "substring" => strings::substring_fn,
        "string-length" => strings::string_length_fn,
        "normalize-space" => strings::normalize_space_fn,
        "translate" => strings::translate_fn,
        "boolean" => boolean::boolean_fn,
        "not" => boolean::not_fn,
        "true" => boolean::true_fn,
        "false" => boolean::false_fn,
        "lang" => boolean::lang_fn,
        "number" => numeric::number_fn,
        "sum" => numeric::sum_fn,
        "floor" => numeric::floor_fn,
        "ceiling" => numeric::ceiling_fn,
        "round" => numeric::round_fn,
        _ => return None,
    };
    Some(f)
}

/// A registry holding the 27 core functions in no namespace.
pub fn default_function_registry<N: Navigator>() -> FunctionRegistry<N> {
    let mut reg = FunctionRegistry::new();
    for f in &CORE_FUNCTIONS {
        if let Some(imp) = implementation::<N>(f.name) {
            reg.register_local_range(f.name, f.min_arity, f.max_arity, imp);
        }
    }
    reg
}

/// String value of argument `i`, or of the context node when absent.
fn string_or_context<N: Navigator>(ctx: &CallCtx<N>, args: &[Value<N>], i: usize) -> Result<String, Error> {
    match args.get(i) {
        Some(v) => v.to_string_value(),
        None => Ok(ctx.context_node().string_value()),
    }
}

fn node_set_arg<N: Navigator>(args: &[Value<N>], i: usize, function: &str) -> Result<NodeSequence<N>, Error> {
    match args.get(i) {
        Some(Value::NodeSet(ns)) => Ok(ns.clone()),
        Some(other) => Err(Error::from_code(
            ErrorCode::XPTY0004,
            format!("{function}() requires a node-set, got {:?}", other.return_type()),
        )),
        None => Err(Error::from_code(
            ErrorCode::XPST0017,
            format!("{function}() is missing argument {}", i + 1),
        )),
    }
}

/// First node of the optional node-set argument in document order, or the
/// context node when the argument is absent.
fn node_or_context<N: Navigator>(
    ctx: &CallCtx<N>,
    args: &[Value<N>],
    function: &str,
) -> Result<Option<N>, Error> {
    if args.is_empty() {
        return Ok(Some(ctx.context_node().clone()));
    }
    node_set_arg(args, 0, function)?.first_in_document_order()
}
