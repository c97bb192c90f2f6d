use super::{node_or_context, node_set_arg};
use crate::engine::evaluator::cursors::sort_document_order;
use crate::engine::runtime::{CallCtx, Error};
use crate::model::{Navigator, NodeKind};
use crate::xdm::{NodeSequence, SeqOrder, Value, is_xml_whitespace};

pub(super) fn last_fn<N: Navigator>(ctx: &CallCtx<N>, _args: &[Value<N>]) -> Result<Value<N>, Error> {
    Ok(Value::Number(ctx.size()? as f64))
}

pub(super) fn position_fn<N: Navigator>(ctx: &CallCtx<N>, _args: &[Value<N>]) -> Result<Value<N>, Error> {
    Ok(Value::Number(ctx.position() as f64))
}

pub(super) fn count_fn<N: Navigator>(_ctx: &CallCtx<N>, args: &[Value<N>]) -> Result<Value<N>, Error> {
    Ok(Value::Number(node_set_arg(args, 0, "count")?.len()? as f64))
}

/// `id(x)`: elements whose ID is one of the whitespace-separated tokens of
/// `x` (of each node's string value when `x` is a node-set).
pub(super) fn id_fn<N: Navigator>(ctx: &CallCtx<N>, args: &[Value<N>]) -> Result<Value<N>, Error> {
    let mut tokens = Vec::new();
    match &args[0] {
        Value::NodeSet(ns) => {
            for n in ns.clone() {
                tokens.push(n?.string_value());
            }
        }
        other => tokens.push(other.to_string_value()?),
    }
    let mut found = Vec::new();
    for id in tokens.iter().flat_map(|t| t.split(is_xml_whitespace)).filter(|t| !t.is_empty()) {
        let mut n = ctx.context_node().clone();
        if n.move_to_id(id) {
            found.push(n);
        }
    }
    Ok(Value::NodeSet(NodeSequence::from_nodes(
        sort_document_order(found)?,
        SeqOrder::Document,
    )))
}

fn has_name(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Element | NodeKind::Attribute | NodeKind::Namespace | NodeKind::ProcessingInstruction
    )
}

pub(super) fn local_name_fn<N: Navigator>(ctx: &CallCtx<N>, args: &[Value<N>]) -> Result<Value<N>, Error> {
    let name = node_or_context(ctx, args, "local-name")?
        .filter(|n| has_name(n.kind()))
        .map(|n| n.local_name().to_string())
        .unwrap_or_default();
    Ok(Value::String(name))
}

pub(super) fn namespace_uri_fn<N: Navigator>(ctx: &CallCtx<N>, args: &[Value<N>]) -> Result<Value<N>, Error> {
    let uri = node_or_context(ctx, args, "namespace-uri")?
        .filter(|n| matches!(n.kind(), NodeKind::Element | NodeKind::Attribute))
        .map(|n| n.namespace_uri().to_string())
        .unwrap_or_default();
    Ok(Value::String(uri))
}

pub(super) fn name_fn<N: Navigator>(ctx: &CallCtx<N>, args: &[Value<N>]) -> Result<Value<N>, Error> {
    let name = node_or_context(ctx, args, "name")?
        .filter(|n| has_name(n.kind()))
        .map(|n| n.name())
        .unwrap_or_default();
    Ok(Value::String(name))
}
