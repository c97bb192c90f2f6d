use crate::consts::XML_URI;
use crate::engine::runtime::{CallCtx, Error};
use crate::model::Navigator;
use crate::xdm::Value;

pub(super) fn boolean_fn<N: Navigator>(_ctx: &CallCtx<N>, args: &[Value<N>]) -> Result<Value<N>, Error> {
    Ok(Value::Boolean(args[0].to_boolean()?))
}

pub(super) fn not_fn<N: Navigator>(_ctx: &CallCtx<N>, args: &[Value<N>]) -> Result<Value<N>, Error> {
    Ok(Value::Boolean(!args[0].to_boolean()?))
}

pub(super) fn true_fn<N: Navigator>(_ctx: &CallCtx<N>, _args: &[Value<N>]) -> Result<Value<N>, Error> {
    Ok(Value::Boolean(true))
}

pub(super) fn false_fn<N: Navigator>(_ctx: &CallCtx<N>, _args: &[Value<N>]) -> Result<Value<N>, Error> {
    Ok(Value::Boolean(false))
}

fn xml_lang<N: Navigator>(node: &N) -> Option<String> {
    let mut a = node.clone();
    if !a.move_to_first_attribute() {
        return None;
    }
    loop {
        if a.local_name() == "lang" && a.namespace_uri() == XML_URI {
            return Some(a.string_value());
        }
        if !a.move_to_next_attribute() {
            return None;
        }
    }
}

/// `lang(s)`: the nearest `xml:lang` on ancestor-or-self equals `s` or
/// starts with `s` followed by `-`, ignoring ASCII case.
pub(super) fn lang_fn<N: Navigator>(ctx: &CallCtx<N>, args: &[Value<N>]) -> Result<Value<N>, Error> {
    let wanted = args[0].to_string_value()?;
    let mut node = ctx.context_node().clone();
    let declared = loop {
        if let Some(l) = xml_lang(&node) {
            break Some(l);
        }
        if !node.move_to_parent() {
            break None;
        }
    };
    let hit = declared.is_some_and(|l| {
        l.get(..wanted.len()).is_some_and(|head| head.eq_ignore_ascii_case(&wanted))
            && matches!(l.as_bytes().get(wanted.len()), None | Some(b'-'))
    });
    Ok(Value::Boolean(hit))
}
