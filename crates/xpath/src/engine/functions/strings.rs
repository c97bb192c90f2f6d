use itertools::Itertools;

use super::string_or_context;
use crate::engine::functions::numeric::xpath_round;
use crate::engine::runtime::{CallCtx, Error};
use crate::model::Navigator;
use crate::xdm::{Value, is_xml_whitespace};

pub(super) fn string_fn<N: Navigator>(ctx: &CallCtx<N>, args: &[Value<N>]) -> Result<Value<N>, Error> {
    Ok(Value::String(string_or_context(ctx, args, 0)?))
}

pub(super) fn concat_fn<N: Navigator>(_ctx: &CallCtx<N>, args: &[Value<N>]) -> Result<Value<N>, Error> {
    let mut out = String::new();
    for a in args {
        out.push_str(&a.to_string_value()?);
    }
    Ok(Value::String(out))
}

fn two_strings<N: Navigator>(args: &[Value<N>]) -> Result<(String, String), Error> {
    Ok((args[0].to_string_value()?, args[1].to_string_value()?))
}

pub(super) fn starts_with_fn<N: Navigator>(_ctx: &CallCtx<N>, args: &[Value<N>]) -> Result<Value<N>, Error> {
    let (s, prefix) = two_strings(args)?;
    Ok(Value::Boolean(s.starts_with(&prefix)))
}

pub(super) fn contains_fn<N: Navigator>(_ctx: &CallCtx<N>, args: &[Value<N>]) -> Result<Value<N>, Error> {
    let (s, needle) = two_strings(args)?;
    Ok(Value::Boolean(s.contains(&needle)))
}

pub(super) fn substring_before_fn<N: Navigator>(_ctx: &CallCtx<N>, args: &[Value<N>]) -> Result<Value<N>, Error> {
    let (s, sep) = two_strings(args)?;
    let out = s.split_once(&sep).map(|(before, _)| before.to_string()).unwrap_or_default();
    Ok(Value::String(out))
}

pub(super) fn substring_after_fn<N: Navigator>(_ctx: &CallCtx<N>, args: &[Value<N>]) -> Result<Value<N>, Error> {
    let (s, sep) = two_strings(args)?;
    let out = s.split_once(&sep).map(|(_, after)| after.to_string()).unwrap_or_default();
    Ok(Value::String(out))
}

/// Characters at 1-based positions `p` with `round(start) <= p < round(start) + round(len)`.
pub(super) fn substring_fn<N: Navigator>(_ctx: &CallCtx<N>, args: &[Value<N>]) -> Result<Value<N>, Error> {
    let s = args[0].to_string_value()?;
    let start = xpath_round(args[1].to_number()?);
    let end = match args.get(2) {
        Some(len) => start + xpath_round(len.to_number()?),
        None => f64::INFINITY,
    };
    let out: String = s
        .chars()
        .enumerate()
        .filter(|(i, _)| {
            let p = (i + 1) as f64;
            p >= start && p < end
        })
        .map(|(_, c)| c)
        .collect();
    Ok(Value::String(out))
}

pub(super) fn string_length_fn<N: Navigator>(ctx: &CallCtx<N>, args: &[Value<N>]) -> Result<Value<N>, Error> {
    let s = string_or_context(ctx, args, 0)?;
    Ok(Value::Number(s.chars().count() as f64))
}

pub(super) fn normalize_space_fn<N: Navigator>(ctx: &CallCtx<N>, args: &[Value<N>]) -> Result<Value<N>, Error> {
    let s = string_or_context(ctx, args, 0)?;
    Ok(Value::String(
        s.split(is_xml_whitespace).filter(|w| !w.is_empty()).join(" "),
    ))
}

pub(super) fn translate_fn<N: Navigator>(_ctx: &CallCtx<N>, args: &[Value<N>]) -> Result<Value<N>, Error> {
    let s = args[0].to_string_value()?;
    let from: Vec<char> = args[1].to_string_value()?.chars().collect();
    let to: Vec<char> = args[2].to_string_value()?.chars().collect();
    let out = s
        .chars()
        .filter_map(|c| match from.iter().position(|&f| f == c) {
            Some(i) => to.get(i).copied(),
            None => Some(c),
        })
        .collect();
    Ok(Value::String(out))
}
