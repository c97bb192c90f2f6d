//! Multi-key sort collector.
//!
//! Keys are computed once per node (with the node as context, its document
//! position and the input size as focus), then the nodes are stably sorted.

use core::cmp::Ordering;
use std::sync::Arc;

use tracing::debug;

use crate::engine::collation::Collation;
use crate::engine::runtime::{DynamicContext, Error};
use crate::model::Navigator;
use crate::parser::ast::Expr;
use crate::xdm::{NodeSequence, SeqOrder};

use super::cursors::sort_document_order;
use super::{ContextSize, Focus, evaluate_number, evaluate_string};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Tie-break for text keys that are equal ignoring case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaseOrder {
    #[default]
    None,
    UpperFirst,
    LowerFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDataType {
    #[default]
    Text,
    Number,
}

#[derive(Debug, Clone)]
pub(crate) struct SortKey {
    pub(crate) expr: Arc<Expr>,
    pub(crate) order: SortOrder,
    pub(crate) case_order: CaseOrder,
    /// Collation URI or language tag; `None` is codepoint order.
    pub(crate) lang: Option<String>,
    pub(crate) data_type: SortDataType,
}

enum KeyValue {
    Number(f64),
    Text(String),
}

pub(crate) fn sort_nodes<N: Navigator>(
    input: NodeSequence<N>,
    keys: &[SortKey],
    ctx: &DynamicContext<N>,
) -> Result<NodeSequence<N>, Error> {
    let order = input.order();
    let mut nodes = input.collect::<Result<Vec<N>, Error>>()?;
    match order {
        SeqOrder::Document => {}
        SeqOrder::Reverse => nodes.reverse(),
        SeqOrder::Unordered => nodes = sort_document_order(nodes)?,
    }
    let collations = keys
        .iter()
        .map(|k| ctx.collations.resolve(k.lang.as_deref()))
        .collect::<Result<Vec<_>, Error>>()?;

    let size = nodes.len();
    let mut rows: Vec<(Vec<KeyValue>, N)> = Vec::with_capacity(size);
    for (i, node) in nodes.into_iter().enumerate() {
        let focus = Focus {
            node: &node,
            position: i + 1,
            size: ContextSize::Known(size),
            ctx,
        };
        let values = keys
            .iter()
            .map(|k| {
                Ok(match k.data_type {
                    SortDataType::Number => KeyValue::Number(evaluate_number(&k.expr, &focus)?),
                    SortDataType::Text => KeyValue::Text(evaluate_string(&k.expr, &focus)?),
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;
        rows.push((values, node));
    }
    debug!(nodes = size, keys = keys.len(), "sort: keys materialized");

    rows.sort_by(|(a, _), (b, _)| {
        for ((key, collation), (x, y)) in keys.iter().zip(&collations).zip(a.iter().zip(b)) {
            let ord = match (x, y) {
                (KeyValue::Number(x), KeyValue::Number(y)) => compare_numbers(*x, *y),
                (KeyValue::Text(x), KeyValue::Text(y)) => {
                    compare_text(collation.as_ref(), key.case_order, x, y)
                }
                _ => Ordering::Equal,
            };
            let ord = match key.order {
                SortOrder::Ascending => ord,
                SortOrder::Descending => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
    let sorted = rows.into_iter().map(|(_, n)| n).collect();
    Ok(NodeSequence::from_nodes(sorted, SeqOrder::Unordered))
}

/// NaN sorts before every number.
fn compare_numbers(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

fn compare_text(collation: &dyn Collation, case_order: CaseOrder, a: &str, b: &str) -> Ordering {
    if case_order == CaseOrder::None {
        return collation.compare(a, b);
    }
    let folded = collation.compare(&a.to_lowercase(), &b.to_lowercase());
    if folded != Ordering::Equal {
        return folded;
    }
    for (x, y) in a.chars().zip(b.chars()) {
        if x == y {
            continue;
        }
        match (x.is_uppercase(), y.is_uppercase()) {
            (true, false) => {
                return if case_order == CaseOrder::UpperFirst {
                    Ordering::Less
                } else {
                    Ordering::Greater
                };
            }
            (false, true) => {
                return if case_order == CaseOrder::UpperFirst {
                    Ordering::Greater
                } else {
                    Ordering::Less
                };
            }
            _ => break,
        }
    }
    collation.compare(a, b)
}
