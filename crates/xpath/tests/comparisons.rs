use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use navpath_xpath::engine::functions::default_function_registry;
use navpath_xpath::model::simple::{SimpleNavigator, doc, elem, text};
use navpath_xpath::{
    DynamicContext, DynamicContextBuilder, StaticContext, StaticContextBuilder, Value, compile,
};
use rstest::{fixture, rstest};

#[fixture]
fn values() -> SimpleNavigator {
    doc()
        .child(
            elem("r")
                .child(elem("v").child(text("1")))
                .child(elem("v").child(text("2")))
                .child(elem("w").child(text("2")))
                .child(elem("w").child(text("x")))
                .child(elem("z")),
        )
        .build()
}

fn boolean(q: &str, root: &SimpleNavigator) -> bool {
    match compile(q, &StaticContext::default())
        .unwrap()
        .evaluate(root, &DynamicContext::default())
        .unwrap()
    {
        Value::Boolean(b) => b,
        other => panic!("{q} returned {other:?}"),
    }
}

#[rstest]
#[case::existential_eq("//v = '2'", true)]
#[case::existential_ne("//v != '2'", true)]
#[case::no_match("//v = '3'", false)]
#[case::number_rhs("//v = 1", true)]
#[case::relational_scalar_left("1 < //v", true)]
#[case::relational_scalar_left_none("2 < //v", false)]
#[case::relational_string("//v > '1.5'", true)]
#[case::set_vs_set("//v = //w", true)]
#[case::set_vs_set_ne("//v != //w", true)]
#[case::set_vs_set_relational("//w < //v", false)]
#[case::empty_vs_string("//missing = ''", false)]
#[case::empty_ne_string("//missing != ''", false)]
#[case::empty_vs_false("//missing = false()", true)]
#[case::set_vs_true("//v = true()", true)]
#[case::empty_text_element("//z = ''", true)]
#[case::bool_vs_number("true() = 1", true)]
#[case::bool_vs_string("false() = ''", true)]
#[case::number_vs_string("1 = '1.0'", true)]
#[case::strings("'abc' = 'abc'", true)]
#[case::string_relational_is_numeric("'abc' < 'abd'", false)]
#[case::nan_ne("0 div 0 != 0 div 0", true)]
#[case::ordering(" 2 >= 2 and 3 > 2 and 1 <= 1", true)]
fn comparison_rules(values: SimpleNavigator, #[case] q: &str, #[case] expected: bool) {
    assert_eq!(boolean(q, &values), expected, "{q}");
}

#[rstest]
#[case::and_skips("false() and t:tick()", false, 0)]
#[case::or_skips("true() or t:tick()", true, 0)]
#[case::and_runs("true() and t:tick()", true, 1)]
#[case::or_runs("false() or t:tick()", true, 1)]
#[case::nested("(1 = 2 and t:tick()) or (t:tick() or t:tick())", true, 1)]
fn logical_operators_short_circuit(
    values: SimpleNavigator,
    #[case] q: &str,
    #[case] expected: bool,
    #[case] calls: usize,
) {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut reg = default_function_registry::<SimpleNavigator>();
    let seen = Arc::clone(&counter);
    reg.register_ns("urn:test", "tick", 0, move |_ctx, _args| {
        seen.fetch_add(1, Ordering::SeqCst);
        Ok(Value::Boolean(true))
    });
    let sc = StaticContextBuilder::new().with_namespace("t", "urn:test").build();
    let ctx = DynamicContextBuilder::new().with_functions(Arc::new(reg)).build();
    let v = compile(q, &sc).unwrap().evaluate(&values, &ctx).unwrap();
    assert!(matches!(v, Value::Boolean(b) if b == expected), "{q}");
    assert_eq!(counter.load(Ordering::SeqCst), calls, "{q}");
}

#[rstest]
fn precedence_of_arithmetic(values: SimpleNavigator) {
    let num = |q: &str| match compile(q, &StaticContext::default())
        .unwrap()
        .evaluate(&values, &DynamicContext::default())
        .unwrap()
    {
        Value::Number(n) => n,
        other => panic!("{q} returned {other:?}"),
    };
    assert_eq!(num("1+2*3"), 7.0);
    assert_eq!(num("(1+2)*3"), 9.0);
    assert_eq!(num("10 - 4 - 3"), 3.0);
    assert_eq!(num("-2 * -3"), 6.0);
    assert_eq!(num("7 mod 3 + 8 div 4"), 3.0);
    assert_eq!(num("//v[2] + //v[1]"), 3.0);
    assert!(num("//w[2] + 1").is_nan());
}
