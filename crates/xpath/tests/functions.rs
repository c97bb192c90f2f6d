use navpath_xpath::model::simple::{SimpleNavigator, attr, comment, doc, elem, ns, pi, text};
use navpath_xpath::xdm::number_to_string;
use navpath_xpath::{DynamicContext, ErrorCode, StaticContext, StaticContextBuilder, Value, compile};
use rstest::{fixture, rstest};

#[fixture]
fn document() -> SimpleNavigator {
    doc()
        .child(
            elem("root")
                .namespace(ns("p", "urn:p"))
                .attr(attr("xml:lang", "en-US"))
                .child(elem("item").attr(attr("id", "i1")).child(elem("n").child(text("3"))))
                .child(elem("item").attr(attr("id", "i2")).child(elem("n").child(text("4.5"))))
                .child(
                    elem("p:item")
                        .attr(attr("id", "i3"))
                        .attr(attr("xml:lang", "de"))
                        .child(text("  spaced \t out  ")),
                )
                .child(comment("c"))
                .child(pi("target", "d")),
        )
        .build()
}

/// Result rendered through the string coercion, numbers in XPath format.
fn eval(q: &str, root: &SimpleNavigator) -> String {
    let sc = StaticContextBuilder::new().with_namespace("p", "urn:p").build();
    match compile(q, &sc).unwrap().evaluate(root, &DynamicContext::default()).unwrap() {
        Value::Number(n) => number_to_string(n),
        other => other.to_string_value().unwrap(),
    }
}

#[rstest]
#[case::string_of_number("string(number('3.5'))", "3.5")]
#[case::number_nan("number('abc')", "NaN")]
#[case::boolean_nan("boolean(number('abc'))", "false")]
#[case::number_of_bool("number(true())", "1")]
#[case::integral_string("string(2.0)", "2")]
#[case::negative_zero("string(-0)", "0")]
#[case::infinity("1 div 0", "Infinity")]
#[case::neg_infinity("-1 div 0", "-Infinity")]
#[case::modulo("-7 mod 3", "-1")]
#[case::string_of_empty("string(/nothing)", "")]
#[case::boolean_of_string("boolean('false')", "true")]
#[case::boolean_of_empty_string("boolean('')", "false")]
#[case::not("not(/root/item)", "false")]
#[case::true_false("true() != false()", "true")]
fn coercions(document: SimpleNavigator, #[case] q: &str, #[case] expected: &str) {
    assert_eq!(eval(q, &document), expected, "{q}");
}

#[rstest]
#[case::concat("concat('a', 'b', 'c', 1)", "abc1")]
#[case::starts_with("starts-with('abc', 'ab')", "true")]
#[case::contains("contains('abc', 'd')", "false")]
#[case::before("substring-before('1999/04/01', '/')", "1999")]
#[case::after("substring-after('1999/04/01', '/')", "04/01")]
#[case::after_missing("substring-after('abc', 'x')", "")]
#[case::substring("substring('12345', 2, 3)", "234")]
#[case::substring_open("substring('12345', 2)", "2345")]
#[case::substring_rounding("substring('12345', 1.5, 2.6)", "234")]
#[case::substring_zero("substring('12345', 0, 3)", "12")]
#[case::substring_nan("substring('12345', 0 div 0, 3)", "")]
#[case::substring_nan_length("substring('12345', 1, 0 div 0)", "")]
#[case::substring_infinite("substring('12345', -42, 1 div 0)", "12345")]
#[case::substring_neg_infinite("substring('12345', -1 div 0, 1 div 0)", "")]
#[case::string_length("string-length('héllo')", "5")]
#[case::normalize_space("normalize-space('  a \t b\n ')", "a b")]
#[case::translate("translate('bar', 'abc', 'ABC')", "BAr")]
#[case::translate_drops("translate('--aaa--', 'abc-', 'ABC')", "AAA")]
#[case::translate_first_wins("translate('a', 'aa', 'xy')", "x")]
fn string_functions(document: SimpleNavigator, #[case] q: &str, #[case] expected: &str) {
    assert_eq!(eval(q, &document), expected, "{q}");
}

#[rstest]
#[case::round_half("round(2.5)", "3")]
#[case::round_negative_half("round(-2.5)", "-2")]
#[case::round_small_negative("1 div round(-0.2)", "-Infinity")]
#[case::round_nan("round(0 div 0)", "NaN")]
#[case::round_just_below_half("round(0.49999999999999994)", "0")]
#[case::round_large_odd("round(4503599627370497)", "4503599627370497")]
#[case::floor("floor(-1.5)", "-2")]
#[case::ceiling("ceiling(1.2)", "2")]
#[case::sum("sum(//n)", "7.5")]
#[case::sum_nan("sum(//item/@id)", "NaN")]
#[case::count("count(//item)", "2")]
#[case::count_all("count(/root/*)", "3")]
fn number_functions(document: SimpleNavigator, #[case] q: &str, #[case] expected: &str) {
    assert_eq!(eval(q, &document), expected, "{q}");
}

#[rstest]
#[case::name("name(/root/p:item)", "p:item")]
#[case::local_name("local-name(/root/p:item)", "item")]
#[case::namespace_uri("namespace-uri(/root/p:item)", "urn:p")]
#[case::no_namespace("namespace-uri(/root)", "")]
#[case::first_in_document_order("name(/root/* | /root)", "root")]
#[case::empty_set("name(/nothing)", "")]
#[case::attribute_name("name(/root/@xml:lang)", "xml:lang")]
#[case::pi_name("name(/root/processing-instruction())", "target")]
#[case::comment_name("name(/root/comment())", "")]
#[case::namespace_node_name("name(/root/namespace::p)", "p")]
#[case::context_default("/root/item[1]/n[name() = 'n']", "3")]
#[case::string_default("/root/item[string() = '4.5']/@id", "i2")]
#[case::string_length_default("string-length(/root/item[string-length() = 3]/@id)", "2")]
#[case::normalize_default("/root/p:item[normalize-space() = 'spaced out']/@id", "i3")]
#[case::number_default("/root/item/n[number() > 4]", "4.5")]
fn node_functions(document: SimpleNavigator, #[case] q: &str, #[case] expected: &str) {
    assert_eq!(eval(q, &document), expected, "{q}");
}

#[rstest]
#[case::single("id('i2')/n", "4.5")]
#[case::list("count(id('i3  i1 missing i1'))", "2")]
#[case::document_order("id('i3 i1')/@id", "i1")]
#[case::from_node_set("count(id(//item/@id))", "2")]
#[case::lang_region("count(/root/item[lang('en')])", "2")]
#[case::lang_case("boolean(/root/item[lang('EN-us')])", "true")]
#[case::lang_overridden("boolean(/root/p:item[lang('en')])", "false")]
#[case::lang_own("boolean(/root/p:item[lang('de')])", "true")]
#[case::lang_partial_tag("boolean(/root/item[lang('e')])", "false")]
fn id_and_lang(document: SimpleNavigator, #[case] q: &str, #[case] expected: &str) {
    assert_eq!(eval(q, &document), expected, "{q}");
}

#[rstest]
fn last_and_position_resolve_through_the_registry(document: SimpleNavigator) {
    let ctx = DynamicContext::default();
    let q = compile("/root/*[position() = last()]", &StaticContext::default()).unwrap();
    let hit = q.select_first(&document, &ctx).unwrap().unwrap();
    assert_eq!(navpath_xpath::Navigator::local_name(&hit), "item");

    let last = ctx.functions.resolve(&"last".into(), 0);
    assert!(last.is_ok());
}

#[rstest]
#[case::count_scalar("count(1)", ErrorCode::XPTY0004)]
#[case::sum_string("sum('1')", ErrorCode::XPTY0004)]
#[case::name_number("name(3)", ErrorCode::XPTY0004)]
#[case::too_few("substring('a')", ErrorCode::XPST0017)]
#[case::too_many("true(1)", ErrorCode::XPST0017)]
#[case::concat_single("concat('a')", ErrorCode::XPST0017)]
fn static_signature_checks(#[case] q: &str, #[case] code: ErrorCode) {
    let err = compile(q, &StaticContext::default()).unwrap_err();
    assert_eq!(err.code_enum(), code, "{q}");
}

#[rstest]
fn extension_functions_take_arity_ranges(document: SimpleNavigator) {
    let mut reg = navpath_xpath::engine::functions::default_function_registry::<SimpleNavigator>();
    reg.register_ns_range("urn:test", "join", 1, None, |_ctx, args| {
        let parts = args
            .iter()
            .map(Value::to_string_value)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::String(parts.join("+")))
    });
    reg.register_local("shout", 1, |_ctx, args| {
        Ok(Value::String(args[0].to_string_value()?.to_uppercase()))
    });
    let name = navpath_xpath::ExpandedName::new(Some("urn:test".to_string()), "join");
    assert!(reg.contains(&name));

    let sc = StaticContextBuilder::new().with_namespace("t", "urn:test").build();
    let ctx = navpath_xpath::DynamicContextBuilder::new()
        .with_functions(std::sync::Arc::new(reg))
        .build();
    let v = compile("t:join('a', 1, true())", &sc).unwrap().evaluate(&document, &ctx).unwrap();
    assert_eq!(v.to_string_value().unwrap(), "a+1+true");
    let v = compile("shout(name(/root/*[3]))", &sc).unwrap().evaluate(&document, &ctx).unwrap();
    assert_eq!(v.to_string_value().unwrap(), "P:ITEM");

    let err = compile("t:join()", &sc).unwrap().evaluate(&document, &ctx).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::XPST0017);
}
