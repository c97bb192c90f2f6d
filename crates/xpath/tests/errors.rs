use navpath_xpath::model::simple::{SimpleNavigator, doc, elem};
use navpath_xpath::{
    DynamicContext, DynamicContextBuilder, Error, ErrorCode, NodeSequence, StaticContext, Value, compile,
};
use rstest::{fixture, rstest};

#[fixture]
fn root() -> SimpleNavigator {
    doc().child(elem("r").child(elem("a"))).build()
}

#[rstest]
fn syntax_error_display_names_code_offset_and_expectations() {
    let err = compile("1 + ", &StaticContext::default()).unwrap_err();
    let shown = err.to_string();
    assert!(shown.starts_with("error: invalid XPath syntax: unexpected end of input (err:XPST0003) at offset 4"), "{shown}");
    assert!(shown.contains("; expected one of: number, string literal"), "{shown}");
}

#[rstest]
fn runtime_error_display_has_no_offset() {
    let err = Error::from_code(ErrorCode::XPST0008, "unbound variable: $x");
    assert_eq!(err.to_string(), "error: unbound variable: $x (err:XPST0008)");
}

#[rstest]
fn unbound_variable(root: SimpleNavigator) {
    let q = compile("$nope + 1", &StaticContext::default()).unwrap();
    let err = q.evaluate(&root, &DynamicContext::default()).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::XPST0008);
}

#[rstest]
#[case::unknown_name("frobnicate()")]
#[case::counted_predicate("count(//a[frobnicate(.)])")]
fn unknown_function_at_runtime(root: SimpleNavigator, #[case] q: &str) {
    let q = compile(q, &StaticContext::default()).unwrap();
    let err = q.evaluate(&root, &DynamicContext::default()).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::XPST0017);
}

#[rstest]
fn node_set_errors_surface_when_pulled(root: SimpleNavigator) {
    let q = compile("//a[frobnicate(.)]", &StaticContext::default()).unwrap();
    let Value::NodeSet(mut seq) = q.evaluate(&root, &DynamicContext::default()).unwrap() else {
        panic!("expected a node-set");
    };
    let err = seq.move_next().unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::XPST0017);

    let err = q.select(&root, &DynamicContext::default()).unwrap().to_vec().unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::XPST0017);
}

#[rstest]
fn unused_unknown_function_is_harmless(root: SimpleNavigator) {
    let q = compile("false() and frobnicate()", &StaticContext::default()).unwrap();
    assert!(q.evaluate(&root, &DynamicContext::default()).is_ok());
}

#[rstest]
fn union_across_documents_has_no_order(root: SimpleNavigator) {
    let other: SimpleNavigator = doc().child(elem("elsewhere")).build();
    let ctx = DynamicContextBuilder::new()
        .with_variable("other", NodeSequence::singleton(other))
        .build();
    let q = compile("count($other | /)", &StaticContext::default()).unwrap();
    let err = q.evaluate(&root, &ctx).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::FOER0000);
}

#[rstest]
fn variable_of_wrong_type_in_path(root: SimpleNavigator) {
    let ctx = DynamicContextBuilder::new().with_variable("n", 3.0).build();
    let q = compile("$n/a", &StaticContext::default()).unwrap();
    let err = q.evaluate(&root, &ctx).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::XPTY0004);
}

#[rstest]
fn unpositioned_sequence_has_no_context(root: SimpleNavigator) {
    let seq = NodeSequence::singleton(root);
    let q = compile(".", &StaticContext::default()).unwrap();
    let err = q.evaluate_at(&seq, &DynamicContext::default()).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::XPDY0002);
}

#[rstest]
#[case::bare("XPST0003", ErrorCode::XPST0003)]
#[case::prefixed("err:FOCH0002", ErrorCode::FOCH0002)]
#[case::context("XPDY0002", ErrorCode::XPDY0002)]
#[case::unknown("XYZ0001", ErrorCode::Unknown)]
#[case::not_an_engine_code("NYI0000", ErrorCode::Unknown)]
fn error_codes_parse(#[case] text: &str, #[case] expected: ErrorCode) {
    let code = ErrorCode::from_code(text);
    assert_eq!(code, expected);
    if code != ErrorCode::Unknown {
        assert_eq!(ErrorCode::from_code(&code.to_string()), code);
        assert_eq!(code.qname().local, code.as_str());
    }
}

#[rstest]
fn errors_are_std_errors() {
    let err = compile("(", &StaticContext::default()).unwrap_err();
    let boxed: Box<dyn std::error::Error + Send + Sync> = Box::new(err);
    assert!(boxed.to_string().contains("err:XPST0003"));
}
