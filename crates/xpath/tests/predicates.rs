use navpath_xpath::model::simple::{SimpleNavigator, attr, doc, elem, text};
use navpath_xpath::{DynamicContext, DynamicContextBuilder, Navigator, StaticContext, Value, compile};
use rstest::{fixture, rstest};

#[fixture]
fn catalog() -> SimpleNavigator {
    let item = |id: &str, ty: &str| elem("item").attr(attr("id", id)).attr(attr("type", ty)).child(text(id));
    doc()
        .child(
            elem("catalog")
                .child(
                    elem("section")
                        .child(item("i1", "a"))
                        .child(item("i2", "b"))
                        .child(item("i3", "a")),
                )
                .child(elem("section").child(item("i4", "b")).child(item("i5", "a"))),
        )
        .build()
}

fn ids_with(q: &str, root: &SimpleNavigator, ctx: &DynamicContext<SimpleNavigator>) -> Vec<String> {
    compile(q, &StaticContext::default())
        .unwrap()
        .select(root, ctx)
        .unwrap()
        .map(|n| n.unwrap().string_value())
        .collect()
}

fn ids(q: &str, root: &SimpleNavigator) -> Vec<String> {
    ids_with(q, root, &DynamicContext::default())
}

#[rstest]
#[case::first("//item[1]", &["i1", "i4"])]
#[case::last_per_parent("//item[last()]", &["i3", "i5"])]
#[case::filtered_then_positional("//item[@type='a'][2]", &["i3"])]
#[case::positional_then_filtered("//item[2][@type='a']", &["i5"])]
#[case::whole_set_positional("(//item)[2]", &["i2"])]
#[case::whole_set_last("(//item)[last()]", &["i5"])]
#[case::position_function("//item[position() >= 2]", &["i2", "i3", "i5"])]
#[case::position_equals_last("//section/item[position() = last()]", &["i3", "i5"])]
#[case::boolean_predicate("//item[@type = 'b']", &["i2", "i4"])]
#[case::string_predicate("//item['']", &[])]
#[case::nested("//section[item[@id = 'i5']]/item", &["i4", "i5"])]
#[case::count_in_predicate("//section[count(item) = 3]/item[3]", &["i3"])]
#[case::out_of_range("//item[9]", &[])]
#[case::fractional("//item[1.5]", &[])]
fn predicate_selection(catalog: SimpleNavigator, #[case] q: &str, #[case] expected: &[&str]) {
    assert_eq!(ids(q, &catalog), expected, "{q}");
}

#[rstest]
#[case::nearest_ancestor("ancestor::*[1]", "section")]
#[case::farthest_ancestor("ancestor::*[last()]", "catalog")]
#[case::nearest_preceding_sibling("preceding-sibling::*[1]", "i2")]
#[case::farthest_preceding_sibling("preceding-sibling::*[2]", "i1")]
#[case::nearest_preceding("preceding::item[1]", "i2")]
fn reverse_axis_positions_count_from_the_context(
    catalog: SimpleNavigator,
    #[case] q: &str,
    #[case] expected: &str,
) {
    let ctx = DynamicContext::default();
    let i3 = compile("//item[@id='i3']", &StaticContext::default())
        .unwrap()
        .select_first(&catalog, &ctx)
        .unwrap()
        .unwrap();
    let hit = compile(q, &StaticContext::default())
        .unwrap()
        .select_first(&i3, &ctx)
        .unwrap()
        .unwrap();
    let got = if hit.local_name() == "item" {
        hit.string_value()
    } else {
        hit.local_name().to_string()
    };
    assert_eq!(got, expected, "{q}");
}

#[rstest]
fn parenthesized_reverse_step_numbers_in_document_order(catalog: SimpleNavigator) {
    let ctx = DynamicContext::default();
    let i3 = compile("//item[@id='i3']", &StaticContext::default())
        .unwrap()
        .select_first(&catalog, &ctx)
        .unwrap()
        .unwrap();
    let q = compile("(preceding-sibling::*)[1]", &StaticContext::default()).unwrap();
    let first = q.select_first(&i3, &ctx).unwrap().unwrap();
    assert_eq!(first.string_value(), "i1");
}

#[rstest]
fn variable_predicate_is_positional_when_numeric(catalog: SimpleNavigator) {
    let ctx = DynamicContextBuilder::new()
        .with_variable("n", 2.0)
        .with_variable("s", "yes")
        .build();
    assert_eq!(ids_with("//section[1]/item[$n]", &catalog, &ctx), ["i2"]);
    assert_eq!(ids_with("//section[1]/item[$s]", &catalog, &ctx), ["i1", "i2", "i3"]);
}

#[rstest]
fn last_is_computed_without_disturbing_iteration(catalog: SimpleNavigator) {
    let q = compile("//item[last() - position() < 2]", &StaticContext::default()).unwrap();
    let mut seq = q.select(&catalog, &DynamicContext::default()).unwrap();
    assert_eq!(seq.len().unwrap(), 4);
    assert!(seq.move_next().unwrap());
    assert_eq!(seq.position(), 1);
    assert_eq!(seq.len().unwrap(), 4);
    let rest: Vec<String> = seq.map(|n| n.unwrap().string_value()).collect();
    assert_eq!(rest, ["i3", "i4", "i5"]);
}

#[rstest]
fn predicate_on_union_uses_document_positions(catalog: SimpleNavigator) {
    assert_eq!(ids("(//item[@id='i4'] | //item[@id='i1'])[1]", &catalog), ["i1"]);
    let v = compile("count((//item | //section)[position() > 5])", &StaticContext::default())
        .unwrap()
        .evaluate(&catalog, &DynamicContext::default())
        .unwrap();
    assert!(matches!(v, Value::Number(n) if n == 2.0));
}
