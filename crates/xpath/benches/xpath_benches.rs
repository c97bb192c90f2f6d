use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use navpath_xpath::model::simple::{SimpleNavigator, attr, doc, elem, text};
use navpath_xpath::{
    CaseOrder, CompiledQuery, DynamicContext, Error, QueryCache, SortDataType, SortOrder,
    StaticContext, compile,
};

fn sample_queries() -> Vec<&'static str> {
    vec![
        "1 + 2 * 3",
        "string-length(normalize-space('  Lorem ipsum   dolor sit amet  '))",
        "/root/section/item[@type='a'][position() < 5]/@id",
        "count(//item[not(@featured)])",
        "//item[last()]/preceding::item[1]",
        "//section[@name='alpha']/item | //section[@name='beta']/item",
    ]
}

fn benchmark_compile(c: &mut Criterion) {
    let queries = sample_queries();
    let sc = StaticContext::default();
    c.bench_function("query/compile", |b| {
        b.iter(|| {
            for q in &queries {
                let compiled = compile(black_box(q), &sc).expect("compile failure");
                black_box(compiled);
            }
        })
    });
}

fn benchmark_cache(c: &mut Criterion) {
    let queries = sample_queries();
    let mut cache = QueryCache::new(16, StaticContext::default());
    c.bench_function("query/cache_hit", |b| {
        b.iter(|| {
            for q in &queries {
                let compiled = cache.get_or_compile(black_box(q)).expect("compile failure");
                black_box(compiled);
            }
        })
    });
}

fn build_sample_document(sections: usize, items: usize) -> SimpleNavigator {
    let names = ["alpha", "beta", "gamma", "delta"];
    let mut root = elem("root").attr(attr("xml:lang", "en"));
    for s in 0..sections {
        let mut section = elem("section").attr(attr("name", names[s % names.len()]));
        for i in 0..items {
            let id = format!("item-{s}-{i}");
            let mut item = elem("item")
                .attr(attr("id", &id))
                .attr(attr("type", if i % 2 == 0 { "a" } else { "b" }));
            if i % 5 == 0 {
                item = item.attr(attr("featured", "true"));
            }
            section = section.child(item.child(text(&format!("Item {i} of {s}"))));
        }
        root = root.child(section);
    }
    doc().child(root).build()
}

fn prepared_compiled_queries() -> Result<Vec<(String, CompiledQuery)>, Error> {
    let sc = StaticContext::default();
    sample_queries()
        .into_iter()
        .map(|q| compile(q, &sc).map(|c| (q.to_string(), c)))
        .collect()
}

fn benchmark_evaluator(c: &mut Criterion) {
    let document = build_sample_document(4, 25);
    let ctx = DynamicContext::default();
    let compiled = prepared_compiled_queries().expect("compile failure");

    let mut group = c.benchmark_group("evaluator/evaluate");
    for (name, query) in &compiled {
        group.bench_with_input(BenchmarkId::from_parameter(name), query, |b, q| {
            b.iter(|| {
                let value = q.evaluate(black_box(&document), &ctx).expect("eval failure");
                black_box(value.to_string_value().expect("string value"));
            });
        });
    }
    group.finish();
}

fn benchmark_descendant_scaling(c: &mut Criterion) {
    let query = compile("count(//section//item[@type='b'])", &StaticContext::default())
        .expect("compile failure");
    let ctx = DynamicContext::default();

    let mut group = c.benchmark_group("evaluator/descendant_scaling");
    for items in [10usize, 100, 1000] {
        let document = build_sample_document(4, items);
        group.bench_with_input(BenchmarkId::from_parameter(items), &document, |b, d| {
            b.iter(|| black_box(query.evaluate(d, &ctx).expect("eval failure")));
        });
    }
    group.finish();
}

fn benchmark_sort(c: &mut Criterion) {
    let document = build_sample_document(4, 100);
    let ctx = DynamicContext::default();
    let mut query = compile("//item", &StaticContext::default()).expect("compile failure");
    query
        .add_sort("@type", SortOrder::Ascending, CaseOrder::None, None, SortDataType::Text)
        .expect("sort key");
    query
        .add_sort(".", SortOrder::Descending, CaseOrder::UpperFirst, None, SortDataType::Text)
        .expect("sort key");

    c.bench_function("evaluator/sort_two_keys", |b| {
        b.iter(|| {
            let nodes = query.select(black_box(&document), &ctx).expect("eval failure");
            black_box(nodes.len().expect("count"));
        })
    });
}

criterion_group!(
    benches,
    benchmark_compile,
    benchmark_cache,
    benchmark_evaluator,
    benchmark_descendant_scaling,
    benchmark_sort
);
criterion_main!(benches);
