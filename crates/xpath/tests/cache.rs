use std::sync::Arc;

use navpath_xpath::model::simple::{SimpleNavigator, doc, elem, ns};
use navpath_xpath::{DynamicContext, ErrorCode, QueryCache, StaticContext, StaticContextBuilder, Value};
use rstest::rstest;

#[rstest]
fn hit_returns_the_same_compiled_query() {
    let mut cache = QueryCache::new(4, StaticContext::default());
    let a = cache.get_or_compile("//item[1]").unwrap();
    let b = cache.get_or_compile("//item[1]").unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(cache.len(), 1);
}

#[rstest]
fn failures_are_not_cached() {
    let mut cache = QueryCache::new(4, StaticContext::default());
    let err = cache.get_or_compile("//item[").unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::XPST0003);
    assert!(cache.is_empty());
}

#[rstest]
fn least_recently_used_entry_is_evicted() {
    let mut cache = QueryCache::new(2, StaticContext::default());
    let a = cache.get_or_compile("a").unwrap();
    cache.get_or_compile("b").unwrap();
    // touch `a` so `b` becomes the eviction candidate
    cache.get_or_compile("a").unwrap();
    cache.get_or_compile("c").unwrap();
    assert_eq!(cache.len(), 2);
    assert!(Arc::ptr_eq(&a, &cache.get_or_compile("a").unwrap()));
    let b_again = cache.get_or_compile("b").unwrap();
    assert_eq!(b_again.expression(), "b");
    assert_eq!(cache.len(), 2);
}

#[rstest]
fn zero_capacity_holds_one_entry() {
    let mut cache = QueryCache::new(0, StaticContext::default());
    let a = cache.get_or_compile("a").unwrap();
    assert!(Arc::ptr_eq(&a, &cache.get_or_compile("a").unwrap()));
    cache.get_or_compile("b").unwrap();
    assert_eq!(cache.len(), 1);
}

#[rstest]
fn clear_drops_every_entry() {
    let mut cache = QueryCache::new(8, StaticContext::default());
    let first = cache.get_or_compile("a").unwrap();
    cache.get_or_compile("b").unwrap();
    cache.clear();
    assert!(cache.is_empty());
    assert!(!Arc::ptr_eq(&first, &cache.get_or_compile("a").unwrap()));
}

#[rstest]
fn entries_compile_against_the_cache_namespaces() {
    let sc = StaticContextBuilder::new().with_namespace("p", "urn:p").build();
    let mut cache = QueryCache::new(4, sc);
    assert_eq!(cache.static_context().resolve_prefix("p"), Some("urn:p"));

    let root: SimpleNavigator = doc().child(elem("p:x").namespace(ns("p", "urn:p"))).build();
    let q = cache.get_or_compile("count(/p:x)").unwrap();
    let v = q.evaluate(&root, &DynamicContext::default()).unwrap();
    assert!(matches!(v, Value::Number(n) if n == 1.0));
}
