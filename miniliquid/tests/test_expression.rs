use std::collections::BTreeMap;

use similar_asserts::assert_eq;

use miniliquid::value::Value;
use miniliquid::{context, Context, Environment, Expression};

fn eval(expr: &str, ctx: &Context) -> Value {
    Environment::new().eval_expression(expr, ctx)
}

#[test]
fn test_filter_chain() {
    let expr = r#"name | default: "untitled" | replace: "tile","Tile""#;
    assert_eq!(eval(expr, &context! { name => "bath tile" }), Value::from("bath Tile"));
    assert_eq!(eval(expr, &context! {}), Value::from("untitled"));
    assert_eq!(eval(expr, &context! { name => "" }), Value::from("untitled"));
}

#[test]
fn test_literals() {
    let ctx = Context::new();
    assert_eq!(eval("'a b'", &ctx), Value::from("a b"));
    assert_eq!(eval("\"x|y\"", &ctx), Value::from("x|y"));
    assert_eq!(eval("42", &ctx), Value::from(42));
    assert_eq!(eval("-1.5", &ctx), Value::from(-1.5));
    assert_eq!(eval("true", &ctx), Value::from(true));
    assert_eq!(eval("false", &ctx), Value::from(false));
    assert_eq!(eval("nil", &ctx), Value::None);
    assert_eq!(eval("", &ctx), Value::None);
}

#[test]
fn test_paths() {
    let ctx = context! {
        page => context! { title => "Tiles", tags => vec!["a", "b"] },
    };
    assert_eq!(eval("page.title", &ctx), Value::from("Tiles"));
    assert_eq!(eval("page.title.size", &ctx), Value::from(5));
    assert_eq!(eval("page.tags.first", &ctx), Value::from("a"));
    assert_eq!(eval("page.tags.last", &ctx), Value::from("b"));
    assert_eq!(eval("page.tags.1", &ctx), Value::from("b"));
    assert_eq!(eval("page.tags.size", &ctx), Value::from(2));
    assert_eq!(eval("page.tags.7", &ctx), Value::None);
    assert_eq!(eval("page.missing.deeper", &ctx), Value::None);
    assert_eq!(eval("nothing", &ctx), Value::None);
}

#[test]
fn test_collection_filters() {
    let ctx = context! {
        page => context! { tags => vec!["a", "b"], title => "T" },
    };
    assert_eq!(eval("page.tags | join", &ctx), Value::from("a, b"));
    assert_eq!(eval("page.tags | join: ' / '", &ctx), Value::from("a / b"));
    assert_eq!(eval("page.tags | reverse | join: ''", &ctx), Value::from("ba"));
    assert_eq!(eval("page.tags | size", &ctx), Value::from(2));
    assert_eq!(eval("page | size", &ctx), Value::from(2));
    insta::assert_snapshot!(
        eval("page | jsonify", &ctx).to_string(),
        @r#"{"tags":["a","b"],"title":"T"}"#
    );
}

#[test]
fn test_sort_in_template() {
    let items = vec![
        BTreeMap::from([("t", Value::from("a")), ("w", Value::from(2))]),
        BTreeMap::from([("t", Value::from("b")), ("w", Value::from(3))]),
        BTreeMap::from([("t", Value::from("c"))]),
    ];
    let mut ctx = context! { items };
    let rv = Environment::new()
        .render_str(
            "{% assign sorted = items | sort: 'w' %}{% for i in sorted %}{{ i.t }}{% endfor %}",
            &mut ctx,
        )
        .unwrap();
    assert_eq!(rv, "cab");
}

#[test]
fn test_date_and_relative_url() {
    let ctx = context! {
        site => context! { baseurl => "/blog/" },
        page => context! { date => "2024-03-05 14:30:00 +0100" },
    };
    assert_eq!(
        eval("page.date | date: '%B %-d, %Y'", &ctx),
        Value::from("March 5, 2024")
    );
    assert_eq!(
        eval("'assets/main.css' | relative_url", &ctx),
        Value::from("/blog/assets/main.css")
    );
    assert_eq!(
        eval("'/about/' | relative_url", &context! {}),
        Value::from("/about/")
    );
}

#[test]
fn test_unknown_filter_passes_value_through() {
    let ctx = context! { name => "Tile" };
    assert_eq!(eval("name | upcase | size", &ctx), Value::from(4));
    assert_eq!(eval("name | truncate: 2", &ctx), Value::from("Tile"));
}

#[test]
fn test_expression_api() {
    let expr = Expression::parse("title | default: site.title");
    let ctx = context! { site => context! { title => "Site" } };
    assert_eq!(expr.eval(&ctx), Value::from("Site"));
    insta::assert_debug_snapshot!(expr, @"title | default: site.title");
}
