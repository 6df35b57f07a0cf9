use std::collections::BTreeMap;

use serde::Serialize;
use similar_asserts::assert_eq;

use miniliquid::value::Value;
use miniliquid::{context, render, Context, Environment, ErrorKind};

fn render_str(source: &str, ctx: &mut Context) -> String {
    Environment::new().render_str(source, ctx).unwrap()
}

#[test]
fn test_basic() {
    let mut ctx = context! { seq => vec![0, 1, 2] };
    let rv = render_str("{% for x in seq %}[{{ x }}]{% endfor %}", &mut ctx);
    assert_eq!(rv, "[0][1][2]");
}

#[test]
fn test_render_macro() {
    assert_eq!(render!("Hello {{ name }}!", name => "World"), "Hello World!");
    assert_eq!(render!("{{ missing }}|{{ 1.0 }}|{{ nil }}"), "|1.0|");
}

#[test]
fn test_deterministic() {
    let source = "{% assign n = items | size %}{% for i in items %}{{ i.name }}:{{ forloop.index }} \
                  {% endfor %}{{ n }}{% if n > 1 %} many{% endif %}";
    let ctx = context! {
        items => vec![
            BTreeMap::from([("name", "a")]),
            BTreeMap::from([("name", "b")]),
        ],
    };
    let first = render_str(source, &mut ctx.clone());
    let second = render_str(source, &mut ctx.clone());
    assert_eq!(first, "a:1 b:2 2 many");
    assert_eq!(first, second);
}

#[test]
fn test_unknown_tags_round_trip() {
    let mut ctx = Context::new();
    for source in [
        "<head>{% seo title=false %}</head>",
        "{%raw%}",
        "{%  highlight   ruby linenos %}x{% endhighlight %}",
        "{% feed_meta -%}",
    ] {
        assert_eq!(render_str(source, &mut ctx), source);
    }
}

#[test]
fn test_default_passes_non_blank_values() {
    for (value, expected) in [
        (Value::from("x"), "x"),
        (Value::from(0), "0"),
        (Value::from(false), "false"),
        (Value::from(vec![1]), "[1]"),
    ] {
        let mut ctx = Context::from_iter([("v", value)]);
        assert_eq!(render_str("{{ v | default: 'Y' }}", &mut ctx), expected);
    }
    for value in [Value::None, Value::from(""), Value::from(Vec::<i32>::new())] {
        let mut ctx = Context::from_iter([("v", value)]);
        assert_eq!(render_str("{{ v | default: 'Y' }}", &mut ctx), "Y");
    }
}

#[test]
fn test_loop_variable_removed_after_loop() {
    let mut ctx = context! { item => "before", list => vec![1, 2] };
    let rv = render_str("{% for item in list %}{{ item }}{% endfor %}", &mut ctx);
    assert_eq!(rv, "12");
    assert!(!ctx.contains_key("item"));
    assert!(!ctx.contains_key("forloop"));

    let mut ctx = context! { item => "before", list => Vec::<i32>::new() };
    let rv = render_str("{% for item in list %}{{ item }}{% endfor %}", &mut ctx);
    assert_eq!(rv, "");
    assert!(!ctx.contains_key("item"));
}

#[test]
fn test_forloop_object() {
    let mut ctx = context! { xs => vec!["a", "b"] };
    let rv = render_str(
        "{% for x in xs %}{{ forloop.index }}/{{ forloop.length }}\
         {% if forloop.last == true %}!{% endif %} {% endfor %}",
        &mut ctx,
    );
    assert_eq!(rv, "1/2 2/2! ");

    let mut ctx = context! { outer => vec![1, 2], inner => vec!["x"] };
    let rv = render_str(
        "{% for a in outer %}{% for b in inner %}{{ forloop.rindex0 }}{% endfor %}\
         {{ forloop.index }}{% endfor %}",
        &mut ctx,
    );
    assert_eq!(rv, "0102");
}

#[test]
fn test_for_else_and_coercions() {
    let mut ctx = context! {
        empty => Vec::<i32>::new(),
        m => BTreeMap::from([("a", 1), ("b", 2)]),
        scalar => "one",
    };
    let rv = render_str(
        "{% for x in empty %}x{% else %}none{% endfor %}|\
         {% for pair in m %}{{ pair.first }}={{ pair.last }};{% endfor %}|\
         {% for s in scalar %}{{ s }}{% endfor %}|\
         {% for x in missing %}x{% endfor %}",
        &mut ctx,
    );
    assert_eq!(rv, "none|a=1;b=2;|one|");
}

#[test]
fn test_assign_persists() {
    let mut ctx = Context::new();
    let rv = render_str("{% assign greeting = 'hi' | upcase %}{{ greeting }}", &mut ctx);
    assert_eq!(rv, "hi");
    assert_eq!(ctx.get("greeting"), Some(&Value::from("hi")));
}

#[test]
fn test_case_when() {
    let source = "{% case status %}{% when 'open' %}A{% when 'closed', 'archived' %}B\
                  {% else %}C{% endcase %}";
    for (status, expected) in [
        ("open", "A"),
        ("closed", "B"),
        ("archived", "B"),
        ("unknown", "C"),
    ] {
        let mut ctx = context! { status };
        assert_eq!(render_str(source, &mut ctx), expected);
    }
}

#[test]
fn test_case_when_or_and_nesting() {
    let source = "{% case a %}{% when 1 or 2 %}{% case b %}{% when 'x' %}X{% else %}Y{% endcase %}\
                  {% when 3 %}three{% endcase %}";
    let mut ctx = context! { a => 2, b => "x" };
    assert_eq!(render_str(source, &mut ctx), "X");
    let mut ctx = context! { a => 1, b => "z" };
    assert_eq!(render_str(source, &mut ctx), "Y");
    let mut ctx = context! { a => 3 };
    assert_eq!(render_str(source, &mut ctx), "three");
    let mut ctx = context! { a => 4 };
    assert_eq!(render_str(source, &mut ctx), "");
}

#[test]
fn test_conditionals() {
    let source = "{% if n == 1 %}one{% elsif n == 2 %}two{% else %}many{% endif %}";
    let mut ctx = context! { n => 1 };
    assert_eq!(render_str(source, &mut ctx), "one");
    let mut ctx = context! { n => 2.0 };
    assert_eq!(render_str(source, &mut ctx), "two");
    let mut ctx = context! { n => 7 };
    assert_eq!(render_str(source, &mut ctx), "many");

    let source = "{% unless draft %}published{% else %}draft{% endunless %}";
    let mut ctx = context! { draft => "" };
    assert_eq!(render_str(source, &mut ctx), "published");
    let mut ctx = context! { draft => "yes" };
    assert_eq!(render_str(source, &mut ctx), "draft");
}

#[test]
fn test_false_and_zero_are_truthy() {
    let mut ctx = context! { flag => false, count => 0, empty => "" };
    let rv = render_str(
        "{% if flag %}a{% endif %}{% if count %}b{% endif %}{% if empty %}c{% endif %}\
         {% if missing %}d{% endif %}",
        &mut ctx,
    );
    assert_eq!(rv, "ab");
}

#[test]
fn test_whitespace_control() {
    let mut ctx = context! { xs => vec![1, 2] };
    let rv = render_str(
        "<ul>\n  {%- for x in xs %}\n  <li>{{ x }}</li>\n  {%- endfor %}\n</ul>",
        &mut ctx,
    );
    assert_eq!(rv, "<ul>\n  <li>1</li>\n  <li>2</li>\n</ul>");

    let rv = render_str("a  {{- 'b' -}}  c", &mut ctx);
    assert_eq!(rv, "abc");
}

#[test]
fn test_comments() {
    let mut ctx = context! { secret => "s" };
    assert_eq!(
        render_str("a{% comment %} {{ secret }}\n{% if x %} {% endcomment %}b", &mut ctx),
        "ab"
    );
    assert_eq!(
        render_str("a{% comment %}b", &mut ctx),
        "a{% comment %}b"
    );
}

#[test]
fn test_lenient_syntax() {
    let mut ctx = context! { b => "B" };
    assert_eq!(render_str("a {{ b", &mut ctx), "a {{ b");
    assert_eq!(render_str("x{% for %}y{% assign z %}", &mut ctx), "xy");
    assert_eq!(render_str("{% endif %}{% else %}{{ b }}", &mut ctx), "B");
    assert_eq!(render_str("{% if b %}open", &mut ctx), "open");
}

#[test]
fn test_render_serializable() {
    let env = Environment::new();
    let ctx = BTreeMap::from([("page", BTreeMap::from([("title", "Home")]))]);
    assert_eq!(env.render("<h1>{{ page.title }}</h1>", &ctx).unwrap(), "<h1>Home</h1>");

    let err = env.render("x", 42).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadSerialization);
}

#[test]
fn test_render_derived_struct() {
    #[derive(Serialize)]
    struct Post {
        title: String,
        tags: Vec<&'static str>,
        draft: Option<bool>,
    }

    #[derive(Serialize)]
    struct Page {
        site: BTreeMap<&'static str, &'static str>,
        posts: Vec<Post>,
    }

    let page = Page {
        site: BTreeMap::from([("title", "Tiles")]),
        posts: vec![
            Post {
                title: "Bath".into(),
                tags: vec!["tile", "blue"],
                draft: None,
            },
            Post {
                title: "Kitchen".into(),
                tags: vec![],
                draft: Some(true),
            },
        ],
    };
    let rv = Environment::new()
        .render(
            "{{ site.title }}:{% for p in posts %} {{ p.title }}({{ p.tags | join: '/' }})\
             {% if p.draft == nil %}!{% endif %}{% endfor %}",
            &page,
        )
        .unwrap();
    assert_eq!(rv, "Tiles: Bath(tile/blue)! Kitchen()");
}

#[test]
fn test_deep_nesting_is_bounded() {
    let mut ctx = context! { a => true };
    let source = format!(
        "{}x{}done",
        "{% if a %}".repeat(100),
        "{% endif %}".repeat(100)
    );
    assert_eq!(render_str(&source, &mut ctx), "xdone");

    for depth in [1000, 5000] {
        let source = format!(
            "{}{}x{}{}done",
            "{% if a %}".repeat(depth),
            "{% for i in a %}{% case i %}{% when true %}".repeat(depth),
            "{% endcase %}{% endfor %}".repeat(depth),
            "{% endif %}".repeat(depth)
        );
        assert_eq!(render_str(&source, &mut ctx), "done");
    }
}

#[test]
fn test_whitespace_markers_on_passthrough_tags() {
    let mut ctx = Context::new();
    assert_eq!(
        render_str("<head>\n  {%- seo -%}\n  <title>", &mut ctx),
        "<head>{%- seo -%}<title>"
    );
}
