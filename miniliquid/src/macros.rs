// `ok!` and `some!` are less bloaty alternatives to the standard library's try operator (`?`).
// Since we do not need type conversions in this crate we can fall back to much easier match
// patterns that compile faster and produce less bloaty code.

macro_rules! ok {
    ($expr:expr) => {
        match $expr {
            Ok(val) => val,
            Err(err) => return Err(err),
        }
    };
}

macro_rules! some {
    ($expr:expr) => {
        match $expr {
            Some(val) => val,
            None => return None,
        }
    };
}

/// Hidden utility module for the [`context!`](crate::context!) macro.
#[doc(hidden)]
pub mod __context {
    use crate::value::Value;
    use crate::Context;

    #[inline(always)]
    pub fn make() -> Context {
        Context::new()
    }

    #[inline(always)]
    pub fn add(ctx: &mut Context, key: &'static str, value: Value) {
        ctx.insert(key, value);
    }
}

/// Creates a template context from keys and values.
///
/// ```rust
/// # use miniliquid::context;
/// let ctx = context!{
///     name => "Peter",
///     location => "World",
/// };
/// ```
///
/// Alternatively if the variable name matches the key name it can
/// be omitted:
///
/// ```rust
/// # use miniliquid::context;
/// let name = "Peter";
/// let ctx = context!{ name };
/// ```
///
/// The return value is a [`Context`](crate::Context) which can be handed to
/// [`Environment::render_str`](crate::Environment::render_str) directly.
///
/// # Note on Conversions
///
/// This macro uses [`Value::from_serialize`](crate::value::Value::from_serialize)
/// for conversions, so nested data structures keep their shape:
///
/// ```rust
/// # use miniliquid::context;
/// let ctx = context! {
///     site => std::collections::BTreeMap::from([("baseurl", "/blog")]),
///     tags => vec!["tile", "bath"],
/// };
/// ```
///
/// This macro currently does not move passed values.  Pass values with
/// `&value` if you intend on still being able to reference them after the
/// macro invocation.
#[macro_export]
macro_rules! context {
    () => {
        $crate::__context::make()
    };
    (
        $($key:ident $(=> $value:expr)?),* $(,)?
    ) => {{
        let mut ctx = $crate::__context::make();
        $(
            $crate::__context_pair!(ctx, $key $(=> $value)?);
        )*
        ctx
    }};
}

#[macro_export]
#[doc(hidden)]
macro_rules! __context_pair {
    ($ctx:ident, $key:ident) => {{
        $crate::__context_pair!($ctx, $key => $key);
    }};
    ($ctx:ident, $key:ident => $value:expr) => {
        $crate::__context::add(
            &mut $ctx,
            stringify!($key),
            $crate::value::Value::from_serialize(&$value),
        );
    };
}

/// A macro similar to [`format!`] but that renders a template.
///
/// This can be used to quickly render a template into a string without
/// having to create an environment first.  The template is parsed every
/// time the macro is called.
///
/// There are two forms for this macro.  The default form takes template
/// source and context variables, the extended form also lets you provide
/// a custom environment (for instance one with includes) that should be
/// used rather than an empty one.  The context variables are passed the
/// same way as with the [`context!`](crate::context) macro.
///
/// # Example
///
/// ```
/// # use miniliquid::render;
/// println!("{}", render!("Hello {{ name }}!", name => "World"));
/// ```
///
/// Passing an explicit environment:
///
/// ```
/// # use miniliquid::{Environment, render};
/// let env = Environment::with_includes([("greeting.html", "Hello {{ name }}!")]);
/// println!("{}", render!(in env, "{% include greeting %}", name => "World"));
/// ```
///
/// # Panics
///
/// This macro panics if rendering fails, for instance because an include
/// is missing.
#[macro_export]
macro_rules! render {
    (
        in $env:expr,
        $tmpl:expr
        $(, $key:ident $(=> $value:expr)?)* $(,)?
    ) => {
        ($env).render_str($tmpl, &mut $crate::context! { $($key $(=> $value)? ,)* })
            .expect("failed to render template")
    };
    (
        $tmpl:expr
        $(, $key:ident $(=> $value:expr)?)* $(,)?
    ) => {
        $crate::render!(in $crate::Environment::new(), $tmpl, $($key $(=> $value)? ,)*)
    }
}
