use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::compiler::parser::parse;
use crate::condition::Condition;
use crate::context::Context;
use crate::defaults;
use crate::error::{Error, ErrorKind};
use crate::expression::Expression;
use crate::utils::BTreeMapKeysDebug;
use crate::value::Value;
use crate::vm::Vm;

/// An abstraction that holds the engine configuration.
///
/// The environment owns the table of includes: named template fragments
/// that templates pull in with `{% include name %}`.  The table can only be
/// changed through `&mut self`, so it is read-only while anything renders.
///
/// Templates are parsed every time they are rendered.  Nothing about a
/// render is cached, which keeps rendering deterministic: the same template
/// and context always produce the same output.
///
/// ```
/// # use miniliquid::{context, Environment};
/// let env = Environment::with_includes([
///     ("badge.html", "<b>{{ include.label | default: 'new' }}</b>"),
/// ]);
/// let mut ctx = context! {};
/// let rv = env.render_str("{% include badge label='sale' %}", &mut ctx).unwrap();
/// assert_eq!(rv, "<b>sale</b>");
/// ```
///
/// The environment is `Send` and `Sync` and can be shared between threads,
/// every render works on its own [`Context`].
#[derive(Clone)]
pub struct Environment<'source> {
    includes: BTreeMap<Cow<'source, str>, Cow<'source, str>>,
    default_extension: Cow<'source, str>,
    recursion_limit: usize,
}

impl<'source> Default for Environment<'source> {
    fn default() -> Self {
        Environment::new()
    }
}

impl<'source> fmt::Debug for Environment<'source> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("includes", &BTreeMapKeysDebug(&self.includes))
            .field("default_extension", &self.default_extension)
            .field("recursion_limit", &self.recursion_limit)
            .finish()
    }
}

impl<'source> Environment<'source> {
    /// Creates a new environment without includes.
    pub fn new() -> Environment<'source> {
        Environment {
            includes: BTreeMap::new(),
            default_extension: Cow::Borrowed(defaults::DEFAULT_EXTENSION),
            recursion_limit: defaults::DEFAULT_RECURSION_LIMIT,
        }
    }

    /// Creates a new environment from a table of include names and sources.
    pub fn with_includes<I, N, S>(includes: I) -> Environment<'source>
    where
        I: IntoIterator<Item = (N, S)>,
        N: Into<Cow<'source, str>>,
        S: Into<Cow<'source, str>>,
    {
        let mut rv = Environment::new();
        for (name, source) in includes {
            rv.add_include(name, source);
        }
        rv
    }

    /// Registers an include under a name.
    ///
    /// An include with the same name is replaced.
    pub fn add_include<N, S>(&mut self, name: N, source: S)
    where
        N: Into<Cow<'source, str>>,
        S: Into<Cow<'source, str>>,
    {
        self.includes.insert(name.into(), source.into());
    }

    /// Removes an include by name.
    pub fn remove_include(&mut self, name: &str) {
        self.includes.remove(name);
    }

    /// Removes all includes.
    pub fn clear_includes(&mut self) {
        self.includes.clear();
    }

    /// Looks up the source of an include.
    ///
    /// The name is tried as given first, then with the default extension
    /// appended.
    pub fn get_include_source(&self, name: &str) -> Option<&str> {
        if let Some(source) = self.includes.get(name) {
            return Some(&**source);
        }
        let with_extension = format!("{}{}", name, self.default_extension);
        self.includes.get(with_extension.as_str()).map(|x| &**x)
    }

    /// Sets the extension that is appended when an include is not found
    /// under its bare name.  Defaults to `.html`.
    pub fn set_default_extension<E: Into<Cow<'source, str>>>(&mut self, extension: E) {
        self.default_extension = extension.into();
    }

    /// Returns the default extension for includes.
    pub fn default_extension(&self) -> &str {
        &self.default_extension
    }

    /// Sets how deeply includes may nest before rendering fails.
    ///
    /// Defaults to 100.  A template including itself runs into this limit
    /// and fails with [`ErrorKind::InvalidOperation`].
    pub fn set_recursion_limit(&mut self, limit: usize) {
        self.recursion_limit = limit;
    }

    /// Returns the include recursion limit.
    pub fn recursion_limit(&self) -> usize {
        self.recursion_limit
    }

    /// Renders a template string against a context.
    ///
    /// The context is changed by the template: variables bound with
    /// `assign` stay visible to the caller afterwards.
    pub fn render_str(&self, source: &str, ctx: &mut Context) -> Result<String, Error> {
        self.render_named_str("<string>", source, ctx)
    }

    /// Like [`render_str`](Self::render_str) but with a name that shows up
    /// in error messages.
    pub fn render_named_str(
        &self,
        name: &str,
        source: &str,
        ctx: &mut Context,
    ) -> Result<String, Error> {
        self.render_at(name, source, ctx, 0)
    }

    /// Renders a template string against serializable data.
    ///
    /// The data has to serialize to a map; it becomes a fresh context that
    /// is dropped after rendering.
    pub fn render<S: Serialize>(&self, source: &str, ctx: S) -> Result<String, Error> {
        let mut ctx = ok!(Context::from_serialize(&ctx));
        self.render_str(source, &mut ctx)
    }

    /// Renders an include by name against a context.
    ///
    /// Fails with [`ErrorKind::TemplateNotFound`] if there is no include
    /// with that name (with or without the default extension).
    pub fn render_include(&self, name: &str, ctx: &mut Context) -> Result<String, Error> {
        self.render_include_at(name, ctx, 1)
    }

    pub(crate) fn render_include_at(
        &self,
        name: &str,
        ctx: &mut Context,
        depth: usize,
    ) -> Result<String, Error> {
        if depth > self.recursion_limit {
            tracing::warn!(include = name, depth, "include recursion limit exceeded");
            return Err(Error::new(
                ErrorKind::InvalidOperation,
                format!(
                    "includes nested deeper than the recursion limit of {}",
                    self.recursion_limit
                ),
            ));
        }
        let source = match self.get_include_source(name) {
            Some(source) => source,
            None => {
                tracing::warn!(include = name, "include not found");
                return Err(Error::new(
                    ErrorKind::TemplateNotFound,
                    format!("include not found: {}", name),
                ));
            }
        };
        tracing::debug!(include = name, depth, "rendering include");
        self.render_at(name, source, ctx, depth)
    }

    fn render_at(
        &self,
        name: &str,
        source: &str,
        ctx: &mut Context,
        depth: usize,
    ) -> Result<String, Error> {
        let template = parse(source);
        let mut out = String::with_capacity(source.len());
        ok!(Vm::new(self, name, depth).eval(&template, ctx, &mut out));
        Ok(out)
    }

    /// Evaluates a single expression (with filters) against a context.
    ///
    /// ```
    /// # use miniliquid::{context, Environment};
    /// let env = Environment::new();
    /// let ctx = context! { page => context! { title => "" } };
    /// let rv = env.eval_expression("page.title | default: 'Untitled'", &ctx);
    /// assert_eq!(rv.to_string(), "Untitled");
    /// ```
    pub fn eval_expression(&self, expr: &str, ctx: &Context) -> Value {
        Expression::parse(expr).eval(ctx)
    }

    /// Evaluates a condition against a context.
    pub fn eval_condition(&self, cond: &str, ctx: &Context) -> bool {
        Condition::parse(cond).eval(ctx)
    }
}
