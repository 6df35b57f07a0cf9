use std::fmt;

use crate::context::Context;
use crate::filters;
use crate::utils::{split_arguments, split_top_level};
use crate::value::Value;

/// A parsed output expression.
///
/// An expression is a base term followed by any number of filters:
///
/// ```liquid
/// page.title | default: "Untitled" | replace: "Tile", "Stone"
/// ```
///
/// The base term is a string literal (single or double quoted), an integer
/// or decimal literal, `true`, `false`, `nil`/`null` or a dotted variable
/// path.  Filter arguments are expressions themselves.
///
/// Parsing never fails and evaluation never fails: anything that cannot be
/// resolved evaluates to `nil`.
///
/// ```
/// # use miniliquid::{context, Expression};
/// let expr = Expression::parse(r#"name | default: "untitled" | replace: "tile","Tile""#);
/// let rv = expr.eval(&context! { name => "bath tile" });
/// assert_eq!(rv.to_string(), "bath Tile");
/// ```
#[derive(Clone, PartialEq)]
pub struct Expression {
    base: Term,
    filters: Vec<FilterCall>,
}

#[derive(Debug, Clone, PartialEq)]
enum Term {
    Const(Value),
    Path(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
struct FilterCall {
    name: String,
    args: Vec<Expression>,
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.base {
            Term::Const(ref value) => write!(f, "{:?}", value)?,
            Term::Path(ref path) => write!(f, "{}", path.join("."))?,
        }
        for filter in &self.filters {
            write!(f, " | {}", filter.name)?;
            if !filter.args.is_empty() {
                f.write_str(":")?;
                for (idx, arg) in filter.args.iter().enumerate() {
                    write!(f, "{}{:?}", if idx == 0 { " " } else { ", " }, arg)?;
                }
            }
        }
        Ok(())
    }
}

impl Expression {
    /// Parses an expression.
    pub fn parse(source: &str) -> Expression {
        let mut stages = split_top_level(source, '|').into_iter();
        let base = parse_term(stages.next().unwrap_or(""));
        let filters = stages.map(parse_filter).collect();
        Expression { base, filters }
    }

    /// Creates an expression that looks up a single variable.
    pub(crate) fn var(name: &str) -> Expression {
        Expression {
            base: Term::Path(vec![name.to_string()]),
            filters: Vec::new(),
        }
    }

    /// Evaluates the expression against a context.
    ///
    /// Filter arguments are evaluated left to right right before their
    /// filter runs.
    pub fn eval(&self, ctx: &Context) -> Value {
        let mut value = match self.base {
            Term::Const(ref value) => value.clone(),
            Term::Path(ref path) => ctx.resolve(path.iter().map(String::as_str)),
        };
        for filter in &self.filters {
            let args: Vec<Value> = filter.args.iter().map(|arg| arg.eval(ctx)).collect();
            value = filters::apply(ctx, &filter.name, value, &args);
        }
        value
    }
}

fn parse_filter(stage: &str) -> FilterCall {
    let (name, args) = match stage.split_once(':') {
        Some((name, args)) => (name, split_arguments(args)),
        None => (stage, Vec::new()),
    };
    FilterCall {
        name: name.trim().to_string(),
        args: args.into_iter().map(Expression::parse).collect(),
    }
}

fn is_number(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|c| c.is_ascii_digit())
}

fn parse_term(token: &str) -> Term {
    let token = token.trim();
    if token.is_empty() {
        return Term::Const(Value::None);
    }

    for quote in ['\'', '"'] {
        if token.len() >= 2 && token.starts_with(quote) && token.ends_with(quote) {
            return Term::Const(Value::from(&token[1..token.len() - 1]));
        }
    }

    let unsigned = token.strip_prefix('-').unwrap_or(token);
    if is_number(unsigned) {
        return Term::Const(match token.parse::<i64>() {
            Ok(int) => Value::Int(int),
            Err(_) => token.parse::<f64>().map_or(Value::None, Value::Float),
        });
    }
    if let Some((int, frac)) = unsigned.split_once('.') {
        if is_number(int) && is_number(frac) {
            if let Ok(float) = token.parse::<f64>() {
                return Term::Const(Value::Float(float));
            }
        }
    }

    match token {
        "true" => Term::Const(Value::Bool(true)),
        "false" => Term::Const(Value::Bool(false)),
        "nil" | "null" => Term::Const(Value::None),
        _ => Term::Path(token.split('.').map(str::to_string).collect()),
    }
}
