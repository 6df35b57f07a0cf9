use std::cmp::Ordering;
use std::fmt;

use crate::context::Context;
use crate::expression::Expression;
use crate::utils::{find_top_level, find_top_level_word, split_top_level_word};
use crate::value::{ops, Value};

/// The comparison operators a condition understands.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum CompareOp {
    Eq,
    Ne,
    Gte,
    Lte,
    Gt,
    Lt,
}

impl CompareOp {
    fn as_str(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Gte => ">=",
            CompareOp::Lte => "<=",
            CompareOp::Gt => ">",
            CompareOp::Lt => "<",
        }
    }
}

// operators are tried in this order, the first one found wins
const COMPARE_OPS: [CompareOp; 6] = [
    CompareOp::Eq,
    CompareOp::Ne,
    CompareOp::Gte,
    CompareOp::Lte,
    CompareOp::Gt,
    CompareOp::Lt,
];

/// A parsed condition as used by `if`, `elsif` and `unless`.
///
/// A condition is one of
///
/// * `left contains right`: substring, item or key membership,
/// * `left == right` or `left != right`: structural (in)equality,
/// * `left >= right`, `<=`, `>` or `<`: ordering of numbers or strings,
/// * any other expression, which is tested for truthiness.
///
/// Simple conditions can be combined with `and` and `or`, where `or` binds
/// loosest.  Operators inside string literals are ignored.
///
/// Truthiness only rejects `nil` and empty strings or collections.  The
/// literal `false` and `0` are true:
///
/// ```
/// # use miniliquid::{context, Condition};
/// let ctx = context! { flag => false, tag => "tile" };
/// assert!(Condition::parse("flag").eval(&ctx));
/// assert!(Condition::parse("tag contains 'ti'").eval(&ctx));
/// assert!(!Condition::parse("").eval(&ctx));
/// ```
#[derive(Clone, PartialEq)]
pub struct Condition(Repr);

#[derive(Clone, PartialEq)]
enum Repr {
    Empty,
    Or(Vec<Condition>),
    And(Vec<Condition>),
    Contains(Expression, Expression),
    Compare(CompareOp, Expression, Expression),
    Truthy(Expression),
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (parts, joiner) = match self.0 {
            Repr::Empty => return Ok(()),
            Repr::Or(ref parts) => (parts, " or "),
            Repr::And(ref parts) => (parts, " and "),
            Repr::Contains(ref left, ref right) => {
                return write!(f, "{:?} contains {:?}", left, right)
            }
            Repr::Compare(op, ref left, ref right) => {
                return write!(f, "{:?} {} {:?}", left, op.as_str(), right)
            }
            Repr::Truthy(ref expr) => return write!(f, "{:?}", expr),
        };
        for (idx, part) in parts.iter().enumerate() {
            if idx > 0 {
                f.write_str(joiner)?;
            }
            write!(f, "{:?}", part)?;
        }
        Ok(())
    }
}

impl Condition {
    /// Parses a condition.
    pub fn parse(source: &str) -> Condition {
        let source = source.trim();
        if source.is_empty() {
            return Condition(Repr::Empty);
        }

        let alternatives = split_top_level_word(source, "or");
        if alternatives.len() > 1 {
            return Condition(Repr::Or(
                alternatives.into_iter().map(Condition::parse).collect(),
            ));
        }
        let terms = split_top_level_word(source, "and");
        if terms.len() > 1 {
            return Condition(Repr::And(terms.into_iter().map(Condition::parse).collect()));
        }

        if let Some(idx) = find_top_level_word(source, "contains") {
            return Condition(Repr::Contains(
                Expression::parse(&source[..idx]),
                Expression::parse(&source[idx + "contains".len()..]),
            ));
        }
        for op in COMPARE_OPS {
            if let Some(idx) = find_top_level(source, op.as_str()) {
                return Condition::compare(
                    op,
                    Expression::parse(&source[..idx]),
                    Expression::parse(&source[idx + op.as_str().len()..]),
                );
            }
        }
        Condition(Repr::Truthy(Expression::parse(source)))
    }

    pub(crate) fn compare(op: CompareOp, left: Expression, right: Expression) -> Condition {
        Condition(Repr::Compare(op, left, right))
    }

    /// Creates a condition that holds if any of the given conditions holds.
    pub(crate) fn any(conditions: Vec<Condition>) -> Condition {
        Condition(Repr::Or(conditions))
    }

    /// Evaluates the condition against a context.
    pub fn eval(&self, ctx: &Context) -> bool {
        match self.0 {
            Repr::Empty => false,
            Repr::Or(ref alternatives) => alternatives.iter().any(|x| x.eval(ctx)),
            Repr::And(ref terms) => terms.iter().all(|x| x.eval(ctx)),
            Repr::Contains(ref left, ref right) => {
                ops::contains(&left.eval(ctx), &right.eval(ctx))
            }
            Repr::Compare(op, ref left, ref right) => {
                compare_values(op, &left.eval(ctx), &right.eval(ctx))
            }
            Repr::Truthy(ref expr) => expr.eval(ctx).is_true(),
        }
    }
}

fn compare_values(op: CompareOp, left: &Value, right: &Value) -> bool {
    match op {
        CompareOp::Eq => left == right,
        CompareOp::Ne => left != right,
        CompareOp::Gte => matches!(
            ops::compare(left, right),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        CompareOp::Lte => matches!(
            ops::compare(left, right),
            Some(Ordering::Less | Ordering::Equal)
        ),
        CompareOp::Gt => ops::compare(left, right) == Some(Ordering::Greater),
        CompareOp::Lt => ops::compare(left, right) == Some(Ordering::Less),
    }
}
