use std::borrow::Cow;
use std::fmt;
use std::ops::Deref;

use crate::compiler::tokens::Span;
use crate::condition::Condition;
use crate::expression::Expression;

/// Container for nodes with location info.
///
/// This container fulfills two purposes: it adds location information
/// to nodes, but it also ensures the nodes is heap allocated.  The
/// latter is useful to ensure that enum variants do not cause the enum
/// to become too large.
pub struct Spanned<T> {
    inner: Box<(T, Span)>,
}

impl<T> Spanned<T> {
    /// Creates a new spanned node.
    pub fn new(node: T, span: Span) -> Spanned<T> {
        Spanned {
            inner: Box::new((node, span)),
        }
    }

    /// Accesses the span.
    pub fn span(&self) -> Span {
        self.inner.1
    }
}

impl<T> Deref for Spanned<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner.0
    }
}

impl<T: fmt::Debug> fmt::Debug for Spanned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        ok!(fmt::Debug::fmt(&self.inner.0, f));
        write!(f, "{:?}", self.inner.1)
    }
}

/// A statement node.
pub enum Stmt<'a> {
    Template(Spanned<Template<'a>>),
    EmitRaw(Spanned<EmitRaw<'a>>),
    EmitExpr(Spanned<EmitExpr>),
    RawTag(Spanned<RawTag<'a>>),
    IfCond(Spanned<IfCond<'a>>),
    ForLoop(Spanned<ForLoop<'a>>),
    Assign(Spanned<Assign<'a>>),
    Include(Spanned<Include<'a>>),
}

impl fmt::Debug for Stmt<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Template(s) => fmt::Debug::fmt(s, f),
            Stmt::EmitRaw(s) => fmt::Debug::fmt(s, f),
            Stmt::EmitExpr(s) => fmt::Debug::fmt(s, f),
            Stmt::RawTag(s) => fmt::Debug::fmt(s, f),
            Stmt::IfCond(s) => fmt::Debug::fmt(s, f),
            Stmt::ForLoop(s) => fmt::Debug::fmt(s, f),
            Stmt::Assign(s) => fmt::Debug::fmt(s, f),
            Stmt::Include(s) => fmt::Debug::fmt(s, f),
        }
    }
}

/// Root template node.
#[derive(Debug)]
pub struct Template<'a> {
    pub children: Vec<Stmt<'a>>,
}

/// Outputs raw template data.
#[derive(Debug)]
pub struct EmitRaw<'a> {
    pub raw: &'a str,
}

/// Outputs the value of an expression.
#[derive(Debug)]
pub struct EmitExpr {
    pub expr: Expression,
}

/// A tag the engine does not handle, written back as it was.
#[derive(Debug)]
pub struct RawTag<'a> {
    pub raw: &'a str,
}

/// An `if`/`elsif`/`else` chain.
///
/// The first branch whose condition holds runs, otherwise the else body.
/// `elsif` and lowered `when` tags add branches instead of nesting, so a
/// long chain does not deepen the tree.
#[derive(Debug)]
pub struct IfCond<'a> {
    pub branches: Vec<CondBranch<'a>>,
    pub else_body: Vec<Stmt<'a>>,
}

/// One branch of an [`IfCond`].  `unless` sets `negated`.
#[derive(Debug)]
pub struct CondBranch<'a> {
    pub cond: Condition,
    pub negated: bool,
    pub body: Vec<Stmt<'a>>,
}

/// A for loop.
#[derive(Debug)]
pub struct ForLoop<'a> {
    pub target: &'a str,
    pub iter: Expression,
    pub body: Vec<Stmt<'a>>,
    pub else_body: Vec<Stmt<'a>>,
}

/// An assign statement.
///
/// The target is owned for temporaries introduced by `case`.
#[derive(Debug)]
pub struct Assign<'a> {
    pub target: Cow<'a, str>,
    pub expr: Expression,
}

/// Includes another template.
#[derive(Debug)]
pub struct Include<'a> {
    pub name: &'a str,
    pub params: Vec<(&'a str, &'a str)>,
}
