use std::fmt::Write;

use crate::compiler::ast;
use crate::context::Context;
use crate::environment::Environment;
use crate::error::Error;
use crate::value::{Value, ValueMap};

/// Walks a parsed template and writes the output.
pub struct Vm<'env> {
    env: &'env Environment<'env>,
    name: &'env str,
    depth: usize,
}

fn loop_object(idx: usize, len: usize) -> Value {
    let mut rv = ValueMap::with_capacity(7);
    rv.insert("index".into(), Value::from(idx + 1));
    rv.insert("index0".into(), Value::from(idx));
    rv.insert("rindex".into(), Value::from(len - idx));
    rv.insert("rindex0".into(), Value::from(len - idx - 1));
    rv.insert("first".into(), Value::from(idx == 0));
    rv.insert("last".into(), Value::from(idx + 1 == len));
    rv.insert("length".into(), Value::from(len));
    Value::Map(rv)
}

impl<'env> Vm<'env> {
    /// Creates a new VM for the template `name` at the given include depth.
    pub fn new(env: &'env Environment<'env>, name: &'env str, depth: usize) -> Vm<'env> {
        Vm { env, name, depth }
    }

    /// Evaluates a statement against the context.
    pub fn eval(
        &self,
        stmt: &ast::Stmt<'_>,
        ctx: &mut Context,
        out: &mut String,
    ) -> Result<(), Error> {
        match stmt {
            ast::Stmt::Template(t) => self.eval_body(&t.children, ctx, out),
            ast::Stmt::EmitRaw(raw) => {
                out.push_str(raw.raw);
                Ok(())
            }
            ast::Stmt::RawTag(tag) => {
                out.push_str(tag.raw);
                Ok(())
            }
            ast::Stmt::EmitExpr(emit) => {
                write!(out, "{}", emit.expr.eval(ctx))?;
                Ok(())
            }
            ast::Stmt::Assign(assign) => {
                let value = assign.expr.eval(ctx);
                ctx.insert(&*assign.target, value);
                Ok(())
            }
            ast::Stmt::IfCond(if_cond) => {
                for branch in &if_cond.branches {
                    if branch.cond.eval(ctx) != branch.negated {
                        return self.eval_body(&branch.body, ctx, out);
                    }
                }
                self.eval_body(&if_cond.else_body, ctx, out)
            }
            ast::Stmt::ForLoop(for_loop) => self.eval_for_loop(for_loop, ctx, out),
            ast::Stmt::Include(include) => {
                let rv = self.eval_include(include, ctx);
                match rv {
                    Ok(rendered) => {
                        out.push_str(&rendered);
                        Ok(())
                    }
                    Err(mut err) => {
                        err.set_location(self.name, include.span().start_line as usize);
                        Err(err)
                    }
                }
            }
        }
    }

    fn eval_body(
        &self,
        body: &[ast::Stmt<'_>],
        ctx: &mut Context,
        out: &mut String,
    ) -> Result<(), Error> {
        for stmt in body {
            ok!(self.eval(stmt, ctx, out));
        }
        Ok(())
    }

    fn eval_for_loop(
        &self,
        for_loop: &ast::ForLoop<'_>,
        ctx: &mut Context,
        out: &mut String,
    ) -> Result<(), Error> {
        let items = for_loop.iter.eval(ctx).into_list();
        if items.is_empty() {
            let rv = self.eval_body(&for_loop.else_body, ctx, out);
            ctx.remove(for_loop.target);
            return rv;
        }

        let parent_loop = ctx.remove("forloop");
        let len = items.len();
        let mut rv = Ok(());
        for (idx, item) in items.into_iter().enumerate() {
            ctx.insert(for_loop.target, item);
            ctx.insert("forloop", loop_object(idx, len));
            rv = self.eval_body(&for_loop.body, ctx, out);
            if rv.is_err() {
                break;
            }
        }
        ctx.remove(for_loop.target);
        ctx.restore("forloop", parent_loop);
        rv
    }

    /// Renders an include with its parameters bound to `include`.
    ///
    /// The previous `include` entry is put back (or removed) whatever the
    /// outcome of the nested render.
    fn eval_include(
        &self,
        include: &ast::Include<'_>,
        ctx: &mut Context,
    ) -> Result<String, Error> {
        let params: ValueMap = include
            .params
            .iter()
            .map(|&(key, value)| (key.to_string(), Value::from(value)))
            .collect();
        let previous = ctx.insert("include", Value::Map(params));
        let rv = self.env.render_include_at(include.name, ctx, self.depth + 1);
        ctx.restore("include", previous);
        rv
    }
}
