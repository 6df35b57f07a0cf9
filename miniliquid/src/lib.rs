//! MiniLiquid is a small template engine for Rust that understands the core of
//! the [Liquid](https://shopify.github.io/liquid/) template language as used by
//! static site generators.  It is implemented on top of [`serde`]: any
//! serializable value can be handed to a template.
//!
//! ```liquid
//! {% for post in site.posts %}
//!   <li>{{ post.title | default: "Untitled" }}</li>
//! {% endfor %}
//! ```
//!
//! Templates are parsed into a small syntax tree on every render and then
//! executed against a mutable [`Context`].  Supported are outputs with
//! filters, `if`/`elsif`/`else`/`unless`, `for` loops (with `else`),
//! `assign`, `case`/`when` and nested includes with parameters.  Tags the
//! engine does not know are written back to the output unchanged, so
//! templates can carry tags meant for another processing step.
//!
//! # Template Usage
//!
//! To render a template create an [`Environment`], register the includes
//! that templates may pull in and render a string against a context.  The
//! [`context!`] macro can be used to quickly construct a context:
//!
//! ```
//! use miniliquid::{context, Environment};
//!
//! let env = Environment::with_includes([("greeting.html", "Hello {{ name }}!")]);
//! let mut ctx = context!(name => "John");
//! println!("{}", env.render_str("{% include greeting %}", &mut ctx).unwrap());
//! ```
//!
//! ```plain
//! Hello John!
//! ```
//!
//! The context is changed by rendering: `assign` stores into it and the
//! values stay visible to the caller afterwards.  For super trivial cases
//! the [`render!`] macro renders a string once.
//!
//! # Expression Usage
//!
//! The expression and condition languages can be used on their own, which
//! is useful to evaluate the same filters and comparisons outside of
//! templates:
//!
//! ```
//! use miniliquid::{context, Environment};
//!
//! let env = Environment::new();
//! let ctx = context!(tag => "tile", name => "bath tile");
//! assert!(env.eval_condition("tag contains 'ti'", &ctx));
//! let rv = env.eval_expression(r#"name | replace: "tile", "Tile""#, &ctx);
//! assert_eq!(rv.to_string(), "bath Tile");
//! ```
//!
//! # Leniency
//!
//! Rendering is forgiving.  Unknown variables and filters evaluate to `nil`
//! or leave values alone, malformed control tags are dropped and blocks that
//! are never closed end with the template.  The only failures are includes
//! that cannot be found and includes that nest deeper than the recursion
//! limit; see [`Error`].
//!
//! # Logging
//!
//! The engine emits [`tracing`](https://docs.rs/tracing) events but never
//! installs a subscriber.  Includes are logged at `debug` level, missing
//! includes at `warn` level and dropped tags or unknown filters at `trace`
//! level.
#![allow(clippy::get_first)]
#![allow(clippy::needless_borrowed_reference)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]

#[macro_use]
mod macros;

mod compiler;
mod condition;
mod context;
mod defaults;
mod environment;
mod error;
mod expression;
mod utils;
mod vm;

pub mod filters;
pub mod value;

pub use self::condition::Condition;
pub use self::context::Context;
pub use self::environment::Environment;
pub use self::error::{Error, ErrorKind};
pub use self::expression::Expression;

/// Re-export for convenience.
pub use self::value::Value;

pub use self::macros::__context;
